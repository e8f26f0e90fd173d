//! Basic usage of the `slot_pool` crate:
//!
//! * Creating a pool.
//! * Allocating single slots and storing values in them.
//! * Returning slots and seeing them reused.
//! * Allocating and returning a contiguous array.

use slot_pool::SlotPool;

fn main() {
    let mut pool = SlotPool::<String>::new();

    // A slot is uninitialized memory for exactly one String. The pool never touches its contents.
    let alice = pool.allocate(1).unwrap().unwrap();
    let bob = pool.allocate(1).unwrap().unwrap();

    // SAFETY: Both slots are sized and aligned for String and were handed out to us.
    unsafe {
        alice.write("Alice".to_string());
        bob.write("Bob".to_string());
    }

    println!(
        "Pool has {} of {} slots in use, in {} block(s)",
        pool.used_slots(),
        pool.total_slots(),
        pool.block_count()
    );

    // We own the values, so we drop them before handing the memory back.
    // SAFETY: The slot holds an initialized String and came from this pool.
    unsafe {
        bob.drop_in_place();
        pool.deallocate(Some(bob), 1);
    }

    // The slot we just returned is the next one handed out.
    let charlie = pool.allocate(1).unwrap().unwrap();
    println!("Reused the freed slot: {}", charlie == bob);

    // SAFETY: The slot is ours and uninitialized.
    unsafe { charlie.write("Charlie".to_string()) };

    // Several contiguous items bypass the slots and get a dedicated region.
    let names = pool.allocate(3).unwrap().unwrap();

    // SAFETY: The region has room for 3 Strings and was handed out to us.
    unsafe {
        for (index, name) in ["Dave", "Eve", "Frank"].into_iter().enumerate() {
            names.add(index).write(name.to_string());
        }

        println!("Third name in the array: {}", names.add(2).as_ref());
    }

    println!(
        "Pool has {} slot(s) and {} array(s) outstanding",
        pool.used_slots(),
        pool.large_allocation_count()
    );

    // SAFETY: Every value is initialized and every allocation came from this pool with these counts.
    unsafe {
        for index in 0..3 {
            names.add(index).drop_in_place();
        }
        pool.deallocate(Some(names), 3);

        alice.drop_in_place();
        pool.deallocate(Some(alice), 1);

        charlie.drop_in_place();
        pool.deallocate(Some(charlie), 1);
    }

    println!("Pool is empty: {}", pool.is_empty());
}
