use std::num::NonZero;

/// The allocation path selected by the number of items in an allocation or deallocation.
///
/// The two paths share nothing: single slots come from blocks and return to the free-list,
/// while bulk regions are allocated and tracked individually.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Request {
    /// Exactly one item, served from the block free-list.
    Single,

    /// More than one item, served by a dedicated allocation. The count is always at least 2.
    Bulk { count: NonZero<usize> },
}

impl Request {
    /// Classifies an item count. Returns `None` for a count of zero, which is a no-op for both
    /// allocation and deallocation.
    #[must_use]
    pub(crate) fn from_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::Single),
            _ => NonZero::new(count).map(|count| Self::Bulk { count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn zero_is_no_request() {
        assert_eq!(Request::from_count(0), None);
    }

    #[test]
    fn one_is_single() {
        assert_eq!(Request::from_count(1), Some(Request::Single));
    }

    #[test]
    fn more_than_one_is_bulk() {
        assert_eq!(
            Request::from_count(2),
            Some(Request::Bulk { count: nz!(2) })
        );
        assert_eq!(
            Request::from_count(usize::MAX),
            Some(Request::Bulk {
                count: nz!(usize::MAX)
            })
        );
    }
}
