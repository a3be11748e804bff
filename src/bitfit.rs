//! First-fit decreasing bit packing.
//!
//! Variables are placed into fixed-width groups (one storage word each) so
//! that no variable straddles a group boundary and no two variables overlap
//! inside a group. Offsets count from the most significant bit of the group.

/// Upper bound on the number of groups a single allocation may open.
pub const MAX_GROUPS: usize = 4_096;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub group: u32,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// One slot per input width, in input order.
    pub slots: Vec<Slot>,
    pub group_count: u32,
    pub group_width: u32,
}

impl Allocation {
    /// Bits spanned up to and including the highest used group.
    pub fn total_bits(&self) -> u64 {
        u64::from(self.group_count) * u64::from(self.group_width)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("width {width} exceeds the {group_width}-bit group width")]
    TooWide { width: u64, group_width: u32 },
    #[error("group table exhausted ({MAX_GROUPS} groups)")]
    Exhausted,
}

impl AllocError {
    /// The input index the error refers to, if any.
    fn with_index(self, index: usize) -> (usize, AllocError) {
        (index, self)
    }
}

/// Assigns a slot to every width.
///
/// Widths are visited in descending order; equal widths keep their input
/// order, so the packing is reproducible. Each width goes into the first group
/// with enough free bits, opening a new group when none has room.
///
/// On failure, returns the index of the offending width alongside the error.
pub fn allocate(widths: &[u64], group_width: u32) -> Result<Allocation, (usize, AllocError)> {
    debug_assert!(group_width > 0);

    if let Some(index) = widths.iter().position(|&w| w > u64::from(group_width)) {
        let error = AllocError::TooWide {
            width: widths[index],
            group_width,
        };
        return Err(error.with_index(index));
    }

    let mut order: Vec<usize> = (0..widths.len()).collect();
    // `sort_by` is stable: equal widths stay in declaration order.
    order.sort_by(|&a, &b| widths[b].cmp(&widths[a]));

    // Used bits per open group.
    let mut used: Vec<u32> = Vec::new();
    let mut slots = vec![Slot { group: 0, offset: 0 }; widths.len()];

    for index in order {
        // Checked above, always fits in a group.
        let width = u32::try_from(widths[index]).unwrap_or(group_width);
        let group = match used.iter().position(|&u| u + width <= group_width) {
            Some(group) => group,
            None => {
                if used.len() == MAX_GROUPS {
                    return Err(AllocError::Exhausted.with_index(index));
                }
                used.push(0);
                used.len() - 1
            }
        };
        slots[index] = Slot {
            group: u32::try_from(group).unwrap_or(u32::MAX),
            offset: used[group],
        };
        used[group] += width;
    }

    let group_count = u32::try_from(used.len()).unwrap_or(u32::MAX);
    tracing::trace!(vars = widths.len(), group_count, "allocated bit groups");
    Ok(Allocation {
        slots,
        group_count,
        group_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn slot(group: u32, offset: u32) -> Slot {
        Slot { group, offset }
    }

    #[test]
    fn test_empty_allocation() {
        let a = allocate(&[], 64).unwrap();
        assert!(a.slots.is_empty());
        assert_eq!(a.group_count, 0);
        assert_eq!(a.total_bits(), 0);
    }

    #[test]
    fn test_first_fit_decreasing() {
        // Sorted: 40 (idx 1), 30 (idx 3), 20 (idx 0), 10 (idx 2).
        let a = allocate(&[20, 40, 10, 30], 64).unwrap();
        assert_eq!(
            a.slots,
            [slot(0, 40), slot(0, 0), slot(1, 30), slot(1, 0)]
        );
        assert_eq!(a.group_count, 2);
        assert_eq!(a.total_bits(), 128);
    }

    #[test]
    fn test_equal_widths_keep_declaration_order() {
        let a = allocate(&[8, 8, 8], 16).unwrap();
        assert_eq!(a.slots, [slot(0, 0), slot(0, 8), slot(1, 0)]);
    }

    #[test]
    fn test_full_width_variable_sits_alone_at_offset_zero() {
        let a = allocate(&[1, 64, 3], 64).unwrap();
        assert_eq!(a.slots[1], slot(0, 0));
        assert_eq!(a.slots[0], slot(1, 3));
        assert_eq!(a.slots[2], slot(1, 0));
    }

    #[test]
    fn test_too_wide() {
        assert_eq!(
            allocate(&[3, 65], 64),
            Err((
                1,
                AllocError::TooWide {
                    width: 65,
                    group_width: 64
                }
            ))
        );
    }

    #[test]
    fn test_exhausted() {
        let widths = vec![32; MAX_GROUPS + 1];
        assert_eq!(
            allocate(&widths, 32),
            Err((MAX_GROUPS, AllocError::Exhausted))
        );
    }

    proptest! {
        #[test]
        fn prop_no_overlap_and_no_straddle(
            widths in prop::collection::vec(1u64..=64, 0..48),
        ) {
            let a = allocate(&widths, 64).unwrap();
            prop_assert_eq!(a.slots.len(), widths.len());

            for (i, (s, &w)) in a.slots.iter().zip(&widths).enumerate() {
                prop_assert!(u64::from(s.offset) + w <= 64);
                prop_assert!(s.group < a.group_count);
                for (t, &v) in a.slots.iter().zip(&widths).skip(i + 1) {
                    if s.group == t.group {
                        let disjoint = u64::from(s.offset) + w <= u64::from(t.offset)
                            || u64::from(t.offset) + v <= u64::from(s.offset);
                        prop_assert!(disjoint, "{s:?}/{w} overlaps {t:?}/{v}");
                    }
                }
            }
        }

        #[test]
        fn prop_full_width_is_alone(widths in prop::collection::vec(1u64..=64, 1..24)) {
            let a = allocate(&widths, 64).unwrap();
            for (s, &w) in a.slots.iter().zip(&widths) {
                if w == 64 {
                    prop_assert_eq!(s.offset, 0);
                    let sharing = a.slots.iter().filter(|t| t.group == s.group).count();
                    prop_assert_eq!(sharing, 1);
                }
            }
        }

        #[test]
        fn prop_deterministic(widths in prop::collection::vec(1u64..=32, 0..32)) {
            prop_assert_eq!(allocate(&widths, 32), allocate(&widths, 32));
        }
    }
}
