//! Minting ids for new blocks.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::block::BlockId;

/// Supplies fresh block ids to the editor.
///
/// Kept out of the reducer so state transitions stay deterministic; tests
/// inject [`SequentialIds`]. `None` means the source has run out.
pub trait IdSource: Send {
    fn next_id(&mut self) -> Option<BlockId>;
}

/// Millisecond timestamps, bumped so that every id is strictly greater than
/// the one before even within the same millisecond.
#[derive(Debug, Default)]
pub struct ClockIds {
    last: Option<u64>,
}

impl IdSource for ClockIds {
    fn next_id(&mut self) -> Option<BlockId> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let next = match self.last {
            Some(last) => now.max(last.checked_add(1)?),
            None => now,
        };
        self.last = Some(next);
        Some(BlockId::Number(next))
    }
}

/// Counts up from a starting number and stops after `u64::MAX`.
#[derive(Debug)]
pub struct SequentialIds {
    next: Option<u64>,
}

impl SequentialIds {
    pub const fn starting_at(first: u64) -> Self {
        Self { next: Some(first) }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> Option<BlockId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(BlockId::Number(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_ids_strictly_increase() {
        let mut ids = ClockIds::default();
        let mut previous = match ids.next_id() {
            Some(BlockId::Number(n)) => n,
            other => panic!("unexpected id {other:?}"),
        };
        for _ in 0..1000 {
            let Some(BlockId::Number(n)) = ids.next_id() else {
                panic!("clock ids are numbers");
            };
            assert!(n > previous);
            previous = n;
        }
    }

    #[test]
    fn test_clock_ids_stop_instead_of_repeating_the_last_id() {
        let mut ids = ClockIds {
            last: Some(u64::MAX),
        };
        assert_eq!(ids.next_id(), None);
    }

    #[test]
    fn test_sequential_ids_count_from_start() {
        let mut ids = SequentialIds::starting_at(10);
        assert_eq!(ids.next_id(), Some(BlockId::Number(10)));
        assert_eq!(ids.next_id(), Some(BlockId::Number(11)));
    }

    #[test]
    fn test_sequential_ids_end_after_largest_number() {
        let mut ids = SequentialIds::starting_at(u64::MAX - 1);
        assert_eq!(ids.next_id(), Some(BlockId::Number(u64::MAX - 1)));
        assert_eq!(ids.next_id(), Some(BlockId::Number(u64::MAX)));
        assert_eq!(ids.next_id(), None);
        assert_eq!(ids.next_id(), None);
    }
}
