use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of one candidate during a suppression pass: `Pending -> Kept | Suppressed`
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CandidateState {
    Pending = 0,
    Kept = 1,
    Suppressed = 2,
}

impl From<u8> for CandidateState {
    fn from(v: u8) -> Self {
        match v {
            1 => CandidateState::Kept,
            2 => CandidateState::Suppressed,
            _ => CandidateState::Pending,
        }
    }
}

/// Arena of per-candidate flags indexed by candidate id.
///
/// Transitions only leave `Pending`, so concurrent writers need nothing beyond a
/// compare-and-swap on the single flag they touch.
///
pub struct SuppressionState {
    flags: Vec<AtomicU8>,
}

impl SuppressionState {
    pub fn new(n: usize) -> Self {
        Self {
            flags: (0..n)
                .map(|_| AtomicU8::new(CandidateState::Pending as u8))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> CandidateState {
        CandidateState::from(self.flags[index].load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_pending(&self, index: usize) -> bool {
        self.get(index) == CandidateState::Pending
    }

    /// Marks a pending candidate as kept; returns `false` if it was already decided
    ///
    pub fn keep(&self, index: usize) -> bool {
        self.transit(index, CandidateState::Kept)
    }

    /// Marks a pending candidate as suppressed; returns `false` if it was already decided
    ///
    #[inline]
    pub fn suppress(&self, index: usize) -> bool {
        self.transit(index, CandidateState::Suppressed)
    }

    fn transit(&self, index: usize, to: CandidateState) -> bool {
        self.flags[index]
            .compare_exchange(
                CandidateState::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn count(&self, state: CandidateState) -> usize {
        (0..self.len()).filter(|&i| self.get(i) == state).count()
    }

    pub fn snapshot(&self) -> Vec<CandidateState> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}
