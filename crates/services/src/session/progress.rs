/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_submitted: bool,
}

impl AttemptProgress {
    #[must_use]
    pub fn is_ready_to_submit(&self) -> bool {
        !self.is_submitted && self.remaining == 0
    }
}
