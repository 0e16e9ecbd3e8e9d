/// Tunables for [`crate::OrderEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on line items in one placement.
    pub max_lines_per_order: usize,
}

impl EngineConfig {
    pub const DEFAULT_MAX_LINES_PER_ORDER: usize = 100;

    pub fn with_max_lines_per_order(mut self, max: usize) -> Self {
        self.max_lines_per_order = max;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lines_per_order: Self::DEFAULT_MAX_LINES_PER_ORDER,
        }
    }
}
