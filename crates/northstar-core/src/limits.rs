/// Bounds applied when validating notebook cells and transformations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum execution timeout, in seconds
    pub max_timeout: i64,
    /// Maximum size of inline code, in bytes
    pub max_code_size: usize,
    /// Maximum number of cell arguments
    pub max_arg_count: usize,
    /// Maximum memory, in MB
    pub max_memory: u64,
    /// Memory used when none is requested, in MB
    pub default_memory: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_timeout: 180,
            max_code_size: 68916,
            max_arg_count: 10,
            max_memory: 6000,
            default_memory: 1000,
        }
    }
}
