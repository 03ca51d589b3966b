use std::fmt;
use std::time::Duration;

/// Knobs validated once at run start. Processor-specific options never pass
/// through here; they stay with the processor and are opaque to the
/// scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Per-item deadline covering both page load and processing time.
    pub timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound on concurrently open target tabs. Clamped to the number
    /// of work items when the run starts.
    pub max_concurrent: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            viewport_width: 1024,
            viewport_height: 768,
            max_concurrent: 1,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.timeout.is_zero() {
            return Err(OptionsError::ZeroTimeout);
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(OptionsError::ZeroViewport);
        }
        if self.max_concurrent == 0 {
            return Err(OptionsError::ZeroConcurrency);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    ZeroTimeout,
    ZeroViewport,
    ZeroConcurrency,
    NoWorkItems,
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::ZeroTimeout => write!(f, "timeout must be positive"),
            OptionsError::ZeroViewport => write!(f, "viewport dimensions must be non-zero"),
            OptionsError::ZeroConcurrency => write!(f, "max concurrent tabs must be at least 1"),
            OptionsError::NoWorkItems => write!(f, "no work items to visit"),
        }
    }
}

impl std::error::Error for OptionsError {}
