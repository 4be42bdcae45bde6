//! Configuration types for isolates.

use crate::snapshot::StartupData;

/// Isolate creation options.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Isolate, IsolateOptions};
///
/// let options = IsolateOptions::new().heap_limits(0, 64 * 1024 * 1024);
/// let iso = Isolate::with_options(options).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct IsolateOptions {
    /// Startup blob to deserialize the isolate from.
    /// Default: None (the engine's built-in snapshot)
    pub startup_data: Option<StartupData>,

    /// Initial heap size in bytes, only used with `max_heap_size`.
    /// Default: 0 (engine default)
    pub initial_heap_size: usize,

    /// Maximum heap size in bytes.
    /// Default: 0 (engine default)
    pub max_heap_size: usize,

    /// Capture stack traces for uncaught exceptions.
    /// Default: true
    pub capture_stack_traces: bool,
}

impl Default for IsolateOptions {
    fn default() -> Self {
        Self {
            startup_data: None,
            initial_heap_size: 0,
            max_heap_size: 0,
            capture_stack_traces: true,
        }
    }
}

impl IsolateOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the isolate from a snapshot blob.
    pub fn startup_data(mut self, data: StartupData) -> Self {
        self.startup_data = Some(data);
        self
    }

    /// Set initial and maximum heap sizes in bytes.
    pub fn heap_limits(mut self, initial: usize, max: usize) -> Self {
        self.initial_heap_size = initial;
        self.max_heap_size = max;
        self
    }

    /// Enable or disable stack trace capture for uncaught exceptions.
    pub fn capture_stack_traces(mut self, enabled: bool) -> Self {
        self.capture_stack_traces = enabled;
        self
    }
}
