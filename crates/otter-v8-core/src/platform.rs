//! Process-wide engine initialization
//!
//! V8's platform is created once per process on first use. Engine flags from
//! `OTTER_V8_FLAGS` are applied before initialization.

use std::ffi::CStr;
use std::sync::Once;

use otter_v8_sys::{otter_v8_initialize, otter_v8_set_flags, otter_v8_version};
use tracing::{debug, warn};

use crate::error::V8Result;
use crate::registry::function_callback_trampoline;
use crate::string::to_cstring;

/// Environment variable holding engine flags applied at initialization
pub const FLAGS_ENV: &str = "OTTER_V8_FLAGS";

static INIT: Once = Once::new();

/// Initialize the engine platform. Safe to call repeatedly.
pub fn initialize() {
    INIT.call_once(|| {
        if let Ok(flags) = std::env::var(FLAGS_ENV) {
            match to_cstring(&flags) {
                // SAFETY: flags is NUL-terminated and V8 copies it
                Ok(c_flags) => unsafe { otter_v8_set_flags(c_flags.as_ptr()) },
                Err(e) => warn!(error = %e, "Ignoring {FLAGS_ENV}"),
            }
        }
        // SAFETY: runs once; the trampoline lives for the whole process
        unsafe { otter_v8_initialize(Some(function_callback_trampoline)) };
        debug!(version = version(), "V8 platform initialized");
    });
}

/// Engine version string, e.g. `"9.0.257.19"`
pub fn version() -> &'static str {
    // SAFETY: V8 returns a static NUL-terminated string
    unsafe { CStr::from_ptr(otter_v8_version()) }
        .to_str()
        .unwrap_or("unknown")
}

/// Set engine flags such as `"--harmony --allow-natives-syntax"`.
///
/// Flags apply to isolates created afterwards; most must be set before the
/// first isolate exists.
pub fn set_flags(flags: &str) -> V8Result<()> {
    let c_flags = to_cstring(flags)?;
    // SAFETY: c_flags is NUL-terminated and V8 copies it
    unsafe { otter_v8_set_flags(c_flags.as_ptr()) };
    debug!(flags, "V8 flags set");
    Ok(())
}
