//! Bit masks attached to functions and host methods.
//!
//! # Suspension categories
//!
//! A host method may suspend the running script back to the host scheduler
//! in one of several ways. Every script function carries two masks over the
//! same categories:
//! - **required**: categories its body (or anything it calls) may suspend in
//! - **allowed**: categories its calling context tolerates
//!
//! Compilation fails whenever `required` escapes `allowed`.

use bitflags::bitflags;

bitflags! {
    /// Suspension categories a call may use.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct SuspendMask: u8 {
        /// Plain asynchronous wait (timers, host events).
        const ASYNC = 1 << 0;
        /// Waits on a serial I/O transfer.
        const ASYNC_SIO = 1 << 1;
        /// Waits on a raw serial I/O transfer.
        const ASYNC_RAW_SIO = 1 << 2;
    }
}

impl SuspendMask {
    /// Human-readable list of set categories, for diagnostics.
    pub fn describe(self) -> String {
        if self.is_empty() {
            return "none".to_owned();
        }
        let mut parts = Vec::new();
        if self.contains(SuspendMask::ASYNC) {
            parts.push("async");
        }
        if self.contains(SuspendMask::ASYNC_SIO) {
            parts.push("async-sio");
        }
        if self.contains(SuspendMask::ASYNC_RAW_SIO) {
            parts.push("async-raw-sio");
        }
        parts.join("|")
    }
}

bitflags! {
    /// Properties of a host method.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MethodFlags: u8 {
        /// Called on the class name, not on an instance.
        const STATIC = 1 << 0;
    }
}

bitflags! {
    /// Which conditional-attribute regions are compiled for a function.
    ///
    /// `[debug]`/`[!debug]` follow the `DEBUG_ENABLED`/`NON_DEBUG_ENABLED`
    /// bits. `[debug_read]`/`[!debug_read]` follow the `*_READ_ENABLED`
    /// bits and are only legal at all when `ALLOWED` is set.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ConditionalMask: u8 {
        const ALLOWED = 1 << 0;
        const DEBUG_READ_ENABLED = 1 << 1;
        const NON_DEBUG_READ_ENABLED = 1 << 2;
        const DEBUG_ENABLED = 1 << 3;
        const NON_DEBUG_ENABLED = 1 << 4;

        /// Host context reading in debug mode.
        const DEBUG_READ_ONLY = Self::ALLOWED.bits() | Self::DEBUG_READ_ENABLED.bits();
        /// Host context reading outside debug mode.
        const NON_DEBUG_READ_ONLY = Self::ALLOWED.bits() | Self::NON_DEBUG_READ_ENABLED.bits();
    }
}

impl ConditionalMask {
    /// Mask for ordinary functions: only the plain debug switch applies.
    pub fn for_debug(debug: bool) -> Self {
        if debug {
            ConditionalMask::DEBUG_ENABLED
        } else {
            ConditionalMask::NON_DEBUG_ENABLED
        }
    }
}
