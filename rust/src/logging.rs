//! Logging macros for the layout pipeline with verbosity level control.
//!
//! Provides zero-cost logging when disabled (verbosity=0).
//! Verbosity levels:
//! - 0: SILENT (nothing, errors are returned as values)
//! - 1: WARNINGS (input diagnostics such as missing dependencies)
//! - 2: STAGES (one line per pipeline stage with counts)
//! - 3: DEBUG (segment/face internals of the embedding pass)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_WARNINGS: u8 = 1;
pub const VERBOSITY_STAGES: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at WARNINGS level (verbosity >= 1).
///
/// Used for: tolerated input inconsistencies and degenerate schedules.
#[macro_export]
macro_rules! log_warn {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_WARNINGS {
            eprintln!("[pert] warning: {}", format_args!($($arg)*));
        }
    };
}

/// Log at STAGES level (verbosity >= 2).
///
/// Used for: index/schedule/synthesis/layout stage summaries.
#[macro_export]
macro_rules! log_stage {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_STAGES {
            eprintln!("[pert] {}", format_args!($($arg)*));
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!("[pert]   {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(VERBOSITY_SILENT < VERBOSITY_WARNINGS);
        assert!(VERBOSITY_WARNINGS < VERBOSITY_STAGES);
        assert!(VERBOSITY_STAGES < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        // Silent verbosity must not evaluate into output, only compile
        let verbosity = VERBOSITY_SILENT;
        log_warn!(verbosity, "missing {}", "a");
        log_stage!(verbosity, "levels {}", 2);
        log_debug!(verbosity, "face {:?}", [0, 1]);
    }
}
