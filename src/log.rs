//! House logging. Diagnostics in this crate never unwind or panic (§7), so
//! every error path reports through `log!` and returns instead. Kept as a
//! small hand-rolled macro, same as the teacher repo's own `crate::log`
//! module, rather than pulling in the `log` crate: there is no downstream
//! consumer that would want to plug in a different subscriber, only a
//! handful of call sites that always want "print this to stderr, maybe."

use lazy_static::lazy_static;
use std::env;

#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    LogError = 0,
    LogWarn = 1,
    LogInfo = 2,
    LogDebug = 3,
}

lazy_static! {
    static ref LEVEL: LogLevel = init_level();
}

fn init_level() -> LogLevel {
    match env::var("RD_MIGRATE_LOG").as_deref() {
        Ok("debug") => LogLevel::LogDebug,
        Ok("info") => LogLevel::LogInfo,
        Ok("warn") => LogLevel::LogWarn,
        Ok("error") => LogLevel::LogError,
        // Default to Warn: the shim's diagnostics (§7) should be visible
        // out of the box without drowning stderr in Debug chatter.
        _ => LogLevel::LogWarn,
    }
}

pub fn enabled(level: LogLevel) -> bool {
    level <= *LEVEL
}

#[doc(hidden)]
pub fn level_prefix(level: LogLevel) -> &'static str {
    match level {
        LogLevel::LogError => "error",
        LogLevel::LogWarn => "warn",
        LogLevel::LogInfo => "info",
        LogLevel::LogDebug => "debug",
    }
}

#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::enabled($level) {
            eprintln!("[migration-shim {}] {}", $crate::log::level_prefix($level), format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_prefixes_are_lowercase() {
        assert_eq!(level_prefix(LogLevel::LogError), "error");
        assert_eq!(level_prefix(LogLevel::LogDebug), "debug");
    }
}
