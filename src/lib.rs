pub mod config;
pub mod error;
pub mod identity;
pub mod security;
pub mod server;
pub mod upstream;

// Debug-build printing helper for session traces; compiled out of release builds.
// Usage: tprintln!("session.bind sid={}", sid);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-debug builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
