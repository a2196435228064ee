//! Logging shims.
//!
//! With the `defmt` feature these forward to defmt.  On `std` builds they
//! print, which keeps test output readable.  Otherwise they vanish, the
//! arguments are only borrowed so they don't warn as unused.

#![allow(unused_macros)]

macro_rules! log_at {
    ($level:ident, $tag:literal, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($fmt $(, $arg)*);
        #[cfg(all(feature = "std", not(feature = "defmt")))]
        ::std::println!(concat!($tag, " ", $fmt) $(, $arg)*);
        #[cfg(not(any(feature = "std", feature = "defmt")))]
        {
            $( let _ = &$arg; )*
        }
    }};
}

macro_rules! debug {
    ($($t:tt)*) => { log_at!(debug, "DEBUG", $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { log_at!(info, "INFO ", $($t)*) };
}

macro_rules! warn {
    ($($t:tt)*) => { log_at!(warn, "WARN ", $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { log_at!(error, "ERROR", $($t)*) };
}
