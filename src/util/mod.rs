//! Utilities used by the rest of the crate.

/// Virtual addresses.
pub mod address;
/// Constants, mostly sizes.
pub mod constants;
/// Address and page arithmetic.
pub mod conversions;
/// The error types.
pub mod error;
/// Logger initialization.
pub mod logger;
/// Node ids and node masks.
pub mod nodemask;
/// Engine options.
pub mod options;
/// Event counters.
pub mod statistics;
mod synchronized_counter;
/// Test helpers and the mock machine.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
pub use self::synchronized_counter::SynchronizedCounter;
