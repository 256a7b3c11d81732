//! Enforcing policies over existing mappings: attaching a policy to an address range, and
//! checking (or moving) the pages already in it.

mod range;
mod scan;

pub use self::range::apply_policy_to_range;
pub use self::range::MbindFlags;
pub use self::scan::verify_and_fix;
pub use self::scan::ScanMode;
pub use self::scan::ScanReport;
