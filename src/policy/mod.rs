//! Memory policies: the policy objects, where they are attached, and how they pick nodes.
//!
//! * [`MemPolicy`]: an immutable, reference-counted policy.
//! * [`ZoneList`]: the zones a bind policy allocates from.
//! * [`TaskPolicy`]: the per-process policy slot.
//! * [`SharedPolicy`]: page-range policies of a shared object.
//! * [`resolve`]: which policy governs an address.
//! * [`select`]: which node an allocation under a policy uses.

mod mempolicy;
pub mod resolve;
pub mod select;
mod shared;
mod task;
mod zonelist;

pub use self::mempolicy::MemPolicy;
pub use self::mempolicy::PolicyMode;
pub use self::mempolicy::DEFAULT_POLICY;
pub use self::shared::InsertMode;
pub use self::shared::SharedPolicy;
pub use self::task::TaskPolicy;
pub use self::zonelist::PolicyZone;
pub use self::zonelist::Zone;
pub use self::zonelist::ZoneList;
pub use self::zonelist::ZoneType;
