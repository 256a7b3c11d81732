//! A NUMA memory-policy engine.
//!
//! A memory policy tells the page allocator which NUMA nodes the pages of a task, or of a part
//! of its address space, should come from. This crate implements:
//!
//! * the policy objects ([`policy::MemPolicy`]): default, preferred, bind and interleave,
//! * where policies are attached: per process ([`policy::TaskPolicy`]), per area (through the
//!   [`vm::VirtualArea`] trait), and per page range of shared objects
//!   ([`policy::SharedPolicy`]),
//! * which policy governs an address ([`policy::resolve`]) and which node an allocation under
//!   it uses ([`policy::select`]),
//! * enforcing a policy over an existing range: attaching it and checking or moving the pages
//!   already there ([`enforce`]).
//!
//! The engine does not own any memory management state. A binding describes the machine by
//! implementing the traits in [`vm`], and calls the operations in [`memory_manager`] on a
//! [`PolicyEngine`] built by a [`PolicyEngineBuilder`].
//!
//! Logging goes through the `log` crate. By default, [`memory_manager::init`] installs
//! `env_logger`, which can be turned off by disabling the `builtin_env_logger` feature.

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod mempolicy;
pub use mempolicy::PolicyEngine;
pub use mempolicy::PolicyEngineBuilder;

pub mod build_info;
pub mod enforce;
pub mod memory_manager;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::policy::{MemPolicy, PolicyMode};
pub use crate::util::error::{InvalidPolicy, PolicyError};
pub use crate::util::nodemask::{NodeId, NodeMask};
