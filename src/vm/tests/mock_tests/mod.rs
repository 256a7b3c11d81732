// All the tests with prefix 'mock_test_' run the engine against the mock machine in
// `crate::util::test_util::mock_machine`. Each test builds its own machine and engine, so the
// tests are independent and can run in parallel. Tests that change options through
// environment variables must use `serial_test`.

// Common includes for mock tests.
pub(crate) mod mock_test_prelude {
    pub use crate::enforce::*;
    pub use crate::memory_manager;
    pub use crate::policy::*;
    pub use crate::util::constants::BYTES_IN_PAGE;
    pub use crate::util::error::PolicyError;
    pub use crate::util::nodemask::{NodeId, NodeMask};
    pub use crate::util::test_util::mock_machine::*;
    pub use crate::util::Address;
    pub use crate::vm::*;

    pub fn nodes(list: &str) -> NodeMask {
        list.parse().unwrap()
    }
}

mod mock_test_cache_eviction;
mod mock_test_concurrent_policy_swap;
mod mock_test_low_zone_bypass;
mod mock_test_resolver_precedence;
mod mock_test_round_trip;
mod mock_test_shared_object;
mod mock_test_strict_bind;
