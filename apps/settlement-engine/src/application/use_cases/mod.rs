//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod option_lifecycle;

pub use option_lifecycle::{
    LifecycleConfig, LifecyclePorts, MAX_SAFETY_MARGIN_BPS, OptionLifecycle, ProtocolParameters,
};
