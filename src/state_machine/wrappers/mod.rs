//! Common wrappers to provide generic functionality to [`StateMachine`](super::StateMachine)
//! containers that want to provide injected behavior for common state machine dependencies.
//!
//! This is typically to implicitly provide system resources to state machines that require them
//! to be deterministically provided via input.

pub mod input;
