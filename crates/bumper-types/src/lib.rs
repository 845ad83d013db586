//! Shared data model for the bumper workspace.
//!
//! Every crate in the workspace speaks in these types: persisted orders and
//! wallet batches, the transaction envelope handed to delivery, and the
//! events broadcast while an order runs.

pub mod account;
pub mod batch;
pub mod delivery;
pub mod events;
pub mod order;
pub mod validation;

pub use account::*;
pub use batch::*;
pub use delivery::*;
pub use events::*;
pub use order::*;
pub use validation::*;

/// Re-exported so downstream crates agree on one primitive set.
pub use alloy::primitives::{Address, U256};
