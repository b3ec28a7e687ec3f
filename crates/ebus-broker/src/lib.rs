//! # ebus-broker
//!
//! The routing and delivery engine.
//!
//! - [`Agent`]: one connected endpoint's mailbox, wake-up signal and joined groups
//! - [`Manager`]: agent, service and group registries behind one routing lock
//! - [`Router`]: the lock-held routing handle passed to service handlers
//! - [`services`]: built-in `@join`, `@leave`, `@boardcast`, `@record`,
//!   `@status` and `@manage` handlers
//! - [`RecordStore`]: key-value map whose changes fan out to subscribers

#![deny(unsafe_code)]

pub mod agent;
pub mod manager;
pub mod metrics;
pub mod record;
pub mod services;

pub use agent::Agent;
pub use manager::{Manager, Router};
pub use record::RecordStore;
pub use services::{Service, ServiceRegistry};

/// Sender address of the initial address-assignment event.
pub const MANAGER_ADDRESS: &str = "@manager";
/// Topic of the initial address-assignment event.
pub const SET_ID_TOPIC: &str = "@set.id";
