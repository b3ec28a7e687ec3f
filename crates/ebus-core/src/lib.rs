//! # ebus-core
//!
//! Leaf types shared by the broker, the server and the client:
//!
//! - [`Event`]: the addressed message flowing through the system
//! - [`Address`]: the closed set of destination kinds (agent, service, group)
//! - [`codec`]: the flat unit-separator wire format, with direction-dependent
//!   field mapping
//! - [`Bus`]: the per-agent FIFO mailbox with a post-enqueue notify hook

#![deny(unsafe_code)]

pub mod address;
pub mod codec;
pub mod errors;
pub mod event;
pub mod mailbox;

pub use address::Address;
pub use codec::Direction;
pub use errors::CodecError;
pub use event::Event;
pub use mailbox::{Bus, NotifyHook};
