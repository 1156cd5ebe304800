//! # zmirror Driver Facade
//!
//! The interface boundary to the native device-network driver.
//!
//! This crate provides:
//! - `DriverEvent` / `EventKind`: the closed set of driver notifications
//! - `EventBus`: a typed multi-subscriber registry keyed by event kind,
//!   rejecting unrecognized event names at registration time
//! - `DeviceControl`: the write capability set the gateway dispatches to
//! - `MockDriver`: a recording implementation for tests and demos

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod control;
pub mod events;
pub mod mock;

pub use bus::EventBus;
pub use control::{DeviceControl, DriverError};
pub use events::{DriverEvent, EventKind, EventNameError};
pub use mock::{ControlCall, EventInjector, MockDriver};
