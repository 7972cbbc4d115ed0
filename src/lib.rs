//! A pluggable-protocol driver station engine for FIRST Robotics Competition
//! robots.
//!
//! The crate is split the way the communication engine itself is: a timer
//! service ([`timer`]), a bounded event queue ([`event`]), an async network
//! endpoint abstraction ([`net`]), a process-wide configuration mirror
//! ([`config`]) and joystick store ([`joystick`]), a pluggable wire
//! [`protocol`] trait with two concrete generations, the [`engine`] loop
//! that drives all of the above, and [`station`], the flat facade most
//! embedders actually use.

pub mod config;
pub mod engine;
pub mod event;
pub(crate) mod ext;
pub mod joystick;
pub mod net;
pub mod protocol;
pub mod station;
pub mod timer;
pub mod util;

pub use config::{Alliance, ControlMode, Reconfigure, Station};
pub use event::Event;
pub use protocol::{Protocol, VariantA, VariantB};
pub use station::DriverStation;

/// Crate-wide fallible-operation alias. Internal packet decoders use plain
/// `bool`/`Option` returns instead (see DESIGN.md): a malformed datagram is
/// routine, not exceptional, and never surfaces as an `anyhow::Error`.
pub type Result<T> = anyhow::Result<T>;
