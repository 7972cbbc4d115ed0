//! Protocol interface (§4.f) and concrete implementations (§4.g).
//!
//! A protocol is the set of function contracts the engine calls through;
//! the engine itself never branches on which protocol is installed. The
//! teacher hardcodes one protocol generation inline in `ds::conn`/`proto`;
//! this generalizes that into a trait with two implementations, matching
//! spec.md's "the engine contains no per-protocol branching" design note.

pub mod variant_a;
pub mod variant_b;

pub use variant_a::VariantA;
pub use variant_b::VariantB;

use crate::config::ConfigStore;
use crate::joystick::JoystickStore;
use crate::net::EndpointTemplate;

/// Per-endpoint send cadences, in milliseconds. `0` disables that sender
/// (e.g. both variants disable the radio sender).
#[derive(Debug, Clone, Copy)]
pub struct SendIntervals {
    pub fms_ms: u64,
    pub radio_ms: u64,
    pub robot_ms: u64,
}

/// Joystick capability ceilings a protocol's wire format can carry.
#[derive(Debug, Clone, Copy)]
pub struct JoystickCaps {
    pub max_joysticks: usize,
    pub max_axes: usize,
    pub max_buttons: usize,
    pub max_hats: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EndpointTemplates {
    pub fms: EndpointTemplate,
    pub radio: EndpointTemplate,
    pub robot: EndpointTemplate,
    pub netconsole: EndpointTemplate,
}

/// Context threaded into encoders/decoders instead of reaching for process
/// globals (redesign note in spec.md §9): a typed handle to the
/// configuration and joystick stores.
pub struct Context<'a> {
    pub config: &'a ConfigStore,
    pub joysticks: &'a JoystickStore,
}

/// The set of function contracts a concrete wire protocol supplies.
///
/// Encoders read `Context`; decoders mutate it through `ConfigStore`'s
/// interior-mutable setters (the store's API is safe to call with only a
/// shared reference). Decoders return whether the packet was well-formed;
/// the engine uses that to decide whether to reset the matching receive
/// watchdog -- a malformed packet never resets a watchdog (§7).
pub trait Protocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn fms_address(&self, team: u16) -> String;
    fn radio_address(&self, team: u16) -> String;
    fn robot_address(&self, team: u16) -> String;

    fn max_battery_voltage(&self) -> f32;
    fn joystick_caps(&self) -> JoystickCaps;
    fn send_intervals(&self) -> SendIntervals;
    fn endpoint_templates(&self) -> EndpointTemplates;

    fn encode_fms(&self, ctx: &Context) -> Vec<u8>;
    fn encode_radio(&self, ctx: &Context) -> Vec<u8>;
    fn encode_robot(&self, ctx: &Context) -> Vec<u8>;

    /// Decodes a buffer received on the FMS endpoint, mutating `ctx.config`.
    /// Returns `true` on a well-formed packet (watchdog reset), `false` on
    /// a malformed/short packet (discarded, no watchdog reset, no event).
    fn decode_fms(&self, buf: &[u8], ctx: &Context) -> bool;
    fn decode_radio(&self, buf: &[u8], ctx: &Context) -> bool;
    fn decode_robot(&self, buf: &[u8], ctx: &Context) -> bool;

    /// One-shot reboot/restart-code flags auto-clear on watchdog reset;
    /// called by the engine whenever the robot watchdog is reset.
    fn reset_robot(&self, ctx: &Context);
    fn reset_fms(&self, ctx: &Context);
    fn reset_radio(&self, ctx: &Context);
}
