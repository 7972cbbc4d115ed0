//! Client facade (§4.i/§6): the flat procedural surface an embedder calls
//! instead of touching the engine, config store, or joystick store
//! directly.
//!
//! Grounded on the teacher's `ds::DriverStation`, generalized from one
//! hardcoded protocol + closure-based joystick/TCP suppliers to explicit
//! getters/setters over [`crate::config::ConfigStore`] and
//! [`crate::joystick::JoystickStore`], plus a `configure` entry point that
//! installs any [`Protocol`] implementation. Unlike the teacher's facade,
//! every method here is synchronous: the stores underneath are
//! `std::sync`-locked rather than `tokio::sync`-locked (see DESIGN.md), so
//! there is nothing left to `.await` except running the engine itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{Alliance, ConfigStore, ControlMode, Counters, Reconfigure, Station, Stream};
use crate::engine::{Engine, EngineHandle};
use crate::event::{Event, EventQueue};
use crate::joystick::JoystickStore;
use crate::protocol::variant_b::tcp::{GameData, MatchInfo, MatchType, TcpTag};
use crate::protocol::Protocol;

fn build_datetime() -> DateTime<Utc> {
    let epoch: i64 = env!("DS_BUILD_EPOCH_SECS").parse().unwrap_or(0);
    DateTime::from_timestamp(epoch, 0).unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
}

/// A driver station session: owns the configuration store, joystick store,
/// event queue, and a handle to the background engine task. Dropping it
/// (or calling [`DriverStation::close`]) shuts the engine down and releases
/// every endpoint.
pub struct DriverStation {
    config: Arc<ConfigStore>,
    joysticks: Arc<JoystickStore>,
    events: Arc<EventQueue>,
    engine: EngineHandle,
    closed: bool,
}

impl DriverStation {
    /// Constructs the stores and spawns the engine loop as a background
    /// task. No protocol is installed yet -- no packet is sent, no data is
    /// consumed, no watchdog ticks, until [`DriverStation::configure`] is
    /// called (§3 invariant).
    pub fn new(team_number: u16) -> DriverStation {
        let events = Arc::new(EventQueue::default());
        let config = Arc::new(ConfigStore::new(events.clone()));
        let joysticks = Arc::new(JoystickStore::new(events.clone()));
        config.set_team_number(team_number);

        let (engine, handle) = Engine::new(config.clone(), joysticks.clone());
        tokio::spawn(engine.run());

        DriverStation {
            config,
            joysticks,
            events,
            engine: handle,
            closed: false,
        }
    }

    // ----- lifecycle -----------------------------------------------------

    pub fn initialized(&self) -> bool {
        !self.closed
    }

    /// Stops the engine loop and releases its endpoints. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.engine.shutdown();
            self.closed = true;
        }
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn build_date(&self) -> String {
        build_datetime().format("%Y-%m-%d").to_string()
    }

    pub fn build_time(&self) -> String {
        build_datetime().format("%H:%M:%S").to_string()
    }

    // ----- protocol selection ---------------------------------------------

    /// Installs `protocol`, closing and reopening every endpoint.
    pub fn configure(&self, protocol: Box<dyn Protocol>) {
        self.engine.configure(protocol);
    }

    // ----- state getters ---------------------------------------------------

    pub fn team_number(&self) -> u16 {
        self.config.team_number()
    }

    pub fn robot_code(&self) -> bool {
        self.config.robot_code()
    }

    pub fn can_be_enabled(&self) -> bool {
        self.config.can_be_enabled()
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    pub fn cpu_usage(&self) -> u8 {
        self.config.cpu_usage()
    }

    pub fn ram_usage(&self) -> u8 {
        self.config.ram_usage()
    }

    pub fn disk_usage(&self) -> u8 {
        self.config.disk_usage()
    }

    pub fn can_utilization(&self) -> u8 {
        self.config.can_utilization()
    }

    pub fn voltage(&self) -> f32 {
        self.config.voltage()
    }

    pub fn station(&self) -> Station {
        self.config.station()
    }

    pub fn alliance(&self) -> Alliance {
        self.config.station().alliance
    }

    pub fn position(&self) -> u8 {
        self.config.station().position
    }

    pub fn emergency_stopped(&self) -> bool {
        self.config.estopped()
    }

    pub fn fms_comms(&self) -> bool {
        self.config.fms_comms()
    }

    pub fn radio_comms(&self) -> bool {
        self.config.radio_comms()
    }

    pub fn robot_comms(&self) -> bool {
        self.config.robot_comms()
    }

    pub fn control_mode(&self) -> ControlMode {
        self.config.control_mode()
    }

    pub fn max_battery_voltage(&self) -> f32 {
        self.config.max_battery_voltage()
    }

    pub fn status_string(&self) -> String {
        self.config.status_string()
    }

    pub fn game_data(&self) -> String {
        self.config.game_data()
    }

    pub fn applied_fms_address(&self) -> String {
        self.config.applied_address(Stream::Fms)
    }

    pub fn applied_radio_address(&self) -> String {
        self.config.applied_address(Stream::Radio)
    }

    pub fn applied_robot_address(&self) -> String {
        self.config.applied_address(Stream::Robot)
    }

    pub fn default_fms_address(&self) -> String {
        self.config.default_address(Stream::Fms)
    }

    pub fn default_radio_address(&self) -> String {
        self.config.default_address(Stream::Radio)
    }

    pub fn default_robot_address(&self) -> String {
        self.config.default_address(Stream::Robot)
    }

    pub fn custom_fms_address(&self) -> String {
        self.config.fms_override()
    }

    pub fn custom_radio_address(&self) -> String {
        self.config.radio_override()
    }

    pub fn custom_robot_address(&self) -> String {
        self.config.robot_override()
    }

    /// Read-only packet-loss diagnostics (SPEC_FULL.md supplement).
    pub fn fms_counters(&self) -> Counters {
        self.config.counters(Stream::Fms)
    }

    pub fn radio_counters(&self) -> Counters {
        self.config.counters(Stream::Radio)
    }

    pub fn robot_counters(&self) -> Counters {
        self.config.counters(Stream::Robot)
    }

    // ----- state setters ---------------------------------------------------

    pub fn reboot_robot(&self) {
        self.config.request_reboot();
    }

    pub fn restart_robot_code(&self) {
        self.config.request_restart_code();
    }

    /// Changes the team number; rebinds every address the protocol derives
    /// from it.
    pub fn set_team_number(&self, team_number: u16) {
        let reconfigure = self.config.set_team_number(team_number);
        self.engine.reconfigure_addresses(reconfigure);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.config.set_enabled(enabled);
    }

    pub fn set_emergency_stop(&self, estopped: bool) {
        self.config.set_emergency_stop(estopped);
    }

    pub fn set_alliance(&self, alliance: Alliance) {
        self.config.set_alliance(alliance);
    }

    pub fn set_position(&self, position: u8) {
        self.config.set_position(position);
    }

    pub fn set_control_mode(&self, mode: ControlMode) {
        self.config.set_control_mode(mode);
    }

    /// Overrides the FMS address; an empty string reverts to the protocol
    /// default.
    pub fn set_fms_address(&self, address: &str) {
        self.config.set_fms_override(address);
        self.engine.reconfigure_addresses(Reconfigure {
            fms: true,
            ..Reconfigure::NONE
        });
    }

    pub fn set_radio_address(&self, address: &str) {
        self.config.set_radio_override(address);
        self.engine.reconfigure_addresses(Reconfigure {
            radio: true,
            ..Reconfigure::NONE
        });
    }

    pub fn set_robot_address(&self, address: &str) {
        self.config.set_robot_override(address);
        self.engine.reconfigure_addresses(Reconfigure {
            robot: true,
            ..Reconfigure::NONE
        });
    }

    pub fn send_netconsole_message(&self, msg: &str) {
        self.config.add_netconsole_message(msg.to_string());
    }

    /// Sets the game-specific message and queues a `GameData` TCP frame for
    /// the engine's lazily-opened match-info side channel (SPEC_FULL.md
    /// supplement; §4.g specifies the wire tag, not how it reaches the
    /// engine).
    pub fn set_game_data(&self, data: &str) {
        self.config.set_game_data(data);
        self.config.queue_tcp_frame(
            TcpTag::GameData(GameData {
                gsm: data.to_string(),
            })
            .construct(),
        );
    }

    /// Queues a `MatchInfo` TCP frame (competition name + match type),
    /// carried over the same side channel as `set_game_data`.
    pub fn set_match_info(&self, competition: &str, match_type: MatchType) {
        self.config.queue_tcp_frame(
            TcpTag::MatchInfo(MatchInfo {
                competition: competition.to_string(),
                match_type,
            })
            .construct(),
        );
    }

    // ----- joystick API ------------------------------------------------

    pub fn reset_joysticks(&self) {
        self.joysticks.reset();
    }

    /// Appends a joystick; `None` if all three counts are zero.
    pub fn add_joystick(&self, num_axes: usize, num_hats: usize, num_buttons: usize) -> Option<usize> {
        self.joysticks.add(num_axes, num_hats, num_buttons)
    }

    pub fn set_joystick_axis(&self, js: usize, axis: usize, value: f32) {
        self.joysticks.set_axis(js, axis, value);
    }

    pub fn set_joystick_button(&self, js: usize, button: usize, pressed: bool) {
        self.joysticks.set_button(js, button, pressed);
    }

    pub fn set_joystick_hat(&self, js: usize, hat: usize, angle: i16) {
        self.joysticks.set_hat(js, hat, angle);
    }

    pub fn joystick_count(&self) -> usize {
        self.joysticks.count()
    }

    pub fn joystick_axis_count(&self, js: usize) -> usize {
        self.joysticks.axis_count(js)
    }

    pub fn joystick_button_count(&self, js: usize) -> usize {
        self.joysticks.button_count(js)
    }

    pub fn joystick_hat_count(&self, js: usize) -> usize {
        self.joysticks.hat_count(js)
    }

    /// Reads are gated on `enabled` -- neutral values while disabled, the
    /// hard safety invariant of §4.e.
    pub fn joystick_axis(&self, js: usize, axis: usize) -> f32 {
        self.joysticks.get_axis(js, axis, self.config.enabled())
    }

    pub fn joystick_button(&self, js: usize, button: usize) -> bool {
        self.joysticks.get_button(js, button, self.config.enabled())
    }

    pub fn joystick_hat(&self, js: usize, hat: usize) -> i16 {
        self.joysticks.get_hat(js, hat, self.config.enabled())
    }

    // ----- event API -------------------------------------------------------

    /// Pops the oldest queued event, if any.
    pub fn poll_event(&self) -> Option<Event> {
        self.events.poll()
    }
}

impl Drop for DriverStation {
    fn drop(&mut self) {
        if !self.closed {
            self.engine.shutdown();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::VariantB;

    #[tokio::test]
    async fn new_installs_no_protocol_and_sends_nothing() {
        let ds = DriverStation::new(3794);
        assert_eq!(ds.team_number(), 3794);
        assert_eq!(ds.applied_robot_address(), "");
        assert_eq!(ds.max_battery_voltage(), 0.0);
    }

    #[tokio::test]
    async fn configure_then_team_change_updates_applied_address() {
        let ds = DriverStation::new(3794);
        ds.configure(Box::new(VariantB::default()));
        // let the engine task process the Configure command
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(ds.applied_robot_address(), "roboRIO-3794.local");

        ds.set_team_number(118);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(ds.applied_robot_address(), "roboRIO-118.local");
    }

    #[tokio::test]
    async fn enable_gate_reads_through_to_joysticks() {
        let ds = DriverStation::new(100);
        ds.add_joystick(2, 0, 4);
        ds.set_joystick_axis(0, 0, 1.0);
        assert_eq!(ds.joystick_axis(0, 0), 0.0); // not enabled yet
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut ds = DriverStation::new(100);
        ds.close();
        ds.close();
        assert!(!ds.initialized());
    }
}
