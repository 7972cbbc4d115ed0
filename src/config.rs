//! Process-wide mirror of observable driver-station and robot state (§3, §4.d).
//!
//! Grounded on `original_source/lib/LibDS-Legacy/src/config.c`: tri-state
//! fields (so the first write always publishes an event), `respect_range`
//! clamping, and the `create_robot_event` "fire an event only on change"
//! pattern. Translated into typed Rust behind `std::sync::RwLock` rather
//! than process-global statics (see DESIGN.md's Open Question resolution on
//! store concurrency).

use std::sync::{Arc, RwLock};

use tracing::{trace, warn};

use crate::event::{Event, EventQueue};
use crate::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Test,
    Autonomous,
    Teleoperated,
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::Teleoperated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alliance {
    Red,
    Blue,
}

impl Default for Alliance {
    fn default() -> Self {
        Alliance::Red
    }
}

/// The pair (alliance, position). `position` is always in `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Station {
    pub alliance: Alliance,
    pub position: u8,
}

impl Default for Station {
    fn default() -> Self {
        Station {
            alliance: Alliance::Red,
            position: 1,
        }
    }
}

impl Station {
    pub fn new(alliance: Alliance, position: u8) -> Station {
        debug_assert!((1..=3).contains(&position));
        Station {
            alliance,
            position: position.clamp(1, 3),
        }
    }
}

/// Which endpoint addresses a mutation requires the engine to rebind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconfigure {
    pub fms: bool,
    pub radio: bool,
    pub robot: bool,
}

impl Reconfigure {
    pub const ALL: Reconfigure = Reconfigure {
        fms: true,
        radio: true,
        robot: true,
    };

    pub const NONE: Reconfigure = Reconfigure {
        fms: false,
        radio: false,
        robot: false,
    };

    pub fn any(self) -> bool {
        self.fms || self.radio || self.robot
    }
}

/// Per-stream sent/received packet counters (data model addition, §4.h).
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub recv_packets: u64,
    pub recv_bytes: u64,
}

impl Counters {
    fn reset(&mut self) {
        *self = Counters::default();
    }
}

struct Outbound {
    team_number: u16,
    control_mode: ControlMode,
    station: Station,
    // Unlike the tri-state inbound flags (§3 "so that first write always
    // publishes"), `enabled`/`estopped` are locally-owned DS intent with a
    // well-defined initial value (both false): there is no "we don't know
    // yet" state to distinguish from "false", so a plain `bool` is used and
    // only genuine transitions emit (see DESIGN.md S6 resolution).
    enabled: bool,
    estopped: bool,
    game_data: String,
    fms_override: String,
    radio_override: String,
    robot_override: String,
    reboot_requested: bool,
    restart_code_requested: bool,
    seqnum: u16,
}

impl Default for Outbound {
    fn default() -> Self {
        Outbound {
            team_number: 0,
            control_mode: ControlMode::Teleoperated,
            station: Station::default(),
            enabled: false,
            estopped: false,
            game_data: String::new(),
            fms_override: String::new(),
            radio_override: String::new(),
            robot_override: String::new(),
            reboot_requested: false,
            restart_code_requested: false,
            seqnum: 0,
        }
    }
}

struct Inbound {
    robot_code: Option<bool>,
    fms_comms: Option<bool>,
    radio_comms: Option<bool>,
    robot_comms: Option<bool>,
    cpu: u8,
    ram: u8,
    disk: u8,
    can: u8,
    voltage: f32,
    fms: Counters,
    radio: Counters,
    robot: Counters,
}

impl Default for Inbound {
    fn default() -> Self {
        Inbound {
            robot_code: None,
            fms_comms: None,
            radio_comms: None,
            robot_comms: None,
            cpu: 0,
            ram: 0,
            disk: 0,
            can: 0,
            voltage: 0.0,
            fms: Counters::default(),
            radio: Counters::default(),
            robot: Counters::default(),
        }
    }
}

fn derive_status_string(
    control_mode: ControlMode,
    enabled: bool,
    estopped: bool,
    robot_comms: bool,
    robot_code: bool,
) -> String {
    if !robot_comms {
        return "No Robot Communications".to_string();
    }
    if !robot_code {
        return "No Robot Code".to_string();
    }
    if estopped {
        return "Emergency Stopped".to_string();
    }

    let mode = match control_mode {
        ControlMode::Test => "Test",
        ControlMode::Autonomous => "Autonomous",
        ControlMode::Teleoperated => "Teleoperated",
    };

    if enabled {
        format!("{} Enabled", mode)
    } else {
        format!("{} Disabled", mode)
    }
}

/// Process-wide mirror of DS/robot state. All getters are O(1); all setters
/// are write-through and emit an event only when the stored value changes.
pub struct ConfigStore {
    events: std::sync::Arc<EventQueue>,
    out: RwLock<Outbound>,
    inb: RwLock<Inbound>,
    tcp_out: std::sync::Mutex<std::collections::VecDeque<bytes::Bytes>>,
    protocol: RwLock<Option<Arc<dyn Protocol>>>,
}

impl ConfigStore {
    pub fn new(events: std::sync::Arc<EventQueue>) -> ConfigStore {
        ConfigStore {
            events,
            out: RwLock::new(Outbound::default()),
            inb: RwLock::new(Inbound::default()),
            tcp_out: std::sync::Mutex::new(std::collections::VecDeque::new()),
            protocol: RwLock::new(None),
        }
    }

    /// Stores the installed protocol so the facade can read address
    /// defaults and `max_battery_voltage` without a round trip through the
    /// engine's command channel. The engine remains the only thing that
    /// ever *calls* the protocol's encode/decode methods.
    pub fn set_installed_protocol(&self, protocol: Option<Arc<dyn Protocol>>) {
        *self.protocol.write().unwrap() = protocol;
    }

    pub fn installed_protocol(&self) -> Option<Arc<dyn Protocol>> {
        self.protocol.read().unwrap().clone()
    }

    /// The installed protocol's declared `max_battery_voltage`, or `0.0`
    /// with no protocol installed (§7 "protocol not installed: facade
    /// returns sentinel/default values").
    pub fn max_battery_voltage(&self) -> f32 {
        self.protocol
            .read()
            .unwrap()
            .as_ref()
            .map(|p| p.max_battery_voltage())
            .unwrap_or(0.0)
    }

    /// The protocol-derived default address for `stream`, ignoring any
    /// override; empty string with no protocol installed.
    pub fn default_address(&self, stream: Stream) -> String {
        let team = self.team_number();
        match self.protocol.read().unwrap().as_ref() {
            None => String::new(),
            Some(p) => match stream {
                Stream::Fms => p.fms_address(team),
                Stream::Radio => p.radio_address(team),
                Stream::Robot => p.robot_address(team),
            },
        }
    }

    /// The address actually applied: the override if nonempty, else the
    /// protocol default (§4.i "applied/default/custom addresses").
    pub fn applied_address(&self, stream: Stream) -> String {
        let override_addr = match stream {
            Stream::Fms => self.fms_override(),
            Stream::Radio => self.radio_override(),
            Stream::Robot => self.robot_override(),
        };
        if override_addr.is_empty() {
            self.default_address(stream)
        } else {
            override_addr
        }
    }

    fn emit_status_if_changed(&self, before: &str, after: String) {
        if before != after {
            self.events.push(Event::StatusStringChanged(after));
        }
    }

    // ----- status string -----------------------------------------------

    pub fn status_string(&self) -> String {
        let out = self.out.read().unwrap();
        let inb = self.inb.read().unwrap();
        derive_status_string(
            out.control_mode,
            out.enabled,
            out.estopped,
            inb.robot_comms.unwrap_or(false),
            inb.robot_code.unwrap_or(false),
        )
    }

    // ----- outbound getters ----------------------------------------------

    pub fn team_number(&self) -> u16 {
        self.out.read().unwrap().team_number
    }

    pub fn control_mode(&self) -> ControlMode {
        self.out.read().unwrap().control_mode
    }

    pub fn station(&self) -> Station {
        self.out.read().unwrap().station
    }

    pub fn enabled(&self) -> bool {
        self.out.read().unwrap().enabled
    }

    pub fn can_be_enabled(&self) -> bool {
        !self.out.read().unwrap().estopped
    }

    pub fn estopped(&self) -> bool {
        self.out.read().unwrap().estopped
    }

    pub fn game_data(&self) -> String {
        self.out.read().unwrap().game_data.clone()
    }

    pub fn fms_override(&self) -> String {
        self.out.read().unwrap().fms_override.clone()
    }

    pub fn radio_override(&self) -> String {
        self.out.read().unwrap().radio_override.clone()
    }

    pub fn robot_override(&self) -> String {
        self.out.read().unwrap().robot_override.clone()
    }

    /// Consumes (clears) the one-shot reboot request flag.
    pub fn take_reboot_requested(&self) -> bool {
        let mut out = self.out.write().unwrap();
        std::mem::take(&mut out.reboot_requested)
    }

    /// Consumes (clears) the one-shot restart-code request flag.
    pub fn take_restart_code_requested(&self) -> bool {
        let mut out = self.out.write().unwrap();
        std::mem::take(&mut out.restart_code_requested)
    }

    pub fn next_seqnum(&self) -> u16 {
        let mut out = self.out.write().unwrap();
        let n = out.seqnum;
        out.seqnum = out.seqnum.wrapping_add(1);
        n
    }

    pub fn reset_seqnum(&self) {
        self.out.write().unwrap().seqnum = 0;
    }

    // ----- outbound setters ----------------------------------------------

    pub fn set_team_number(&self, team_number: u16) -> Reconfigure {
        let mut out = self.out.write().unwrap();
        if out.team_number != team_number {
            out.team_number = team_number;
            trace!(team_number, "team number changed");
            Reconfigure::ALL
        } else {
            Reconfigure::NONE
        }
    }

    pub fn set_control_mode(&self, mode: ControlMode) {
        let mut out = self.out.write().unwrap();
        if out.control_mode != mode {
            let before = {
                let inb = self.inb.read().unwrap();
                derive_status_string(
                    out.control_mode,
                    out.enabled,
                    out.estopped,
                    inb.robot_comms.unwrap_or(false),
                    inb.robot_code.unwrap_or(false),
                )
            };
            out.control_mode = mode;
            self.events.push(Event::RobotModeChanged(mode));
            let after = {
                let inb = self.inb.read().unwrap();
                derive_status_string(
                    out.control_mode,
                    out.enabled,
                    out.estopped,
                    inb.robot_comms.unwrap_or(false),
                    inb.robot_code.unwrap_or(false),
                )
            };
            self.emit_status_if_changed(&before, after);
        }
    }

    pub fn set_station(&self, station: Station) {
        let mut out = self.out.write().unwrap();
        if out.station != station {
            out.station = station;
            self.events.push(Event::RobotStationChanged(station));
        }
    }

    pub fn set_alliance(&self, alliance: Alliance) {
        let station = self.station();
        self.set_station(Station::new(alliance, station.position));
    }

    pub fn set_position(&self, position: u8) {
        let station = self.station();
        self.set_station(Station::new(station.alliance, position));
    }

    /// Mutates the enabled flag and pushes its change event if it actually
    /// transitioned; does not check the derived status string. Shared by
    /// [`ConfigStore::set_enabled`] (which does check status) and
    /// [`ConfigStore::on_robot_watchdog_expired`] (which checks status once,
    /// at the end of the whole reset, per §8 scenario S3's literal event
    /// order).
    fn set_enabled_inner(&self, requested: bool) -> bool {
        let mut out = self.out.write().unwrap();
        let new = requested && !out.estopped;
        if out.enabled != new {
            out.enabled = new;
            self.events.push(Event::RobotEnabledChanged(new));
            true
        } else {
            false
        }
    }

    /// Sets the enabled intent. Gated: requesting `true` while emergency
    /// stopped is a no-op and is stored as disabled (invariant #1).
    pub fn set_enabled(&self, enabled: bool) {
        let before = self.status_string();
        if self.set_enabled_inner(enabled) {
            self.emit_status_if_changed(&before, self.status_string());
        }
    }

    /// Mutates the estop flag (and, per invariant #1, force-disables
    /// `enabled` if it was set), pushing change events as they occur. Does
    /// not check the derived status string; see [`Self::set_enabled_inner`].
    fn set_emergency_stop_inner(&self, estopped: bool) -> bool {
        let mut out = self.out.write().unwrap();
        if out.estopped != estopped {
            out.estopped = estopped;
            self.events.push(Event::RobotEstopChanged(estopped));

            if estopped && out.enabled {
                out.enabled = false;
                self.events.push(Event::RobotEnabledChanged(false));
            }
            true
        } else {
            false
        }
    }

    /// Latches emergency stop. Per invariant #1, also forces `enabled` false.
    pub fn set_emergency_stop(&self, estopped: bool) {
        let before = self.status_string();
        if self.set_emergency_stop_inner(estopped) {
            self.emit_status_if_changed(&before, self.status_string());
        }
    }

    pub fn set_game_data(&self, data: &str) {
        self.out.write().unwrap().game_data = data.to_string();
    }

    pub fn set_fms_override(&self, address: &str) {
        self.out.write().unwrap().fms_override = address.to_string();
    }

    pub fn set_radio_override(&self, address: &str) {
        self.out.write().unwrap().radio_override = address.to_string();
    }

    pub fn set_robot_override(&self, address: &str) {
        self.out.write().unwrap().robot_override = address.to_string();
    }

    pub fn request_reboot(&self) {
        self.out.write().unwrap().reboot_requested = true;
    }

    pub fn request_restart_code(&self) {
        self.out.write().unwrap().restart_code_requested = true;
    }

    // ----- inbound getters (floor at 0 per original_source's DS_Max) -----

    pub fn robot_code(&self) -> bool {
        self.inb.read().unwrap().robot_code.unwrap_or(false)
    }

    pub fn fms_comms(&self) -> bool {
        self.inb.read().unwrap().fms_comms.unwrap_or(false)
    }

    pub fn radio_comms(&self) -> bool {
        self.inb.read().unwrap().radio_comms.unwrap_or(false)
    }

    pub fn robot_comms(&self) -> bool {
        self.inb.read().unwrap().robot_comms.unwrap_or(false)
    }

    pub fn cpu_usage(&self) -> u8 {
        self.inb.read().unwrap().cpu
    }

    pub fn ram_usage(&self) -> u8 {
        self.inb.read().unwrap().ram
    }

    pub fn disk_usage(&self) -> u8 {
        self.inb.read().unwrap().disk
    }

    pub fn can_utilization(&self) -> u8 {
        self.inb.read().unwrap().can
    }

    pub fn voltage(&self) -> f32 {
        self.inb.read().unwrap().voltage.max(0.0)
    }

    pub fn counters(&self, stream: Stream) -> Counters {
        let inb = self.inb.read().unwrap();
        match stream {
            Stream::Fms => inb.fms,
            Stream::Radio => inb.radio,
            Stream::Robot => inb.robot,
        }
    }

    // ----- inbound setters -------------------------------------------------

    /// Mutates the robot-code-loaded flag and pushes its change event if it
    /// actually transitioned; does not check the derived status string. See
    /// [`Self::set_enabled_inner`] for why.
    fn set_robot_code_inner(&self, code: bool) -> bool {
        let mut inb = self.inb.write().unwrap();
        if inb.robot_code != Some(code) {
            inb.robot_code = Some(code);
            self.events.push(Event::RobotCodeChanged(code));
            true
        } else {
            false
        }
    }

    pub fn set_robot_code(&self, code: bool) {
        let before = self.status_string();
        if self.set_robot_code_inner(code) {
            self.emit_status_if_changed(&before, self.status_string());
        }
    }

    pub fn set_cpu_usage(&self, percent: u8) {
        let percent = percent.min(100);
        let mut inb = self.inb.write().unwrap();
        if inb.cpu != percent {
            inb.cpu = percent;
            self.events.push(Event::RobotCpuChanged(percent));
        }
    }

    pub fn set_ram_usage(&self, percent: u8) {
        let percent = percent.min(100);
        let mut inb = self.inb.write().unwrap();
        if inb.ram != percent {
            inb.ram = percent;
            self.events.push(Event::RobotRamChanged(percent));
        }
    }

    pub fn set_disk_usage(&self, percent: u8) {
        let percent = percent.min(100);
        let mut inb = self.inb.write().unwrap();
        if inb.disk != percent {
            inb.disk = percent;
            self.events.push(Event::RobotDiskChanged(percent));
        }
    }

    pub fn set_can_utilization(&self, percent: u8) {
        let percent = percent.min(100);
        let mut inb = self.inb.write().unwrap();
        if inb.can != percent {
            inb.can = percent;
            self.events.push(Event::RobotCanChanged(percent));
        }
    }

    pub fn set_voltage(&self, voltage: f32) {
        let rounded = (voltage.max(0.0) * 100.0).round() / 100.0;
        let mut inb = self.inb.write().unwrap();
        if inb.voltage != rounded {
            inb.voltage = rounded;
            self.events.push(Event::RobotVoltageChanged(rounded));
        }
    }

    /// Mutates the comms flag for `stream` and resets that stream's packet
    /// counters if it actually transitioned (§4.h "Packet counters"
    /// semantics); does not check the derived status string. See
    /// [`Self::set_enabled_inner`] for why.
    fn set_comms_inner(&self, stream: Stream, connected: bool) -> bool {
        let mut inb = self.inb.write().unwrap();
        let (flag, counters, event): (&mut Option<bool>, &mut Counters, fn(bool) -> Event) =
            match stream {
                Stream::Fms => (&mut inb.fms_comms, &mut inb.fms, Event::FmsCommsChanged),
                Stream::Radio => (
                    &mut inb.radio_comms,
                    &mut inb.radio,
                    Event::RadioCommsChanged,
                ),
                Stream::Robot => (
                    &mut inb.robot_comms,
                    &mut inb.robot,
                    Event::RobotCommsChanged,
                ),
            };

        if *flag != Some(connected) {
            *flag = Some(connected);
            counters.reset();
            self.events.push(event(connected));
            true
        } else {
            false
        }
    }

    /// Sets the comms flag for `stream`. Resets that stream's packet
    /// counters on any transition (§4.h "Packet counters" semantics); emits
    /// `status-string-changed` when the stream is the robot and the derived
    /// string actually changes (robot comms is the only stream the status
    /// string depends on).
    pub fn set_comms(&self, stream: Stream, connected: bool) {
        let before = self.status_string();
        if self.set_comms_inner(stream, connected) && matches!(stream, Stream::Robot) {
            self.emit_status_if_changed(&before, self.status_string());
        }
    }

    /// Zeroes all three streams' packet counters. Called by the engine on
    /// protocol installation (§4.h `configure`).
    pub fn reset_all_counters(&self) {
        let mut inb = self.inb.write().unwrap();
        inb.fms.reset();
        inb.radio.reset();
        inb.robot.reset();
    }

    pub fn record_sent(&self, stream: Stream, bytes: usize) {
        let mut inb = self.inb.write().unwrap();
        let counters = match stream {
            Stream::Fms => &mut inb.fms,
            Stream::Radio => &mut inb.radio,
            Stream::Robot => &mut inb.robot,
        };
        counters.sent_packets += 1;
        counters.sent_bytes += bytes as u64;
    }

    pub fn record_received(&self, stream: Stream, bytes: usize) {
        let mut inb = self.inb.write().unwrap();
        let counters = match stream {
            Stream::Fms => &mut inb.fms,
            Stream::Radio => &mut inb.radio,
            Stream::Robot => &mut inb.robot,
        };
        counters.recv_packets += 1;
        counters.recv_bytes += bytes as u64;
    }

    /// Emits a NetConsole message event, wrapped the way the library wraps
    /// its own internal notices (see SPEC_FULL.md Data Model addition).
    pub fn add_notification(&self, msg: &str) {
        self.events.push(Event::NetConsoleNewMessage(format!(
            "<font color=#888>** ds: {}</font>",
            msg
        )));
    }

    /// Forwards a verbatim NetConsole line from the robot.
    pub fn add_netconsole_message(&self, msg: String) {
        self.events.push(Event::NetConsoleNewMessage(msg));
    }

    // ----- TCP side-channel queue ------------------------------------------

    /// Queues a pre-built TCP tag frame (match info, game data) for the
    /// engine to drain and send on its lazily-opened game-data connection.
    /// Facade-level, not protocol-level: queued regardless of which
    /// protocol is installed, since the side channel is independent of the
    /// four endpoint templates a `Protocol` declares (see DESIGN.md).
    pub fn queue_tcp_frame(&self, frame: bytes::Bytes) {
        self.tcp_out.lock().unwrap().push_back(frame);
    }

    /// Drains every queued TCP frame, in FIFO order. Called once per engine
    /// tick; returns an empty `Vec` on most ticks.
    pub fn drain_tcp_frames(&self) -> Vec<bytes::Bytes> {
        self.tcp_out.lock().unwrap().drain(..).collect()
    }

    // ----- watchdog-expiry hooks --------------------------------------------

    pub fn on_fms_watchdog_expired(&self) -> Reconfigure {
        warn!("FMS watchdog expired");
        self.set_comms(Stream::Fms, false);
        Reconfigure {
            fms: true,
            ..Reconfigure::NONE
        }
    }

    pub fn on_radio_watchdog_expired(&self) -> Reconfigure {
        warn!("radio watchdog expired");
        self.set_comms(Stream::Radio, false);
        Reconfigure {
            radio: true,
            ..Reconfigure::NONE
        }
    }

    /// Robot watchdog expiry is the safety-critical path (invariant #2):
    /// comms/code/enabled/voltage/utilizations/estop reset to safe values
    /// and the robot address is flagged for rebind. Uses the `_inner`
    /// mutators and checks the derived status string exactly once, at the
    /// end, to match §8 scenario S3's literal event order (comms, code,
    /// voltage, enabled, then a single trailing status-string-changed) --
    /// calling the public setters in sequence would instead interleave a
    /// status check after every individual field.
    pub fn on_robot_watchdog_expired(&self) -> Reconfigure {
        warn!("robot watchdog expired");
        let before = self.status_string();

        self.set_comms_inner(Stream::Robot, false);
        self.set_robot_code_inner(false);
        self.set_voltage(0.0);
        self.set_enabled_inner(false);
        self.set_cpu_usage(0);
        self.set_ram_usage(0);
        self.set_disk_usage(0);
        self.set_can_utilization(0);
        self.set_emergency_stop_inner(false);

        self.emit_status_if_changed(&before, self.status_string());

        Reconfigure {
            robot: true,
            ..Reconfigure::NONE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Fms,
    Radio,
    Robot,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    fn store() -> (Arc<EventQueue>, ConfigStore) {
        let events = Arc::new(EventQueue::new(64));
        let store = ConfigStore::new(events.clone());
        (events, store)
    }

    #[test]
    fn enabling_requires_not_estopped() {
        let (_events, store) = store();
        store.set_emergency_stop(true);
        store.set_enabled(true);
        assert!(!store.enabled());
    }

    #[test]
    fn enable_gate_emits_single_status_and_estop_event() {
        let (events, store) = store();
        // §8 scenario S6 baseline: a connected, code-loaded, disabled robot
        // (status = "Teleoperated Disabled"). Without an established
        // connection the derived string is pinned to "No Robot
        // Communications" regardless of enabled/estopped, which would make
        // the status-change assertion below vacuous.
        store.set_comms(Stream::Robot, true);
        store.set_robot_code(true);
        while events.poll().is_some() {}

        store.set_emergency_stop(true);
        store.set_enabled(true); // gated: already false, so this is a no-op

        let mut saw_estop = 0;
        let mut saw_status = 0;
        let mut saw_enabled = 0;
        while let Some(e) = events.poll() {
            match e {
                Event::RobotEstopChanged(_) => saw_estop += 1,
                Event::StatusStringChanged(_) => saw_status += 1,
                Event::RobotEnabledChanged(_) => saw_enabled += 1,
                _ => {}
            }
        }
        assert_eq!(saw_estop, 1);
        assert_eq!(saw_status, 1);
        assert_eq!(saw_enabled, 0);
        assert!(!store.enabled());
    }

    #[test]
    fn utilization_setters_clamp() {
        let (_e, store) = store();
        store.set_cpu_usage(255);
        assert_eq!(store.cpu_usage(), 100);
    }

    #[test]
    fn voltage_rounds_to_two_decimals() {
        let (_e, store) = store();
        store.set_voltage(12.3456);
        assert_eq!(store.voltage(), 12.35);
    }

    #[test]
    fn same_value_setter_is_noop() {
        let (events, store) = store();
        store.set_control_mode(ControlMode::Teleoperated);
        // already the default value
        assert!(events.is_empty());
    }

    #[test]
    fn address_override_empty_reverts_handled_by_caller() {
        let (_e, store) = store();
        store.set_robot_override("10.1.1.5");
        assert_eq!(store.robot_override(), "10.1.1.5");
        store.set_robot_override("");
        assert_eq!(store.robot_override(), "");
    }

    #[test]
    fn robot_watchdog_expiry_resets_safety_state_and_emits_status() {
        let (events, store) = store();
        store.set_robot_code(true);
        store.set_enabled(true);
        store.set_voltage(12.0);
        store.set_comms(Stream::Robot, true);
        while events.poll().is_some() {}

        let reconfigure = store.on_robot_watchdog_expired();
        assert!(reconfigure.robot);
        assert!(!store.robot_code());
        assert!(!store.enabled());
        assert_eq!(store.voltage(), 0.0);

        let mut kinds = vec![];
        while let Some(e) = events.poll() {
            kinds.push(e);
        }
        assert!(kinds
            .iter()
            .any(|e| matches!(e, Event::StatusStringChanged(s) if s == "No Robot Communications")));
    }

    #[test]
    fn counters_reset_on_comms_transition() {
        let (_e, store) = store();
        store.record_sent(Stream::Robot, 100);
        store.set_comms(Stream::Robot, true);
        assert_eq!(store.counters(Stream::Robot).sent_packets, 0);
    }
}
