//! The engine loop (§4.h): owns the three sender timers, three receiver
//! watchdogs, and four endpoints (FMS, radio, robot, netconsole); drives
//! the installed protocol's encoders and decoders each tick.
//!
//! Grounded on the teacher's `ds::conn::udp_conn` main select loop
//! (`tokio::select!` against a signal channel, one socket owned by the
//! loop), generalized to be protocol-agnostic instead of hardcoding one
//! 20ms interval, and to drive four endpoints instead of one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::config::{ConfigStore, Reconfigure, Stream};
use crate::joystick::JoystickStore;
use crate::net::{Endpoint, EndpointTemplate, Transport};
use crate::protocol::{Context, Protocol};
use crate::timer::Timer;
use crate::Result;

/// Poll cadence of the engine loop itself; coarser than the smallest
/// sender cadence the protocols declare (20 ms) as required by §4.a.
const TICK: Duration = Duration::from_millis(5);

const DISABLED_TEMPLATE: EndpointTemplate = EndpointTemplate {
    local_port: 0,
    remote_port: 0,
    transport: Transport::Udp,
    broadcast: false,
};

/// Match info / game data side channel (SPEC_FULL.md supplemented feature).
/// Fixed port 1740, matching the teacher's `ds::conn::tcp_conn`; independent
/// of the installed protocol's own four endpoint templates, since neither
/// variant's `Protocol` record names a fifth endpoint for it.
const GAME_DATA_TEMPLATE: EndpointTemplate = EndpointTemplate {
    local_port: 0,
    remote_port: 1740,
    transport: Transport::Tcp,
    broadcast: false,
};

enum Command {
    Configure(Box<dyn Protocol>),
    Reconfigure(Reconfigure),
    Shutdown,
}

/// Cheap, cloneable handle the facade uses to talk to a running [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<Command>,
}

impl EngineHandle {
    /// Installs a new protocol. Closes and reopens all four endpoints.
    pub fn configure(&self, protocol: Box<dyn Protocol>) {
        let _ = self.tx.send(Command::Configure(protocol));
    }

    /// Forces a rebind of whichever endpoints `reconfigure` marks, using
    /// the currently installed protocol's address functions plus any
    /// custom overrides. A no-op if nothing is installed yet.
    pub fn reconfigure_addresses(&self, reconfigure: Reconfigure) {
        if reconfigure.any() {
            let _ = self.tx.send(Command::Reconfigure(reconfigure));
        }
    }

    /// Stops the engine loop and releases its endpoints.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Owns protocol installation, endpoint lifecycle, and the send/receive/
/// watchdog cycle. Runs as a single background task (`Engine::run`);
/// all other access goes through [`EngineHandle`] or directly through the
/// shared [`ConfigStore`]/[`JoystickStore`].
pub struct Engine {
    config: Arc<ConfigStore>,
    joysticks: Arc<JoystickStore>,
    protocol: Option<Arc<dyn Protocol>>,

    fms: Endpoint,
    radio: Endpoint,
    robot: Endpoint,
    netconsole: Endpoint,
    game_data: Endpoint,

    fms_send: Timer,
    radio_send: Timer,
    robot_send: Timer,

    fms_watchdog: Timer,
    radio_watchdog: Timer,
    robot_watchdog: Timer,

    netconsole_partial: String,

    commands: UnboundedReceiver<Command>,
}

impl Engine {
    pub fn new(config: Arc<ConfigStore>, joysticks: Arc<JoystickStore>) -> (Engine, EngineHandle) {
        let (tx, rx) = unbounded_channel();
        let engine = Engine {
            config,
            joysticks,
            protocol: None,
            fms: Endpoint::new(DISABLED_TEMPLATE),
            radio: Endpoint::new(DISABLED_TEMPLATE),
            robot: Endpoint::new(DISABLED_TEMPLATE),
            netconsole: Endpoint::new(DISABLED_TEMPLATE),
            game_data: Endpoint::new(GAME_DATA_TEMPLATE),
            fms_send: Timer::new(0),
            radio_send: Timer::new(0),
            robot_send: Timer::new(0),
            fms_watchdog: Timer::new(0),
            radio_watchdog: Timer::new(0),
            robot_watchdog: Timer::new(0),
            netconsole_partial: String::new(),
            commands: rx,
        };
        (engine, EngineHandle { tx })
    }

    fn watchdog_period_ms(send_interval_ms: u64) -> u64 {
        (50 * send_interval_ms).min(1000)
    }

    fn resolve_address(&self, protocol: &dyn Protocol, stream: Stream) -> String {
        let team = self.config.team_number();
        let (override_addr, default_addr) = match stream {
            Stream::Fms => (self.config.fms_override(), protocol.fms_address(team)),
            Stream::Radio => (self.config.radio_override(), protocol.radio_address(team)),
            Stream::Robot => (self.config.robot_override(), protocol.robot_address(team)),
        };
        if override_addr.is_empty() {
            default_addr
        } else {
            override_addr
        }
    }

    /// Closes all endpoints, installs `protocol`, reopens every endpoint
    /// from its templates, resets timers and counters (§4.h `configure`).
    async fn configure(&mut self, protocol: Box<dyn Protocol>) -> Result<()> {
        let protocol: Arc<dyn Protocol> = Arc::from(protocol);

        self.fms.close().await;
        self.radio.close().await;
        self.robot.close().await;
        self.netconsole.close().await;
        self.game_data.close().await;

        let templates = protocol.endpoint_templates();
        let intervals = protocol.send_intervals();

        self.fms = Endpoint::new(templates.fms);
        self.radio = Endpoint::new(templates.radio);
        self.robot = Endpoint::new(templates.robot);
        self.netconsole = Endpoint::new(templates.netconsole);

        self.fms_send = Timer::new(intervals.fms_ms);
        self.radio_send = Timer::new(intervals.radio_ms);
        self.robot_send = Timer::new(intervals.robot_ms);

        self.fms_watchdog = Timer::new(Self::watchdog_period_ms(intervals.fms_ms));
        self.radio_watchdog = Timer::new(Self::watchdog_period_ms(intervals.radio_ms));
        self.robot_watchdog = Timer::new(Self::watchdog_period_ms(intervals.robot_ms));

        self.protocol = Some(protocol.clone());
        self.config.set_installed_protocol(Some(protocol));
        self.config.reset_all_counters();
        self.config.reset_seqnum();

        self.apply_addresses(Reconfigure::ALL).await?;

        self.fms_send.start();
        self.radio_send.start();
        self.robot_send.start();
        self.fms_watchdog.start();
        self.radio_watchdog.start();
        self.robot_watchdog.start();

        let name = self.protocol.as_ref().unwrap().name();
        info!(protocol = name, "protocol configured");
        self.config.add_notification(&format!("configured protocol: {}", name));

        Ok(())
    }

    /// Rebinds whichever endpoints `reconfigure` marks, using the installed
    /// protocol's address functions plus overrides. No-op without a
    /// protocol installed.
    async fn apply_addresses(&mut self, reconfigure: Reconfigure) -> Result<()> {
        let Some(protocol) = self.protocol.as_ref() else {
            return Ok(());
        };
        // watchdog period doubles as the open timeout (§5): a stalled DNS
        // resolution can't stall the engine loop longer than that.
        let timeout = Duration::from_millis(self.robot_watchdog.period_ms().max(50));

        if reconfigure.fms {
            let addr = self.resolve_address(protocol.as_ref(), Stream::Fms);
            self.fms.set_address(&addr, timeout).await?;
        }
        if reconfigure.radio {
            let addr = self.resolve_address(protocol.as_ref(), Stream::Radio);
            self.radio.set_address(&addr, timeout).await?;
        }
        if reconfigure.robot {
            let addr = self.resolve_address(protocol.as_ref(), Stream::Robot);
            self.robot.set_address(&addr, timeout).await?;
            // Best-effort: the robot frequently isn't listening on the
            // game-data TCP port yet when this first runs (teacher's
            // `tcp_conn` connects lazily once the robot is known reachable).
            // A failed connect here must never fail protocol configuration.
            let _ = self.game_data.set_address(&addr, timeout).await;
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.fms.close().await;
        self.radio.close().await;
        self.robot.close().await;
        self.netconsole.close().await;
        self.game_data.close().await;
        self.config.set_installed_protocol(None);
    }

    /// One send/receive/watchdog cycle (§4.h). Exposed at crate visibility
    /// for tests that want to drive the engine without a real socket pair.
    pub(crate) async fn tick(&mut self) {
        let Some(protocol) = self.protocol.as_ref() else {
            return;
        };

        let ctx = Context {
            config: &self.config,
            joysticks: &self.joysticks,
        };

        // ----- send phase -------------------------------------------------
        if self.fms_send.poll_expired() {
            let bytes = protocol.encode_fms(&ctx);
            let n = self.fms.send(&bytes).await;
            self.config
                .record_sent(Stream::Fms, if n >= 0 { n as usize } else { 0 });
            self.fms_send.reset();
        }
        if self.radio_send.poll_expired() {
            let bytes = protocol.encode_radio(&ctx);
            let n = self.radio.send(&bytes).await;
            self.config
                .record_sent(Stream::Radio, if n >= 0 { n as usize } else { 0 });
            self.radio_send.reset();
        }
        if self.robot_send.poll_expired() {
            let bytes = protocol.encode_robot(&ctx);
            let n = self.robot.send(&bytes).await;
            self.config
                .record_sent(Stream::Robot, if n >= 0 { n as usize } else { 0 });
            self.robot_send.reset();
        }

        // ----- receive phase ------------------------------------------------
        let mut fms_ok = false;
        let mut radio_ok = false;
        let mut robot_ok = false;

        let fms_buf = self.fms.recv();
        if !fms_buf.is_empty() {
            self.config.record_received(Stream::Fms, fms_buf.len());
            if protocol.decode_fms(&fms_buf, &ctx) {
                fms_ok = true;
                self.config.set_comms(Stream::Fms, true);
            }
        }

        let radio_buf = self.radio.recv();
        if !radio_buf.is_empty() {
            self.config.record_received(Stream::Radio, radio_buf.len());
            if protocol.decode_radio(&radio_buf, &ctx) {
                radio_ok = true;
                self.config.set_comms(Stream::Radio, true);
            }
        }

        let robot_buf = self.robot.recv();
        if !robot_buf.is_empty() {
            self.config.record_received(Stream::Robot, robot_buf.len());
            if protocol.decode_robot(&robot_buf, &ctx) {
                robot_ok = true;
                self.config.set_comms(Stream::Robot, true);
            }
        }

        let console_buf = self.netconsole.recv();
        if !console_buf.is_empty() {
            self.netconsole_partial
                .push_str(&String::from_utf8_lossy(&console_buf));
            while let Some(pos) = self.netconsole_partial.find('\n') {
                let line: String = self.netconsole_partial.drain(..=pos).collect();
                let line = line.trim_end_matches(['\r', '\n']);
                if !line.is_empty() {
                    self.config.add_netconsole_message(line.to_string());
                }
            }
        }

        // ----- TCP side channel (match info / game data) -------------------
        for frame in self.config.drain_tcp_frames() {
            let n = self.game_data.send(&frame).await;
            self.config
                .record_sent(Stream::Robot, if n >= 0 { n as usize } else { 0 });
        }

        // ----- watchdog phase ------------------------------------------------
        if fms_ok {
            self.fms_watchdog.reset();
        }
        if radio_ok {
            self.radio_watchdog.reset();
        }
        if robot_ok {
            self.robot_watchdog.reset();
        }

        // FMS, then radio, then robot (§4.h tie-break policy).
        if self.fms_watchdog.poll_expired() {
            protocol.reset_fms(&ctx);
            let reconfigure = self.config.on_fms_watchdog_expired();
            self.fms_watchdog.reset();
            let _ = self.apply_addresses(reconfigure).await;
        }
        if self.radio_watchdog.poll_expired() {
            protocol.reset_radio(&ctx);
            let reconfigure = self.config.on_radio_watchdog_expired();
            self.radio_watchdog.reset();
            let _ = self.apply_addresses(reconfigure).await;
        }
        if self.robot_watchdog.poll_expired() {
            protocol.reset_robot(&ctx);
            let reconfigure = self.config.on_robot_watchdog_expired();
            self.robot_watchdog.reset();
            let _ = self.apply_addresses(reconfigure).await;
        }
    }

    /// Runs the engine loop until [`EngineHandle::shutdown`] is called or
    /// the handle (and every clone) is dropped.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Configure(protocol)) => {
                            if let Err(err) = self.configure(protocol).await {
                                tracing::warn!(%err, "protocol configuration failed");
                            }
                        }
                        Some(Command::Reconfigure(reconfigure)) => {
                            if let Err(err) = self.apply_addresses(reconfigure).await {
                                tracing::warn!(%err, "address reconfiguration failed");
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventQueue;
    use crate::protocol::VariantB;

    fn store_pair() -> (Arc<ConfigStore>, Arc<JoystickStore>, Arc<EventQueue>) {
        let events = Arc::new(EventQueue::new(64));
        (
            Arc::new(ConfigStore::new(events.clone())),
            Arc::new(JoystickStore::new(events.clone())),
            events,
        )
    }

    #[tokio::test]
    async fn configure_opens_endpoints_and_starts_timers() {
        let (config, joysticks, _events) = store_pair();
        config.set_team_number(3794);
        let (mut engine, _handle) = Engine::new(config, joysticks);

        engine
            .configure(Box::new(VariantB::default()))
            .await
            .expect("configure should succeed without a real robot present");

        assert!(engine.robot_send.period_ms() == 20);
        assert!(engine.fms_send.period_ms() == 500);
        assert_eq!(engine.robot.remote_host(), "roboRIO-3794.local");
    }

    #[tokio::test]
    async fn tick_without_protocol_is_a_no_op() {
        let (config, joysticks, _events) = store_pair();
        let (mut engine, _handle) = Engine::new(config, joysticks);
        engine.tick().await;
    }

    #[test]
    fn watchdog_period_matches_formula() {
        assert_eq!(Engine::watchdog_period_ms(20), 1000);
        assert_eq!(Engine::watchdog_period_ms(500), 1000);
        assert_eq!(Engine::watchdog_period_ms(0), 0);
    }
}
