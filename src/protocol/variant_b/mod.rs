//! Variant B: newer, variable-length, UDP-for-everything protocol (§4.g).
//!
//! Grounded on the teacher's existing codec types (`tags`, `tcp`) plus
//! `original_source/src/Protocols/DS_Protocol2015.cpp` for the FMS/robot
//! packet shape and the newer library's bit-accurate robot-code handling
//! (see spec.md §9's Open Question -- Variant B reads the real program-
//! present bit, unlike Variant A).

pub mod tags;
pub mod tcp;

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, BufMut, BytesMut};
use chrono::{Datelike, Timelike, Utc};

use crate::config::{Alliance, ControlMode, Station};
use crate::ext::BufExt;
use crate::net::{EndpointTemplate, Transport};
use crate::protocol::{Context, EndpointTemplates, JoystickCaps, Protocol, SendIntervals};
use crate::util::{float_to_byte, static_ip, timezone_name};

use tags::{DateTime as DTTag, Joysticks, Tag, Timezone, UdpTag};

const CONTROL_TEST: u8 = 0x01;
const CONTROL_AUTONOMOUS: u8 = 0x02;
const CONTROL_TELEOP: u8 = 0x00;
const CONTROL_ENABLED: u8 = 0x04;
const CONTROL_FMS_ATTACHED: u8 = 0x08;
const CONTROL_ESTOP: u8 = 0x80;

const REQUEST_NORMAL: u8 = 0x80;
const REQUEST_REBOOT: u8 = 0x08;
const REQUEST_RESTART_CODE: u8 = 0x04;

const ROBOT_STATUS_CODE: u8 = 0x20;

const MAX_BATTERY_VOLTAGE: f32 = 12.8;

/// Which sub-variant of Variant B's robot hostname to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotHost {
    RoboRio,
    RoboRioFrc,
}

/// `needs_time_section` is a one-shot flag set whenever the robot watchdog
/// is reset (fresh connection, per `reset_robot`); the next robot packet
/// carries the date/time section instead of joystick data, matching
/// `original_source`'s `DS_Protocol2015.cpp` "send time once per connect"
/// behavior. It's an `AtomicBool` rather than living in `Context` because
/// it's per-protocol-instance state, not observable DS/robot state.
pub struct VariantB {
    pub robot_host: RobotHost,
    needs_time_section: AtomicBool,
}

impl Default for VariantB {
    fn default() -> Self {
        VariantB {
            robot_host: RobotHost::RoboRio,
            needs_time_section: AtomicBool::new(true),
        }
    }
}

fn station_code(station: Station) -> u8 {
    let position0 = station.position.clamp(1, 3) - 1;
    match station.alliance {
        Alliance::Red => position0,
        Alliance::Blue => 3 + position0,
    }
}

fn station_from_code(code: u8) -> Station {
    let code = code.min(5);
    if code < 3 {
        Station::new(Alliance::Red, code + 1)
    } else {
        Station::new(Alliance::Blue, code - 3 + 1)
    }
}

fn control_mode_bits(mode: ControlMode) -> u8 {
    match mode {
        ControlMode::Test => CONTROL_TEST,
        ControlMode::Autonomous => CONTROL_AUTONOMOUS,
        ControlMode::Teleoperated => CONTROL_TELEOP,
    }
}

fn voltage_bytes(voltage: f32, max: f32) -> (u8, u8) {
    let voltage = voltage.clamp(0.0, max);
    let int_part = voltage as u8;
    let frac = ((voltage - int_part as f32) * 100.0).round() as u8;
    (int_part, frac)
}

impl Protocol for VariantB {
    fn name(&self) -> &'static str {
        "FRC 20xx (Variant B)"
    }

    fn fms_address(&self, _team: u16) -> String {
        String::new()
    }

    fn radio_address(&self, team: u16) -> String {
        static_ip(10, team as u32, 1)
    }

    fn robot_address(&self, team: u16) -> String {
        match self.robot_host {
            RobotHost::RoboRio => format!("roboRIO-{}.local", team),
            RobotHost::RoboRioFrc => format!("roboRIO-{}-FRC.local", team),
        }
    }

    fn max_battery_voltage(&self) -> f32 {
        MAX_BATTERY_VOLTAGE
    }

    fn joystick_caps(&self) -> JoystickCaps {
        JoystickCaps {
            max_joysticks: 6,
            max_axes: 12,
            max_buttons: 16,
            max_hats: 1,
        }
    }

    fn send_intervals(&self) -> SendIntervals {
        SendIntervals {
            fms_ms: 500,
            radio_ms: 0,
            robot_ms: 20,
        }
    }

    fn endpoint_templates(&self) -> EndpointTemplates {
        EndpointTemplates {
            fms: EndpointTemplate {
                local_port: 1120,
                remote_port: 1160,
                transport: Transport::Udp,
                broadcast: false,
            },
            radio: EndpointTemplate {
                local_port: 0,
                remote_port: 0,
                transport: Transport::Udp,
                broadcast: false,
            },
            robot: EndpointTemplate {
                local_port: 1150,
                remote_port: 1110,
                transport: Transport::Udp,
                broadcast: false,
            },
            netconsole: EndpointTemplate {
                local_port: 6666,
                remote_port: 6668,
                transport: Transport::Udp,
                broadcast: true,
            },
        }
    }

    fn encode_fms(&self, ctx: &Context) -> Vec<u8> {
        let cfg = ctx.config;
        let mut buf = BytesMut::with_capacity(8);
        let seq = cfg.next_seqnum();
        buf.put_u16(seq);
        buf.put_u8(0x00); // DS version

        let mut control = control_mode_bits(cfg.control_mode());
        if cfg.enabled() {
            control |= CONTROL_ENABLED;
        }
        if cfg.estopped() {
            control |= CONTROL_ESTOP;
        }
        if cfg.radio_comms() {
            control |= 0x10; // radio-ping
        }
        if cfg.robot_comms() {
            control |= 0x08 | 0x20; // robot-ping + robot-comms
        }
        buf.put_u8(control);

        buf.put_u16(cfg.team_number());
        let (vi, vf) = voltage_bytes(cfg.voltage(), self.max_battery_voltage());
        buf.put_u8(vi);
        buf.put_u8(vf);

        buf.to_vec()
    }

    fn encode_radio(&self, _ctx: &Context) -> Vec<u8> {
        Vec::new()
    }

    fn encode_robot(&self, ctx: &Context) -> Vec<u8> {
        let cfg = ctx.config;
        let mut buf = BytesMut::with_capacity(64);

        let seq = cfg.next_seqnum();
        buf.put_u16(seq);
        buf.put_u8(0x01); // general tag

        let mut control = control_mode_bits(cfg.control_mode());
        if cfg.enabled() {
            control |= CONTROL_ENABLED;
        }
        if cfg.fms_comms() {
            control |= CONTROL_FMS_ATTACHED;
        }
        if cfg.estopped() {
            control |= CONTROL_ESTOP;
        }
        buf.put_u8(control);

        let mut request = REQUEST_NORMAL;
        if cfg.take_reboot_requested() {
            request |= REQUEST_REBOOT;
        }
        if cfg.take_restart_code_requested() {
            request |= REQUEST_RESTART_CODE;
        }
        buf.put_u8(request);

        buf.put_u8(station_code(cfg.station()));

        if self.needs_time_section.load(Ordering::Relaxed) {
            let now = Utc::now();
            let micros = now.timestamp_subsec_micros();
            let tag = DTTag::new(
                micros,
                now.time().second() as u8,
                now.time().minute() as u8,
                now.time().hour() as u8,
                now.date_naive().day() as u8,
                now.date_naive().month0() as u8,
                (now.date_naive().year() - 1900) as u8,
            );
            buf.extend_from_slice(&UdpTag::DateTime(tag).construct());

            let offset_hours = 0i8; // engine operates on UTC; see DESIGN.md
            let tz = Timezone::new(timezone_name(offset_hours));
            buf.extend_from_slice(&UdpTag::Timezone(tz).construct());
            self.needs_time_section.store(false, Ordering::Relaxed);
        } else {
            let joysticks = ctx.joysticks.snapshot_all();
            for joystick in joysticks {
                let axes: Vec<i8> = joystick
                    .axes()
                    .iter()
                    .map(|v| float_to_byte(*v, 1.0))
                    .collect();
                let tag = Joysticks::new(axes, joystick.buttons().to_vec(), joystick.hats().to_vec());
                buf.extend_from_slice(&UdpTag::Joysticks(tag).construct());
            }
        }

        buf.to_vec()
    }

    /// spec.md §4.g only spells out Variant B's *outgoing* FMS packet; the
    /// incoming direction isn't wire-specified by the distillation. This
    /// mirrors the outgoing control-byte/station-byte shape (mode bits at
    /// `[2]`, station code at `[3]`, alliance/position derived the same way
    /// `encode_fms`/`encode_robot` derive them) rather than inventing an
    /// unrelated layout.
    fn decode_fms(&self, buf: &[u8], ctx: &Context) -> bool {
        if buf.len() < 4 {
            return false;
        }
        let cfg = ctx.config;
        let mode_byte = buf[2];
        let mode = match mode_byte & 0x03 {
            CONTROL_AUTONOMOUS => ControlMode::Autonomous,
            CONTROL_TEST => ControlMode::Test,
            _ => ControlMode::Teleoperated,
        };
        cfg.set_control_mode(mode);
        cfg.set_enabled((mode_byte & CONTROL_ENABLED) != 0);
        cfg.set_station(station_from_code(buf[3]));

        true
    }

    /// The engine never exchanges application-level packets with the
    /// radio/bridge (glossary); reachability is tracked by presence of any
    /// datagram at all, not by parsing a payload.
    fn decode_radio(&self, buf: &[u8], _ctx: &Context) -> bool {
        !buf.is_empty()
    }

    fn decode_robot(&self, buf: &[u8], ctx: &Context) -> bool {
        if buf.len() < 8 {
            return false;
        }
        let cfg = ctx.config;

        let control_echo = buf[3];
        cfg.set_emergency_stop((control_echo & CONTROL_ESTOP) != 0);

        let robot_status = buf[4];
        cfg.set_robot_code((robot_status & ROBOT_STATUS_CODE) != 0);

        let voltage_int = buf[5] as f32;
        let voltage_frac = buf[6] as f32;
        cfg.set_voltage(voltage_int + voltage_frac / 100.0);

        if buf.len() > 7 && buf[7] == 0x01 {
            self.needs_time_section.store(true, Ordering::Relaxed);
        }

        if buf.len() > 9 {
            let mut cursor = &buf[8..];
            while cursor.remaining() >= 2 {
                let len = match cursor.read_u8() {
                    Ok(v) => v as usize,
                    Err(_) => break,
                };
                if cursor.remaining() < len {
                    break;
                }
                let mut tag_buf = cursor.copy_to_bytes(len);
                if tag_buf.remaining() == 0 {
                    continue;
                }
                let tag_id = tag_buf.get_u8();
                match tag_id {
                    0x05 if tag_buf.remaining() >= 1 => cfg.set_cpu_usage(tag_buf.get_u8()),
                    0x06 if tag_buf.remaining() >= 1 => cfg.set_ram_usage(tag_buf.get_u8()),
                    0x04 if tag_buf.remaining() >= 1 => cfg.set_disk_usage(tag_buf.get_u8()),
                    0x0E if tag_buf.remaining() >= 1 => cfg.set_can_utilization(tag_buf.get_u8()),
                    _ => {}
                }
            }
        }

        true
    }

    fn reset_robot(&self, _ctx: &Context) {
        self.needs_time_section.store(true, Ordering::Relaxed);
    }

    fn reset_fms(&self, _ctx: &Context) {}

    fn reset_radio(&self, _ctx: &Context) {}
}
