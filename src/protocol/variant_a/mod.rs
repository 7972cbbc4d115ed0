//! Variant A: older, fixed-length (1024 byte), CRC-32C-trailed protocol
//! (§4.g).
//!
//! Grounded on `original_source/lib/LibDS-Legacy/src/protocols/frc_2014.c`:
//! the control-code bitfield constants, the `10.TE.AM.{1,2}` address
//! scheme, the squared-index button packing, and the `(byte*12)/0x12`
//! voltage scaling are all taken from that file. The CRC-32C trailer and
//! exact byte offsets follow spec.md §4.g's byte-for-byte layout rather
//! than the original's checksum placement (the original uses a plain
//! CRC-32 at the same 1020..1024 offset; this crate's CRC-32C is
//! specified explicitly by spec.md §4.j/§8 test vector #11, so Variant A
//! uses CRC-32C here, matching the spec over the legacy C source).

use bytes::{BufMut, BytesMut};

use crate::config::{Alliance, ControlMode, Station};
use crate::protocol::{Context, EndpointTemplates, JoystickCaps, Protocol, SendIntervals};
use crate::net::{EndpointTemplate, Transport};
use crate::util::{crc32c, float_to_byte, pack_buttons_squared, static_ip};

const CONTROL_ENABLED: u8 = 0x20;
const CONTROL_TEST: u8 = 0x02;
const CONTROL_AUTONOMOUS: u8 = 0x10;
const CONTROL_TELEOP: u8 = 0x00;
const CONTROL_FMS_ATTACHED: u8 = 0x08;
const CONTROL_RESYNC: u8 = 0x04;
const CONTROL_REBOOT: u8 = 0x80;
const CONTROL_ESTOP_OFF: u8 = 0x40;
const CONTROL_ESTOP_ON: u8 = 0x00;

const ALLIANCE_RED: u8 = b'R';
const ALLIANCE_BLUE: u8 = b'B';

const FMS_AUTONOMOUS: u8 = 0x53;
const FMS_TELEOPERATED: u8 = 0x43;
const FMS_ENABLED: u8 = CONTROL_ENABLED;

const PACKET_LEN: usize = 1024;
const CRC_OFFSET: usize = 1020;

const MAX_JOYSTICKS: usize = 4;
const MAX_AXES: usize = 6;
const MAX_BUTTONS: usize = 10;

const MAX_BATTERY_VOLTAGE: f32 = 13.0;

/// The 1024-byte, CRC-32C-trailed frame protocol used by older FRC control
/// systems. Every robot packet is padded to exactly 1024 bytes.
#[derive(Debug, Default)]
pub struct VariantA;

fn control_code(
    mode: ControlMode,
    enabled: bool,
    estopped: bool,
    fms_attached: bool,
    resync: bool,
    reboot: bool,
) -> u8 {
    if reboot {
        return CONTROL_REBOOT;
    }
    if estopped {
        return CONTROL_ESTOP_ON;
    }

    let mode_bits = match mode {
        ControlMode::Test => CONTROL_TEST,
        ControlMode::Autonomous => CONTROL_AUTONOMOUS,
        ControlMode::Teleoperated => CONTROL_TELEOP,
    };

    let mut code = CONTROL_ESTOP_OFF | mode_bits;
    if enabled {
        code |= CONTROL_ENABLED;
    }
    if resync {
        code |= CONTROL_RESYNC;
    }
    if fms_attached {
        code |= CONTROL_FMS_ATTACHED;
    }
    code
}

fn alliance_byte(alliance: Alliance) -> u8 {
    match alliance {
        Alliance::Red => ALLIANCE_RED,
        Alliance::Blue => ALLIANCE_BLUE,
    }
}

fn position_byte(position: u8) -> u8 {
    b'0' + position.clamp(1, 3)
}

fn alliance_from_byte(byte: u8) -> Alliance {
    if byte == ALLIANCE_RED {
        Alliance::Red
    } else {
        Alliance::Blue
    }
}

fn position_from_byte(byte: u8) -> u8 {
    match byte {
        b'1' => 1,
        b'2' => 2,
        b'3' => 3,
        _ => 1,
    }
}

/// Encodes the four-joystick section: six signed axis bytes followed by a
/// 16-bit squared-index button field per joystick, regardless of how many
/// joysticks are actually connected (absent joysticks send neutral values).
fn encode_joysticks(ctx: &Context) -> [u8; MAX_JOYSTICKS * (MAX_AXES + 2)] {
    let mut out = [0u8; MAX_JOYSTICKS * (MAX_AXES + 2)];
    for js in 0..MAX_JOYSTICKS {
        let snapshot = ctx.joysticks.snapshot(js);
        let base = js * (MAX_AXES + 2);

        for axis in 0..MAX_AXES {
            let value = snapshot
                .as_ref()
                .and_then(|s| s.axes().get(axis).copied())
                .unwrap_or(0.0);
            out[base + axis] = float_to_byte(value, 1.0) as u8;
        }

        let buttons: Vec<bool> = (0..MAX_BUTTONS)
            .map(|b| {
                snapshot
                    .as_ref()
                    .and_then(|s| s.buttons().get(b).copied())
                    .unwrap_or(false)
            })
            .collect();
        let field = pack_buttons_squared(&buttons);
        out[base + MAX_AXES] = (field >> 8) as u8;
        out[base + MAX_AXES + 1] = (field & 0xFF) as u8;
    }
    out
}

impl Protocol for VariantA {
    fn name(&self) -> &'static str {
        "FRC 20xx (Variant A)"
    }

    fn fms_address(&self, _team: u16) -> String {
        String::new()
    }

    fn radio_address(&self, team: u16) -> String {
        static_ip(10, team as u32, 1)
    }

    fn robot_address(&self, team: u16) -> String {
        static_ip(10, team as u32, 2)
    }

    fn max_battery_voltage(&self) -> f32 {
        MAX_BATTERY_VOLTAGE
    }

    fn joystick_caps(&self) -> JoystickCaps {
        JoystickCaps {
            max_joysticks: MAX_JOYSTICKS,
            max_axes: MAX_AXES,
            max_buttons: MAX_BUTTONS,
            max_hats: 0,
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
                local_port: 0,
                remote_port: 0,
                transport: Transport::Udp,
                broadcast: false,
            },
        }
    }

    fn encode_fms(&self, _ctx: &Context) -> Vec<u8> {
        Vec::new()
    }

    fn encode_radio(&self, _ctx: &Context) -> Vec<u8> {
        Vec::new()
    }

    /// Builds the fixed 1024-byte robot packet per spec.md §4.g: header,
    /// joystick section, zero padding, CRC-32C trailer.
    fn encode_robot(&self, ctx: &Context) -> Vec<u8> {
        let cfg = ctx.config;
        let mut buf = BytesMut::with_capacity(PACKET_LEN);

        let seq = cfg.next_seqnum();
        buf.put_u16(seq);

        let reboot = cfg.take_reboot_requested();
        // Variant A has no distinct "restart code" wire bit; the legacy
        // protocol only ever resyncs or reboots. Consume the flag so it
        // doesn't accumulate, matching the one-shot contract in §4.g.
        let _ = cfg.take_restart_code_requested();

        let code = control_code(
            cfg.control_mode(),
            cfg.enabled(),
            cfg.estopped(),
            cfg.fms_comms(),
            true,
            reboot,
        );
        buf.put_u8(code);
        buf.put_u8(0x00); // digital inputs, unused

        buf.put_u16(cfg.team_number());
        buf.put_u8(alliance_byte(cfg.station().alliance));
        buf.put_u8(position_byte(cfg.station().position));

        buf.extend_from_slice(&encode_joysticks(ctx));

        buf.resize(CRC_OFFSET, 0);

        let crc = crc32c(&buf[..CRC_OFFSET]);
        buf.put_u32(crc);

        debug_assert_eq!(buf.len(), PACKET_LEN);
        buf.to_vec()
    }

    fn decode_fms(&self, buf: &[u8], ctx: &Context) -> bool {
        if buf.len() < 5 {
            return false;
        }
        let cfg = ctx.config;
        let mode_byte = buf[2];

        if mode_byte & FMS_AUTONOMOUS == FMS_AUTONOMOUS {
            cfg.set_control_mode(ControlMode::Autonomous);
        } else if mode_byte & FMS_TELEOPERATED == FMS_TELEOPERATED {
            cfg.set_control_mode(ControlMode::Teleoperated);
        }
        cfg.set_enabled((mode_byte & FMS_ENABLED) != 0);

        let alliance = alliance_from_byte(buf[3]);
        let position = position_from_byte(buf[4]);
        cfg.set_station(Station::new(alliance, position));

        true
    }

    /// The engine never exchanges application-level packets with the
    /// radio/bridge (glossary); reachability is tracked by presence of any
    /// datagram at all, not by parsing a payload.
    fn decode_radio(&self, buf: &[u8], _ctx: &Context) -> bool {
        !buf.is_empty()
    }

    /// Per spec.md §9's preserved Open Question: this sets `robot_code =
    /// true` unconditionally on any well-formed robot packet, matching the
    /// legacy library's behavior (`frc_2014.c`'s
    /// `/* Assume that robot code is present (issue #31 in QDriverStation) */`
    /// comment), not the actual program-present bit -- Variant A's wire
    /// format has no such bit to read.
    fn decode_robot(&self, buf: &[u8], ctx: &Context) -> bool {
        if buf.len() < PACKET_LEN {
            return false;
        }
        let cfg = ctx.config;

        cfg.set_emergency_stop(buf[0] == CONTROL_ESTOP_ON);

        // Voltage scaling rule preserved verbatim from the legacy library:
        // `(byte*12)/0x12` applied identically to both the integer and
        // fractional byte. Its intent is ambiguous (spec.md §9); kept
        // bit-for-bit for wire compatibility.
        let upper = ((buf[1] as u16) * 12) / 0x12;
        let lower = ((buf[2] as u16) * 12) / 0x12;
        let voltage = upper as f32 + (lower as f32 / 255.0);
        cfg.set_voltage(voltage);

        cfg.set_robot_code(true);

        true
    }

    fn reset_robot(&self, _ctx: &Context) {}

    fn reset_fms(&self, _ctx: &Context) {}

    fn reset_radio(&self, _ctx: &Context) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ConfigStore;
    use crate::event::EventQueue;
    use crate::joystick::JoystickStore;
    use std::sync::Arc;

    fn ctx_parts() -> (Arc<ConfigStore>, Arc<JoystickStore>) {
        let events = Arc::new(EventQueue::new(64));
        (
            Arc::new(ConfigStore::new(events.clone())),
            Arc::new(JoystickStore::new(events)),
        )
    }

    #[test]
    fn robot_address_is_static_ip_scheme() {
        let proto = VariantA;
        assert_eq!(proto.robot_address(118), "10.1.18.2");
        assert_eq!(proto.radio_address(118), "10.1.18.1");
    }

    #[test]
    fn encoded_robot_packet_is_1024_bytes_with_valid_crc() {
        let proto = VariantA;
        let (config, joysticks) = ctx_parts();
        config.set_team_number(3794);
        let ctx = Context {
            config: &config,
            joysticks: &joysticks,
        };

        let packet = proto.encode_robot(&ctx);
        assert_eq!(packet.len(), PACKET_LEN);

        let crc = crc32c(&packet[..CRC_OFFSET]);
        let trailer = u32::from_be_bytes(packet[CRC_OFFSET..PACKET_LEN].try_into().unwrap());
        assert_eq!(crc, trailer);
    }

    #[test]
    fn button_field_matches_squared_packing_s4() {
        let proto = VariantA;
        let (config, joysticks) = ctx_parts();
        joysticks.add(0, 0, 10);
        joysticks.set_button(0, 2, true); // 0-based button index 2
        joysticks.set_button(0, 3, true); // 0-based button index 3
        let ctx = Context {
            config: &config,
            joysticks: &joysticks,
        };

        let packet = proto.encode_robot(&ctx);
        let base = 8; // header length before joystick section
        let field = ((packet[base + MAX_AXES] as u16) << 8) | packet[base + MAX_AXES + 1] as u16;
        assert_eq!(field, 0x000D);
    }

    #[test]
    fn decode_robot_rejects_short_packets() {
        let proto = VariantA;
        let (config, joysticks) = ctx_parts();
        let ctx = Context {
            config: &config,
            joysticks: &joysticks,
        };
        assert!(!proto.decode_robot(&[0u8; 10], &ctx));
    }

    #[test]
    fn decode_robot_sets_code_loaded_unconditionally() {
        let proto = VariantA;
        let (config, joysticks) = ctx_parts();
        let ctx = Context {
            config: &config,
            joysticks: &joysticks,
        };
        let mut buf = vec![0u8; PACKET_LEN];
        buf[0] = CONTROL_ESTOP_OFF;
        assert!(proto.decode_robot(&buf, &ctx));
        assert!(config.robot_code());
    }
}
