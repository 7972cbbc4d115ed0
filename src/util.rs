/// Translates boolean button values into bytes expected by the roboRIO.
/// Encoding: LSB 0 (first bool = bit 0 of the byte).
/// Byte Order: First chunk of 8 booleans corresponds to the *last* byte in the output.
pub(crate) fn to_u8_vec(vec_in: &[bool]) -> Vec<u8> {
    // Calculate needed bytes, rounding up
    let num_bytes = vec_in.len().div_ceil(8);
    let mut result = Vec::with_capacity(num_bytes);

    // Iterate over input in chunks of 8
    for chunk_start in (0..vec_in.len()).step_by(8) {
        let mut byte: u8 = 0;
        // Build one byte, processing up to 8 bits
        for bit_pos in 0..8 {
            let bool_idx = chunk_start + bit_pos;

            // Safely handle slices not perfectly divisible by 8
            if let Some(&value) = vec_in.get(bool_idx) {
                if value {
                    // Set bit 'bit_pos' if true (LSB-first)
                    byte |= 1 << bit_pos;
                }
            } else {
                break; // Reached end of input slice
            }
        }
        result.push(byte);
    }

    // Reverse byte order (first chunk processed becomes last byte)
    result.reverse();

    result
}

/// Packs button presses using FRC's legacy "squared index" rule: button `i`
/// (0-based) contributes `i*i` to a 16-bit field. Preserved bit-for-bit for
/// Variant A wire compatibility; see `protocol::variant_a`.
pub(crate) fn pack_buttons_squared(buttons: &[bool]) -> u16 {
    let mut field: u16 = 0;
    for (idx, &pressed) in buttons.iter().enumerate() {
        if pressed {
            let i = idx as u16;
            field = field.wrapping_add(i * i);
        }
    }
    field
}

/// Constructs a dotted-quad static IP of the form `<net>.<team/100>.<team%100>.<host>`.
pub(crate) fn static_ip(net: u8, team: u32, host: u8) -> String {
    let hundreds = team / 100;
    let ones = team % 100;
    format!("{}.{}.{}.{}", net, hundreds, ones, host)
}

/// Scales a float in `[-max, max]` into a signed byte: `value / max * 127`,
/// clamped to the 8-bit signed range.
pub(crate) fn float_to_byte(value: f32, max: f32) -> i8 {
    let scaled = (value / max) * 127.0;
    scaled.clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

/// Fixed table mapping a whole-hour UTC offset to a timezone name, used by
/// Variant B's time section. Offsets outside the table fall back to a
/// generic `Etc/GMT` name.
pub(crate) fn timezone_name(offset_hours: i8) -> String {
    const TABLE: &[(i8, &str)] = &[
        (-12, "Etc/GMT+12"),
        (-11, "Pacific/Midway"),
        (-10, "Pacific/Honolulu"),
        (-9, "America/Anchorage"),
        (-8, "America/Los_Angeles"),
        (-7, "America/Denver"),
        (-6, "America/Chicago"),
        (-5, "America/New_York"),
        (-4, "America/Halifax"),
        (-3, "America/Sao_Paulo"),
        (-2, "Etc/GMT+2"),
        (-1, "Atlantic/Azores"),
        (0, "GMT0BST"),
        (1, "Europe/Paris"),
        (2, "Europe/Athens"),
        (3, "Europe/Moscow"),
        (4, "Asia/Dubai"),
        (5, "Asia/Karachi"),
        (6, "Asia/Dhaka"),
        (7, "Asia/Bangkok"),
        (8, "Asia/Shanghai"),
        (9, "Asia/Tokyo"),
        (10, "Australia/Sydney"),
        (11, "Pacific/Noumea"),
        (12, "Pacific/Auckland"),
    ];

    for &(hour, name) in TABLE {
        if hour == offset_hours {
            return name.to_string();
        }
    }

    if offset_hours >= 0 {
        format!("Etc/GMT-{}", offset_hours)
    } else {
        format!("Etc/GMT+{}", -offset_hours)
    }
}

/// Builds the CRC-32C (Castagnoli) lookup table from the reversed
/// polynomial `0x82F63B78`.
fn crc32c_table() -> [u32; 256] {
    const POLY: u32 = 0x82F6_3B78;
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Computes the CRC-32C checksum of `data` using the software table.
/// No SIMD-accelerated path; see DESIGN.md for why that's a deliberate cut.
pub(crate) fn crc32c(data: &[u8]) -> u32 {
    thread_local! {
        static TABLE: [u32; 256] = crc32c_table();
    }

    TABLE.with(|table| {
        let mut crc: u32 = 0xFFFF_FFFF;
        for &byte in data {
            let idx = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = table[idx] ^ (crc >> 8);
        }
        !crc
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc32c_of_empty_is_zero() {
        assert_eq!(crc32c(b""), 0x0000_0000);
    }

    #[test]
    fn crc32c_of_check_string() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn static_ip_examples() {
        assert_eq!(static_ip(10, 3794, 2), "10.37.94.2");
        assert_eq!(static_ip(10, 18, 1), "10.0.18.1");
    }

    #[test]
    fn squared_button_packing() {
        // §8 scenario S4: 0-based indices 2 and 3 pressed -> 2*2 + 3*3 = 0x000D.
        let mut buttons = vec![false; 10];
        buttons[2] = true;
        buttons[3] = true;
        assert_eq!(pack_buttons_squared(&buttons), 0x000D);
    }

}
