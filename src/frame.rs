//! Structural fields of the 7-byte Elster payload.
//!
//! ```text
//! byte 0: rrrr tttt   r = receiver bits 7..10, t = packet type
//! byte 1: xrrr rrrr   r = receiver bits 0..6
//! byte 2: index, or 0xFA when the index follows in bytes 3..4
//! bytes 3.. : value (big endian) after the index
//! ```
//!
//! Accessors take the payload as a slice and check its length before touching a field. Reads of
//! a field that isn't there return `None`; writes to it do nothing.

use crate::packet::PacketType;

pub const FRAME_LEN: usize = 7;

pub type Frame = [u8; FRAME_LEN];

/// Byte 2 value announcing a 16-bit index in bytes 3..4.
pub const EXTENDED_INDEX: u8 = 0xFA;

/// Byte 1 value that collides with a reserved marker; such frames carry no receiver.
const NO_RECEIVER_MARKER: u8 = 0x79;

pub fn receiver(data: &[u8]) -> Option<u16> {
    let [b0, b1, ..] = *data else {
        return None;
    };
    if b1 == NO_RECEIVER_MARKER {
        return None;
    }
    Some((u16::from(b0 & 0xF0) << 3) | u16::from(b1 & 0x7F))
}

/// ORs the receiver bits into the payload, expecting the affected bits to be clear.
pub fn set_receiver(data: &mut [u8], receiver: u16) {
    let [b0, b1, ..] = data else {
        return;
    };
    *b0 |= ((receiver >> 3) & 0xF0) as u8;
    *b1 |= (receiver & 0x7F) as u8;
}

pub fn packet_type(data: &[u8]) -> PacketType {
    match data.first() {
        Some(b0) => PacketType::from_raw(b0 & 0x0F),
        None => PacketType::Invalid,
    }
}

pub fn set_packet_type(data: &mut [u8], packet_type: PacketType) {
    let Some(b0) = data.first_mut() else {
        return;
    };
    *b0 |= packet_type.to_raw() & 0x0F;
}

pub fn is_extended(data: &[u8]) -> bool {
    data.get(2) == Some(&EXTENDED_INDEX)
}

fn index_length_ok(data: &[u8]) -> bool {
    (3..=FRAME_LEN).contains(&data.len())
}

pub fn index(data: &[u8]) -> Option<u16> {
    if !index_length_ok(data) {
        return None;
    }
    if data[2] == EXTENDED_INDEX {
        let [_, _, _, hi, lo, ..] = *data else {
            return None;
        };
        return Some(u16::from_be_bytes([hi, lo]));
    }
    Some(u16::from(data[2]))
}

/// Indices below `0xFA` use the short form; every other index is written in extended form, which
/// needs a payload of at least 5 bytes.
pub fn set_index(data: &mut [u8], index: u16) {
    if !index_length_ok(data) {
        return;
    }
    match u8::try_from(index) {
        Ok(short) if short < EXTENDED_INDEX => data[2] = short,
        _ => {
            let [_, _, marker, hi, lo, ..] = data else {
                return;
            };
            *marker = EXTENDED_INDEX;
            [*hi, *lo] = index.to_be_bytes();
        }
    }
}

/// The 16-bit value following the index field.
///
/// A short-form index puts the value in bytes 3..4 and only needs 5 bytes of payload; the
/// extended form needs the full 7.
pub fn raw_value(data: &[u8]) -> Option<u16> {
    if !(5..=FRAME_LEN).contains(&data.len()) {
        return None;
    }
    if data[2] == EXTENDED_INDEX {
        let [_, _, _, _, _, hi, lo] = *data else {
            return None;
        };
        return Some(u16::from_be_bytes([hi, lo]));
    }
    Some(u16::from_be_bytes([data[3], data[4]]))
}

/// Write `value` big endian after the index.
///
/// With an extended index only 16-bit values fit and anything wider is silently dropped. With a
/// short index the value takes 2, 3 or 4 bytes starting at byte 3, depending on its magnitude; a
/// 4 byte value ends on the last byte of the frame.
pub fn set_value(data: &mut [u8], value: u32) {
    let Ok(data) = <&mut Frame>::try_from(data) else {
        return;
    };
    let bytes = value.to_be_bytes();
    if data[2] == EXTENDED_INDEX {
        if value > 0xFFFF {
            tracing::debug!(value, "value does not fit an extended index frame, dropping");
            return;
        }
        data[5..7].copy_from_slice(&bytes[2..]);
    } else if value > 0xFF_FFFF {
        data[3..7].copy_from_slice(&bytes);
    } else if value > 0xFFFF {
        data[3..6].copy_from_slice(&bytes[1..]);
    } else {
        data[3..5].copy_from_slice(&bytes[2..]);
    }
}

/// Write a single 0/1 byte into the low byte of the value field.
pub fn set_bool(data: &mut [u8], value: bool) {
    let Ok(data) = <&mut Frame>::try_from(data) else {
        return;
    };
    let offset = if data[2] == EXTENDED_INDEX { 6 } else { 4 };
    data[offset] = u8::from(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_bits() {
        let mut frame = [0; FRAME_LEN];
        set_receiver(&mut frame, 0x480);
        assert_eq!(frame[..2], [0x90, 0x00]);
        assert_eq!(receiver(&frame), Some(0x480));

        let mut frame = [0; FRAME_LEN];
        set_receiver(&mut frame, 0x601);
        assert_eq!(frame[..2], [0xC0, 0x01]);
        assert_eq!(receiver(&frame), Some(0x601));
    }

    #[test]
    fn receiver_marker_and_short_payloads() {
        assert_eq!(receiver(&[0xA1, 0x79, 0x0c]), None);
        assert_eq!(receiver(&[0xA1]), None);
        assert_eq!(receiver(&[]), None);
        let mut short = [0u8; 1];
        set_receiver(&mut short, 0x480);
        assert_eq!(short, [0]);
    }

    #[test]
    fn packet_type_nibble() {
        assert_eq!(packet_type(&[0x31]), PacketType::Read);
        assert_eq!(packet_type(&[0x92]), PacketType::Response);
        assert_eq!(packet_type(&[0x08]), PacketType::Invalid);
        assert_eq!(packet_type(&[0x0F]), PacketType::Invalid);
        assert_eq!(packet_type(&[]), PacketType::Invalid);

        let mut frame = [0x90, 0, 0];
        set_packet_type(&mut frame, PacketType::SystemResponse);
        assert_eq!(frame[0], 0x97);
        set_packet_type(&mut [], PacketType::Read);
    }

    #[test]
    fn short_and_extended_index() {
        assert_eq!(index(&[0xA1, 0x00, 0x0c, 0, 0, 0, 0]), Some(0x000c));
        assert_eq!(index(&[0x31, 0x00, 0xFA, 0x4f, 0x07, 0, 0]), Some(0x4f07));
        assert_eq!(index(&[0x31, 0x00, 0xFA, 0x4f]), None);
        assert_eq!(index(&[0x31, 0x00]), None);
        assert_eq!(index(&[0x31, 0x00, 0x0c, 0, 0, 0, 0, 0]), None);

        let mut frame = [0; FRAME_LEN];
        set_index(&mut frame, 0xF9);
        assert_eq!(frame, [0, 0, 0xF9, 0, 0, 0, 0]);

        let mut frame = [0; FRAME_LEN];
        set_index(&mut frame, 0xFA);
        assert_eq!(frame, [0, 0, 0xFA, 0x00, 0xFA, 0, 0]);

        let mut frame = [0; 3];
        set_index(&mut frame, 0x4f07);
        assert_eq!(frame, [0, 0, 0]);
    }

    #[test]
    fn raw_value_position() {
        assert_eq!(raw_value(&[0xA2, 0x00, 0x0c, 0xFF, 0xF6, 0, 0]), Some(0xFFF6));
        assert_eq!(raw_value(&[0xA2, 0x00, 0x0c, 0x01, 0x02]), Some(0x0102));
        assert_eq!(raw_value(&[0x32, 0x00, 0xFA, 0x4f, 0x07, 0x00, 0x01]), Some(0x0001));
        assert_eq!(raw_value(&[0x32, 0x00, 0xFA, 0x4f, 0x07, 0x00]), None);
        assert_eq!(raw_value(&[0x32, 0x00, 0x0c, 0x01]), None);
    }

    #[test]
    fn set_value_widths() {
        let mut frame = [0x90, 0x00, 0x0a, 0, 0, 0, 0];
        set_value(&mut frame, 0x1234);
        assert_eq!(frame, [0x90, 0x00, 0x0a, 0x12, 0x34, 0, 0]);

        let mut frame = [0x90, 0x00, 0x0a, 0, 0, 0, 0];
        set_value(&mut frame, 0x12_3456);
        assert_eq!(frame, [0x90, 0x00, 0x0a, 0x12, 0x34, 0x56, 0]);

        // Fills the frame up to and including its last byte.
        let mut frame = [0x90, 0x00, 0x0a, 0, 0, 0, 0];
        set_value(&mut frame, 0x1234_5678);
        assert_eq!(frame, [0x90, 0x00, 0x0a, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn set_value_extended_drops_wide_values() {
        let mut frame = [0x90, 0x00, 0xFA, 0x01, 0x12, 0, 0];
        set_value(&mut frame, 0x0200);
        assert_eq!(frame, [0x90, 0x00, 0xFA, 0x01, 0x12, 0x02, 0x00]);
        set_value(&mut frame, 0x1_0000);
        assert_eq!(frame, [0x90, 0x00, 0xFA, 0x01, 0x12, 0x02, 0x00]);
    }

    #[test]
    fn set_value_requires_full_frame() {
        let mut frame = [0x90, 0x00, 0x0a, 0, 0, 0];
        set_value(&mut frame, 0x1234);
        assert_eq!(frame, [0x90, 0x00, 0x0a, 0, 0, 0]);
        set_bool(&mut frame, true);
        assert_eq!(frame, [0x90, 0x00, 0x0a, 0, 0, 0]);
    }

    #[test]
    fn set_bool_offsets() {
        let mut frame = [0x30, 0x00, 0xFA, 0x4f, 0x07, 0, 0];
        set_bool(&mut frame, true);
        assert_eq!(frame, [0x30, 0x00, 0xFA, 0x4f, 0x07, 0x00, 0x01]);

        let mut frame = [0x30, 0x00, 0x58, 0, 0, 0, 0];
        set_bool(&mut frame, true);
        assert_eq!(frame, [0x30, 0x00, 0x58, 0, 0x01, 0, 0]);
        set_bool(&mut frame, false);
        assert_eq!(frame, [0x30, 0x00, 0x58, 0, 0, 0, 0]);
    }
}
