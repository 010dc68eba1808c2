//! HueStream v2 datagram framing.
//!
//! Every streaming datagram carries a fixed 52-byte header followed by one
//! 7-byte block per channel. Multi-byte fields are big-endian.
//!
//! ## Wire format
//!
//! ```text
//! offset  size  field
//! 0       9     magic "HueStream"
//! 9       1     major version (0x02)
//! 10      1     minor version (0x00)
//! 11      1     sequence
//! 12      2     reserved (zero)
//! 14      1     color space (0x00 = RGB)
//! 15      1     reserved (zero)
//! 16      36    entertainment area id, ASCII, NUL-padded
//! 52+7i   1     channel id
//! 53+7i   2     R16 = r * 257
//! 55+7i   2     G16 = g * 257
//! 57+7i   2     B16 = b * 257
//! ```

use crate::color::Rgb;

/// Magic bytes opening every datagram.
const MAGIC: &[u8; 9] = b"HueStream";

/// Protocol version streamed by this implementation.
const VERSION_MAJOR: u8 = 0x02;
const VERSION_MINOR: u8 = 0x00;

/// Color space selector: raw RGB.
const COLOR_SPACE_RGB: u8 = 0x00;

/// Header size in bytes; channel blocks follow.
pub const HEADER_LEN: usize = 52;

/// Size of one per-channel block.
pub const CHANNEL_LEN: usize = 7;

/// Field width of the area id; shorter ids are NUL-padded, longer ones
/// truncated.
const AREA_ID_LEN: usize = 36;

/// Build one HueStream v2 datagram addressing every channel with `color`.
///
/// Channel blocks are emitted in the order of `channel_ids` — the bridge's
/// order, which callers must preserve. The `* 257` expansion maps 8-bit
/// components exactly onto the 16-bit range (`0xFF * 0x0101 == 0xFFFF`).
pub fn build_message(area_id: &str, channel_ids: &[u8], color: Rgb, seq: u8) -> Vec<u8> {
    let mut msg = vec![0u8; HEADER_LEN + CHANNEL_LEN * channel_ids.len()];

    msg[0..9].copy_from_slice(MAGIC);
    msg[9] = VERSION_MAJOR;
    msg[10] = VERSION_MINOR;
    msg[11] = seq;
    // msg[12..14] reserved, already zero
    msg[14] = COLOR_SPACE_RGB;
    // msg[15] reserved, already zero

    let id_bytes = area_id.as_bytes();
    let id_len = id_bytes.len().min(AREA_ID_LEN);
    msg[16..16 + id_len].copy_from_slice(&id_bytes[..id_len]);

    let r16 = u16::from(color.r) * 257;
    let g16 = u16::from(color.g) * 257;
    let b16 = u16::from(color.b) * 257;

    let mut offset = HEADER_LEN;
    for &ch in channel_ids {
        msg[offset] = ch;
        msg[offset + 1..offset + 3].copy_from_slice(&r16.to_be_bytes());
        msg[offset + 3..offset + 5].copy_from_slice(&g16.to_be_bytes());
        msg[offset + 5..offset + 7].copy_from_slice(&b16.to_be_bytes());
        offset += CHANNEL_LEN;
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA_ID: &str = "abcdefgh-1234-5678-9abc-def012345678";

    #[test]
    fn header_layout() {
        let msg = build_message(AREA_ID, &[0, 1], Rgb::new(255, 128, 0), 42);

        assert_eq!(msg.len(), 66);
        assert_eq!(&msg[0..9], b"HueStream");
        assert_eq!(msg[9], 0x02);
        assert_eq!(msg[10], 0x00);
        assert_eq!(msg[11], 42);
        assert_eq!(&msg[12..14], &[0, 0]);
        assert_eq!(msg[14], 0x00);
        assert_eq!(msg[15], 0x00);
        assert_eq!(&msg[16..52], AREA_ID.as_bytes());
    }

    #[test]
    fn channel_blocks_carry_scaled_color() {
        let msg = build_message(AREA_ID, &[0, 3], Rgb::new(255, 0, 128), 0);

        assert_eq!(msg.len(), 66);

        // First block: channel 0 at offset 52.
        assert_eq!(msg[52], 0);
        assert_eq!(u16::from_be_bytes([msg[53], msg[54]]), 65535); // 255 * 257
        assert_eq!(u16::from_be_bytes([msg[55], msg[56]]), 0);
        assert_eq!(u16::from_be_bytes([msg[57], msg[58]]), 0x8080); // 128 * 257

        // Second block: channel 3 at offset 59 with the same color.
        assert_eq!(msg[59], 3);
        assert_eq!(u16::from_be_bytes([msg[60], msg[61]]), 65535);
    }

    #[test]
    fn single_channel_max_sequence() {
        let msg = build_message(
            "12345678-1234-1234-1234-123456789012",
            &[5],
            Rgb::default(),
            255,
        );

        assert_eq!(msg.len(), 59);
        assert_eq!(msg[11], 255);
        assert_eq!(msg[52], 5);
        assert!(msg[53..59].iter().all(|&b| b == 0));
    }

    #[test]
    fn no_channels_is_header_only() {
        let msg = build_message(AREA_ID, &[], Rgb::new(1, 2, 3), 9);
        assert_eq!(msg.len(), HEADER_LEN);
    }

    #[test]
    fn short_area_id_is_nul_padded() {
        let msg = build_message("x", &[1], Rgb::new(9, 9, 9), 7);

        assert_eq!(msg[16], b'x');
        assert!(msg[17..52].iter().all(|&b| b == 0));
        assert_eq!(msg[11], 7);
    }

    #[test]
    fn long_area_id_is_truncated() {
        let long = "a".repeat(50);
        let msg = build_message(&long, &[], Rgb::default(), 0);

        assert_eq!(msg.len(), HEADER_LEN);
        assert!(msg[16..52].iter().all(|&b| b == b'a'));
    }
}
