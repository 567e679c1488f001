use log::warn;

use crate::error::Error;
use crate::tables::{is_known_device, BOARDS, PLATFORMS};
use crate::Result;

/// The variable-width device-code alphabet: digits then the uppercase
/// letters minus I, O, Y and Z, most-significant digit first.
pub const BASE32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKLMNPQRSTUVWX";

fn alphabet_index(c: u8) -> Option<u32> {
    BASE32_ALPHABET.iter().position(|&a| a == c).map(|i| i as u32)
}

/// Decode a device token to its on-wire numeric code.
///
/// A 2-character token that parses as hex and names a legacy (single-byte)
/// table entry decodes as that byte value; everything else is read in the
/// base-32 alphabet. Characters outside the alphabet are skipped, matching
/// the behaviour of the device loader. Unless `accept_unknown` is set, the
/// resulting code must exist in the device table.
pub fn decode_device(token: &str, accept_unknown: bool) -> Result<u32> {
    let normalized = token.trim().to_ascii_uppercase();
    if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::MalformedDeviceCode(token.to_string()));
    }

    if normalized.len() == 2 {
        if let Ok(value) = u32::from_str_radix(&normalized, 16) {
            if value < 0x100 && is_known_device(value) {
                return Ok(value);
            }
        }
    }

    let mut value: u32 = 0;
    for byte in normalized.bytes() {
        let digit = match alphabet_index(byte) {
            Some(digit) => digit,
            None => {
                warn!("device code {normalized}: character {:?} is not in the alphabet, skipping", byte as char);
                continue;
            }
        };
        value = value
            .checked_mul(32)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| Error::MalformedDeviceCode(token.to_string()))?;
    }

    if !accept_unknown && !is_known_device(value) {
        return Err(Error::UnknownDevice(token.to_string()));
    }

    Ok(value)
}

/// Encode a numeric device code as its token form: single-byte codes the
/// legacy table knows render as 2-char uppercase hex, everything else as
/// base-32 with a minimum width of 3. Mirrors `decode_device`'s legacy
/// test, so the forms stay injective and round-trip (an unassigned
/// single-byte value has no legacy escape and must not claim one).
pub fn encode_device(code: u32) -> String {
    if code < 0x100 && is_known_device(code) {
        return format!("{code:02X}");
    }

    let mut digits = Vec::new();
    let mut rest = code;
    while rest > 0 {
        digits.push(BASE32_ALPHABET[(rest % 32) as usize] as char);
        rest /= 32;
    }
    while digits.len() < 3 {
        digits.push('0');
    }
    digits.iter().rev().collect()
}

/// Resolve a platform token (name or numeric) to its code.
pub fn parse_platform(token: &str) -> Result<u32> {
    let lowered = token.trim().to_ascii_lowercase();
    if let Some(rec) = PLATFORMS.iter().find(|rec| rec.token == lowered) {
        return Ok(rec.code);
    }
    parse_number(&lowered).ok_or_else(|| Error::UnknownPlatform(token.to_string()))
}

/// Resolve a board token (name or numeric) to its code.
pub fn parse_board(token: &str) -> Result<u32> {
    let lowered = token.trim().to_ascii_lowercase();
    if let Some(rec) = BOARDS.iter().find(|rec| rec.token == lowered) {
        return Ok(rec.code);
    }
    parse_number(&lowered).ok_or_else(|| Error::UnknownBoard(token.to_string()))
}

fn parse_number(token: &str) -> Option<u32> {
    if let Some(hex) = token.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::DEVICES;

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(decode_device("0GC", false).unwrap(), 0x20C);
        assert_eq!(decode_device("01", false).unwrap(), 0x01);
        assert_eq!(decode_device("3HA", false).unwrap(), 0xE2A);
        assert_eq!(decode_device("D4", false).unwrap(), 0xD4);
    }

    #[test]
    fn test_decode_unknown_policy() {
        match decode_device("ZZZ", false) {
            Err(Error::UnknownDevice(token)) => assert_eq!(token, "ZZZ"),
            other => panic!("expected UnknownDevice, got {:?}", other),
        }
        // Z is outside the alphabet; every digit is skipped.
        assert_eq!(decode_device("ZZZ", true).unwrap(), 0);
        // A well-formed but unassigned code only decodes under the relaxed policy.
        assert_eq!(decode_device("XXX", true).unwrap(), 31 * 1024 + 31 * 32 + 31);
        assert!(decode_device("XXX", false).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_device("", false), Err(Error::MalformedDeviceCode(_))));
        assert!(matches!(decode_device("0G C", false), Err(Error::MalformedDeviceCode(_))));
        assert!(matches!(decode_device("0GCAAAAA", true), Err(Error::MalformedDeviceCode(_))));
    }

    #[test]
    fn test_encode_forms() {
        assert_eq!(encode_device(0x01), "01");
        assert_eq!(encode_device(0xD4), "D4");
        assert_eq!(encode_device(0x20C), "0GC");
        assert_eq!(encode_device(0xE2A), "3HA");
        assert_eq!(encode_device(0x11D7), "4EP");
    }

    #[test]
    fn test_unassigned_single_byte_codes_have_no_legacy_form() {
        // 0x50 sits in a gap of the legacy table; encoding it as "50"
        // would decode back through base-32 as 0xA0.
        assert_eq!(encode_device(0x50), "02G");
        assert_eq!(decode_device("02G", true).unwrap(), 0x50);
        assert!(decode_device("50", true).unwrap() != 0x50);
    }

    #[test]
    fn test_round_trip_whole_table() {
        for rec in DEVICES {
            let token = encode_device(rec.code);
            assert_eq!(decode_device(&token, false).unwrap(), rec.code, "token {token}");
        }
    }

    #[test]
    fn test_encoding_is_injective_over_table() {
        let mut tokens: Vec<String> = DEVICES.iter().map(|rec| encode_device(rec.code)).collect();
        tokens.sort();
        let before = tokens.len();
        tokens.dedup();
        assert_eq!(tokens.len(), before);
    }

    #[test]
    fn test_platform_and_board_parsing() {
        assert_eq!(parse_platform("wario").unwrap(), 0x07);
        assert_eq!(parse_platform("Zelda").unwrap(), 0x0A);
        assert_eq!(parse_platform("12").unwrap(), 12);
        assert!(parse_platform("toadstool").is_err());
        assert_eq!(parse_board("unspecified").unwrap(), 0);
        assert_eq!(parse_board("0x2a").unwrap(), 0x2A);
    }
}
