//! Hex RGBA color strings.

use image::Rgba;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("supplied color does not have four components. try e.g. aabbccff")]
    WrongLength,
    #[error("failed to parse color '{0}'. are all characters in range [0-9a-f]?")]
    NotHex(String),
}

fn hex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{8}$").expect("color pattern is valid"))
}

/// Parses `RRGGBBAA`, e.g. `efefefff`.
pub fn parse_color(text: &str) -> Result<Rgba<u8>, ColorError> {
    if text.chars().count() != 8 {
        return Err(ColorError::WrongLength);
    }
    if !hex_pattern().is_match(text) {
        return Err(ColorError::NotHex(text.to_string()));
    }

    let value = u32::from_str_radix(text, 16).map_err(|_| ColorError::NotHex(text.to_string()))?;
    Ok(Rgba(value.to_be_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgba() {
        assert_eq!(parse_color("efefefff"), Ok(Rgba([0xef, 0xef, 0xef, 0xff])));
        assert_eq!(parse_color("00000000"), Ok(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("12AbCd7F"), Ok(Rgba([0x12, 0xab, 0xcd, 0x7f])));
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(parse_color("fff"), Err(ColorError::WrongLength));
        assert_eq!(parse_color("efefefff00"), Err(ColorError::WrongLength));
    }

    #[test]
    fn test_not_hex() {
        assert!(matches!(parse_color("efefefgg"), Err(ColorError::NotHex(_))));
        assert!(matches!(parse_color("+fefefef"), Err(ColorError::NotHex(_))));
    }
}
