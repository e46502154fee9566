//! Conversion between raw register values and their textual form.

use crate::registers::{ErrorDescriptor, OPERATING_MODES, OperatingModeDescriptor, ValueType};

/// Raw value the devices report for a register that has no value at the moment.
pub const NOT_AVAILABLE: u16 = 0x8000;

/// The value the wire protocol uses in place of a value that could not be parsed.
pub const PARSE_FAILURE: u32 = 0xFFFF;

/// A raw 16-bit register value together with the encoding to display it with.
#[derive(Clone, Copy, Debug)]
pub struct FormattedValue {
    pub value_type: ValueType,
    pub raw: u16,
}

impl std::fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let raw = self.raw;
        if raw == NOT_AVAILABLE {
            return f.write_str("not available");
        }
        let [hi, lo] = raw.to_be_bytes();
        match self.value_type {
            ValueType::Byte => write!(f, "{lo}"),
            ValueType::DecVal => write!(f, "{:.1}", f64::from(raw as i16) / 10.0),
            ValueType::CentVal => write!(f, "{:.2}", f64::from(raw as i16) / 100.0),
            ValueType::MilVal => write!(f, "{:.3}", f64::from(raw as i16) / 1000.0),
            ValueType::LittleEndian => write!(f, "{}", raw.swap_bytes()),
            ValueType::LittleBool => f.write_str(if raw == 0x0100 { "1" } else { "0" }),
            ValueType::Bool => f.write_str(if raw == 0x0001 { "1" } else { "0" }),
            ValueType::Betriebsart => match OperatingModeDescriptor::by_number(hi) {
                Some(mode) if lo == 0 => f.write_str(mode.name),
                _ => f.write_str("?"),
            },
            ValueType::Zeit => write!(f, "{lo:02}:{hi:02}"),
            ValueType::Datum => write!(f, "{hi:02}.{lo:02}."),
            ValueType::TimeDomain => {
                if raw & 0x8080 != 0 {
                    return f.write_str("not used time domain");
                }
                write!(
                    f,
                    "{:02}:{:02}-{:02}:{:02}",
                    hi / 4,
                    15 * (hi % 4),
                    lo / 4,
                    15 * (lo % 4)
                )
            }
            ValueType::DevNr => {
                if raw >= 0x80 {
                    f.write_str("--")
                } else {
                    write!(f, "{}", raw + 1)
                }
            }
            ValueType::DevId => write!(f, "{hi}-{lo:02}"),
            ValueType::ErrNr => match ErrorDescriptor::find(raw) {
                Some(error) => f.write_str(error.name),
                None => write!(f, "ERR {raw}"),
            },
            ValueType::Default | ValueType::DoubleVal | ValueType::TripleVal => {
                write!(f, "{}", raw as i16)
            }
        }
    }
}

pub fn format(value_type: ValueType, raw: u16) -> String {
    FormattedValue { value_type, raw }.to_string()
}

/// Format a value already combined from several registers.
pub fn format_double(value_type: ValueType, value: f64) -> String {
    match value_type {
        ValueType::DoubleVal => format!("{value:.3}"),
        ValueType::TripleVal => format!("{value:.6}"),
        _ => value.to_string(),
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{text}` is not a valid {value_type} value")]
pub struct ParseValueError {
    pub value_type: ValueType,
    pub text: String,
}

/// Convert operator supplied text into a raw register value.
///
/// The result is 16 bits wide for every type except [`ValueType::Datum`], which packs
/// `day << 16 | month << 8 | year & 0xFF` and so needs a short-index frame to fit. Only text
/// after leading spaces is considered and anything after the recognised value is ignored.
/// Fixed-point values, time domains, device numbers, device ids, error numbers and the
/// double/triple types can't be written.
///
/// Every numeric field of a time or date must contain at least one digit.
pub fn parse(value_type: ValueType, text: &str) -> Result<u32, ParseValueError> {
    let input = text.trim_start_matches(' ');
    let parsed = match value_type {
        ValueType::Default | ValueType::Byte | ValueType::LittleEndian => {
            parse_integer(value_type, input)
        }
        ValueType::Bool | ValueType::LittleBool => parse_bool(value_type, input),
        ValueType::Betriebsart => OPERATING_MODES
            .iter()
            .find(|mode| input.starts_with(mode.name))
            .map(|mode| u32::from(mode.index)),
        ValueType::Zeit => parse_time(input).and_then(|(hour, minute)| {
            (hour < 24).then_some((u32::from(minute) << 8) | u32::from(hour))
        }),
        ValueType::Datum => parse_date(input),
        ValueType::DecVal
        | ValueType::CentVal
        | ValueType::MilVal
        | ValueType::TimeDomain
        | ValueType::DevNr
        | ValueType::ErrNr
        | ValueType::DevId
        | ValueType::DoubleVal
        | ValueType::TripleVal => None,
    };
    parsed.ok_or_else(|| ParseValueError { value_type, text: text.to_string() })
}

/// Like [`parse`], but with failures folded into [`PARSE_FAILURE`] as they appear on the wire.
pub fn parse_or_failure(value_type: ValueType, text: &str) -> u32 {
    parse(value_type, text).unwrap_or(PARSE_FAILURE)
}

fn parse_integer(value_type: ValueType, input: &str) -> Option<u32> {
    let (value, _) = leading_integer(input)?;
    if !(-0x7FFF..=0xFFFF).contains(&value) {
        return None;
    }
    let value = value as u16;
    match value_type {
        ValueType::Byte if value > 0xFF => None,
        ValueType::LittleEndian => Some(u32::from(value.swap_bytes())),
        _ => Some(u32::from(value)),
    }
}

fn parse_bool(value_type: ValueType, input: &str) -> Option<u32> {
    let value = if input.starts_with("on") || input.starts_with('1') {
        1
    } else if input.starts_with("off") || input.starts_with('0') {
        0
    } else {
        return None;
    };
    Some(if value_type == ValueType::LittleBool { value << 8 } else { value })
}

/// `H:M` with `0 <= H <= 24` and `0 <= M < 60`, where `24` only goes with minute zero.
fn parse_time(input: &str) -> Option<(u8, u8)> {
    let (hour, rest) = leading_integer(input)?;
    let (minute, _) = leading_integer(rest.strip_prefix(':')?)?;
    if hour == 24 && minute > 0 {
        return None;
    }
    if !(0..=24).contains(&hour) || !(0..60).contains(&minute) {
        return None;
    }
    Some((hour as u8, minute as u8))
}

/// `D.M.Y`, rejecting days that can't exist in the month (February always has 28 days).
fn parse_date(input: &str) -> Option<u32> {
    let (day, rest) = leading_integer(input)?;
    let (month, rest) = leading_integer(rest.strip_prefix('.')?)?;
    let (year, _) = leading_integer(rest.strip_prefix('.')?)?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    if month == 2 && day >= 29 {
        return None;
    }
    if matches!(month, 4 | 6 | 9 | 11) && day > 30 {
        return None;
    }
    Some(((day as u32) << 16) | ((month as u32) << 8) | (year & 0xFF) as u32)
}

/// An optionally signed decimal prefix of `input` and whatever text follows it.
fn leading_integer(input: &str) -> Option<(i64, &str)> {
    let input = input.trim_start();
    let (negative, unsigned) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = unsigned[..digits].parse::<i64>().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    Some((value, &unsigned[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_available_overrides_every_type() {
        use strum::VariantArray as _;
        for vt in ValueType::VARIANTS {
            assert_eq!(format(*vt, 0x8000), "not available", "{vt}");
        }
    }

    #[test]
    fn fixed_point() {
        assert_eq!(format(ValueType::DecVal, 0xFFF6), "-1.0");
        assert_eq!(format(ValueType::DecVal, 215), "21.5");
        assert_eq!(format(ValueType::DecVal, 0), "0.0");
        assert_eq!(format(ValueType::CentVal, 45), "0.45");
        assert_eq!(format(ValueType::CentVal, 0xFFFF), "-0.01");
        assert_eq!(format(ValueType::MilVal, 1234), "1.234");
    }

    #[test]
    fn integers() {
        assert_eq!(format(ValueType::Default, 0xFFFF), "-1");
        assert_eq!(format(ValueType::Default, 1234), "1234");
        assert_eq!(format(ValueType::Byte, 0x12FE), "254");
        assert_eq!(format(ValueType::LittleEndian, 0x0200), "2");
        assert_eq!(format(ValueType::LittleEndian, 0xE807), "2024");
        assert_eq!(format(ValueType::DoubleVal, 0xFFFE), "-2");
    }

    #[test]
    fn booleans() {
        assert_eq!(format(ValueType::Bool, 0x0001), "1");
        assert_eq!(format(ValueType::Bool, 0x0100), "0");
        assert_eq!(format(ValueType::LittleBool, 0x0100), "1");
        assert_eq!(format(ValueType::LittleBool, 0x0001), "0");
    }

    #[test]
    fn operating_mode() {
        assert_eq!(format(ValueType::Betriebsart, 0x0000), "Notbetrieb");
        assert_eq!(format(ValueType::Betriebsart, 0x0200), "Programmbetrieb");
        assert_eq!(format(ValueType::Betriebsart, 0x0201), "?");
        assert_eq!(format(ValueType::Betriebsart, 0x0600), "?");
        assert_eq!(format(ValueType::Betriebsart, 0xFF00), "?");
    }

    #[test]
    fn time_and_date() {
        assert_eq!(format(ValueType::Zeit, 0x1E09), "09:30");
        assert_eq!(format(ValueType::Zeit, 0x0000), "00:00");
        assert_eq!(format(ValueType::Datum, 0x1F0C), "31.12.");
        assert_eq!(format(ValueType::Datum, 0x0102), "01.02.");
    }

    #[test]
    fn time_domain() {
        assert_eq!(format(ValueType::TimeDomain, (24 << 8) | 90), "06:00-22:30");
        assert_eq!(format(ValueType::TimeDomain, (25 << 8) | 3), "06:15-00:45");
        assert_eq!(format(ValueType::TimeDomain, 0x8080), "not used time domain");
        assert_eq!(format(ValueType::TimeDomain, 0x0180), "not used time domain");
        assert_eq!(format(ValueType::TimeDomain, 0x8001), "not used time domain");
    }

    #[test]
    fn device_fields() {
        assert_eq!(format(ValueType::DevNr, 0), "1");
        assert_eq!(format(ValueType::DevNr, 0x7F), "128");
        assert_eq!(format(ValueType::DevNr, 0x80), "--");
        assert_eq!(format(ValueType::DevId, 0x0F03), "15-03");
        assert_eq!(format(ValueType::DevId, 0x8014), "128-20");
    }

    #[test]
    fn error_numbers() {
        assert_eq!(format(ValueType::ErrNr, 0x0004), "Hochdruck");
        assert_eq!(format(ValueType::ErrNr, 0x0021), "KEINE LEISTUNG");
        assert_eq!(format(ValueType::ErrNr, 0x0001), "ERR 1");
        assert_eq!(format(ValueType::ErrNr, 0xFFFF), "ERR 65535");
    }

    #[test]
    fn doubles() {
        assert_eq!(format_double(ValueType::DoubleVal, 12.5), "12.500");
        assert_eq!(format_double(ValueType::TripleVal, 0.25), "0.250000");
        assert_eq!(format_double(ValueType::Default, 0.1), "0.1");
        assert_eq!(format_double(ValueType::DecVal, 1500.0), "1500");
    }

    #[test]
    fn parse_integers() {
        assert_eq!(parse(ValueType::Default, "  -1"), Ok(0xFFFF));
        assert_eq!(parse(ValueType::Default, "-32767"), Ok(0x8001));
        assert!(parse(ValueType::Default, "-32768").is_err());
        assert_eq!(parse(ValueType::Default, "65535"), Ok(0xFFFF));
        assert!(parse(ValueType::Default, "65536").is_err());
        assert!(parse(ValueType::Default, "abc").is_err());
        assert_eq!(parse(ValueType::Default, "42\n"), Ok(42));
        assert_eq!(parse(ValueType::Byte, "255"), Ok(0xFF));
        assert!(parse(ValueType::Byte, "256").is_err());
        assert!(parse(ValueType::Byte, "-1").is_err());
        assert_eq!(parse(ValueType::LittleEndian, "2"), Ok(0x0200));
        assert_eq!(parse(ValueType::LittleEndian, "2024"), Ok(0xE807));
    }

    #[test]
    fn fixed_point_text_is_rejected() {
        for vt in [ValueType::DecVal, ValueType::CentVal, ValueType::MilVal] {
            assert!(parse(vt, "21.5").is_err(), "{vt}");
            assert!(parse(vt, "1").is_err(), "{vt}");
            assert_eq!(parse_or_failure(vt, "1.15"), PARSE_FAILURE);
        }
    }

    #[test]
    fn failures_fold_into_wire_value() {
        assert_eq!(parse_or_failure(ValueType::Zeit, "09:30"), 0x1E09);
        assert_eq!(parse_or_failure(ValueType::Zeit, "24:01"), PARSE_FAILURE);
        assert_eq!(parse_or_failure(ValueType::Betriebsart, "unknown-mode"), PARSE_FAILURE);
        // -1 is indistinguishable from a failure once folded
        assert_eq!(parse_or_failure(ValueType::Default, "-1"), PARSE_FAILURE);
    }

    #[test]
    fn parse_booleans() {
        assert_eq!(parse(ValueType::Bool, "on"), Ok(1));
        assert_eq!(parse(ValueType::Bool, "1"), Ok(1));
        assert_eq!(parse(ValueType::Bool, "off"), Ok(0));
        assert_eq!(parse(ValueType::Bool, "0"), Ok(0));
        assert_eq!(parse(ValueType::LittleBool, "on"), Ok(0x0100));
        assert_eq!(parse(ValueType::LittleBool, "off"), Ok(0));
        assert!(parse(ValueType::Bool, "yes").is_err());
        assert!(parse(ValueType::Bool, "").is_err());
    }

    #[test]
    fn parse_operating_mode() {
        assert_eq!(parse(ValueType::Betriebsart, "Notbetrieb"), Ok(0x0000));
        assert_eq!(parse(ValueType::Betriebsart, "Notbetrieb (manual)"), Ok(0x0000));
        assert_eq!(parse(ValueType::Betriebsart, " Warmwasserbetrieb"), Ok(0x0500));
        assert!(parse(ValueType::Betriebsart, "unknown-mode").is_err());
        assert!(parse(ValueType::Betriebsart, "Not").is_err());
        for mode in OPERATING_MODES {
            let raw = parse(ValueType::Betriebsart, mode.name).unwrap();
            assert_eq!(format(ValueType::Betriebsart, raw as u16), mode.name);
        }
    }

    #[test]
    fn parse_times() {
        assert_eq!(parse(ValueType::Zeit, "09:30"), Ok(0x1E09));
        assert_eq!(parse(ValueType::Zeit, "9:5"), Ok(0x0509));
        assert_eq!(parse(ValueType::Zeit, "23:59"), Ok(0x3B17));
        assert!(parse(ValueType::Zeit, "24:01").is_err());
        assert!(parse(ValueType::Zeit, "24:00").is_err());
        assert!(parse(ValueType::Zeit, "12:60").is_err());
        assert!(parse(ValueType::Zeit, "-1:30").is_err());
        assert!(parse(ValueType::Zeit, "12.30").is_err());
        assert!(parse(ValueType::Zeit, ":30").is_err());
        assert!(parse(ValueType::Zeit, "9:").is_err());
        assert_eq!(format(ValueType::Zeit, parse(ValueType::Zeit, "09:30").unwrap() as u16), "09:30");
    }

    #[test]
    fn parse_dates() {
        assert_eq!(parse(ValueType::Datum, "18.10.2026"), Ok(0x120AEA));
        assert_eq!(parse(ValueType::Datum, "1.1.0"), Ok(0x010100));
        assert_eq!(parse(ValueType::Datum, "28.2.2025"), Ok(0x1C02E9));
        assert!(parse(ValueType::Datum, "29.2.2024").is_err());
        assert!(parse(ValueType::Datum, "31.4.2024").is_err());
        assert_eq!(parse(ValueType::Datum, "30.4.2024"), Ok(0x1E04E8));
        assert!(parse(ValueType::Datum, "0.1.2024").is_err());
        assert!(parse(ValueType::Datum, "1.13.2024").is_err());
        assert!(parse(ValueType::Datum, "1.1").is_err());
        assert!(parse(ValueType::Datum, "1.1.").is_err());
        assert!(parse(ValueType::Datum, ".10.2026").is_err());
    }

    #[test]
    fn unwritable_types() {
        for vt in [
            ValueType::TimeDomain,
            ValueType::DevNr,
            ValueType::ErrNr,
            ValueType::DevId,
            ValueType::DoubleVal,
            ValueType::TripleVal,
            ValueType::DecVal,
        ] {
            let err = parse(vt, "1").unwrap_err();
            assert_eq!(err.value_type, vt);
            assert_eq!(err.text, "1");
        }
    }
}
