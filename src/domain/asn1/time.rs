//! UTCTime / GeneralizedTime codec.
//!
//! Times are exchanged as `SystemTime`. Conversion between calendar dates and
//! Unix seconds uses the proleptic Gregorian calendar.

use crate::domain::constants::{ASN1_GENERALIZED_TIME_TAG, ASN1_UTC_TIME_TAG};
use crate::domain::asn1::writer::tlv;
use crate::infra::error::{Asn1Error, Asn1Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Days since 1970-01-01 for a calendar date.
#[must_use]
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month_index = i64::from((month + 9) % 12);
    let day_of_year = (153 * month_index + 2) / 5 + i64::from(day) - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Calendar date for days since 1970-01-01.
#[must_use]
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let day_of_era = z - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * month_index + 2) / 5 + 1) as u32;
    let month = if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    } as u32;
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn system_time_from_unix(seconds: i64, nanos: u32) -> SystemTime {
    if seconds >= 0 {
        UNIX_EPOCH + Duration::new(seconds as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(seconds.unsigned_abs()) + Duration::from_nanos(u64::from(nanos))
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => {
            let before = before.duration();
            -(before.as_secs() as i64) - i64::from(before.subsec_nanos() > 0)
        }
    }
}

fn digits(text: &[u8], what: &'static str) -> Asn1Result<u32> {
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return Err(Asn1Error::malformed(what, "expected decimal digits"));
    }
    Ok(text
        .iter()
        .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0')))
}

fn to_system_time(
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    what: &'static str,
) -> Asn1Result<SystemTime> {
    if !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || hour > 23
        || minute > 59
        || second > 60
    {
        return Err(Asn1Error::malformed(what, "field out of range"));
    }
    let days = days_from_civil(year, month, day);
    let seconds =
        days * 86_400 + i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second);
    Ok(system_time_from_unix(seconds, nanos))
}

/// Parse GeneralizedTime content: `YYYYMMDDhhmmss[.f+]Z`.
pub fn parse_generalized_time(content: &[u8]) -> Asn1Result<SystemTime> {
    const WHAT: &str = "GeneralizedTime";
    if content.len() < 15 || content.last() != Some(&b'Z') {
        return Err(Asn1Error::malformed(WHAT, "expected YYYYMMDDhhmmss[.f]Z"));
    }
    let body = &content[..content.len() - 1];
    let year = digits(&body[0..4], WHAT)?;
    let month = digits(&body[4..6], WHAT)?;
    let day = digits(&body[6..8], WHAT)?;
    let hour = digits(&body[8..10], WHAT)?;
    let minute = digits(&body[10..12], WHAT)?;
    let second = digits(&body[12..14], WHAT)?;
    let nanos = match &body[14..] {
        [] => 0,
        [b'.', fraction @ ..] if !fraction.is_empty() => {
            let mut scaled = 0u32;
            for (index, &d) in fraction.iter().take(9).enumerate() {
                if !d.is_ascii_digit() {
                    return Err(Asn1Error::malformed(WHAT, "bad fractional seconds"));
                }
                scaled += u32::from(d - b'0') * 10u32.pow(8 - index as u32);
            }
            scaled
        }
        _ => return Err(Asn1Error::malformed(WHAT, "bad fractional seconds")),
    };
    to_system_time(
        i64::from(year),
        month,
        day,
        hour,
        minute,
        second,
        nanos,
        WHAT,
    )
}

/// Parse UTCTime content: `YYMMDDhhmmssZ` (years 50-99 map to 19xx).
pub fn parse_utc_time(content: &[u8]) -> Asn1Result<SystemTime> {
    const WHAT: &str = "UTCTime";
    if content.len() != 13 || content[12] != b'Z' {
        return Err(Asn1Error::malformed(WHAT, "expected YYMMDDhhmmssZ"));
    }
    let short_year = digits(&content[0..2], WHAT)?;
    let year = if short_year >= 50 {
        1900 + short_year
    } else {
        2000 + short_year
    };
    to_system_time(
        i64::from(year),
        digits(&content[2..4], WHAT)?,
        digits(&content[4..6], WHAT)?,
        digits(&content[6..8], WHAT)?,
        digits(&content[8..10], WHAT)?,
        digits(&content[10..12], WHAT)?,
        0,
        WHAT,
    )
}

fn calendar(time: SystemTime) -> (i64, u32, u32, u32, u32, u32) {
    let seconds = unix_seconds(time);
    let days = seconds.div_euclid(86_400);
    let rem = seconds.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    (
        year,
        month,
        day,
        (rem / 3_600) as u32,
        ((rem % 3_600) / 60) as u32,
        (rem % 60) as u32,
    )
}

/// Encode a GeneralizedTime TLV with whole seconds.
#[must_use]
pub fn encode_generalized_time(time: SystemTime) -> Vec<u8> {
    let (year, month, day, hour, minute, second) = calendar(time);
    let text = format!("{year:04}{month:02}{day:02}{hour:02}{minute:02}{second:02}Z");
    tlv(ASN1_GENERALIZED_TIME_TAG, text.as_bytes())
}

/// Encode a `Time` per RFC 5652 11.3: UTCTime for 1950-2049, GeneralizedTime otherwise.
#[must_use]
pub fn encode_signing_time(time: SystemTime) -> Vec<u8> {
    let (year, month, day, hour, minute, second) = calendar(time);
    if (1950..2050).contains(&year) {
        let text = format!(
            "{:02}{month:02}{day:02}{hour:02}{minute:02}{second:02}Z",
            year % 100
        );
        tlv(ASN1_UTC_TIME_TAG, text.as_bytes())
    } else {
        encode_generalized_time(time)
    }
}

/// Whole seconds since the Unix epoch (negative before 1970).
#[must_use]
pub fn to_unix_seconds(time: SystemTime) -> i64 {
    unix_seconds(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_round_trip_known_dates() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(civil_from_days(11_017), (2000, 3, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn parses_generalized_time_with_fraction() {
        let t = parse_generalized_time(b"20240229120000.5Z").unwrap();
        let since = t.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(since.as_secs(), 1_709_208_000);
        assert_eq!(since.subsec_millis(), 500);
    }

    #[test]
    fn parses_utc_time_century_window() {
        let t = parse_utc_time(b"491231235959Z").unwrap();
        assert_eq!(to_unix_seconds(t), 2_524_607_999);
        let old = parse_utc_time(b"500101000000Z").unwrap();
        assert_eq!(to_unix_seconds(old), -631_152_000);
    }

    #[test]
    fn rejects_local_times_and_garbage() {
        assert!(parse_generalized_time(b"20240101000000").is_err());
        assert!(parse_generalized_time(b"2024010100000AZ").is_err());
        assert!(parse_utc_time(b"241301000000Z").is_err());
    }

    #[test]
    fn signing_time_switches_encoding_at_2050() {
        let in_window = UNIX_EPOCH + Duration::from_secs(1_709_208_000);
        let encoded = encode_signing_time(in_window);
        assert_eq!(encoded[0], ASN1_UTC_TIME_TAG);
        assert_eq!(&encoded[2..], b"240229120000Z");

        let later = UNIX_EPOCH + Duration::from_secs(2_556_144_000); // 2051-01-01
        let encoded = encode_signing_time(later);
        assert_eq!(encoded[0], ASN1_GENERALIZED_TIME_TAG);
        assert_eq!(&encoded[2..], b"20510101000000Z");
    }
}
