//! Textual `d"..."` datetime literal, using `chrono` for the calendar
//! <-> epoch-millisecond conversion rather than hand-rolled calendar
//! arithmetic.

use chrono::{Datelike, NaiveDate, Timelike};

use crate::error::{Error, Result};
use crate::value::DateTime;

fn take_digits(b: &[u8], i: &mut usize, max: usize) -> String {
    let start = *i;
    while *i < b.len() && *i - start < max && b[*i].is_ascii_digit() {
        *i += 1;
    }
    std::str::from_utf8(&b[start..*i]).unwrap().to_owned()
}

fn eat(b: &[u8], i: &mut usize, c: u8) -> bool {
    if *i < b.len() && b[*i] == c {
        *i += 1;
        true
    } else {
        false
    }
}

/// Parses the content between the `d"` and closing `"` (not including the
/// quotes). Grammar: `YYYY-MM-DD(T| )H(H)?:MM:SS(.sss)?(Z|[+-]HH(:?MM)?)?` —
/// month, day, hour and the fractional seconds are variable-width (`tst_ccpcp.c`
/// exercises single-digit hours like `"2017-05-03 5:52:03"` and two- as well
/// as four-digit zone offsets like `"-01"` and `"-1015"`), so this scans digit
/// runs rather than slicing fixed columns. An empty string is the
/// invalid-datetime sentinel.
pub fn parse(text: &str) -> Result<DateTime> {
    if text.is_empty() {
        return Ok(DateTime::invalid());
    }
    let bad = || Error::malformed("malformed datetime literal", 0);
    let b = text.as_bytes();
    let mut i = 0usize;

    let year_s = take_digits(b, &mut i, 4);
    if year_s.len() != 4 || !eat(b, &mut i, b'-') {
        return Err(bad());
    }
    let month_s = take_digits(b, &mut i, 2);
    if month_s.is_empty() || !eat(b, &mut i, b'-') {
        return Err(bad());
    }
    let day_s = take_digits(b, &mut i, 2);
    if day_s.is_empty() {
        return Err(bad());
    }
    if i >= b.len() || (b[i] != b'T' && b[i] != b' ') {
        return Err(bad());
    }
    i += 1;
    let hour_s = take_digits(b, &mut i, 2);
    if hour_s.is_empty() || !eat(b, &mut i, b':') {
        return Err(bad());
    }
    let min_s = take_digits(b, &mut i, 2);
    if min_s.is_empty() || !eat(b, &mut i, b':') {
        return Err(bad());
    }
    let sec_s = take_digits(b, &mut i, 2);
    if sec_s.is_empty() {
        return Err(bad());
    }

    let mut msec = 0i32;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac = take_digits(b, &mut i, 9);
        if frac.is_empty() {
            return Err(bad());
        }
        msec = format!("{:0<3}", &frac[..frac.len().min(3)]).parse().unwrap_or(0);
    }

    let offset_min: i32 = if i >= b.len() {
        0
    } else if b[i] == b'Z' {
        i += 1;
        0
    } else if b[i] == b'+' || b[i] == b'-' {
        let sign = if b[i] == b'-' { -1 } else { 1 };
        i += 1;
        let zh_s = take_digits(b, &mut i, 2);
        if zh_s.is_empty() {
            return Err(bad());
        }
        eat(b, &mut i, b':');
        let zm_s = take_digits(b, &mut i, 2);
        let zh: i32 = zh_s.parse().map_err(|_| bad())?;
        let zm: i32 = if zm_s.is_empty() { 0 } else { zm_s.parse().map_err(|_| bad())? };
        sign * (zh * 60 + zm)
    } else {
        return Err(bad());
    };

    if i != b.len() {
        return Err(bad());
    }

    let year: i32 = year_s.parse().map_err(|_| bad())?;
    let month: u32 = month_s.parse().map_err(|_| bad())?;
    let day: u32 = day_s.parse().map_err(|_| bad())?;
    let hour: u32 = hour_s.parse().map_err(|_| bad())?;
    let min: u32 = min_s.parse().map_err(|_| bad())?;
    let sec: u32 = sec_s.parse().map_err(|_| bad())?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)?;
    let naive = date.and_hms_milli_opt(hour, min, sec, msec as u32).ok_or_else(bad)?;
    let utc_msec = naive.and_utc().timestamp_millis() - (offset_min as i64) * 60_000;
    Ok(DateTime::from_epoch_msec(utc_msec, offset_min))
}

pub fn format(dt: &DateTime) -> String {
    if !dt.is_valid() {
        return String::new();
    }
    let offset_min = dt.utc_offset_min();
    let local_msec = dt.msec_since_epoch() + (offset_min as i64) * 60_000;
    let secs = local_msec.div_euclid(1000);
    let msec = local_msec.rem_euclid(1000);
    let naive = chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default();

    let mut s = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        naive.year(),
        naive.month(),
        naive.day(),
        naive.hour(),
        naive.minute(),
        naive.second()
    );
    if msec != 0 {
        s.push_str(&format!(".{:03}", msec));
    }
    if offset_min == 0 {
        s.push('Z');
    } else {
        let sign = if offset_min < 0 { '-' } else { '+' };
        let abs = offset_min.abs();
        s.push_str(&format!("{}{:02}{:02}", sign, abs / 60, abs % 60));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_with_millis() {
        let dt = parse("2018-02-02T00:00:00.123Z").unwrap();
        assert_eq!(dt.msec_since_epoch(), crate::value::SHV_EPOCH_MSEC + 123);
        assert_eq!(dt.utc_offset_min(), 0);
    }

    #[test]
    fn parses_single_digit_hour_and_bare_space_separator() {
        // tst_ccpcp.c: test_unpack_datetime("d\"2017-05-03 5:52:03\"", 0, 0)
        let dt = parse("2017-05-03 5:52:03").unwrap();
        assert_eq!(dt.utc_offset_min(), 0);
        let dt = parse("2018-12-02 0:00:00").unwrap();
        assert_eq!(dt.utc_offset_min(), 0);
    }

    #[test]
    fn parses_two_and_four_digit_zone_offsets() {
        // tst_ccpcp.c: "1970-01-01 00:00:00-01" -> -60 min, "2041-03-04 0:00:00-1015" -> -615 min
        assert_eq!(parse("1970-01-01 00:00:00-01").unwrap().utc_offset_min(), -60);
        assert_eq!(parse("2041-03-04 0:00:00-1015").unwrap().utc_offset_min(), -(10 * 60 + 15));
        assert_eq!(parse("2017-05-03T15:52:03.000-0130").unwrap().utc_offset_min(), -(60 + 30));
        assert_eq!(parse("2018-02-02 01:00:00.001+01").unwrap().utc_offset_min(), 60);
    }

    #[test]
    fn equivalent_instants_under_different_zone_notations_agree() {
        let a = parse("2017-05-03T18:30:00Z").unwrap();
        let b = parse("2017-05-03T22:30:00+04").unwrap();
        assert_eq!(a.msec_since_epoch(), b.msec_since_epoch());

        let c = parse("2017-05-03T11:30:00-0700").unwrap();
        let d = parse("2017-05-03T15:00:00-0330").unwrap();
        assert_eq!(c.msec_since_epoch(), d.msec_since_epoch());
    }

    #[test]
    fn round_trips_with_offset() {
        let original = DateTime::from_epoch_msec(crate::value::SHV_EPOCH_MSEC + 61_000, 90);
        let text = format(&original);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.msec_since_epoch(), original.msec_since_epoch());
        assert_eq!(parsed.utc_offset_min(), original.utc_offset_min());
    }

    #[test]
    fn empty_text_is_invalid_sentinel() {
        assert!(!parse("").unwrap().is_valid());
        assert_eq!(format(&DateTime::invalid()), "");
    }
}
