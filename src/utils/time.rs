//! Time parsing and formatting utilities
//!
//! ffmpeg receives every seek position in the fixed-width `hh:mm:ss.mmm`
//! form, whether the caller supplied seconds or a timecode.

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Format milliseconds as `hh:mm:ss.mmm`
///
/// Never trims: zero renders as `00:00:00.000`. Hours grow past two digits
/// instead of wrapping. Negative and non-finite input renders as zero.
pub fn format_fixed_width(milliseconds: f64) -> String {
    let total = if milliseconds.is_finite() && milliseconds > 0.0 {
        milliseconds.round() as u64
    } else {
        0
    };

    let hours = total / MS_PER_HOUR;
    let minutes = (total % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (total % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = total % MS_PER_SECOND;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Parse a `[d.]hh:mm[:ss[.fff]]` timecode into milliseconds
///
/// Two components are hours and minutes, three add seconds. A leading `-`
/// negates the result. Returns `None` for anything else.
pub fn parse_timecode(timecode: &str) -> Option<f64> {
    let trimmed = timecode.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    // "1.02:03" carries a day count in front of the hours
    let (days, hours) = match parts[0].split_once('.') {
        Some((days, hours)) => (parse_digits(days)?, parse_digits(hours)?),
        None => (0, parse_digits(parts[0])?),
    };
    let minutes = parse_digits(parts[1])?;

    let (seconds, fraction_ms) = match parts.get(2) {
        None => (0, 0.0),
        Some(field) => match field.split_once('.') {
            Some((whole, fraction)) => (parse_digits(whole)?, parse_fraction_ms(fraction)?),
            None => (parse_digits(field)?, 0.0),
        },
    };

    let whole_ms = days
        .checked_mul(MS_PER_DAY)?
        .checked_add(hours.checked_mul(MS_PER_HOUR)?)?
        .checked_add(minutes.checked_mul(MS_PER_MINUTE)?)?
        .checked_add(seconds.checked_mul(MS_PER_SECOND)?)?;
    let total = whole_ms as f64 + fraction_ms;

    Some(if negative { -total } else { total })
}

/// Leading decimal number of `text`, ignoring whatever follows it
///
/// `"5s"` yields 5 and `" 1.5e1x"` yields 15. Returns `None` when no digits
/// start the text.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        mantissa_end = digits_from(int_end + 1);
    }
    // A lone sign or dot carries no digits
    if mantissa_end - end <= usize::from(mantissa_end > int_end) {
        return None;
    }

    end = mantissa_end;
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// ".5" is half a second, ".050" fifty milliseconds
fn parse_fraction_ms(fraction: &str) -> Option<f64> {
    if fraction.is_empty() {
        return Some(0.0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: f64 = format!("0.{}", fraction).parse().ok()?;
    Some((value * MS_PER_SECOND as f64).round())
}
