use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const UKRAINIAN_MONTHS: [&str; 12] = [
    "січ", "лют", "бер", "квіт", "трав", "черв", "лип", "серп", "вер", "жовт", "лист", "груд",
];

pub fn ukrainian_month(month: Month) -> &'static str {
    UKRAINIAN_MONTHS[month as usize - 1]
}

/// Drop a trailing RFC 5322 comment such as `(EEST)` and map obsolete zone names.
fn strip_zone_noise(raw: &str) -> String {
    let mut s = raw.trim();
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            s = s[..open].trim_end();
        }
    }
    for (zone, numeric) in [(" GMT", " +0000"), (" UTC", " +0000"), (" UT", " +0000")] {
        if let Some(head) = s.strip_suffix(zone) {
            return format!("{head}{numeric}");
        }
    }
    s.to_string()
}

/// Parse a mail `Date:` header value.
///
/// RFC 2822 first; then a lenient variant that tolerates a missing weekday and a
/// single-digit day, which some relays emit.
pub fn parse_mail_date(raw: &str) -> Option<OffsetDateTime> {
    let cleaned = strip_zone_noise(raw);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(&cleaned, &Rfc2822) {
        return representable(dt, UtcOffset::UTC);
    }

    let without_weekday = match cleaned.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => cleaned.as_str(),
    };
    let lenient = format_description!(
        "[day padding:none] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(without_weekday, &lenient)
        .ok()
        .and_then(|dt| representable(dt, UtcOffset::UTC))
}

/// `dt` if it can be shifted to UTC and to `local` without leaving the supported
/// date range (years ±9999).
fn representable(dt: OffsetDateTime, local: UtcOffset) -> Option<OffsetDateTime> {
    dt.checked_to_offset(UtcOffset::UTC)?;
    dt.checked_to_offset(local)?;
    Some(dt)
}

/// Parse `Z`, `+03:00` or `+0300`.
pub fn parse_offset(raw: &str) -> Option<UtcOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return Some(UtcOffset::UTC);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1i8, &raw[1..]),
        b'-' => (-1i8, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i8 = digits[..2].parse().ok()?;
    let minutes: i8 = digits[2..].parse().ok()?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

/// Parse a trap-value timestamp (`YYYY-MM-DDTHH:MM:SS`, optional fraction and offset).
///
/// Values without an offset are local wall-clock time in `local`.
pub fn parse_trap_timestamp(raw: &str, local: UtcOffset) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return representable(dt, local);
    }

    let naive_len = "YYYY-MM-DDTHH:MM:SS".len();
    if raw.len() < naive_len || !raw.is_char_boundary(naive_len) {
        return None;
    }
    let (naive, rest) = raw.split_at(naive_len);
    let pdt = PrimitiveDateTime::parse(
        naive,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()?;

    let rest = match rest.strip_prefix('.') {
        Some(frac) => frac.trim_start_matches(|c: char| c.is_ascii_digit()),
        None => rest,
    };
    let offset = if rest.is_empty() {
        local
    } else {
        parse_offset(rest)?
    };
    representable(pdt.assume_offset(offset), local)
}

/// `16 жовт 2026 08:00:00`, the date prefix of every report line.
///
/// An instant that cannot be shifted to `offset` is shown in its own offset.
pub fn format_display(ts: OffsetDateTime, offset: UtcOffset) -> String {
    let local = ts.checked_to_offset(offset).unwrap_or(ts);
    format!(
        "{:02} {} {:04} {:02}:{:02}:{:02}",
        local.day(),
        ukrainian_month(local.month()),
        local.year(),
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// `2026-10-16 08:00:00` in the timestamp's own offset.
pub fn format_window_bound(ts: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        ts.year(),
        ts.month() as u8,
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn parses_rfc2822_with_zone_comment() {
        let dt = parse_mail_date("Fri, 16 Oct 2026 08:00:05 +0300 (EEST)").expect("date");
        assert_eq!(dt, datetime!(2026-10-16 08:00:05 +3));
    }

    #[test]
    fn parses_single_digit_day_without_weekday() {
        let dt = parse_mail_date("6 Oct 2026 21:15:00 +0300").expect("date");
        assert_eq!(dt, datetime!(2026-10-06 21:15:00 +3));
    }

    #[test]
    fn parses_gmt_zone_name() {
        let dt = parse_mail_date("Fri, 16 Oct 2026 05:00:00 GMT").expect("date");
        assert_eq!(dt, datetime!(2026-10-16 05:00:00 UTC));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_mail_date("").is_none());
        assert!(parse_mail_date("yesterday").is_none());
    }

    #[test]
    fn offsets_accept_both_spellings() {
        assert_eq!(parse_offset("+03:00"), Some(offset!(+3)));
        assert_eq!(parse_offset("-0130"), Some(offset!(-1:30)));
        assert_eq!(parse_offset("Z"), Some(UtcOffset::UTC));
        assert_eq!(parse_offset("03:00"), None);
        assert_eq!(parse_offset("+3"), None);
    }

    #[test]
    fn naive_trap_timestamp_uses_local_offset() {
        let dt = parse_trap_timestamp("2026-10-16T07:42:10", offset!(+3)).expect("ts");
        assert_eq!(dt, datetime!(2026-10-16 07:42:10 +3));

        let dt = parse_trap_timestamp("2026-10-16T07:42:10.250", offset!(+3)).expect("ts");
        assert_eq!(dt, datetime!(2026-10-16 07:42:10 +3));

        let dt = parse_trap_timestamp("2026-10-16T04:42:10Z", offset!(+3)).expect("ts");
        assert_eq!(dt, datetime!(2026-10-16 07:42:10 +3));
    }

    #[test]
    fn timestamps_at_the_edge_of_the_calendar_are_rejected() {
        assert!(parse_trap_timestamp("9999-12-31T23:59:59-05:00", offset!(+3)).is_none());
        assert!(parse_trap_timestamp("9999-12-31T23:00:00Z", offset!(+3)).is_none());
        assert!(parse_mail_date("Fri, 31 Dec 9999 23:59:59 -0500").is_none());
        assert!(parse_trap_timestamp("9999-12-31T10:00:00Z", offset!(+3)).is_some());
    }

    #[test]
    fn display_keeps_unshiftable_instants_in_their_own_offset() {
        let ts = datetime!(9999-12-31 23:00:00 UTC);
        assert_eq!(format_display(ts, offset!(+3)), "31 груд 9999 23:00:00");
    }

    #[test]
    fn display_uses_ukrainian_month_names() {
        let ts = datetime!(2026-10-16 05:00:07 UTC);
        assert_eq!(format_display(ts, offset!(+3)), "16 жовт 2026 08:00:07");
        assert_eq!(
            format_window_bound(ts.to_offset(offset!(+3))),
            "2026-10-16 08:00:07"
        );
    }
}
