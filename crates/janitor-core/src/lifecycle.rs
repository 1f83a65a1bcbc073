//! Lifecycle tags: `KeepAlive` and `KeepUntil`
//!
//! Tag keys are matched case-insensitively. When several tags share a key
//! (ignoring case), the first one in the sequence wins.

use chrono::NaiveDate;
use janitor_api::{CustomTag, KeepUntil, LifecycleSignal, RetentionDecision};
use std::collections::HashMap;

/// Lowercased key of the keep-alive tag
pub const KEEP_ALIVE_KEY: &str = "keepalive";

/// Lowercased keys accepted for the keep-until tag
pub const KEEP_UNTIL_KEYS: [&str; 2] = ["keepuntil", "keep_until"];

/// Case-insensitive view over an ordered tag sequence
#[derive(Debug, Default)]
pub struct TagIndex<'a> {
    // (position, value) of the first tag for each lowercased key
    first: HashMap<String, (usize, &'a str)>,
}

impl<'a> TagIndex<'a> {
    pub fn new(tags: &'a [CustomTag]) -> Self {
        let mut first = HashMap::with_capacity(tags.len());
        for (pos, tag) in tags.iter().enumerate() {
            first
                .entry(tag.key.to_lowercase())
                .or_insert((pos, tag.value.as_str()));
        }
        Self { first }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.first.contains_key(&key.to_lowercase())
    }

    /// Value of the first tag whose key equals `key`, ignoring case
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.first.get(&key.to_lowercase()).map(|(_, v)| *v)
    }

    /// Value of the earliest tag matching any of `keys`
    pub fn first_of(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .filter_map(|k| self.first.get(&k.to_lowercase()))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, v)| *v)
    }
}

/// Parse a `month-day-year` date, accepting `/` or `-` as separators.
///
/// Month and day take one or two digits, the year exactly four. A single
/// day digit may be padded with a space (`"1/ 5/2099"`).
pub fn parse_keep_until_date(value: &str) -> Option<NaiveDate> {
    let normalized = value.replace('/', "-");
    let mut parts = normalized.split('-');
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let month = parse_digits(month, 1, 2)?;
    let day = match day.strip_prefix(' ') {
        Some(digit) if digit.len() == 1 && digit != "0" => parse_digits(digit, 1, 1)?,
        Some(_) => return None,
        None => parse_digits(day, 1, 2)?,
    };
    let year = parse_digits(year, 4, 4)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn parse_digits(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Interpret a keep-until tag value relative to `today`
pub fn keep_until_status(value: Option<&str>, today: NaiveDate) -> KeepUntil {
    match value {
        None => KeepUntil::Unset,
        Some(raw) => match parse_keep_until_date(raw) {
            Some(date) if date >= today => KeepUntil::Stop,
            _ => KeepUntil::Expired,
        },
    }
}

/// Derive the lifecycle signal from an endpoint's tags
pub fn lifecycle_signal(tags: &[CustomTag], today: NaiveDate) -> LifecycleSignal {
    if tags.is_empty() {
        return LifecycleSignal::NONE;
    }

    let index = TagIndex::new(tags);
    LifecycleSignal {
        keep_alive: index.contains(KEEP_ALIVE_KEY),
        keep_until: keep_until_status(index.first_of(&KEEP_UNTIL_KEYS), today),
    }
}

/// Retention decision for a lifecycle signal.
///
/// Only a keep-alive tag without an expired keep-until date keeps an
/// endpoint; everything else is terminated.
pub fn decide(signal: LifecycleSignal) -> RetentionDecision {
    match (signal.keep_alive, signal.keep_until) {
        (true, KeepUntil::Expired) => RetentionDecision::Terminate,
        (true, KeepUntil::Stop) => RetentionDecision::Keep,
        (true, KeepUntil::Unset) => RetentionDecision::Keep,
        (false, _) => RetentionDecision::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn tags(pairs: &[(&str, &str)]) -> Vec<CustomTag> {
        pairs.iter().map(|(k, v)| CustomTag::new(*k, *v)).collect()
    }

    #[test]
    fn test_parse_dates() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);

        assert_eq!(parse_keep_until_date("12/31/2099"), d(2099, 12, 31));
        assert_eq!(parse_keep_until_date("01-01-2000"), d(2000, 1, 1));
        assert_eq!(parse_keep_until_date("1/2/2024"), d(2024, 1, 2));
        assert_eq!(parse_keep_until_date("3-04/2025"), d(2025, 3, 4));
        assert_eq!(parse_keep_until_date("1/ 5/2099"), d(2099, 1, 5));
        assert_eq!(parse_keep_until_date("12- 9-2030"), d(2030, 12, 9));
    }

    #[test]
    fn test_space_padded_day_keeps_endpoint() {
        let t = tags(&[("KeepAlive", "True"), ("KeepUntil", "1/ 5/2099")]);
        let signal = lifecycle_signal(&t, today());
        assert_eq!(signal.keep_until, KeepUntil::Stop);
        assert_eq!(decide(signal), RetentionDecision::Keep);
    }

    #[test]
    fn test_reject_malformed_dates() {
        for value in [
            "not-a-date",
            "",
            "2099-12-31",
            "12/31/99",
            "12/31/02099",
            "13/01/2024",
            "02/30/2024",
            "12/31/2099/1",
            "12.31.2099",
            " 12/31/2099",
            "+1/01/2024",
            "001/01/2024",
            "1/ 0/2024",
            "1/  5/2024",
            "1/ 15/2024",
            " 1/05/2024",
            "1/5 /2024",
        ] {
            assert_eq!(parse_keep_until_date(value), None, "{value:?}");
        }
    }

    #[test]
    fn test_keep_until_status() {
        assert_eq!(keep_until_status(None, today()), KeepUntil::Unset);
        assert_eq!(keep_until_status(Some("06/15/2024"), today()), KeepUntil::Stop);
        assert_eq!(keep_until_status(Some("06/16/2024"), today()), KeepUntil::Stop);
        assert_eq!(keep_until_status(Some("06/14/2024"), today()), KeepUntil::Expired);
        assert_eq!(keep_until_status(Some("soon"), today()), KeepUntil::Expired);
    }

    #[test]
    fn test_keep_alive_any_case() {
        for key in ["KeepAlive", "KEEPALIVE", "keepalive", "kEePaLiVe"] {
            let signal = lifecycle_signal(&tags(&[(key, "")]), today());
            assert!(signal.keep_alive, "{key}");
        }

        let signal = lifecycle_signal(&tags(&[("Keep_Alive", "True")]), today());
        assert!(!signal.keep_alive);
    }

    #[test]
    fn test_keep_alive_value_ignored() {
        let signal = lifecycle_signal(&tags(&[("KeepAlive", "False")]), today());
        assert!(signal.keep_alive);
    }

    #[test]
    fn test_keep_until_key_variants() {
        for key in ["KeepUntil", "keep_until", "Keep_Until", "KEEPUNTIL"] {
            let signal = lifecycle_signal(&tags(&[(key, "12/31/2099")]), today());
            assert_eq!(signal.keep_until, KeepUntil::Stop, "{key}");
        }
    }

    #[test]
    fn test_first_keep_until_wins() {
        let signal = lifecycle_signal(
            &tags(&[("KeepUntil", "01/01/2000"), ("keepuntil", "12/31/2099")]),
            today(),
        );
        assert_eq!(signal.keep_until, KeepUntil::Expired);

        let signal = lifecycle_signal(
            &tags(&[("Keep_Until", "12/31/2099"), ("KeepUntil", "01/01/2000")]),
            today(),
        );
        assert_eq!(signal.keep_until, KeepUntil::Stop);
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(lifecycle_signal(&[], today()), LifecycleSignal::NONE);
        assert_eq!(
            lifecycle_signal(&tags(&[("team", "data")]), today()),
            LifecycleSignal::NONE
        );
    }

    #[test]
    fn test_decision_table() {
        use KeepUntil::*;
        use RetentionDecision::*;

        let cases = [
            (true, Expired, Terminate),
            (true, Stop, Keep),
            (true, Unset, Keep),
            (false, Expired, Terminate),
            (false, Stop, Terminate),
            (false, Unset, Terminate),
        ];

        for (keep_alive, keep_until, expected) in cases {
            let signal = LifecycleSignal {
                keep_alive,
                keep_until,
            };
            assert_eq!(decide(signal), expected, "{signal:?}");
        }
    }

    #[test]
    fn test_tag_index_get() {
        let tags = tags(&[("Team", "a"), ("TEAM", "b"), ("owner", "c")]);
        let index = TagIndex::new(&tags);
        assert_eq!(index.get("team"), Some("a"));
        assert_eq!(index.get("OWNER"), Some("c"));
        assert_eq!(index.get("missing"), None);
    }
}
