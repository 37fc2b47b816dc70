//! Serde adapters for .NET `TimeSpan` strings.
//!
//! Octopus serializes durations as `[d.]hh:mm:ss[.fffffff]`, e.g.
//! `00:01:00` or `1.02:00:00`. Use with `#[serde(with = "timespan")]`
//! on `Duration` fields, or `timespan::option` for optional ones.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Format a duration as a `TimeSpan` string.
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

/// Parse a `TimeSpan` string. Returns `None` for malformed input, for
/// negative spans (`-00:01:00`), which `Duration` cannot hold, and for
/// day counts that overflow.
pub fn parse(raw: &str) -> Option<Duration> {
    if raw.starts_with('-') {
        return None;
    }
    let (days, clock) = match raw.split_once(':') {
        Some((head, _)) if head.contains('.') => {
            let (d, rest) = raw.split_once('.')?;
            (d.parse::<u64>().ok()?, rest)
        }
        Some(_) => (0, raw),
        None => return None,
    };

    let mut parts = clock.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let sec_part = parts.next()?;
    let (secs, frac) = match sec_part.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (sec_part, None),
    };
    let seconds: u64 = secs.parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let nanos = match frac {
        Some(f) if !f.is_empty() && f.len() <= 7 && f.bytes().all(|b| b.is_ascii_digit()) => {
            let padded = format!("{f:0<7}");
            padded.parse::<u32>().ok()? * 100
        }
        Some(_) => return None,
        None => 0,
    };

    let total = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60 + seconds)?;
    Some(Duration::new(total, nanos))
}

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*duration))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid TimeSpan: {raw:?}")))
}

/// Same as the parent module, for `Option<Duration>` fields.
pub mod option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_str(&super::format(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid TimeSpan: {raw:?}"))),
            None => Ok(None),
        }
    }
}
