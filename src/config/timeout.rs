//! GPIB bus timeout settings.
//!
//! The bus timeout is not an arbitrary duration: drivers accept one of a fixed
//! ladder of values (`T10us`, `T30us`, ..., `T1000s`), or `TNONE` to wait
//! forever. The textual names are used verbatim in `gpib.conf`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A GPIB bus operation timeout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Timeout {
    /// Never time out.
    None,
    /// 10 microseconds.
    T10us,
    /// 30 microseconds.
    T30us,
    /// 100 microseconds.
    T100us,
    /// 300 microseconds.
    T300us,
    /// 1 millisecond.
    T1ms,
    /// 3 milliseconds.
    T3ms,
    /// 10 milliseconds.
    T10ms,
    /// 30 milliseconds.
    T30ms,
    /// 100 milliseconds.
    T100ms,
    /// 300 milliseconds.
    T300ms,
    /// 1 second.
    T1s,
    /// 3 seconds.
    #[default]
    T3s,
    /// 10 seconds.
    T10s,
    /// 30 seconds.
    T30s,
    /// 100 seconds.
    T100s,
    /// 300 seconds.
    T300s,
    /// 1000 seconds.
    T1000s,
}

const LADDER: [(Timeout, &str, u64); 18] = [
    (Timeout::None, "TNONE", 0),
    (Timeout::T10us, "T10us", 10),
    (Timeout::T30us, "T30us", 30),
    (Timeout::T100us, "T100us", 100),
    (Timeout::T300us, "T300us", 300),
    (Timeout::T1ms, "T1ms", 1_000),
    (Timeout::T3ms, "T3ms", 3_000),
    (Timeout::T10ms, "T10ms", 10_000),
    (Timeout::T30ms, "T30ms", 30_000),
    (Timeout::T100ms, "T100ms", 100_000),
    (Timeout::T300ms, "T300ms", 300_000),
    (Timeout::T1s, "T1s", 1_000_000),
    (Timeout::T3s, "T3s", 3_000_000),
    (Timeout::T10s, "T10s", 10_000_000),
    (Timeout::T30s, "T30s", 30_000_000),
    (Timeout::T100s, "T100s", 100_000_000),
    (Timeout::T300s, "T300s", 300_000_000),
    (Timeout::T1000s, "T1000s", 1_000_000_000),
];

impl Timeout {
    /// Every timeout setting, shortest first after `TNONE`.
    pub fn all() -> impl Iterator<Item = Timeout> {
        LADDER.iter().map(|(t, _, _)| *t)
    }

    /// Name used in configuration text, e.g. `T30s`.
    pub fn name(self) -> &'static str {
        LADDER[self.index()].1
    }

    /// Timeout as a duration, or `None` for `TNONE`.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Timeout::None => None,
            other => Some(Duration::from_micros(LADDER[other.index()].2)),
        }
    }

    /// Driver-level index of the setting (`TNONE` = 0, `T10us` = 1, ...).
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timeout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LADDER
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(s))
            .map(|(t, _, _)| *t)
            .ok_or_else(|| format!("unknown timeout '{s}'"))
    }
}

impl TryFrom<String> for Timeout {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeout> for String {
    fn from(value: Timeout) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("T30s".parse::<Timeout>(), Ok(Timeout::T30s));
        assert_eq!("t30S".parse::<Timeout>(), Ok(Timeout::T30s));
        assert_eq!("TNONE".parse::<Timeout>(), Ok(Timeout::None));
        assert!("T31s".parse::<Timeout>().is_err());
        assert!("30".parse::<Timeout>().is_err());
    }

    #[test]
    fn durations_follow_the_ladder() {
        assert_eq!(Timeout::None.as_duration(), None);
        assert_eq!(Timeout::T10us.as_duration(), Some(Duration::from_micros(10)));
        assert_eq!(Timeout::T30s.as_duration(), Some(Duration::from_secs(30)));
        assert_eq!(Timeout::T1000s.as_duration(), Some(Duration::from_secs(1000)));
    }

    #[test]
    fn index_matches_driver_numbering() {
        assert_eq!(Timeout::None.index(), 0);
        assert_eq!(Timeout::T3s.index(), 12);
        assert_eq!(Timeout::T1000s.index(), 17);
        for (i, t) in Timeout::all().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_string(&Timeout::T30s).unwrap();
        assert_eq!(json, "\"T30s\"");
        let back: Timeout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Timeout::T30s);
    }
}
