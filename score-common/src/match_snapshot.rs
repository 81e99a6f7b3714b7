use crate::config::Locale;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Suffix appended to the match minute when it is displayed.
pub const MINUTE_SUFFIX: char = '′';

/// The state of a single match as returned by `GET /api/matches/{matchId}`.
///
/// The endpoint returns the full match record, only the fields shown on a match card are kept.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    #[serde(default, deserialize_with = "deser_score")]
    pub score_home: u32,
    #[serde(default, deserialize_with = "deser_score")]
    pub score_away: u32,
    #[serde(
        default,
        deserialize_with = "deser_minute",
        skip_serializing_if = "Option::is_none"
    )]
    pub minute: Option<Minute>,
    pub status: MatchStatus,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchStatus {
    Scheduled,
    InPlay,
    HalfTime,
    Finished,
    /// A status this display doesn't know about, kept exactly as received
    Other(String),
}

impl MatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::InPlay => "IN_PLAY",
            Self::HalfTime => "HALF_TIME",
            Self::Finished => "FINISHED",
            Self::Other(raw) => raw,
        }
    }

    pub fn label(&self, locale: Locale) -> &str {
        match (self, locale) {
            (Self::Scheduled, Locale::English) => "Scheduled",
            (Self::InPlay, Locale::English) => "Live",
            (Self::HalfTime, Locale::English) => "Half-time",
            (Self::Finished, Locale::English) => "Finished",
            (Self::Scheduled, Locale::French) => "Programmé",
            (Self::InPlay, Locale::French) => "En direct",
            (Self::HalfTime, Locale::French) => "Mi-temps",
            (Self::Finished, Locale::French) => "Terminé",
            (Self::Other(raw), _) => raw,
        }
    }

    /// Value for the class attribute of the status badge
    pub fn badge_class(&self) -> String {
        format!("badge badge-match-{}", self.as_str().to_lowercase())
    }
}

impl From<String> for MatchStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SCHEDULED" => Self::Scheduled,
            "IN_PLAY" => Self::InPlay,
            "HALF_TIME" => Self::HalfTime,
            "FINISHED" => Self::Finished,
            _ => Self::Other(raw),
        }
    }
}

impl From<MatchStatus> for String {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The match minute as the server reports it. Usually a number, but stoppage time comes through
/// as text like `45+2`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Minute(String);

impl Minute {
    pub fn new(minute: impl Into<String>) -> Self {
        Self(minute.into())
    }

    /// Text shown in the minute element of a card, eg. `37′`
    pub fn display_text(&self) -> String {
        format!("{}{MINUTE_SUFFIX}", self.0)
    }
}

impl From<u32> for Minute {
    fn from(minute: u32) -> Self {
        Self(minute.to_string())
    }
}

impl fmt::Display for Minute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Scores that are missing, `null` or negative are shown as 0
fn deser_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer)
        .map(|val| val.and_then(|score| u32::try_from(score).ok()).unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinute {
    Number(u32),
    Text(String),
}

fn deser_minute<'de, D>(deserializer: D) -> Result<Option<Minute>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawMinute>::deserialize(deserializer)? {
        // A numeric 0 is no minute, same as a missing one
        Some(RawMinute::Number(0)) => None,
        Some(RawMinute::Number(minute)) => Some(minute.into()),
        Some(RawMinute::Text(text)) if !text.trim().is_empty() => {
            Some(Minute::new(text.trim()))
        }
        _ => None,
    })
}
