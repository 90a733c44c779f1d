use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of reported occurrence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Volunteer,
    Fire,
    Safe,
    Note,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Volunteer,
        EventKind::Fire,
        EventKind::Safe,
        EventKind::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Volunteer => "volunteer",
            EventKind::Fire => "fire",
            EventKind::Safe => "safe",
            EventKind::Note => "note",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown event type: {}", s)))
    }
}

/// Event status. Progresses active -> verified -> resolved, though any
/// value of the set may be written.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Verified,
    Resolved,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [
        EventStatus::Active,
        EventStatus::Verified,
        EventStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Verified => "verified",
            EventStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown event status: {}", s)))
    }
}

/// Event model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Event {
    pub id: i64,
    /// Unix timestamp, seconds
    pub ts: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub user_id: Option<i64>,
    pub group_id: Option<String>,
    pub text: Option<String>,
    /// Reference token into external media storage
    pub photo_file_id: Option<String>,
    pub status: EventStatus,
    pub contact: Option<String>,
}

impl Event {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

/// Values for a new event row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEvent {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo_file_id: Option<String>,
    /// Stored as `active` when absent
    #[serde(default)]
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub contact: Option<String>,
}

impl NewEvent {
    pub fn new(kind: EventKind, ts: i64) -> Self {
        Self {
            ts,
            kind,
            lat: None,
            lon: None,
            user_id: None,
            group_id: None,
            text: None,
            photo_file_id: None,
            status: None,
            contact: None,
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn by_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Reject coordinates that cannot be a point on the globe. Latitude and
    /// longitude must be given together.
    pub fn validate(&self) -> Result<(), Error> {
        match (self.lat, self.lon) {
            (None, None) => Ok(()),
            (Some(lat), Some(lon)) => validate_point(lat, lon),
            _ => Err(Error::Validation(
                "Latitude and longitude must be given together".to_string(),
            )),
        }
    }
}

pub fn validate_point(lat: f64, lon: f64) -> Result<(), Error> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::Validation(format!("Latitude out of range: {}", lat)));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::Validation(format!("Longitude out of range: {}", lon)));
    }
    Ok(())
}
