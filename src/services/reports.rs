use crate::db::models::{Event, EventKind, NewEvent};
use crate::db::repositories::EventsRepository;
use crate::error::Error;
use anyhow::Result;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

const FIRE_PREFIX: &str = "fire ";

/// Coordinates and extras pulled out of a free-text report line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub lat: f64,
    pub lon: f64,
    /// First `@handle` or `+phone` token after the coordinates
    pub contact: Option<String>,
    /// Remaining words, if any
    pub text: Option<String>,
    /// Line started with `fire `
    pub fire: bool,
}

/// Parse lines such as `fire 42.1, 18.9 @ranger smoke by the road`.
///
/// Returns `None` when the line does not start with two numbers.
pub fn parse_report(line: &str) -> Option<ParsedReport> {
    let mut raw = line.trim();
    let fire = raw
        .get(..FIRE_PREFIX.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(FIRE_PREFIX));
    if fire {
        raw = raw[FIRE_PREFIX.len()..].trim();
    }

    let normalized = raw.replace([',', ';'], " ");
    let parts: Vec<&str> = normalized.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let lat: f64 = parts[0].parse().ok()?;
    let lon: f64 = parts[1].parse().ok()?;

    let mut contact = None;
    let mut tail = Vec::new();
    for part in &parts[2..] {
        if contact.is_none() && (part.starts_with('@') || part.starts_with('+')) {
            contact = Some(part.to_string());
        } else {
            tail.push(*part);
        }
    }

    Some(ParsedReport {
        lat,
        lon,
        contact,
        text: (!tail.is_empty()).then(|| tail.join(" ")),
        fire,
    })
}

/// Free-text report submitted by a reporter
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportRequest {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Used when the text carries no contact of its own
    #[serde(default)]
    pub contact: Option<String>,
    /// Type for reports without the `fire` prefix; volunteer if absent
    #[serde(default, rename = "type")]
    pub kind: Option<EventKind>,
}

/// Turns incoming reports into stored events
#[derive(Clone)]
pub struct ReportService {
    events: EventsRepository,
}

impl ReportService {
    pub fn new(events: EventsRepository) -> Self {
        Self { events }
    }

    /// Build the event a report describes, stamped with `ts`
    pub fn to_new_event(request: &ReportRequest, ts: i64) -> Result<NewEvent, Error> {
        let parsed = parse_report(&request.text).ok_or_else(|| {
            Error::Validation("Report must start with latitude and longitude".to_string())
        })?;

        let kind = if parsed.fire {
            EventKind::Fire
        } else {
            request.kind.unwrap_or(EventKind::Volunteer)
        };

        let mut event = NewEvent::new(kind, ts).at(parsed.lat, parsed.lon);
        event.user_id = request.user_id;
        event.group_id = request.group_id.clone();
        event.text = parsed.text;
        event.contact = parsed.contact.or_else(|| request.contact.clone());
        event.validate()?;

        Ok(event)
    }

    /// Store a report as a new active event
    pub async fn submit(&self, request: &ReportRequest) -> Result<Event> {
        let new_event = Self::to_new_event(request, Utc::now().timestamp())?;
        debug!("Parsed report into {:?}", new_event);

        let event = self.events.create(&new_event).await?;
        info!(
            "Report from {:?} stored as {} event {}",
            request.user_id, event.kind, event.id
        );

        Ok(event)
    }
}
