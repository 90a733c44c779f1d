use super::event_models::{Event, EventKind, EventStatus};
use serde::{Deserialize, Serialize};

/// GeoJSON `FeatureCollection` of reported events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

impl Feature {
    /// Map feature for an event, or `None` if it has no coordinates.
    pub fn from_event(event: &Event, photo_count: i64) -> Option<Self> {
        let (lat, lon) = event.coordinates()?;
        Some(Self {
            kind: "Feature".to_string(),
            properties: FeatureProperties {
                id: event.id.to_string(),
                ts: event.ts,
                kind: event.kind,
                text: event.text.clone(),
                status: event.status,
                photos: photo_count,
                contact: event.contact.clone(),
                user_id: event.user_id,
            },
            geometry: Geometry::point(lat, lon),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureProperties {
    pub id: String,
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub text: Option<String>,
    pub status: EventStatus,
    pub photos: i64,
    pub contact: Option<String>,
    pub user_id: Option<i64>,
}

/// GeoJSON point; coordinates are `[lon, lat]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl Geometry {
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [lon, lat],
        }
    }
}
