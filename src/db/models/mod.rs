pub mod event_models;
pub mod geojson_models;
pub mod photo_models;

pub use event_models::{Event, EventKind, EventStatus, NewEvent};
pub use geojson_models::{Feature, FeatureCollection, Geometry};
pub use photo_models::{NewPhoto, Photo};
