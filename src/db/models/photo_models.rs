use serde::{Deserialize, Serialize};

/// Photo attached to an event. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Photo {
    pub id: i64,
    pub event_id: i64,
    pub ts: i64,
    /// Reference token into external media storage
    pub file_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPhoto {
    pub event_id: i64,
    pub ts: i64,
    pub file_id: String,
}
