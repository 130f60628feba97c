use crate::config::Config;
use crate::export::DocumentBackend;
use crate::records::StoredRecord;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything a request may read or change. Owned by the request loop.
pub struct AppState {
    pub config: Config,
    pub db: Connection,
    pub backend: Option<Box<dyn DocumentBackend>>,
    /// Record picked by the last successful search; the export target.
    pub selected: Option<StoredRecord>,
}
