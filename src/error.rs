use serde_json::json;
use thiserror::Error;

/// Pieces of the export pipeline that configuration may leave out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Document,
    TableLayout,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Document => "document",
            Capability::TableLayout => "tableLayout",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MarksheetError {
    #[error("no student found with the given details")]
    NotFound,

    #[error("search for a student first")]
    NoSelection,

    #[error("{0} capability is not available; export aborted")]
    MissingCapability(Capability),

    #[error("{0}")]
    BadParams(String),

    #[error("record store query failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("export failed: {0:#}")]
    Export(anyhow::Error),
}

impl MarksheetError {
    pub fn code(&self) -> &'static str {
        match self {
            MarksheetError::NotFound => "not_found",
            MarksheetError::NoSelection => "no_selection",
            MarksheetError::MissingCapability(_) => "missing_capability",
            MarksheetError::BadParams(_) => "bad_params",
            MarksheetError::Store(_) => "db_query_failed",
            MarksheetError::Export(_) => "export_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            MarksheetError::MissingCapability(cap) => Some(json!({ "capability": cap.as_str() })),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarksheetError>;
