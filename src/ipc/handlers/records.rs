use crate::db;
use crate::error::{MarksheetError, Result};
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use crate::ranking;
use crate::records::SearchQuery;
use crate::view::build_marksheet;
use serde_json::json;
use tracing::info;

fn list(state: &AppState) -> Result<serde_json::Value> {
    let records = db::list_records(&state.db)?;
    let rows: Vec<serde_json::Value> = records
        .iter()
        .map(|s| {
            let mut v = json!(s);
            v["total"] = json!(ranking::total_obtained(&s.record));
            v
        })
        .collect();
    Ok(json!({ "records": rows }))
}

// A miss clears the selection: exporting is only possible right after a
// successful search.
fn search(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let query = SearchQuery::from_params(&req.params);
    let Some(found) = db::find_first(&state.db, &query)? else {
        state.selected = None;
        info!(?query, "search found no student");
        return Err(MarksheetError::NotFound);
    };
    let cohort = db::cohort(&state.db, &found.record.class, &found.record.section)?;
    let view = build_marksheet(&found.record, &cohort);
    let result = json!({
        "record": found,
        "marksheet": view,
    });
    state.selected = Some(found);
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.list" => Some(respond(&req.id, list(state))),
        "records.search" => Some(respond(&req.id, search(state, req))),
        _ => None,
    }
}
