use crate::db;
use crate::error::{MarksheetError, Result};
use crate::export::{self, assets, bundle, Branding};
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use crate::ranking;
use crate::records::value_as_text;
use crate::view::{build_marksheet, MarksheetView};
use serde_json::json;
use std::path::PathBuf;

// Cohort keys are taken verbatim, like the search filters.
fn required_text(req: &Request, key: &str) -> Result<String> {
    req.params
        .get(key)
        .and_then(value_as_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MarksheetError::BadParams(format!("missing {}", key)))
}

fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

fn selected_view(state: &AppState) -> Result<MarksheetView> {
    let selected = state.selected.as_ref().ok_or(MarksheetError::NoSelection)?;
    let cohort = db::cohort(&state.db, &selected.record.class, &selected.record.section)?;
    Ok(build_marksheet(&selected.record, &cohort))
}

// Header text comes from configuration unless the caller supplies it.
fn branding(state: &AppState, req: &Request) -> Branding {
    let pick = |key: &str, fallback: &str| {
        optional_str(req, key)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    Branding {
        institution: pick("institutionName", &state.config.institution.name),
        exam: pick("examName", &state.config.institution.exam),
    }
}

fn export_assets(state: &AppState, req: &Request) -> assets::ExportAssets {
    let inst = &state.config.institution;
    assets::resolve_assets(
        optional_str(req, "logo").or(inst.logo.as_deref()),
        optional_str(req, "background").or(inst.background.as_deref()),
        &state.config.base_dir,
    )
}

fn current(state: &AppState) -> Result<serde_json::Value> {
    let selected = state.selected.as_ref().ok_or(MarksheetError::NoSelection)?;
    Ok(json!({
        "record": selected,
        "marksheet": selected_view(state)?,
    }))
}

fn standings(state: &AppState, req: &Request) -> Result<serde_json::Value> {
    let class = required_text(req, "class")?;
    let section = required_text(req, "section")?;
    let cohort = db::cohort(&state.db, &class, &section)?;
    Ok(json!({
        "class": class,
        "section": section,
        "standings": ranking::cohort_standings(&class, &section, &cohort),
    }))
}

fn export_selected(state: &AppState, req: &Request) -> Result<serde_json::Value> {
    let view = selected_view(state)?;
    // Refuse before touching assets or the output directory.
    export::ensure_capable(state.backend.as_deref())?;

    let out_dir = optional_str(req, "outDir")
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.output_dir());
    let summary = export::export_marksheet(
        state.backend.as_deref(),
        &view,
        &branding(state, req),
        &export_assets(state, req),
        state.config.export.page_size,
        &out_dir,
    )?;
    Ok(json!(summary))
}

fn export_cohort(state: &AppState, req: &Request) -> Result<serde_json::Value> {
    let class = required_text(req, "class")?;
    let section = required_text(req, "section")?;
    let out_path = optional_str(req, "outPath")
        .map(PathBuf::from)
        .ok_or_else(|| MarksheetError::BadParams("missing outPath".to_string()))?;
    export::ensure_capable(state.backend.as_deref())?;

    let cohort = db::cohort(&state.db, &class, &section)?;
    let summary = bundle::export_cohort_bundle(
        state.backend.as_deref(),
        &class,
        &section,
        &cohort,
        &branding(state, req),
        &export_assets(state, req),
        state.config.export.page_size,
        &out_path,
    )?;
    Ok(json!({
        "path": summary.path,
        "format": summary.bundle_format,
        "entryCount": summary.entry_count,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marksheet.current" => Some(respond(&req.id, current(state))),
        "marksheet.standings" => Some(respond(&req.id, standings(state, req))),
        "marksheet.export" => Some(respond(&req.id, export_selected(state, req))),
        "marksheet.exportCohort" => Some(respond(&req.id, export_cohort(state, req))),
        _ => None,
    }
}
