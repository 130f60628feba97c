pub mod assets;
pub mod bundle;
pub mod layout;
pub mod pdf;
pub mod text;

use crate::config::{BackendKind, Config, PageSize};
use crate::error::{Capability, MarksheetError, Result};
use crate::view::MarksheetView;
use anyhow::Context;
use assets::ExportAssets;
use layout::{DocumentPlan, MarksTable, PageGeometry};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub document: bool,
    pub table_layout: bool,
}

/// Turns a planned marksheet into document bytes.
pub trait DocumentBackend {
    fn capabilities(&self) -> Capabilities;
    fn render(&self, doc: &DocumentContent<'_>) -> anyhow::Result<Vec<u8>>;
}

pub fn backend_from_config(config: &Config) -> Option<Box<dyn DocumentBackend>> {
    match config.export.backend {
        BackendKind::Pdf => Some(Box::new(pdf::PdfBackend::new(config.export.table_layout))),
        BackendKind::None => None,
    }
}

pub fn capabilities_of(backend: Option<&dyn DocumentBackend>) -> Capabilities {
    backend.map(|b| b.capabilities()).unwrap_or(Capabilities {
        document: false,
        table_layout: false,
    })
}

/// Header text printed on every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub institution: String,
    pub exam: String,
}

pub struct DocumentContent<'a> {
    pub view: &'a MarksheetView,
    pub branding: &'a Branding,
    pub assets: &'a ExportAssets,
    pub table: &'a MarksTable,
    pub plan: &'a DocumentPlan,
}

pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub page_count: usize,
    pub bytes: usize,
}

/// `Marksheet_<name>.pdf`, every run of non-alphanumerics in the name
/// collapsed to one underscore.
pub fn marksheet_file_name(student_name: &str) -> String {
    let mut stem = String::with_capacity(student_name.len());
    let mut in_gap = false;
    for ch in student_name.chars() {
        if ch.is_alphanumeric() {
            stem.push(ch);
            in_gap = false;
        } else if !in_gap {
            stem.push('_');
            in_gap = true;
        }
    }
    format!("Marksheet_{}.pdf", stem)
}

/// Fails before any work when the backend cannot produce a tabular document.
pub fn ensure_capable(backend: Option<&dyn DocumentBackend>) -> Result<&dyn DocumentBackend> {
    let Some(backend) = backend else {
        return Err(MarksheetError::MissingCapability(Capability::Document));
    };
    let caps = backend.capabilities();
    if !caps.document {
        return Err(MarksheetError::MissingCapability(Capability::Document));
    }
    if !caps.table_layout {
        return Err(MarksheetError::MissingCapability(Capability::TableLayout));
    }
    Ok(backend)
}

/// Wraps the subject table for `page_size` and splits it into pages.
pub fn plan_document(view: &MarksheetView, page_size: PageSize) -> (MarksTable, DocumentPlan) {
    let geom = PageGeometry::for_size(page_size);
    let table = MarksTable::for_view(view, &geom);
    let plan = layout::paginate(&table, view.attendance.is_some(), geom);
    (table, plan)
}

pub fn render_document(
    backend: Option<&dyn DocumentBackend>,
    view: &MarksheetView,
    branding: &Branding,
    assets: &ExportAssets,
    page_size: PageSize,
) -> Result<RenderedDocument> {
    let backend = ensure_capable(backend)?;
    let (table, plan) = plan_document(view, page_size);
    let bytes = backend
        .render(&DocumentContent {
            view,
            branding,
            assets,
            table: &table,
            plan: &plan,
        })
        .map_err(MarksheetError::Export)?;
    Ok(RenderedDocument {
        file_name: marksheet_file_name(&view.student.name),
        bytes,
        page_count: plan.page_count(),
    })
}

/// Writes `bytes` next to `dst` first and renames into place, so a failed
/// write never leaves a truncated file under the final name.
pub fn write_atomic(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let mut tmp_name = dst.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".part");
    let tmp = dst.with_file_name(tmp_name);
    if tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    let result = (|| -> anyhow::Result<()> {
        let mut f = std::fs::File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.to_string_lossy()))?;
        f.write_all(bytes).context("failed to write document")?;
        f.flush().context("failed to flush document")?;
        std::fs::rename(&tmp, dst)
            .with_context(|| format!("failed to move document to {}", dst.to_string_lossy()))
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

pub fn export_marksheet(
    backend: Option<&dyn DocumentBackend>,
    view: &MarksheetView,
    branding: &Branding,
    assets: &ExportAssets,
    page_size: PageSize,
    out_dir: &Path,
) -> Result<ExportSummary> {
    let doc = render_document(backend, view, branding, assets, page_size)?;
    let path = out_dir.join(&doc.file_name);
    write_atomic(&path, &doc.bytes).map_err(MarksheetError::Export)?;
    info!(
        path = %path.to_string_lossy(),
        pages = doc.page_count,
        "marksheet exported"
    );
    Ok(ExportSummary {
        path,
        file_name: doc.file_name,
        page_count: doc.page_count,
        bytes: doc.bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::demo_records;
    use crate::view::build_marksheet;

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn branding() -> Branding {
        Branding {
            institution: "Greenfield College".into(),
            exam: "Annual Examination".into(),
        }
    }

    #[test]
    fn file_names_collapse_punctuation_runs() {
        assert_eq!(marksheet_file_name("John Doe"), "Marksheet_John_Doe.pdf");
        assert_eq!(marksheet_file_name("O'Brien, Jr."), "Marksheet_O_Brien_Jr_.pdf");
        assert_eq!(marksheet_file_name("Anik  Das"), "Marksheet_Anik_Das.pdf");
    }

    #[test]
    fn missing_backend_is_document_capability() {
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let out = temp_dir("marksheet-export-nobackend");
        let e = export_marksheet(
            None,
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter,
            &out,
        )
        .err()
        .expect("must fail");
        assert!(matches!(e, MarksheetError::MissingCapability(Capability::Document)));
        assert_eq!(std::fs::read_dir(&out).expect("read dir").count(), 0);
        let _ = std::fs::remove_dir_all(out);
    }

    #[test]
    fn missing_table_layout_writes_nothing() {
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let out = temp_dir("marksheet-export-notable");
        let backend = pdf::PdfBackend::new(false);
        let e = export_marksheet(
            Some(&backend as &dyn DocumentBackend),
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter,
            &out,
        )
        .err()
        .expect("must fail");
        assert_eq!(e.code(), "missing_capability");
        assert_eq!(e.details(), Some(serde_json::json!({ "capability": "tableLayout" })));
        assert_eq!(std::fs::read_dir(&out).expect("read dir").count(), 0);
        let _ = std::fs::remove_dir_all(out);
    }

    #[test]
    fn pdf_export_lands_under_deterministic_name() {
        let records = demo_records();
        let view = build_marksheet(&records[1], &records);
        let out = temp_dir("marksheet-export-pdf");
        let backend = pdf::PdfBackend::new(true);
        let summary = export_marksheet(
            Some(&backend as &dyn DocumentBackend),
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::A4,
            &out,
        )
        .expect("export");
        assert_eq!(summary.file_name, "Marksheet_Jane_Smith.pdf");
        assert_eq!(summary.page_count, 1);
        let bytes = std::fs::read(&summary.path).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(bytes.len(), summary.bytes);
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = std::fs::remove_dir_all(out);
    }
}
