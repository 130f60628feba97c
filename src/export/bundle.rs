use super::{assets::ExportAssets, render_document, write_atomic, Branding, DocumentBackend};
use crate::config::PageSize;
use crate::error::{MarksheetError, Result};
use crate::ranking;
use crate::records::StudentRecord;
use crate::view::build_marksheet;
use anyhow::Context;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const MARKSHEET_DIR: &str = "marksheets";
pub const BUNDLE_FORMAT_V1: &str = "marksheet-cohort-v1";

#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub path: PathBuf,
    pub bundle_format: String,
    pub entry_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

// Two students may share a file name; later ones get a roll suffix.
fn unique_entry_name(file_name: &str, roll: &str, taken: &mut Vec<String>) -> String {
    let mut name = file_name.to_string();
    if taken.contains(&name) {
        let stem = file_name.trim_end_matches(".pdf");
        name = format!("{}_{}.pdf", stem, roll);
        let mut n = 2;
        while taken.contains(&name) {
            name = format!("{}_{}_{}.pdf", stem, roll, n);
            n += 1;
        }
    }
    taken.push(name.clone());
    name
}

/// Renders every member of the (class, section) cohort, in rank order, into
/// one zip bundle with a manifest.
#[allow(clippy::too_many_arguments)]
pub fn export_cohort_bundle(
    backend: Option<&dyn DocumentBackend>,
    class: &str,
    section: &str,
    records: &[StudentRecord],
    branding: &Branding,
    assets: &ExportAssets,
    page_size: PageSize,
    out_path: &Path,
) -> Result<BundleSummary> {
    super::ensure_capable(backend)?;

    let standings = ranking::cohort_standings(class, section, records);
    if standings.is_empty() {
        return Err(MarksheetError::NotFound);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::with_capacity(standings.len());
    let mut taken: Vec<String> = Vec::new();

    for standing in &standings {
        let Some(record) = records.iter().find(|r| {
            ranking::in_cohort(r, class, section)
                && r.same_entrant(&standing.entry.name, &standing.entry.roll)
        }) else {
            continue;
        };
        let view = build_marksheet(record, records);
        let doc = render_document(backend, &view, branding, assets, page_size)?;
        let file = unique_entry_name(&doc.file_name, &record.roll, &mut taken);
        let entry_name = format!("{}/{}", MARKSHEET_DIR, file);

        zip.start_file(entry_name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", entry_name))
            .map_err(MarksheetError::Export)?;
        zip.write_all(&doc.bytes)
            .with_context(|| format!("failed to write entry {}", entry_name))
            .map_err(MarksheetError::Export)?;

        entries.push(json!({
            "file": entry_name,
            "name": record.name,
            "roll": record.roll,
            "position": standing.rank,
            "pages": doc.page_count,
            "sha256": sha256_hex(&doc.bytes),
        }));
    }

    let entry_count = entries.len();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "class": class,
        "section": section,
        "entries": entries,
    });

    let finish = (|| -> anyhow::Result<Vec<u8>> {
        zip.start_file(MANIFEST_ENTRY, opts)
            .context("failed to start manifest entry")?;
        zip.write_all(
            serde_json::to_string_pretty(&manifest)
                .context("failed to serialize manifest")?
                .as_bytes(),
        )
        .context("failed to write manifest entry")?;
        Ok(zip.finish().context("failed to finalize zip bundle")?.into_inner())
    })();
    let bytes = finish.map_err(MarksheetError::Export)?;
    write_atomic(out_path, &bytes).map_err(MarksheetError::Export)?;

    info!(
        path = %out_path.to_string_lossy(),
        class,
        section,
        entries = entry_count,
        "cohort bundle exported"
    );
    Ok(BundleSummary {
        path: out_path.to_path_buf(),
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count,
    })
}
