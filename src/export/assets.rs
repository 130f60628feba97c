//! Logo and background images for the exported document.
//!
//! Resolution never fails the export: anything that cannot be read or
//! decoded is logged and left out.

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use printpdf::image_crate::{self, DynamicImage};
use std::path::Path;
use tracing::debug;

#[derive(Default)]
pub struct ExportAssets {
    pub logo: Option<DynamicImage>,
    pub background: Option<DynamicImage>,
}

fn read_reference(reference: &str, base_dir: &Path) -> anyhow::Result<Vec<u8>> {
    let reference = reference.trim();
    if let Some(rest) = reference.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("data URL has no payload"))?;
        if !meta.ends_with(";base64") {
            return Err(anyhow!("only base64 data URLs are supported"));
        }
        return STANDARD
            .decode(payload.trim())
            .context("data URL payload is not valid base64");
    }
    if reference.contains("://") && !reference.starts_with("file://") {
        return Err(anyhow!("unsupported asset scheme: {}", reference));
    }
    let raw = reference.strip_prefix("file://").unwrap_or(reference);
    let path = Path::new(raw);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    std::fs::read(&path).with_context(|| format!("failed to read {}", path.to_string_lossy()))
}

/// Decodes one asset reference into a raster image, or nothing.
pub fn resolve_image(reference: Option<&str>, base_dir: &Path) -> Option<DynamicImage> {
    let reference = reference.filter(|r| !r.trim().is_empty())?;
    let decoded = read_reference(reference, base_dir).and_then(|bytes| {
        image_crate::load_from_memory(&bytes).context("asset is not a decodable image")
    });
    match decoded {
        Ok(img) => Some(img),
        Err(e) => {
            debug!(asset = %short(reference), error = %format!("{e:#}"), "asset omitted");
            None
        }
    }
}

// data: URLs can be megabytes long; keep log lines readable.
fn short(reference: &str) -> String {
    if reference.len() > 64 {
        let cut = (0..=64).rev().find(|i| reference.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &reference[..cut])
    } else {
        reference.to_string()
    }
}

pub fn resolve_assets(logo: Option<&str>, background: Option<&str>, base_dir: &Path) -> ExportAssets {
    ExportAssets {
        logo: resolve_image(logo, base_dir),
        background: resolve_image(background, base_dir),
    }
}
