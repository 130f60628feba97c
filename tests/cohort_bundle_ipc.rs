mod test_support;

use serde_json::json;
use std::io::Read;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn cohort_export_bundles_every_member() {
    let out = temp_dir("marksheet-cohort");
    let path = out.join("class-10-A.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "marksheet.exportCohort",
        json!({ "class": "10", "section": "A", "outPath": path.to_string_lossy() }),
    );
    assert_eq!(result["format"], "marksheet-cohort-v1");
    assert_eq!(result["entryCount"], 3);

    let f = std::fs::File::open(&path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("zip");
    let mut text = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest")
        .read_to_string(&mut text)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&text).expect("manifest json");
    assert_eq!(manifest["class"], "10");
    assert_eq!(manifest["section"], "A");
    let files: Vec<&str> = manifest["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["file"].as_str().expect("file"))
        .collect();
    assert_eq!(
        files,
        vec![
            "marksheets/Marksheet_John_Doe.pdf",
            "marksheets/Marksheet_Jane_Smith.pdf",
            "marksheets/Marksheet_Rahim_Khan.pdf",
        ]
    );

    // Bundling needs no prior search.
    let (code, _) = request_err(&mut stdin, &mut reader, "2", "marksheet.current", json!({}));
    assert_eq!(code, "no_selection");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "marksheet.exportCohort",
        json!({ "class": "11", "section": "A", "outPath": out.join("none.zip").to_string_lossy() }),
    );
    assert_eq!(code, "not_found");
    assert!(!out.join("none.zip").exists());

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "marksheet.exportCohort",
        json!({ "class": "10", "section": "A" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(out);
}
