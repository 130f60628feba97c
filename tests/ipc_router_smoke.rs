mod test_support;

use serde_json::json;
use test_support::{request, send_line, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("marksheet-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let calls = [
        ("1", "health", json!({})),
        ("2", "records.list", json!({})),
        ("3", "records.search", json!({ "name": "john" })),
        ("4", "marksheet.current", json!({})),
        ("5", "marksheet.standings", json!({ "class": "10", "section": "A" })),
        (
            "6",
            "marksheet.export",
            json!({ "outDir": workspace.to_string_lossy() }),
        ),
        (
            "7",
            "marksheet.exportCohort",
            json!({
                "class": "10",
                "section": "A",
                "outPath": workspace.join("10A.zip").to_string_lossy(),
            }),
        ),
    ];
    for (id, method, params) in calls {
        let resp = request(&mut stdin, &mut reader, id, method, params);
        let code = resp
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str());
        assert_ne!(code, Some("not_implemented"), "{} not routed", method);
        assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(true), "{}: {}", method, resp);
    }

    let unknown = request(&mut stdin, &mut reader, "8", "grades.recompute", json!({}));
    assert_eq!(unknown["error"]["code"], "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let bad = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(bad["ok"], false);
    assert_eq!(bad["error"]["code"], "bad_json");

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);
    assert_eq!(health["result"]["recordCount"], 5);
    assert_eq!(health["result"]["capabilities"]["document"], true);
    assert_eq!(health["result"]["capabilities"]["tableLayout"], true);
    assert_eq!(health["result"]["institution"]["name"], "College Name");

    drop(stdin);
    let _ = child.wait();
}
