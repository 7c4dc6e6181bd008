//! End-to-end tests running the lanewright binary

use std::process::{Command, Output};

const CLAIM: &str = r#"{
    "name": "Claim",
    "actors": ["Clerk", "Manager"],
    "elements": [
        {"id": "s", "type": "start_event", "label": "Start", "actor": "Clerk"},
        {"id": "t", "type": "task", "label": "File", "actor": "Clerk"},
        {"id": "g", "type": "gateway", "label": "Complete?", "actor": "Clerk"},
        {"id": "a", "type": "task", "subtype": "user", "label": "Approve", "actor": "Manager"},
        {"id": "e", "type": "end_event", "label": "End", "actor": "Manager"}
    ],
    "flows": [
        {"source": "s", "target": "t"},
        {"source": "t", "target": "g"},
        {"source": "g", "target": "a", "condition": "yes"},
        {"source": "g", "target": "t", "condition": "no"},
        {"source": "a", "target": "e"}
    ]
}"#;

fn run_cli(args: &[&str], input: &str) -> Result<Output, Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let input_path = temp_dir.path().join("process.json");
    std::fs::write(&input_path, input)?;

    let input_arg = input_path.to_string_lossy().to_string();
    let mut cmd_args: Vec<&str> = args.to_vec();
    cmd_args.push("--input");
    cmd_args.push(&input_arg);

    let output = Command::new(env!("CARGO_BIN_EXE_lanewright"))
        .args(&cmd_args)
        .current_dir(temp_dir.path())
        .env_remove("LANEWRIGHT_LOG_LEVEL")
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

#[test]
fn test_layout_json() {
    let output = run_cli(&["layout"], CLAIM).unwrap();
    assert!(output.status.success());

    let diagram: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(diagram["name"], "Claim");
    assert_eq!(diagram["lanes"].as_array().unwrap().len(), 2);
    let connectors = diagram["connectors"].as_array().unwrap();
    assert_eq!(connectors.len(), 5);
    let reversed: Vec<_> = connectors.iter().filter(|c| c["reverse"] == true).collect();
    assert_eq!(reversed.len(), 1);
    assert_eq!(reversed[0]["source_id"], "g");
    assert_eq!(reversed[0]["style"], "dashed");
}

#[test]
fn test_layout_summary() {
    let output = run_cli(&["layout", "--format", "summary"], CLAIM).unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Process: Claim"));
    assert!(stdout.contains("1 Clerk: s, t, g"));
    assert!(stdout.contains("Connectors: 5 (1 reversed)"));
}

#[test]
fn test_lanes_text() {
    let output = run_cli(&["lanes"], CLAIM).unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["1. Clerk: s, t, g", "2. Manager: a, e"]);
}

#[test]
fn test_validate_valid() {
    let output = run_cli(&["validate"], CLAIM).unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("✓ Valid process 'Claim'"));
}

#[test]
fn test_validate_reports_errors() {
    let broken = CLAIM.replace(
        r#"{"source": "a", "target": "e"}"#,
        r#"{"source": "s", "target": "e"}"#,
    );
    let output = run_cli(&["validate"], &broken).unwrap();
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: "));
    assert!(stdout.contains("✗ Invalid process 'Claim'"));
}

#[test]
fn test_plan_call_log() {
    let output = run_cli(&["plan"], CLAIM).unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let calls = plan["canvas_calls"].as_array().unwrap();
    // board, 2 lanes, 5 elements, 5 connectors
    assert_eq!(calls.len(), 13);
    let first_connector = calls
        .iter()
        .position(|c| c["call"] == "create_connector")
        .unwrap();
    assert!(calls[..first_connector]
        .iter()
        .all(|c| c["call"] != "create_connector"));
    assert!(calls[first_connector..]
        .iter()
        .all(|c| c["call"] == "create_connector"));
}

#[test]
fn test_invalid_json_fails() {
    let output = run_cli(&["layout"], "{ not json").unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid process document"));
}

#[test]
fn test_config_uses_local_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join("lanewright.toml"),
        "[layout]\nlane_height = 320.0\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_lanewright"))
        .arg("config")
        .current_dir(temp_dir.path())
        .env_remove("LANEWRIGHT_CANVAS_TOKEN")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lane_height = 320.0"));
    assert!(!stdout.contains("token"));
}

const HIERARCHY: &str = r#"{
    "value_chain": {
        "id": "vc",
        "name": "Acme",
        "organization": "Acme Ltd",
        "primary_macroprocesses": ["sell", "ship"],
        "support_macroprocesses": ["hr"]
    },
    "macroprocesses": {
        "sell": {"id": "sell", "name": "Sell", "type": "primario",
            "sipoc": {
                "suppliers": [{"name": "Marketing", "type": "interno"}],
                "inputs": [{"name": "Lead"}],
                "process_steps": ["Qualify", "Propose"],
                "outputs": [{"name": "Contract"}],
                "customers": [{"name": "Client", "type": "externo"}]
            }},
        "ship": {"id": "ship", "name": "Ship", "type": "primary"},
        "hr": {"id": "hr", "name": "People", "type": "apoio"}
    }
}"#;

#[test]
fn test_value_chain_board() {
    let output = run_cli(&["value-chain"], HIERARCHY).unwrap();
    assert!(output.status.success());

    let board: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(board["kind"], "value_chain");
    assert_eq!(board["metadata"]["organization"], "Acme Ltd");
    let connectors = board["connectors"].as_array().unwrap();
    assert_eq!(connectors.len(), 1);
    assert_eq!(connectors[0]["source_id"], "sell");
    assert_eq!(connectors[0]["target_id"], "ship");
}

#[test]
fn test_sipoc_plan() {
    let output = run_cli(&["sipoc", "--macroprocess", "sell", "--plan"], HIERARCHY).unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["board"], "SIPOC - Sell");
    let calls = plan["canvas_calls"].as_array().unwrap();
    // board, title, 5 headers, 6 cells, 4 header arrows
    assert_eq!(calls.len(), 17);
}

#[test]
fn test_sipoc_unknown_macroprocess_fails() {
    let output = run_cli(&["sipoc", "--macroprocess", "nope"], HIERARCHY).unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));
}
