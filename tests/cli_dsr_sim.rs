use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dsrsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

const LINE_EXPERIMENT: &str = r#"
{
    "schema_version": 1,
    "topology": {
        "kind": "custom",
        "nodes": [
            { "name": "src", "kind": "host" },
            { "name": "r1" },
            { "name": "dst", "kind": "host" }
        ],
        "links": [
            { "a": 0, "b": 1, "latency_us": 1000, "bandwidth_mbps": 10 },
            { "a": 1, "b": 2, "latency_us": 1000, "bandwidth_mbps": 10 }
        ]
    },
    "flows": [
        { "src": 0, "dst": 2, "stop_ms": 20, "pkt_bytes": 52, "pkts": 4, "rate_mbps": 1.0, "budget_us": 10000, "flag": true }
    ],
    "until_ms": 50
}
"#;

#[test]
fn dsr_sim_runs_experiment_and_writes_stats_json() {
    let dir = unique_temp_dir("stats");
    let experiment = write_file(&dir, "experiment.json", LINE_EXPERIMENT);
    let stats_json = dir.join("stats.json");

    let output = Command::new(env!("CARGO_BIN_EXE_dsr_sim"))
        .args([
            "--experiment",
            experiment.to_str().unwrap(),
            "--stats-json",
            stats_json.to_str().unwrap(),
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run dsr_sim");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("delivered_pkts=4"), "stdout: {stdout}");
    assert!(stdout.contains("deadline_met=4"), "stdout: {stdout}");

    let raw = fs::read_to_string(&stats_json).expect("read stats json");
    let v: Value = serde_json::from_str(&raw).expect("parse stats json");
    assert_eq!(v["sent_pkts"], 4);
    assert_eq!(v["delivered_pkts"], 4);
    assert_eq!(v["dropped_pkts"], 0);
    assert_eq!(v["route_rebuilds"], 0);
}

#[test]
fn dsr_sim_prints_routing_tables() {
    let dir = unique_temp_dir("routes");
    let experiment = write_file(&dir, "experiment.json", LINE_EXPERIMENT);

    let output = Command::new(env!("CARGO_BIN_EXE_dsr_sim"))
        .args([
            "--experiment",
            experiment.to_str().unwrap(),
            "--print-routes",
            "--until-ms",
            "0",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run dsr_sim");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout
            .lines()
            .filter(|l| l.ends_with("Ipv4DSRRouting table"))
            .count(),
        6
    );
    assert!(stdout.contains("Node: 0, Time: +0.000000s, Ipv4DSRRouting table"));
    assert!(stdout.contains("10.1.2.2        10.1.1.2        255.255.255.255 UH    2000"));
}

#[test]
fn dsr_sim_rejects_invalid_experiment() {
    let dir = unique_temp_dir("invalid");
    let experiment = write_file(
        &dir,
        "experiment.json",
        r#"{ "schema_version": 1, "topology": { "kind": "custom", "nodes": [ { "name": "a" } ], "links": [ { "a": 0, "b": 3, "latency_us": 1, "bandwidth_mbps": 1 } ] } }"#,
    );
    let output = Command::new(env!("CARGO_BIN_EXE_dsr_sim"))
        .args(["--experiment", experiment.to_str().unwrap()])
        .env("RUST_LOG", "off")
        .output()
        .expect("run dsr_sim");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown node 3"), "stderr: {stderr}");
}

#[test]
fn dsr_sim_default_grid_runs_briefly() {
    let output = Command::new(env!("CARGO_BIN_EXE_dsr_sim"))
        .args(["--until-ms", "200", "--fast-queue-pkts", "10"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run dsr_sim");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("done @ "))
        .expect("summary line");
    assert!(!line.contains("delivered_pkts=0,"), "{line}");
}
