//! Integration tests for rotation behaviour on real files.

use gauntlet_jsonl::RotatingLog;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

async fn read_records(path: &std::path::Path) -> Vec<Value> {
    let content = tokio::fs::read_to_string(path).await.unwrap();
    content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn batch_of_appends_keeps_newest_records_within_budget() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let log = RotatingLog::with_max_bytes(&path, 120);

    for index in 0..10 {
        log.append(&json!({ "index": index, "message": format!("event-{index}") }))
            .await
            .unwrap();
    }

    let records = read_records(&path).await;
    assert_eq!(records.last().unwrap()["index"], 9);
    assert!(records[0]["index"].as_u64().unwrap() > 0);

    let size = tokio::fs::metadata(&path).await.unwrap().len();
    assert!(size <= 120, "log size {size} exceeds budget");
}

#[tokio::test]
async fn every_line_parses_after_repeated_rotation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let log = RotatingLog::with_max_bytes(&path, 512);

    for index in 0..200 {
        log.append(&json!({ "index": index, "message": format!("payload-{index}") }))
            .await
            .unwrap();
    }

    let records = read_records(&path).await;
    assert!(!records.is_empty());

    // Records are monotone: the retained window is always a contiguous
    // suffix of what was appended.
    let indices: Vec<u64> = records
        .iter()
        .map(|record| record["index"].as_u64().unwrap())
        .collect();
    for pair in indices.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
    assert_eq!(*indices.last().unwrap(), 199);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_produce_intact_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let log = Arc::new(RotatingLog::with_max_bytes(&path, 2048));

    let mut handles = Vec::new();
    for task in 0..8 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            for index in 0..25 {
                log.append(&json!({ "task": task, "index": index }))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whatever survived rotation must be valid JSON, one record per line.
    let records = read_records(&path).await;
    assert!(!records.is_empty());
    for record in &records {
        assert!(record["task"].is_u64());
        assert!(record["index"].is_u64());
    }
}
