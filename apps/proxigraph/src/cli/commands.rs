//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command starts from the configured snapshot (if any), so `replay`
//! adds to the saved graph and `status`/`export` describe it.

use crate::api::{self, AppState, BatchReportJson, GraphResponse};
use crate::config::AppConfig;
use proxigraph_core::{BatchReport, GraphError, Session};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum event file size for replay (100 MB).
const MAX_REPLAY_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GraphError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GraphError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        GraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(GraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Open the configured storage and build a session restored from it.
fn load_session(config: &AppConfig) -> Result<(Session, crate::config::Storage), GraphError> {
    let storage = config.open_storage()?;
    let session = config.build_session(&storage)?;
    Ok((session, storage))
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(config: &AppConfig) -> Result<(), GraphError> {
    let (session, storage) = load_session(config)?;

    println!("Proxigraph Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:    {}", config.bind_addr());
    println!("  Capacity:   {}", config.capacity);
    println!("  Batch size: {}", config.batch_size);
    match &config.snapshot_path {
        Some(path) => println!(
            "  Snapshot:   {} ({:?})",
            path.display(),
            config.snapshot_backend
        ),
        None => println!("  Snapshot:   disabled"),
    }
    println!();
    println!("Endpoints:");
    println!("  POST /events            - Submit event records");
    println!("  POST /flush             - Apply buffered records");
    println!("  GET  /graph             - Nodes and edges");
    println!("  GET  /metrics           - Connection statistics");
    println!("  GET  /metrics/history   - Recorded samples");
    println!("  GET  /anomalies         - Highly connected nodes");
    println!("  GET  /clusters          - Nodes by bucket");
    println!("  POST /snapshot/save     - Save the graph");
    println!("  POST /snapshot/restore  - Restore the graph");
    println!("  GET  /health            - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut state = AppState::new(session).with_anomaly_threshold(config.anomaly_threshold);
    if let Some(store) = storage.store {
        state = state.with_store(store);
    }
    api::run_server(config, state).await
}

// =============================================================================
// REPLAY COMMAND
// =============================================================================

/// Feed a JSON-lines file through a session.
pub fn cmd_replay(
    config: &AppConfig,
    json_mode: bool,
    file: &Path,
    save: bool,
) -> Result<(), GraphError> {
    tracing::info!("Replaying events from {:?}", file);

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_REPLAY_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| GraphError::IoError(format!("Read file: {}", e)))?;

    let (mut session, storage) = load_session(config)?;
    let report = replay_lines(&mut session, &contents)?;
    let metrics = session.record_metrics()?;

    if save {
        let store = storage.store.ok_or_else(|| {
            GraphError::Sink("--save requires a snapshot path (-S or snapshot_path)".to_string())
        })?;
        store.save(&session.snapshot())?;
    }

    let report = BatchReportJson::from(report);
    if json_mode {
        let output = serde_json::json!({
            "report": report,
            "metrics": metrics,
            "saved": save,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Replay complete");
    println!("===============");
    println!("Applied:     {}", report.applied);
    println!("Failed:      {}", report.failures.len());
    println!("Nodes added: {}", report.created.len());
    println!("Edges added: {}", report.edges_added);
    for failure in &report.failures {
        println!("  line {}: {}", failure.index + 1, failure.error);
    }
    println!();
    println!("Nodes:           {}", metrics.total_nodes);
    println!("Edges:           {}", metrics.total_edges);
    println!("Max connections: {}", metrics.max_connections);
    println!("Avg connections: {:.2}", metrics.avg_connections);
    if save {
        println!("Snapshot saved");
    }

    Ok(())
}

/// Submit every non-blank line, then flush the remainder.
///
/// Failure indices in the returned report are zero-based line numbers of
/// `contents`, blank lines included.
pub fn replay_lines(session: &mut Session, contents: &[u8]) -> Result<BatchReport, GraphError> {
    let mut total = BatchReport::default();
    // Line number of every submitted record, in submission order.
    let mut submitted = Vec::new();

    for (line_no, line) in contents.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        submitted.push(line_no);
        if let Some(report) = session.submit_line(line)? {
            total.merge(report);
        }
    }
    total.merge(session.flush()?);

    for failure in &mut total.failures {
        if let Some(&line_no) = submitted.get(failure.index) {
            failure.index = line_no;
        }
    }
    Ok(total)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show metrics, anomalies and clusters of the saved graph.
pub fn cmd_status(
    config: &AppConfig,
    json_mode: bool,
    threshold: Option<usize>,
) -> Result<(), GraphError> {
    let (session, _) = load_session(config)?;
    let graph = session.graph();
    let metrics = graph.metrics();
    let threshold = threshold.unwrap_or(config.anomaly_threshold);
    let anomalies: Vec<String> = graph
        .anomalies(threshold)
        .iter()
        .map(|n| n.id.to_string())
        .collect();
    let clusters: Vec<(u64, Vec<String>)> = graph
        .cluster_nodes()
        .into_iter()
        .map(|(bucket, nodes)| (bucket, nodes.iter().map(|n| n.id.to_string()).collect()))
        .collect();

    if json_mode {
        let output = serde_json::json!({
            "snapshot": config.snapshot_path.as_ref().map(|p| p.to_string_lossy()),
            "capacity": graph.capacity(),
            "metrics": metrics,
            "anomaly_threshold": threshold,
            "anomalies": anomalies,
            "clusters": clusters
                .iter()
                .map(|(bucket, nodes)| serde_json::json!({"bucket": bucket, "nodes": nodes}))
                .collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Proxigraph Status");
    println!("=================");
    match &config.snapshot_path {
        Some(path) => println!("Snapshot: {}", path.display()),
        None => println!("Snapshot: none (empty graph)"),
    }
    println!();
    println!("Capacity:        {}", graph.capacity());
    println!("Nodes:           {}", metrics.total_nodes);
    println!("Edges:           {}", metrics.total_edges);
    println!("Max connections: {}", metrics.max_connections);
    println!("Avg connections: {:.2}", metrics.avg_connections);
    println!();
    println!("Anomalies (> {} connections): {}", threshold, anomalies.len());
    for id in &anomalies {
        println!("  {}", id);
    }
    println!();
    println!("Clusters:");
    for (bucket, nodes) in &clusters {
        println!("  {}: {}", bucket, nodes.join(", "));
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the saved graph as JSON.
pub fn cmd_export(config: &AppConfig, output: &Path) -> Result<(), GraphError> {
    tracing::info!("Exporting to {:?}", output);

    let (session, _) = load_session(config)?;
    let graph = GraphResponse::from(session.graph());
    let json = serde_json::to_string_pretty(&graph)
        .map_err(|e| GraphError::SerializationError(e.to_string()))?;

    std::fs::write(output, json)
        .map_err(|e| GraphError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} nodes and {} edges to {:?}",
        graph.nodes.len(),
        graph.edges.len(),
        output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxigraph_core::SessionConfig;

    fn session() -> Session {
        Session::with_config(SessionConfig {
            capacity: 10,
            batch_size: 3,
            history_limit: None,
            seed: Some(21),
        })
        .expect("session")
    }

    #[test]
    fn replay_applies_every_line() {
        let mut s = session();
        let contents = b"{\"event\":\"add_node\"}\n\n{\"event\":\"add_node\"}\r\n{\"event\":\"bogus\"}\n{\"event\":\"add_node\"}";

        let report = replay_lines(&mut s, contents).expect("replay");

        assert_eq!(report.applied, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 3);
        assert_eq!(s.graph().node_count(), 3);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn replay_failures_name_file_lines() {
        let mut s = session();
        let contents = b"\n\n{\"event\":\"add_node\"}\n\n{\"event\":\"transition\",\"source\":\"X\",\"target\":\"Y\"}\n\n\nnot json\n";

        let report = replay_lines(&mut s, contents).expect("replay");

        let lines: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
        assert_eq!(lines, vec![4, 7]);
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn export_writes_graph_json() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            snapshot_path: Some(temp.path().join("graph.pxg")),
            seed: Some(4),
            ..AppConfig::default()
        };

        let (mut s, storage) = load_session(&config).expect("session");
        replay_lines(&mut s, b"{\"event\":\"add_node\"}\n{\"event\":\"add_node\"}").expect("replay");
        storage.store.as_ref().expect("store").save(&s.snapshot()).expect("save");

        let output = temp.path().join("graph.json");
        cmd_export(&config, &output).expect("export");

        let written: GraphResponse =
            serde_json::from_slice(&std::fs::read(&output).expect("read")).expect("parse");
        assert_eq!(written.nodes.len(), 2);
    }

    #[test]
    fn replay_rejects_missing_file() {
        let config = AppConfig::default();
        assert!(cmd_replay(&config, false, Path::new("/nonexistent/events.jsonl"), false).is_err());
    }
}
