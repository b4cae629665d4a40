use crate::{
    error::AppError,
    models::{ResultSet, Snapshot},
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const RESULTS_TABLE_FILE: &str = "scan_results.txt";
pub const RESULTS_JSON_FILE: &str = "rpc_endpoints.json";

/// Flat text table, one endpoint per line, fastest first
pub fn render_table(results: &ResultSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# RPC scan - {} endpoints", results.len());
    let _ = writeln!(out, "#{}", "=".repeat(70));
    let _ = writeln!(out);

    for rpc in results.iter() {
        let _ = writeln!(
            out,
            "{:4}ms | {:<40} | Peers: {}",
            rpc.latency, rpc.url, rpc.peers
        );
    }

    out
}

/// JSON array of `{url, latency, peers}`
pub fn render_json(results: &ResultSet) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Write the table and the JSON array into `dir`, creating it if needed.
/// Both files are written even for an empty result set.
pub async fn write_artifacts(dir: &Path, results: &ResultSet) -> Result<Vec<PathBuf>, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let table_path = dir.join(RESULTS_TABLE_FILE);
    let json_path = dir.join(RESULTS_JSON_FILE);

    write_replacing(&table_path, render_table(results).as_bytes()).await?;
    write_replacing(&json_path, render_json(results)?.as_bytes()).await?;

    tracing::info!(
        "Saved {} endpoints to {} and {}",
        results.len(),
        table_path.display(),
        json_path.display()
    );

    Ok(vec![table_path, json_path])
}

/// Write the snapshot to every target so a web server can serve it.
///
/// Missing parent directories are created world-readable and the files are
/// left at mode 0644. A failing target does not stop the others; the
/// returned list holds one error per target that could not be written.
pub async fn publish_snapshot(snapshot: &Snapshot, targets: &[PathBuf]) -> Vec<AppError> {
    if targets.is_empty() {
        return Vec::new();
    }

    let body = match serde_json::to_string_pretty(snapshot) {
        Ok(body) => body,
        Err(e) => return vec![e.into()],
    };

    let mut failures = Vec::new();
    for target in targets {
        match publish_to(target, body.as_bytes()).await {
            Ok(()) => tracing::info!(
                "Published {} RPCs for {} to {}",
                snapshot.total_rpcs,
                snapshot.network,
                target.display()
            ),
            Err(e) => {
                tracing::error!("Failed to publish to {}: {}", target.display(), e);
                failures.push(e);
            }
        }
    }

    failures
}

async fn publish_to(target: &Path, body: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !tokio::fs::try_exists(parent).await? {
            tokio::fs::create_dir_all(parent).await?;
            set_mode(parent, 0o755).await?;
        }
    }

    write_replacing(target, body).await?;
    set_mode(target, 0o644).await
}

/// Log the fastest endpoints of a run
pub fn log_top(results: &ResultSet, count: usize) {
    if results.is_empty() {
        tracing::info!("No matching RPC endpoints found");
        return;
    }

    tracing::info!("Top {}:", count.min(results.len()));
    for (i, rpc) in results.iter().take(count).enumerate() {
        tracing::info!(
            "{:2}. {:4}ms | {} | Peers: {}",
            i + 1,
            rpc.latency,
            rpc.url,
            rpc.peers
        );
    }
}

/// Readers never see a half-written file: write beside it, then rename
async fn write_replacing(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), AppError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), AppError> {
    Ok(())
}
