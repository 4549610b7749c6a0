#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;
    use std::path::PathBuf;
    use std::process::Stdio;
    use std::sync::OnceLock;
    use std::time::Duration;
    use std::time::SystemTime;

    use anyhow::{Context, Result, bail};
    use client_sdk::{StoreApiError, StoreClient};
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use tokio::process::{Child, Command};
    use tokio::time::sleep;

    #[tokio::test]
    async fn sdk_lifecycle_against_live_store() -> Result<()> {
        let bind = "127.0.0.1:21080";
        let mut store = start_store(bind).await?;
        let client = StoreClient::new(format!("http://{bind}"));

        let result = async {
            client.set("alpha", "1", None).await?;

            let record = client.get("alpha").await?;
            assert_eq!(record["key"], "alpha");
            assert_eq!(record["value"], "1");
            assert!(record["ttl_remaining"].is_null());

            client.delete("alpha").await?;
            let missing = client.get("alpha").await;
            assert!(matches!(missing, Err(StoreApiError::NotFound { .. })));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn deleting_an_absent_key_always_fails_the_same_way() -> Result<()> {
        let bind = "127.0.0.1:21081";
        let mut store = start_store(bind).await?;
        let client = StoreClient::new(format!("http://{bind}"));

        let result = async {
            let first = client.delete("ghost").await.unwrap_err();
            let second = client.delete("ghost").await.unwrap_err();

            assert!(first.is_not_found());
            assert_eq!(first.to_string(), second.to_string());
            assert_eq!(first.detail(), Some("Key not found"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn key_listing_tracks_mutations() -> Result<()> {
        let bind = "127.0.0.1:21082";
        let mut store = start_store(bind).await?;
        let client = StoreClient::new(format!("http://{bind}"));

        let result = async {
            for key in ["a", "b", "c"] {
                client.set(key, "1", None).await?;
            }

            let listing = client.list_keys().await?;
            assert_eq!(listing.count, 3);
            assert_eq!(listing.keys.len(), 3);
            assert!(listing.keys.contains(&"b".to_string()));

            client.delete("b").await?;
            let listing = client.list_keys().await?;
            assert_eq!(listing.count, 2);
            assert!(!listing.keys.contains(&"b".to_string()));

            let message = client.clear_all().await?;
            assert_eq!(message, "All keys cleared");
            let listing = client.list_keys().await?;
            assert_eq!(listing.count, 0);
            assert!(listing.keys.is_empty());

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn absent_ttl_is_not_zero_ttl() -> Result<()> {
        let bind = "127.0.0.1:21083";
        let mut store = start_store(bind).await?;
        let client = StoreClient::new(format!("http://{bind}"));

        let result = async {
            // No TTL: the key must survive and report a null remainder.
            client.set("pinned", "v", None).await?;
            let record = client.get("pinned").await?;
            assert!(record["ttl_remaining"].is_null());

            // A real TTL counts down from its value.
            client.set("fleeting", "v", Some(120)).await?;
            let record = client.get("fleeting").await?;
            let remaining = record["ttl_remaining"]
                .as_u64()
                .context("ttl_remaining missing")?;
            assert!((1..=120).contains(&remaining));

            // TTL zero means already expired, not "no TTL".
            client.set("flash", "v", Some(0)).await?;
            let gone = client.get("flash").await;
            assert!(matches!(gone, Err(StoreApiError::NotFound { .. })));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn restart_recovers_state_from_wal() -> Result<()> {
        let data_dir = fresh_data_dir("wal-restart");
        let first_bind = "127.0.0.1:21084";
        let mut store = start_store_with_data_dir(first_bind, &data_dir).await?;
        let client = StoreClient::new(format!("http://{first_bind}"));

        let seed = async {
            client.set("kept", "survives", None).await?;
            client.set("dropped", "temporary", None).await?;
            client.delete("dropped").await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;
        stop_server(&mut store).await;
        seed?;

        let second_bind = "127.0.0.1:21089";
        let mut store = start_store_with_data_dir(second_bind, &data_dir).await?;
        let client = StoreClient::new(format!("http://{second_bind}"));

        let result = async {
            let record = client.get("kept").await?;
            assert_eq!(record["value"], "survives");

            let gone = client.get("dropped").await;
            assert!(matches!(gone, Err(StoreApiError::NotFound { .. })));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        let _ = fs::remove_dir_all(&data_dir);
        result
    }

    #[tokio::test]
    async fn compaction_shrinks_wal_and_preserves_state() -> Result<()> {
        let bind = "127.0.0.1:21085";
        let mut store = start_store(bind).await?;
        let client = StoreClient::new(format!("http://{bind}"));

        let result = async {
            client.set("churn", "v1", None).await?;
            client.set("churn", "v2", None).await?;
            client.set("gone", "x", None).await?;
            client.delete("gone").await?;

            let before = client.stats().await?["wal_file_size"]
                .as_u64()
                .context("wal_file_size missing")?;

            let message = client.compact().await?;
            assert_eq!(message.as_deref(), Some("WAL compacted successfully"));

            let after = client.stats().await?["wal_file_size"]
                .as_u64()
                .context("wal_file_size missing")?;
            assert!(after < before, "wal did not shrink: {before} -> {after}");

            let record = client.get("churn").await?;
            assert_eq!(record["value"], "v2");

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn cli_set_get_delete_flow() -> Result<()> {
        let bind = "127.0.0.1:21086";
        let base_url = format!("http://{bind}");
        let mut store = start_store(bind).await?;

        let result = async {
            run_cli(&["--server-url", &base_url, "set", "cli-key", "hello-from-cli"]).await?;

            let output = run_cli(&["--server-url", &base_url, "get", "cli-key"]).await?;
            assert!(output.contains("hello-from-cli"));

            let output = run_cli(&["--server-url", &base_url, "keys"]).await?;
            assert!(output.contains("cli-key"));
            assert!(output.contains("1 keys"));

            let output = run_cli(&["--server-url", &base_url, "delete", "cli-key"]).await?;
            assert!(output.contains("deleted 'cli-key'"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn cli_stats_and_clear() -> Result<()> {
        let bind = "127.0.0.1:21087";
        let base_url = format!("http://{bind}");
        let mut store = start_store(bind).await?;

        let result = async {
            run_cli(&["--server-url", &base_url, "set", "x", "1"]).await?;

            let output = run_cli(&["--server-url", &base_url, "stats"]).await?;
            assert!(output.contains("total_keys"));
            assert!(output.contains("wal_file_size"));

            let output = run_cli(&["--server-url", &base_url, "clear"]).await?;
            assert!(output.contains("All keys cleared"));

            let output = run_cli(&["--server-url", &base_url, "keys"]).await?;
            assert!(output.contains("0 keys"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn panel_serves_page_and_ping() -> Result<()> {
        let bind = "127.0.0.1:21088";
        // The panel comes up even when no store is reachable.
        let mut panel = start_panel(bind, "http://127.0.0.1:9").await?;

        let result = async {
            let body = reqwest::get(format!("http://{bind}/api/ping"))
                .await
                .context("failed to call panel ping endpoint")?
                .error_for_status()
                .context("panel ping endpoint returned non-success status")?
                .text()
                .await?;
            assert!(body.contains("\"ok\":true"));
            assert!(body.contains("kvdeck-panel"));

            let page = reqwest::get(format!("http://{bind}/"))
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(page.contains("kvdeck Control Panel"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut panel).await;
        result
    }

    #[tokio::test]
    async fn panel_api_drives_the_store() -> Result<()> {
        let store_bind = "127.0.0.1:21090";
        let panel_bind = "127.0.0.1:21091";
        let mut store = start_store(store_bind).await?;
        let mut panel = start_panel(panel_bind, &format!("http://{store_bind}")).await?;
        let http = reqwest::Client::new();
        let base_url = format!("http://{panel_bind}");

        let result = async {
            let state: Value = http
                .get(format!("{base_url}/api/state"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            assert_eq!(state["status"]["text"], "");
            assert_eq!(state["lookup"]["kind"], "empty");

            let state = post_op(&http, &base_url, "set", json!({ "key": "alpha", "value": "1", "ttl": "" })).await?;
            assert_eq!(state["status"]["ok"], true);
            assert_eq!(state["status"]["text"], "1 keys loaded");
            assert_eq!(state["keys"]["count"], 1);
            assert_eq!(state["keys"]["entries"][0]["key"], "alpha");

            let state = post_op(&http, &base_url, "lookup", json!({ "key": "alpha" })).await?;
            assert_eq!(state["lookup"]["kind"], "record");
            assert_eq!(state["lookup"]["record"]["value"], "1");
            assert!(state["lookup"]["record"]["ttl_remaining"].is_null());
            assert_eq!(state["status"]["text"], "Loaded \"alpha\"");

            let state = post_op(&http, &base_url, "delete", json!({ "key": "alpha" })).await?;
            assert_eq!(state["status"]["text"], "0 keys loaded");
            assert_eq!(state["keys"]["count"], 0);

            let state = post_op(&http, &base_url, "lookup", json!({ "key": "alpha" })).await?;
            assert_eq!(state["lookup"]["kind"], "not_found");
            assert_eq!(state["status"]["text"], "Key not found");
            assert_eq!(state["status"]["ok"], false);

            let state = post_op(&http, &base_url, "compact", json!({})).await?;
            assert_eq!(state["pending_ack"], "WAL compacted successfully");
            assert!(state["stats"]["snapshot"].is_object());
            assert_eq!(state["status"]["text"], "Stats updated");

            let state = post_op(&http, &base_url, "ack", json!({})).await?;
            assert!(state["pending_ack"].is_null());

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut panel).await;
        stop_server(&mut store).await;
        result
    }

    #[tokio::test]
    async fn panel_clear_resets_lookup_pane() -> Result<()> {
        let store_bind = "127.0.0.1:21092";
        let panel_bind = "127.0.0.1:21093";
        let mut store = start_store(store_bind).await?;
        let mut panel = start_panel(panel_bind, &format!("http://{store_bind}")).await?;
        let http = reqwest::Client::new();
        let base_url = format!("http://{panel_bind}");

        let result = async {
            post_op(&http, &base_url, "set", json!({ "key": "a", "value": "1", "ttl": "" })).await?;
            post_op(&http, &base_url, "set", json!({ "key": "b", "value": "2", "ttl": "" })).await?;

            let state = post_op(&http, &base_url, "lookup", json!({ "key": "a" })).await?;
            assert_eq!(state["lookup"]["kind"], "record");

            let state = post_op(&http, &base_url, "clear", json!({})).await?;
            assert_eq!(state["lookup"]["kind"], "empty");
            assert_eq!(state["keys"]["count"], 0);
            assert_eq!(state["status"]["text"], "0 keys loaded");

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut panel).await;
        stop_server(&mut store).await;
        result
    }

    async fn post_op(
        http: &reqwest::Client,
        base_url: &str,
        name: &str,
        body: Value,
    ) -> Result<Value> {
        let state = http
            .post(format!("{base_url}/api/op/{name}"))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to post panel op {name}"))?
            .error_for_status()
            .with_context(|| format!("panel op {name} returned non-success status"))?
            .json()
            .await?;
        Ok(state)
    }

    async fn start_store(bind: &str) -> Result<Child> {
        let data_dir = fresh_data_dir("default-store");
        start_store_with_data_dir(bind, &data_dir).await
    }

    async fn start_store_with_data_dir(bind: &str, data_dir: &Path) -> Result<Child> {
        let store_bin = binary_path("store-node")?;

        let child = Command::new(store_bin)
            .env("KVDECK_STORE_BIND", bind)
            .env("KVDECK_DATA_DIR", data_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn store-node")?;

        wait_for_url_status(&format!("http://{bind}/stats"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn start_panel(bind: &str, server_url: &str) -> Result<Child> {
        let cli_bin = binary_path("panel-cli")?;

        let child = Command::new(cli_bin)
            .arg("--server-url")
            .arg(server_url)
            .arg("serve-panel")
            .arg("--bind")
            .arg(bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn panel-cli serve-panel")?;

        wait_for_url_status(&format!("http://{bind}/api/ping"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn run_cli(args: &[&str]) -> Result<String> {
        let cli_bin = binary_path("panel-cli")?;
        let output = Command::new(cli_bin)
            .args(args)
            .output()
            .await
            .context("failed to execute panel-cli")?;

        if !output.status.success() {
            bail!(
                "panel-cli failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn wait_for_url_status(url: &str, expected: StatusCode, retries: usize) -> Result<()> {
        let http = reqwest::Client::new();

        for _ in 0..retries {
            if let Ok(resp) = http.get(url).send().await
                && resp.status() == expected
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }

        bail!("service did not return {expected} at {url}");
    }

    async fn stop_server(child: &mut Child) {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn build_required_binaries(workspace_root: &PathBuf) -> Result<()> {
        let status = std::process::Command::new("cargo")
            .arg("build")
            .arg("-p")
            .arg("store-node")
            .arg("-p")
            .arg("panel-cli")
            .current_dir(workspace_root)
            .status()
            .context("failed to run cargo build for system test binaries")?;

        if !status.success() {
            bail!("cargo build for system test binaries failed");
        }

        Ok(())
    }

    fn ensure_binaries_built(workspace_root: &PathBuf) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            build_required_binaries(workspace_root).map_err(|err| err.to_string())
        });

        if let Err(message) = result {
            bail!("failed to build required binaries: {message}");
        }

        Ok(())
    }

    fn fresh_data_dir(name: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("kvdeck-{name}-{unique}"));
        let _ = fs::remove_dir_all(&path);
        let _ = fs::create_dir_all(&path);
        path
    }
}
