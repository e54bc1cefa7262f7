//! End-to-end tests for build/serve cycles over real TCP.

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use futures::FutureExt;
use futures::future::BoxFuture;
use lume_server::cms::{
    AdapterFactory, CMS_HEADER, CMS_RELOAD, Cms, CmsAdapter, ScriptModuleLoader,
};
use lume_server::reload::{HostMessage, host_channel};
use lume_server::site::{ChangeSet, FsSiteBuilder, Site};
use lume_server::worker::{BuildState, Worker, WorkerConfig, WorkerContext, WorkerMessage};
use lume_shared::{LumeError, LumeResult};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const SITE_CONFIG: &str = r#"
[server]
port = 0
hostname = "127.0.0.1"

[watcher]
debounce = 50
"#;

struct Project {
    _dir: TempDir,
    root: PathBuf,
}

fn project(with_cms: bool) -> Project {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    if with_cms {
        std::fs::write(root.join("_cms.ts"), "const cms = lumeCMS();\nexport default cms;\n")
            .unwrap();
    }
    std::fs::write(root.join("_config.toml"), SITE_CONFIG).unwrap();
    std::fs::write(root.join("index.html"), "<h1>hello</h1>").unwrap();

    Project { _dir: dir, root }
}

fn files_worker(root: &Path) -> (Worker, mpsc::Receiver<HostMessage>) {
    let config = WorkerConfig::new().with_root(root.to_path_buf());
    let (host, host_rx) = host_channel(config.host_capacity);
    (Worker::new(WorkerContext::files(config), host), host_rx)
}

/// Adapter that asks for a reload on `POST /save` and echoes the path otherwise.
struct SavingAdapter;

impl CmsAdapter for SavingAdapter {
    fn fetch(&self, request: Request) -> BoxFuture<'_, LumeResult<Response>> {
        let path = request.uri().path().to_string();
        async move {
            let mut response = Response::new(Body::from(format!("adapter:{path}")));
            if path == "/save" {
                response
                    .headers_mut()
                    .insert(CMS_HEADER, HeaderValue::from_static(CMS_RELOAD));
            }
            Ok(response)
        }
        .boxed()
    }
}

struct SavingAdapterFactory;

impl AdapterFactory for SavingAdapterFactory {
    fn adapt<'a>(
        &'a self,
        _site: &'a Site,
        _cms: Arc<dyn Cms>,
    ) -> BoxFuture<'a, LumeResult<Arc<dyn CmsAdapter>>> {
        async { Ok(Arc::new(SavingAdapter) as Arc<dyn CmsAdapter>) }.boxed()
    }
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn expect_no_message(host_rx: &mut mpsc::Receiver<HostMessage>) {
    let next = timeout(Duration::from_millis(300), host_rx.recv()).await;
    assert!(next.is_err(), "unexpected host message: {next:?}");
}

#[tokio::test]
async fn rebuild_serves_adapter_responses_unchanged() {
    let project = project(true);
    let (worker, _host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Rebuild { config: None })
        .await
        .unwrap();
    assert_eq!(worker.state(), BuildState::Serving);

    let addr = worker.local_addr().await.unwrap();
    assert_ne!(addr.port(), 0);
    assert_eq!(worker.serve_config().await.unwrap().port, addr.port());

    let response = get(addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.to_ascii_lowercase().contains("content-type: text/html"));
    assert!(response.ends_with("<h1>hello</h1>"));

    let missing = get(addr, "/missing.html").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    worker.shutdown().await;
}

#[tokio::test]
async fn cms_config_change_emits_one_reload() {
    let project = project(true);
    let (worker, mut host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();

    let unrelated: ChangeSet = [project.root.join("index.html")].into_iter().collect();
    assert_eq!(worker.dispatch_changes(unrelated).await, 1);
    expect_no_message(&mut host_rx).await;

    let changed: ChangeSet = [project.root.join("_cms.ts"), project.root.join("index.html")]
        .into_iter()
        .collect();
    worker.dispatch_changes(changed).await;

    let message = timeout(Duration::from_secs(2), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));
    expect_no_message(&mut host_rx).await;

    worker.shutdown().await;
}

#[tokio::test]
async fn site_config_change_emits_reload() {
    let project = project(true);
    let (worker, mut host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();

    let changed: ChangeSet = [project.root.join("_config.toml")].into_iter().collect();
    worker.dispatch_changes(changed).await;

    let message = timeout(Duration::from_secs(2), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    worker.shutdown().await;
}

#[tokio::test]
async fn build_without_cms_config_fails() {
    let project = project(false);
    let (worker, _host_rx) = files_worker(&project.root);

    let err = worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap_err();

    match err {
        LumeError::ConfigNotFound { candidates, .. } => {
            assert_eq!(candidates, vec!["_cms.ts", "_cms.js"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(worker.state(), BuildState::Idle);
    assert!(worker.local_addr().await.is_none());
}

#[tokio::test]
async fn missing_default_export_fails_before_binding() {
    let project = project(false);
    std::fs::write(project.root.join("_cms.js"), "const cms = lumeCMS();\n").unwrap();
    let (worker, _host_rx) = files_worker(&project.root);

    let err = worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap_err();

    assert!(matches!(err, LumeError::CmsInstanceMissing(_)), "{err}");
    assert!(worker.local_addr().await.is_none());
}

#[tokio::test]
async fn rebuild_replaces_previous_server() {
    let project = project(true);
    let (worker, _host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();
    let first = worker.local_addr().await.unwrap();

    worker
        .handle(WorkerMessage::Rebuild { config: None })
        .await
        .unwrap();
    let second = worker.local_addr().await.unwrap();

    assert_eq!(worker.state(), BuildState::Serving);
    assert!(get(second, "/").await.starts_with("HTTP/1.1 200"));
    if first != second {
        assert!(TcpStream::connect(first).await.is_err());
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn local_storage_is_handled_while_serving() {
    let project = project(true);
    let (worker, _host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::LocalStorage {
            data: serde_json::json!({ "theme": "light" }),
        })
        .await
        .unwrap();
    assert_eq!(worker.state(), BuildState::Idle);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();
    worker
        .handle(WorkerMessage::LocalStorage {
            data: serde_json::json!({ "theme": "dark" }),
        })
        .await
        .unwrap();

    assert_eq!(worker.state(), BuildState::Serving);
    assert_eq!(worker.storage().get_item("theme").as_deref(), Some("dark"));

    worker.shutdown().await;
}

#[tokio::test]
async fn reload_header_returns_wait_page() {
    let project = project(true);
    let config = WorkerConfig::new().with_root(project.root.clone());
    let (host, mut host_rx) = host_channel(config.host_capacity);
    let ctx = WorkerContext::new(
        config,
        Arc::new(FsSiteBuilder::new()),
        Arc::new(ScriptModuleLoader::files()),
        Arc::new(SavingAdapterFactory),
    );
    let worker = Worker::new(ctx, host);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();
    let addr = worker.local_addr().await.unwrap();

    let plain = get(addr, "/posts").await;
    assert!(plain.ends_with("adapter:/posts"), "{plain}");
    expect_no_message(&mut host_rx).await;

    let saved = get(addr, "/save").await;
    assert!(saved.starts_with("HTTP/1.1 200"), "{saved}");
    assert!(saved.contains("Please wait..."));
    assert!(!saved.contains("adapter:/save"));
    assert!(saved.contains(&format!("http://127.0.0.1:{}/", addr.port())));

    let message = timeout(Duration::from_secs(2), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    worker.shutdown().await;
}

async fn drain(host_rx: &mut mpsc::Receiver<HostMessage>) {
    while let Ok(Some(_)) = timeout(Duration::from_millis(300), host_rx.recv()).await {}
}

#[tokio::test]
async fn failed_rebuild_retries_after_config_fix() {
    let project = project(true);
    let cms_config = project.root.join("_cms.ts");
    let (worker, mut host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();

    std::fs::write(&cms_config, "const cms = lumeCMS();\n").unwrap();
    let message = timeout(Duration::from_secs(5), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    let err = worker
        .handle(WorkerMessage::Rebuild { config: None })
        .await
        .unwrap_err();
    assert!(matches!(err, LumeError::CmsInstanceMissing(_)), "{err}");
    assert_eq!(worker.state(), BuildState::Idle);
    assert!(worker.local_addr().await.is_none());
    drain(&mut host_rx).await;

    std::fs::write(&cms_config, "const cms = lumeCMS();\nexport default cms;\n").unwrap();
    let message = timeout(Duration::from_secs(5), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    worker
        .handle(WorkerMessage::Rebuild { config: None })
        .await
        .unwrap();
    assert_eq!(worker.state(), BuildState::Serving);

    worker.shutdown().await;
}

#[tokio::test]
async fn failed_rebuild_keeps_reporting_dispatched_changes() {
    let project = project(true);
    let (worker, mut host_rx) = files_worker(&project.root);

    worker
        .handle(WorkerMessage::Build { config: None })
        .await
        .unwrap();

    std::fs::remove_file(project.root.join("_cms.ts")).unwrap();
    let err = worker
        .handle(WorkerMessage::Rebuild { config: None })
        .await
        .unwrap_err();
    assert!(matches!(err, LumeError::ConfigNotFound { .. }), "{err}");
    drain(&mut host_rx).await;

    let changed: ChangeSet = [project.root.join("_cms.ts")].into_iter().collect();
    assert_eq!(worker.dispatch_changes(changed).await, 1);

    let message = timeout(Duration::from_secs(2), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    worker.shutdown().await;
    let changed: ChangeSet = [project.root.join("_cms.ts")].into_iter().collect();
    assert_eq!(worker.dispatch_changes(changed).await, 0);
}

#[tokio::test]
async fn site_config_outside_root_is_watched() {
    let dir = TempDir::new().unwrap();
    let parent = dir.path().canonicalize().unwrap();
    let root = parent.join("site");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(root.join("_cms.ts"), "export default cms;\n").unwrap();
    let shared = parent.join("shared.toml");
    std::fs::write(&shared, SITE_CONFIG).unwrap();

    let (worker, mut host_rx) = files_worker(&root);
    worker
        .handle(WorkerMessage::Build {
            config: Some("../shared.toml".to_string()),
        })
        .await
        .unwrap();
    assert!(worker.local_addr().await.is_some());

    std::fs::write(&shared, SITE_CONFIG.replace("debounce = 50", "debounce = 60")).unwrap();
    let message = timeout(Duration::from_secs(5), host_rx.recv()).await.unwrap();
    assert_eq!(message, Some(HostMessage::Reload));

    worker.shutdown().await;
}
