//! End-to-end exercises of the infrastructure API against a scripted engine.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anvyl::{
    docker::{
        ContainerEngine, ContainerSpec, EngineContainerDetail, EngineContainerSummary,
        EngineStats, ExecOutput, LogStream,
    },
    infra::{create_router, AppState, Reconciler},
    store, AnvylError, AnvylResult,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

//--------------------------------------------------------------------------------------------------
// Fake engine
//--------------------------------------------------------------------------------------------------

#[derive(Clone, Default)]
struct FakeContainer {
    name: String,
    image: String,
    labels: HashMap<String, String>,
    running: bool,
    state: String,
    exit_code: Option<i64>,
}

#[derive(Default)]
struct FakeEngineInner {
    containers: HashMap<String, FakeContainer>,
    next_id: u64,
    down: bool,
}

/// An in-memory engine with externally scriptable state.
#[derive(Clone, Default)]
struct FakeEngine {
    inner: Arc<Mutex<FakeEngineInner>>,
}

impl FakeEngine {
    fn set_down(&self, down: bool) {
        self.inner.lock().unwrap().down = down;
    }

    fn external_stop(&self, docker_id: &str, exit_code: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(container) = inner.containers.get_mut(docker_id) {
            container.running = false;
            container.state = "exited".to_string();
            container.exit_code = Some(exit_code);
        }
    }

    fn external_remove(&self, docker_id: &str) {
        self.inner.lock().unwrap().containers.remove(docker_id);
    }

    fn external_add(&self, name: &str, labels: HashMap<String, String>) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let docker_id = format!("{:064x}", inner.next_id);
        inner.containers.insert(
            docker_id.clone(),
            FakeContainer {
                name: name.to_string(),
                image: "nginx:alpine".to_string(),
                labels,
                running: true,
                state: "running".to_string(),
                exit_code: None,
            },
        );
        docker_id
    }

    fn contains(&self, docker_id: &str) -> bool {
        self.inner.lock().unwrap().containers.contains_key(docker_id)
    }

    fn labels_of(&self, docker_id: &str) -> HashMap<String, String> {
        self.inner
            .lock()
            .unwrap()
            .containers
            .get(docker_id)
            .map(|c| c.labels.clone())
            .unwrap_or_default()
    }

    fn check_up(&self) -> AnvylResult<()> {
        if self.inner.lock().unwrap().down {
            return Err(AnvylError::EngineUnavailable("engine is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ping(&self) -> AnvylResult<()> {
        self.check_up()
    }

    async fn list_containers(&self, all: bool) -> AnvylResult<Vec<EngineContainerSummary>> {
        self.check_up()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .containers
            .iter()
            .filter(|(_, c)| all || c.running)
            .map(|(docker_id, c)| EngineContainerSummary {
                docker_id: docker_id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: c.state.clone(),
                labels: c.labels.clone(),
            })
            .collect())
    }

    async fn inspect(&self, docker_id: &str) -> AnvylResult<EngineContainerDetail> {
        self.check_up()?;
        let inner = self.inner.lock().unwrap();
        let container = inner
            .containers
            .get(docker_id)
            .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", docker_id)))?;

        Ok(EngineContainerDetail {
            docker_id: docker_id.to_string(),
            name: container.name.clone(),
            state: container.state.clone(),
            running: container.running,
            exit_code: container.exit_code,
            started_at: Some(Utc::now()),
            finished_at: container.exit_code.map(|_| Utc::now()),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> AnvylResult<String> {
        self.check_up()?;
        Ok(self.external_add_with_image(&spec.name, &spec.image, spec.labels.clone()))
    }

    async fn start(&self, docker_id: &str) -> AnvylResult<()> {
        self.check_up()?;
        let mut inner = self.inner.lock().unwrap();
        let container = inner
            .containers
            .get_mut(docker_id)
            .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", docker_id)))?;
        container.running = true;
        container.state = "running".to_string();
        Ok(())
    }

    async fn stop(&self, docker_id: &str, _timeout_secs: u64) -> AnvylResult<()> {
        self.check_up()?;
        let mut inner = self.inner.lock().unwrap();
        let container = inner
            .containers
            .get_mut(docker_id)
            .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", docker_id)))?;
        container.running = false;
        container.state = "exited".to_string();
        container.exit_code = Some(0);
        Ok(())
    }

    async fn remove(&self, docker_id: &str, _force: bool) -> AnvylResult<()> {
        self.check_up()?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .containers
            .remove(docker_id)
            .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", docker_id)))?;
        Ok(())
    }

    async fn logs(&self, docker_id: &str, tail: u32, _follow: bool) -> AnvylResult<LogStream> {
        self.check_up()?;
        if !self.contains(docker_id) {
            return Err(AnvylError::NotFound(format!("container '{}'", docker_id)));
        }

        let lines: Vec<AnvylResult<String>> = (0..tail.min(3))
            .map(|i| Ok(format!("log line {}", i)))
            .collect();
        Ok(Box::pin(futures::stream::iter(lines)))
    }

    async fn exec(&self, docker_id: &str, argv: &[String], _tty: bool) -> AnvylResult<ExecOutput> {
        self.check_up()?;
        if !self.contains(docker_id) {
            return Err(AnvylError::NotFound(format!("container '{}'", docker_id)));
        }

        Ok(ExecOutput {
            exit_code: 0,
            stdout: argv.join(" "),
            stderr: String::new(),
        })
    }

    async fn stats(&self, docker_id: &str) -> AnvylResult<EngineStats> {
        self.check_up()?;
        if !self.contains(docker_id) {
            return Err(AnvylError::NotFound(format!("container '{}'", docker_id)));
        }

        Ok(EngineStats {
            cpu_percent: 1.5,
            memory_usage: 1024,
            memory_limit: 4096,
        })
    }
}

impl FakeEngine {
    fn external_add_with_image(
        &self,
        name: &str,
        image: &str,
        labels: HashMap<String, String>,
    ) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let docker_id = format!("{:064x}", inner.next_id);
        inner.containers.insert(
            docker_id.clone(),
            FakeContainer {
                name: name.to_string(),
                image: image.to_string(),
                labels,
                running: true,
                state: "running".to_string(),
                exit_code: None,
            },
        );
        docker_id
    }
}

//--------------------------------------------------------------------------------------------------
// Helpers
//--------------------------------------------------------------------------------------------------

async fn test_state() -> (AppState, FakeEngine) {
    let pool = store::init_memory_db().await.unwrap();
    let engine = FakeEngine::default();
    let state = AppState::new(pool, Arc::new(engine.clone())).await.unwrap();
    (state, engine)
}

async fn test_app() -> (Router, AppState, FakeEngine) {
    let (state, engine) = test_state().await;
    (create_router(state.clone()), state, engine)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn create_test_container(app: &Router, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/containers",
        Some(json!({
            "name": name,
            "image": "nginx:alpine",
            "ports": ["8080:80"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

//--------------------------------------------------------------------------------------------------
// Tests: API surface
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_components() {
    let (app, _, engine) = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["db"], true);
    assert_eq!(body["components"]["docker"], true);

    engine.set_down(true);
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["docker"], false);
}

#[tokio::test]
async fn local_host_is_bootstrapped_and_undeletable() {
    let (app, state, _) = test_app().await;

    let (status, hosts) = send(&app, "GET", "/hosts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hosts.as_array().unwrap().len(), 1);
    assert_eq!(hosts[0]["is_local"], true);

    let local_id = state.local_host_id().to_string();
    let (status, body) = send(&app, "DELETE", &format!("/hosts/{}", local_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Invariant");

    let (status, _) = send(&app, "GET", &format!("/hosts/{}", local_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn host_round_trip() {
    let (app, _, _) = test_app().await;

    let (status, host) = send(
        &app,
        "POST",
        "/hosts",
        Some(json!({"name": "lab-1", "ip": "10.0.0.7", "tags": ["lab"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = host["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, "GET", &format!("/hosts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "lab-1");
    assert_eq!(fetched["tags"][0], "lab");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/hosts/{}", id),
        Some(json!({"status": "inactive"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");

    let (status, _) = send(&app, "DELETE", &format!("/hosts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/hosts/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_container_round_trip() {
    let (app, _, engine) = test_app().await;

    let container = create_test_container(&app, "t1").await;
    assert_eq!(container["status"], "running");
    let docker_id = container["docker_id"].as_str().unwrap().to_string();
    let id = container["id"].as_str().unwrap().to_string();

    // The engine container carries the managed labels.
    let labels = engine.labels_of(&docker_id);
    assert_eq!(labels.get("anvyl.managed").map(String::as_str), Some("true"));
    assert_eq!(
        labels.get("anvyl.container_id").map(String::as_str),
        Some(id.as_str())
    );

    // Lookup works by internal id and by engine id.
    let (status, by_id) = send(&app, "GET", &format!("/containers/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["docker_id"], docker_id.as_str());

    let (status, by_docker_id) =
        send(&app, "GET", &format!("/containers/{}", docker_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_docker_id["id"], id.as_str());
}

#[tokio::test]
async fn duplicate_container_name_conflicts() {
    let (app, _, _) = test_app().await;
    create_test_container(&app, "t1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/containers",
        Some(json!({"name": "t1", "image": "nginx:alpine"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
}

#[tokio::test]
async fn create_on_non_local_host_is_rejected() {
    let (app, _, _) = test_app().await;

    let (_, host) = send(
        &app,
        "POST",
        "/hosts",
        Some(json!({"name": "remote", "ip": "10.0.0.9"})),
    )
    .await;
    let remote_id = host["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/containers",
        Some(json!({"name": "t1", "image": "nginx:alpine", "host_id": remote_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");
}

#[tokio::test]
async fn engine_failure_during_create_leaves_no_row() {
    let (app, _, engine) = test_app().await;
    engine.set_down(true);

    let (status, body) = send(
        &app,
        "POST",
        "/containers",
        Some(json!({"name": "t1", "image": "nginx:alpine"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "EngineUnavailable");

    engine.set_down(false);
    let (_, containers) = send(&app, "GET", "/containers?all=true", None).await;
    assert_eq!(containers.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn stop_and_remove_container() {
    let (app, _, engine) = test_app().await;
    let container = create_test_container(&app, "t1").await;
    let id = container["id"].as_str().unwrap().to_string();
    let docker_id = container["docker_id"].as_str().unwrap().to_string();

    let (status, stopped) = send(
        &app,
        "POST",
        &format!("/containers/{}/stop", id),
        Some(json!({"timeout": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["status"], "stopped");

    let (status, _) = send(&app, "DELETE", &format!("/containers/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/containers/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!engine.contains(&docker_id));
}

#[tokio::test]
async fn logs_and_exec_round_trip() {
    let (app, _, _) = test_app().await;
    let container = create_test_container(&app, "t1").await;
    let id = container["id"].as_str().unwrap().to_string();

    let (status, logs) = send(&app, "GET", &format!("/containers/{}/logs?tail=2", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["logs"].as_array().unwrap().len(), 2);

    let (status, output) = send(
        &app,
        "POST",
        &format!("/containers/{}/exec", id),
        Some(json!({"command": ["echo", "hi"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["exit_code"], 0);
    assert_eq!(output["stdout"], "echo hi");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/containers/{}/exec", id),
        Some(json!({"command": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");
}

#[tokio::test]
async fn system_status_counts_live_containers() {
    let (app, _, engine) = test_app().await;
    let first = create_test_container(&app, "t1").await;
    create_test_container(&app, "t2").await;

    // Stop one externally and reconcile so the store sees it.
    engine.external_stop(first["docker_id"].as_str().unwrap(), 0);
    let (status, body) = send(&app, "GET", "/system/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hosts"], 1);
    assert_eq!(body["containers"]["total"], 2);
    assert_eq!(body["engine"], "ok");
}

//--------------------------------------------------------------------------------------------------
// Tests: Reconciler
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn reconciler_absorbs_external_stop() {
    let (app, state, engine) = test_app().await;
    let container = create_test_container(&app, "t1").await;
    let id = container["id"].as_str().unwrap().to_string();

    engine.external_stop(container["docker_id"].as_str().unwrap(), 137);

    let mut reconciler = Reconciler::new(state.clone(), Duration::from_secs(3600));
    reconciler.tick().await.unwrap();

    let row = store::get_container(state.db(), &id).await.unwrap();
    assert_eq!(row.status, anvyl::store::ContainerStatus::Exited);
    assert_eq!(row.exit_code, Some(137));
    assert!(row.finished_at.is_some());
}

#[tokio::test]
async fn reconciler_drops_vanished_rows_after_two_ticks() {
    let (app, state, engine) = test_app().await;
    let container = create_test_container(&app, "t1").await;
    let id = container["id"].as_str().unwrap().to_string();

    engine.external_remove(container["docker_id"].as_str().unwrap());

    let mut reconciler = Reconciler::new(state.clone(), Duration::from_secs(3600));

    reconciler.tick().await.unwrap();
    assert!(store::get_container(state.db(), &id).await.is_ok());

    reconciler.tick().await.unwrap();
    assert!(matches!(
        store::get_container(state.db(), &id).await,
        Err(AnvylError::NotFound(_))
    ));
}

#[tokio::test]
async fn reconciler_recovers_lost_rows_from_labels() {
    let (state, engine) = test_state().await;

    let mut labels = HashMap::new();
    labels.insert("anvyl.managed".to_string(), "true".to_string());
    labels.insert(
        "anvyl.container_id".to_string(),
        "lost-row-id".to_string(),
    );
    let docker_id = engine.external_add("orphan", labels);

    let mut reconciler = Reconciler::new(state.clone(), Duration::from_secs(3600));
    reconciler.tick().await.unwrap();

    let recovered = store::get_container(state.db(), &docker_id).await.unwrap();
    assert_eq!(recovered.name, "orphan");
    assert_eq!(recovered.status, anvyl::store::ContainerStatus::Running);
}

#[tokio::test]
async fn reconciler_ignores_unmanaged_containers() {
    let (state, engine) = test_state().await;
    engine.external_add("other-tool", HashMap::new());

    let mut reconciler = Reconciler::new(state.clone(), Duration::from_secs(3600));
    reconciler.tick().await.unwrap();

    let rows = store::list_containers(state.db(), None, true).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn host_exec_runs_on_the_local_host_only() {
    let (app, state, _) = test_app().await;
    let local_id = state.local_host_id().to_string();

    let (status, output) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", local_id),
        Some(json!({"command": ["echo", "hello"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["exit_code"], 0);
    assert_eq!(output["stdout"], "hello\n");

    // Environment entries reach the child.
    let (status, output) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", local_id),
        Some(json!({
            "command": ["sh", "-c", "echo $ANVYL_EXEC_PROBE"],
            "env": ["ANVYL_EXEC_PROBE=probe-value"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["stdout"], "probe-value\n");

    // Remote hosts are rejected.
    let (_, host) = send(
        &app,
        "POST",
        "/hosts",
        Some(json!({"name": "remote", "ip": "10.0.0.9"})),
    )
    .await;
    let remote_id = host["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", remote_id),
        Some(json!({"command": ["echo", "hi"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");

    // Unknown hosts are 404, empty commands 400.
    let (status, _) = send(
        &app,
        "POST",
        "/hosts/ghost/exec",
        Some(json!({"command": ["true"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", local_id),
        Some(json!({"command": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn host_exec_timeout_reports_conventional_exit_code() {
    let (app, state, _) = test_app().await;
    let local_id = state.local_host_id().to_string();

    let (status, output) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", local_id),
        Some(json!({"command": ["sleep", "5"], "timeout": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["exit_code"], 124);

    // A missing binary is the caller's mistake, not a server fault.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/hosts/{}/exec", local_id),
        Some(json!({"command": ["definitely-not-a-real-binary-anvyl"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");
}

//--------------------------------------------------------------------------------------------------
// Tests: MCP against a live infra server
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn mcp_tools_mirror_the_infra_api() {
    use anvyl::infra::InfraClient;
    use anvyl::mcp::{McpRouter, RpcId, RpcRequest};

    let (app, _, _) = test_app().await;

    // Serve the infra router on an ephemeral port so the MCP tool handlers
    // can reach it over real HTTP.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let infra_app = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, infra_app.into_make_service())
            .await
            .unwrap();
    });

    let mcp = McpRouter::new(InfraClient::new(format!("http://{}", addr)));

    let rpc = |id: i64, method: &str, params: Value| RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(RpcId::Num(id)),
        method: method.to_string(),
        params: Some(params),
    };

    // initialize advertises tool support.
    let init = mcp
        .dispatch(rpc(1, "initialize", json!({"protocol_version": "2024-11-05"})))
        .await
        .unwrap();
    assert_eq!(init.result.unwrap()["capabilities"]["tools"], true);

    // tools/list names list_hosts.
    let list = mcp.dispatch(rpc(2, "tools/list", json!({}))).await.unwrap();
    let names: Vec<String> = list.result.unwrap()["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"list_hosts".to_string()));

    // tools/call list_hosts mirrors GET /hosts.
    let (_, hosts) = send(&app, "GET", "/hosts", None).await;
    let local_name = hosts[0]["name"].as_str().unwrap();

    let call = mcp
        .dispatch(rpc(
            3,
            "tools/call",
            json!({"name": "list_hosts", "arguments": {}}),
        ))
        .await
        .unwrap();
    let result = call.result.unwrap();
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains(local_name));

    // A failing tool maps onto the MCP error-code table.
    let missing = mcp
        .dispatch(rpc(
            4,
            "tools/call",
            json!({"name": "get_host_metrics", "arguments": {"host_id": "ghost"}}),
        ))
        .await
        .unwrap();
    assert_eq!(missing.error.unwrap().code, -32001);
}

#[tokio::test]
async fn reconciler_refreshes_local_resources() {
    let (state, _) = test_state().await;

    let mut reconciler = Reconciler::new(state.clone(), Duration::from_secs(3600));
    reconciler.tick().await.unwrap();

    let local = store::get_local_host(state.db()).await.unwrap();
    let blob = local.resources.expect("resources recorded");
    let value: Value = serde_json::from_str(&blob).unwrap();
    assert!(value["memory_total"].as_u64().unwrap() > 0);
}
