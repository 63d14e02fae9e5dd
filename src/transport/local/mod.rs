//! Engine API client over the local Unix socket
//!
//! Every call is a plain HTTP/1.1 request against the daemon socket. Exec and
//! log output arrive multiplexed and are split by [`demux`]. File copies use the
//! container archive endpoints, packed and unpacked by [`archive`].

pub mod archive;
pub mod demux;

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyperlocal::UnixConnector;
use log::{debug, info, warn};
use serde_json::{Value, json};

use super::{ContainerSpec, Teardown, exec_outcome, split_container_path};
use crate::config::CONTAINER_WORKDIR;
use crate::error::{ContainerError, Result};
use crate::types::{ContainerId, TransferDirection};

type HyperClient = Client<UnixConnector, Full<Bytes>>;

/// Header carrying the base64 JSON stat of an archive path
const PATH_STAT_HEADER: &str = "X-Docker-Container-Path-Stat";

/// Directory bit of a Go `os.FileMode`
const MODE_DIR: u64 = 1 << 31;

/// Collected response from the daemon
struct EngineResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl EngineResponse {
    fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Daemon error message, falling back to the raw body
    fn message(&self) -> String {
        self.json()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&self.body).trim().to_string())
    }

    fn describe(&self) -> String {
        format!("{} - {}", self.status, self.message())
    }
}

/// Client for the container host's Engine API
pub struct EngineClient {
    client: HyperClient,
    socket: PathBuf,
}

impl EngineClient {
    /// Create a client for the daemon listening on `socket`
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(UnixConnector);
        Self {
            client,
            socket: socket.into(),
        }
    }

    /// Socket this client talks to
    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        content_type: &str,
        body: Bytes,
    ) -> std::io::Result<EngineResponse> {
        let uri: hyper::Uri = hyperlocal::Uri::new(&self.socket, endpoint).into();
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", content_type)
            .body(Full::new(body))
            .map_err(std::io::Error::other)?;

        let res = self.client.request(req).await.map_err(std::io::Error::other)?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(std::io::Error::other)?
            .to_bytes();

        Ok(EngineResponse {
            status,
            headers,
            body,
        })
    }

    async fn get(&self, endpoint: &str) -> std::io::Result<EngineResponse> {
        self.send(Method::GET, endpoint, "application/json", Bytes::new())
            .await
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> std::io::Result<EngineResponse> {
        let bytes = Bytes::from(serde_json::to_vec(body)?);
        self.send(Method::POST, endpoint, "application/json", bytes)
            .await
    }

    // ========================================================================
    // IMAGES
    // ========================================================================

    async fn ensure_image(&self, image: &str) -> Result<()> {
        let inspect = self
            .get(&format!("/images/{image}/json"))
            .await
            .map_err(|e| ContainerError::provisioning(format!("inspect image {image}: {e}")))?;

        match inspect.status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => self.pull_image(image).await,
            _ => Err(ContainerError::provisioning(format!(
                "inspect image {image}: {}",
                inspect.describe()
            ))),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling image {image}");
        let (repo, tag) = split_image_ref(image);
        let mut endpoint = format!("/images/create?fromImage={}", urlencoding::encode(repo));
        if let Some(tag) = tag {
            endpoint.push_str(&format!("&tag={}", urlencoding::encode(tag)));
        }

        let res = self
            .send(Method::POST, &endpoint, "application/json", Bytes::new())
            .await
            .map_err(|e| ContainerError::provisioning(format!("pull {image}: {e}")))?;

        if !res.status.is_success() {
            return Err(ContainerError::provisioning(format!(
                "pull {image}: {}",
                res.describe()
            )));
        }

        // Progress is streamed as JSON lines; failures arrive as an `error` entry.
        for line in res.body.split(|b| *b == b'\n') {
            if let Ok(progress) = serde_json::from_slice::<Value>(line)
                && let Some(error) = progress.get("error").and_then(Value::as_str)
            {
                return Err(ContainerError::provisioning(format!("pull {image}: {error}")));
            }
        }

        info!("Pulled image {image}");
        Ok(())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Ensure the image and create the container
    ///
    /// # Errors
    /// Returns `Provisioning` if the pull or create fails
    pub async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.ensure_image(&spec.image).await?;

        let body = json!({
            "Image": spec.image,
            "Cmd": spec.command,
            "Env": spec.env.to_assignments(),
            "WorkingDir": CONTAINER_WORKDIR,
            "HostConfig": {
                "Binds": spec.binds(),
                "AutoRemove": false,
            },
        });
        debug!(
            "Creating container {} from {} with env {:?}",
            spec.name, spec.image, spec.env
        );

        let endpoint = format!("/containers/create?name={}", urlencoding::encode(&spec.name));
        let res = self
            .post_json(&endpoint, &body)
            .await
            .map_err(|e| ContainerError::provisioning(format!("create {}: {e}", spec.name)))?;

        if res.status != StatusCode::CREATED {
            return Err(ContainerError::provisioning(format!(
                "create {}: {}",
                spec.name,
                res.describe()
            )));
        }

        let id = res
            .json()
            .and_then(|v| v.get("Id").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| {
                ContainerError::provisioning(format!("create {}: response had no Id", spec.name))
            })?;

        Ok(ContainerId::new(id))
    }

    /// Start a created container
    ///
    /// # Errors
    /// Returns `Provisioning` if the daemon refuses
    pub async fn start(&self, id: &ContainerId) -> Result<()> {
        let res = self
            .post_json(&format!("/containers/{id}/start"), &json!({}))
            .await
            .map_err(|e| ContainerError::provisioning(format!("start {}: {e}", id.short())))?;

        match res.status {
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => Ok(()),
            _ => Err(ContainerError::provisioning(format!(
                "start {}: {}",
                id.short(),
                res.describe()
            ))),
        }
    }

    /// Run a command and return stdout
    ///
    /// # Errors
    /// Returns `Execution` or `Timeout`
    pub async fn exec(&self, id: &ContainerId, command: &[String], timeout: Duration) -> Result<String> {
        tokio::time::timeout(timeout, self.exec_inner(id, command))
            .await
            .map_err(|_| ContainerError::timeout(format!("exec in container {}", id.short()), timeout))?
    }

    async fn exec_inner(&self, id: &ContainerId, command: &[String]) -> Result<String> {
        let io_err = |e: std::io::Error| ContainerError::execution(format!("exec in {}: {e}", id.short()));

        let created = self
            .post_json(
                &format!("/containers/{id}/exec"),
                &json!({
                    "AttachStdout": true,
                    "AttachStderr": true,
                    "Cmd": command,
                }),
            )
            .await
            .map_err(io_err)?;

        if created.status != StatusCode::CREATED {
            return Err(ContainerError::execution(format!(
                "exec in {}: {}",
                id.short(),
                created.describe()
            )));
        }

        let exec_id = created
            .json()
            .and_then(|v| v.get("Id").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| ContainerError::execution("exec create response had no Id"))?;

        let started = self
            .post_json(
                &format!("/exec/{exec_id}/start"),
                &json!({ "Detach": false, "Tty": false }),
            )
            .await
            .map_err(io_err)?;

        if !started.status.is_success() {
            return Err(ContainerError::execution(format!(
                "exec start in {}: {}",
                id.short(),
                started.describe()
            )));
        }

        let (stdout, stderr) = demux::split(&started.body);

        let inspected = self.get(&format!("/exec/{exec_id}/json")).await.map_err(io_err)?;
        let exit_code = inspected
            .json()
            .and_then(|v| v.get("ExitCode").and_then(Value::as_i64));

        exec_outcome(id, stdout, stderr, exit_code)
    }

    /// Copy between host and container
    ///
    /// # Errors
    /// Returns `Transfer` on failure
    pub async fn copy(
        &self,
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Result<()> {
        match direction {
            TransferDirection::ToContainer => self.copy_in(id, source, dest).await,
            TransferDirection::FromContainer => self.copy_out(id, source, dest).await,
        }
    }

    async fn copy_in(&self, id: &ContainerId, source: &str, dest: &str) -> Result<()> {
        let source_path = PathBuf::from(source);
        let metadata = tokio::fs::metadata(&source_path)
            .await
            .map_err(|e| ContainerError::transfer(format!("read {source}: {e}")))?;

        let source_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let dest_is_dir = if dest.ends_with('/') {
            true
        } else {
            self.stat_path(id, dest).await? == Some(true)
        };
        let (parent, name) = upload_target(dest, &source_name, dest_is_dir);
        let (parent, name) = (parent.to_string(), name.to_string());

        let packed = if metadata.is_dir() {
            tokio::task::spawn_blocking(move || archive::pack_directory(&source_path, &name))
                .await
                .map_err(|e| ContainerError::transfer(format!("pack {source}: {e}")))?
        } else {
            let contents = tokio::fs::read(&source_path)
                .await
                .map_err(|e| ContainerError::transfer(format!("read {source}: {e}")))?;
            archive::pack_file(&contents, &name, file_mode(&metadata))
        };
        let tarball =
            packed.map_err(|e| ContainerError::transfer(format!("pack {source}: {e}")))?;

        let endpoint = format!(
            "/containers/{id}/archive?path={}",
            urlencoding::encode(&parent)
        );
        let res = self
            .send(Method::PUT, &endpoint, "application/x-tar", Bytes::from(tarball))
            .await
            .map_err(|e| ContainerError::transfer(format!("upload to {dest}: {e}")))?;

        if !res.status.is_success() {
            return Err(ContainerError::transfer(format!(
                "upload to {dest}: {}",
                res.describe()
            )));
        }

        debug!("Copied {source} into {}:{dest}", id.short());
        Ok(())
    }

    /// Whether `path` is a directory in the container, `None` if it does not exist
    async fn stat_path(&self, id: &ContainerId, path: &str) -> Result<Option<bool>> {
        let endpoint = format!(
            "/containers/{id}/archive?path={}",
            urlencoding::encode(path)
        );
        let res = self
            .send(Method::HEAD, &endpoint, "application/json", Bytes::new())
            .await
            .map_err(|e| ContainerError::transfer(format!("stat {path}: {e}")))?;

        match res.status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let is_dir = res
                    .headers
                    .get(PATH_STAT_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_path_stat)
                    .unwrap_or(false);
                Ok(Some(is_dir))
            }
            _ => Err(ContainerError::transfer(format!(
                "stat {path}: {}",
                res.describe()
            ))),
        }
    }

    async fn copy_out(&self, id: &ContainerId, source: &str, dest: &str) -> Result<()> {
        let endpoint = format!(
            "/containers/{id}/archive?path={}",
            urlencoding::encode(source)
        );
        let res = self
            .get(&endpoint)
            .await
            .map_err(|e| ContainerError::transfer(format!("download {source}: {e}")))?;

        if !res.status.is_success() {
            return Err(ContainerError::transfer(format!(
                "download {source}: {}",
                res.describe()
            )));
        }

        let dest_path = PathBuf::from(dest);
        tokio::task::spawn_blocking(move || archive::unpack(&res.body, &dest_path))
            .await
            .map_err(|e| ContainerError::transfer(format!("unpack into {dest}: {e}")))?
            .map_err(|e| ContainerError::transfer(format!("unpack into {dest}: {e}")))?;

        debug!("Copied {}:{source} to {dest}", id.short());
        Ok(())
    }

    /// Whether the container is running; errors read as `false`
    pub async fn is_running(&self, id: &ContainerId) -> bool {
        match self.get(&format!("/containers/{id}/json")).await {
            Ok(res) if res.status.is_success() => res
                .json()
                .and_then(|v| v.pointer("/State/Running").and_then(Value::as_bool))
                .unwrap_or(false),
            Ok(res) => {
                debug!("Inspect of {} returned {}", id.short(), res.status);
                false
            }
            Err(e) => {
                warn!("Inspect of {} failed: {e}", id.short());
                false
            }
        }
    }

    /// Stop the container
    ///
    /// # Errors
    /// Returns `Teardown` unless the container is stopped or absent
    pub async fn stop(&self, id: &ContainerId) -> Result<Teardown> {
        let res = self
            .post_json(&format!("/containers/{id}/stop"), &json!({}))
            .await
            .map_err(|e| ContainerError::teardown(format!("stop {}: {e}", id.short())))?;

        match res.status {
            StatusCode::NO_CONTENT => Ok(Teardown::Done),
            StatusCode::NOT_MODIFIED => Ok(Teardown::AlreadyStopped),
            StatusCode::NOT_FOUND => Ok(Teardown::Missing),
            _ => Err(ContainerError::teardown(format!(
                "stop {}: {}",
                id.short(),
                res.describe()
            ))),
        }
    }

    /// Remove the container
    ///
    /// # Errors
    /// Returns `Teardown` unless the container is absent
    pub async fn remove(&self, id: &ContainerId) -> Result<Teardown> {
        let res = self
            .send(Method::DELETE, &format!("/containers/{id}"), "application/json", Bytes::new())
            .await
            .map_err(|e| ContainerError::teardown(format!("remove {}: {e}", id.short())))?;

        match res.status {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(Teardown::Done),
            StatusCode::NOT_FOUND => Ok(Teardown::Missing),
            _ => Err(ContainerError::teardown(format!(
                "remove {}: {}",
                id.short(),
                res.describe()
            ))),
        }
    }

    /// Fetch the log tail
    ///
    /// # Errors
    /// Returns `Execution` if the container is gone
    pub async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String> {
        let endpoint = format!("/containers/{id}/logs?stdout=1&stderr=1&timestamps=1&tail={tail}");
        let res = self
            .get(&endpoint)
            .await
            .map_err(|e| ContainerError::execution(format!("logs of {}: {e}", id.short())))?;

        if !res.status.is_success() {
            return Err(ContainerError::execution(format!(
                "logs of {}: {}",
                id.short(),
                res.describe()
            )));
        }

        Ok(demux::merged(&res.body))
    }
}

/// Parent directory and entry name for an upload to `dest`.
///
/// An existing directory receives the source under its own name, like `docker cp`.
fn upload_target<'a>(dest: &'a str, source_name: &'a str, dest_is_dir: bool) -> (&'a str, &'a str) {
    if dest_is_dir {
        let dir = dest.trim_end_matches('/');
        return (if dir.is_empty() { "/" } else { dir }, source_name);
    }
    split_container_path(dest, source_name)
}

/// Directory flag from a path-stat header value
fn parse_path_stat(header: &str) -> Option<bool> {
    let decoded = STANDARD.decode(header.trim()).ok()?;
    let stat: Value = serde_json::from_slice(&decoded).ok()?;
    let mode = stat.get("mode").and_then(Value::as_u64)?;
    Some(mode & MODE_DIR != 0)
}

/// Split `repo[:tag]` for the pull endpoint; digests are passed whole
fn split_image_ref(image: &str) -> (&str, Option<&str>) {
    if image.contains('@') {
        return (image, None);
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], Some(&image[name_start + i + 1..])),
        None => (image, Some("latest")),
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;

    use base64::Engine as _;
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Response, server::conn::http1};
    use hyper_util::rt::TokioIo;
    use parking_lot::Mutex;
    use tokio::net::UnixListener;

    use super::*;
    use crate::transport::ContainerEnv;

    /// Reply the fake daemon sends for one request
    struct Canned {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    }

    impl Canned {
        fn status(status: u16) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: Vec::new(),
            }
        }

        fn json(status: u16, body: Value) -> Self {
            Self {
                body: body.to_string().into_bytes(),
                ..Self::status(status)
            }
        }

        fn bytes(status: u16, body: Vec<u8>) -> Self {
            Self {
                body,
                ..Self::status(status)
            }
        }

        fn header(mut self, name: &'static str, value: String) -> Self {
            self.headers.push((name, value));
            self
        }
    }

    type Routes = Arc<dyn Fn(&Method, &str) -> Canned + Send + Sync>;

    /// Engine API double listening on a Unix socket in a temp dir
    struct FakeEngine {
        client: EngineClient,
        requests: Arc<Mutex<Vec<(String, Bytes)>>>,
        _dir: tempfile::TempDir,
    }

    impl FakeEngine {
        fn start(routes: impl Fn(&Method, &str) -> Canned + Send + Sync + 'static) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let socket = dir.path().join("engine.sock");
            let listener = UnixListener::bind(&socket).unwrap();
            let routes: Routes = Arc::new(routes);
            let requests = Arc::new(Mutex::new(Vec::new()));

            let log = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = Arc::clone(&routes);
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let service = service_fn(move |req: Request<Incoming>| {
                            let routes = Arc::clone(&routes);
                            let log = Arc::clone(&log);
                            async move {
                                let method = req.method().clone();
                                let target = req
                                    .uri()
                                    .path_and_query()
                                    .map(|p| p.as_str().to_string())
                                    .unwrap_or_default();
                                let body = req.into_body().collect().await?.to_bytes();
                                log.lock().push((format!("{method} {target}"), body));

                                let canned = routes(&method, &target);
                                let mut res = Response::builder().status(canned.status);
                                for (name, value) in canned.headers {
                                    res = res.header(name, value);
                                }
                                let res = res
                                    .body(Full::new(Bytes::from(canned.body)))
                                    .unwrap();
                                Ok::<_, hyper::Error>(res)
                            }
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await;
                    });
                }
            });

            Self {
                client: EngineClient::new(socket),
                requests,
                _dir: dir,
            }
        }

        fn lines(&self) -> Vec<String> {
            self.requests.lock().iter().map(|(l, _)| l.clone()).collect()
        }

        fn body_of(&self, prefix: &str) -> Bytes {
            self.requests
                .lock()
                .iter()
                .find(|(l, _)| l.starts_with(prefix))
                .map(|(_, b)| b.clone())
                .unwrap()
        }
    }

    fn cid() -> ContainerId {
        ContainerId::new("c0ffee")
    }

    fn frame(stream: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![stream, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "claude-code-abc".into(),
            image: "agent:1".into(),
            project_path: "/proj".into(),
            mounts: Vec::new(),
            env: ContainerEnv::default(),
            command: vec!["sleep".into(), "infinity".into()],
        }
    }

    fn dir_stat() -> String {
        let stat = json!({ "name": "app", "size": 4096, "mode": MODE_DIR | 0o755 });
        STANDARD.encode(stat.to_string())
    }

    #[test]
    fn image_refs_split_on_tag_after_last_slash() {
        assert_eq!(
            split_image_ref("ghcr.io/zeeno-atl/claude-code:latest"),
            ("ghcr.io/zeeno-atl/claude-code", Some("latest"))
        );
        assert_eq!(
            split_image_ref("localhost:5000/agent"),
            ("localhost:5000/agent", Some("latest"))
        );
        assert_eq!(split_image_ref("agent@sha256:abc"), ("agent@sha256:abc", None));
    }

    #[test]
    fn existing_directory_receives_upload_by_source_name() {
        assert_eq!(upload_target("/app", "notes.txt", true), ("/app", "notes.txt"));
        assert_eq!(upload_target("/", "notes.txt", true), ("/", "notes.txt"));
        assert_eq!(upload_target("/app/new.txt", "notes.txt", false), ("/app", "new.txt"));
    }

    #[test]
    fn path_stat_reads_directory_bit() {
        assert_eq!(parse_path_stat(&dir_stat()), Some(true));

        let file = STANDARD.encode(json!({ "name": "a", "mode": 0o644 }).to_string());
        assert_eq!(parse_path_stat(&file), Some(false));
        assert_eq!(parse_path_stat("not base64!"), None);
    }

    #[tokio::test]
    async fn stop_maps_status_codes_to_teardown() {
        let engine = FakeEngine::start(|_, target| match target {
            "/containers/done/stop" => Canned::status(204),
            "/containers/idle/stop" => Canned::status(304),
            "/containers/gone/stop" => Canned::json(404, json!({ "message": "No such container: gone" })),
            _ => Canned::json(500, json!({ "message": "permission denied" })),
        });
        let client = &engine.client;

        assert_eq!(client.stop(&ContainerId::new("done")).await.unwrap(), Teardown::Done);
        assert_eq!(
            client.stop(&ContainerId::new("idle")).await.unwrap(),
            Teardown::AlreadyStopped
        );
        assert_eq!(client.stop(&ContainerId::new("gone")).await.unwrap(), Teardown::Missing);

        let err = client.stop(&ContainerId::new("locked")).await.unwrap_err();
        assert!(matches!(err, ContainerError::Teardown(ref m) if m.contains("permission denied")));
    }

    #[tokio::test]
    async fn remove_treats_missing_container_as_missing() {
        let engine = FakeEngine::start(|method, target| {
            if method != Method::DELETE {
                Canned::status(500)
            } else if target == "/containers/gone" {
                Canned::status(404)
            } else {
                Canned::status(204)
            }
        });

        assert_eq!(
            engine.client.remove(&ContainerId::new("gone")).await.unwrap(),
            Teardown::Missing
        );
        assert_eq!(engine.client.remove(&cid()).await.unwrap(), Teardown::Done);
    }

    #[tokio::test]
    async fn create_pulls_missing_image_then_creates() {
        let engine = FakeEngine::start(|_, target| {
            if target.starts_with("/images/agent:1/json") {
                Canned::json(404, json!({ "message": "No such image: agent:1" }))
            } else if target.starts_with("/images/create") {
                Canned::bytes(200, b"{\"status\":\"Pulling\"}\n{\"status\":\"Done\"}\n".to_vec())
            } else if target.starts_with("/containers/create") {
                Canned::json(201, json!({ "Id": "deadbeef", "Warnings": [] }))
            } else {
                Canned::status(500)
            }
        });

        let id = engine.client.create(&spec()).await.unwrap();
        assert_eq!(id, ContainerId::new("deadbeef"));

        let lines = engine.lines();
        assert_eq!(lines[0], "GET /images/agent:1/json");
        assert_eq!(lines[1], "POST /images/create?fromImage=agent&tag=1");
        assert_eq!(lines[2], "POST /containers/create?name=claude-code-abc");

        let body: Value = serde_json::from_slice(&engine.body_of("POST /containers/create")).unwrap();
        assert_eq!(body["WorkingDir"], CONTAINER_WORKDIR);
        assert_eq!(body["HostConfig"]["Binds"][0], "/proj:/app");
    }

    #[tokio::test]
    async fn pull_stream_error_fails_provisioning() {
        let engine = FakeEngine::start(|_, target| {
            if target.starts_with("/images/create") {
                Canned::bytes(200, b"{\"error\":\"manifest unknown\"}\n".to_vec())
            } else {
                Canned::status(404)
            }
        });

        let err = engine.client.create(&spec()).await.unwrap_err();
        assert!(matches!(err, ContainerError::Provisioning(ref m) if m.contains("manifest unknown")));
        assert!(!engine.lines().iter().any(|l| l.starts_with("POST /containers/create")));
    }

    #[tokio::test]
    async fn exec_demultiplexes_stdout() {
        let engine = FakeEngine::start(|_, target| {
            if target.ends_with("/exec") {
                Canned::json(201, json!({ "Id": "e1" }))
            } else if target == "/exec/e1/start" {
                let mut body = frame(1, b"hi\n");
                body.extend(frame(2, b"noise"));
                Canned::bytes(200, body)
            } else if target == "/exec/e1/json" {
                Canned::json(200, json!({ "ExitCode": 0, "Running": false }))
            } else {
                Canned::status(500)
            }
        });

        let out = engine
            .client
            .exec(&cid(), &["echo".to_string(), "hi".to_string()], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "hi\n");

        let body: Value = serde_json::from_slice(&engine.body_of("POST /containers/c0ffee/exec")).unwrap();
        assert_eq!(body["Cmd"], json!(["echo", "hi"]));
    }

    #[tokio::test]
    async fn silent_nonzero_exit_is_execution_error_with_stderr() {
        let engine = FakeEngine::start(|_, target| {
            if target.ends_with("/exec") {
                Canned::json(201, json!({ "Id": "e2" }))
            } else if target == "/exec/e2/start" {
                Canned::bytes(200, frame(2, b"not found"))
            } else {
                Canned::json(200, json!({ "ExitCode": 2 }))
            }
        });

        let err = engine
            .client
            .exec(&cid(), &["false".to_string()], Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ContainerError::Execution { message, stderr, .. } => {
                assert!(message.contains("status 2"));
                assert_eq!(stderr, "not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn logs_of_missing_container_is_execution_error() {
        let engine = FakeEngine::start(|_, _| {
            Canned::json(404, json!({ "message": "No such container: c0ffee" }))
        });

        let err = engine.client.logs(&cid(), 10).await.unwrap_err();
        assert!(err.indicates_absent_container());
        assert!(matches!(err, ContainerError::Execution { .. }));
        assert_eq!(
            engine.lines(),
            vec!["GET /containers/c0ffee/logs?stdout=1&stderr=1&timestamps=1&tail=10"]
        );
    }

    #[tokio::test]
    async fn inspect_failures_read_as_not_running() {
        let engine = FakeEngine::start(|_, target| match target {
            "/containers/up/json" => Canned::json(200, json!({ "State": { "Running": true } })),
            _ => Canned::status(500),
        });

        assert!(engine.client.is_running(&ContainerId::new("up")).await);
        assert!(!engine.client.is_running(&ContainerId::new("broken")).await);

        let dir = tempfile::tempdir().unwrap();
        let unreachable = EngineClient::new(dir.path().join("missing.sock"));
        assert!(!unreachable.is_running(&cid()).await);
    }

    #[tokio::test]
    async fn upload_into_existing_directory_keeps_source_name() {
        let stat = dir_stat();
        let engine = FakeEngine::start(move |method, _| {
            if method == Method::HEAD {
                Canned::status(200).header(PATH_STAT_HEADER, stat.clone())
            } else if method == Method::PUT {
                Canned::status(200)
            } else {
                Canned::status(500)
            }
        });

        let host = tempfile::tempdir().unwrap();
        let source = host.path().join("notes.txt");
        std::fs::write(&source, "remember").unwrap();

        engine
            .client
            .copy(&cid(), TransferDirection::ToContainer, source.to_str().unwrap(), "/app")
            .await
            .unwrap();

        let lines = engine.lines();
        assert_eq!(lines[0], "HEAD /containers/c0ffee/archive?path=%2Fapp");
        assert_eq!(lines[1], "PUT /containers/c0ffee/archive?path=%2Fapp");

        let tarball = engine.body_of("PUT ");
        let mut archive = tar::Archive::new(tarball.as_ref());
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("notes.txt"));
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "remember");
    }

    #[tokio::test]
    async fn upload_to_missing_path_renames_entry() {
        let engine = FakeEngine::start(|method, _| {
            if method == Method::HEAD {
                Canned::status(404)
            } else {
                Canned::status(200)
            }
        });

        let host = tempfile::tempdir().unwrap();
        let source = host.path().join("notes.txt");
        std::fs::write(&source, "x").unwrap();

        engine
            .client
            .copy(
                &cid(),
                TransferDirection::ToContainer,
                source.to_str().unwrap(),
                "/app/renamed.txt",
            )
            .await
            .unwrap();

        assert_eq!(engine.lines()[1], "PUT /containers/c0ffee/archive?path=%2Fapp");
        let tarball = engine.body_of("PUT ");
        let mut archive = tar::Archive::new(tarball.as_ref());
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("renamed.txt"));
    }
}
