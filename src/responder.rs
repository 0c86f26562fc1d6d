//! Request resolution: stub lookup first, static file fallback second.
//!
//! Each incoming request makes a single resolution pass: extract the
//! effective parameters, query the stub registry, and on a miss map the
//! request path onto the static file root and delegate to the file-send
//! collaborator. A registered stub always masks a static file at the same
//! path. When neither resolves, the outcome is [`Resolution::NotFound`] -
//! a normal terminal result, not an error.

use crate::config::StaticFileConfig;
use crate::registry::{ParamMap, StubRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Read-only view of an incoming request.
///
/// Implemented by the host server's request type; tests use concrete
/// fakes.
pub trait Request: Send + Sync {
    /// Request path, e.g. "/api/users".
    fn path(&self) -> &str;

    /// HTTP method, any casing.
    fn method(&self) -> &str;

    /// Declared `Content-Type` header, if any.
    fn content_type(&self) -> Option<&str>;

    /// Raw request body bytes, if any.
    fn body(&self) -> Option<&[u8]>;

    /// Pre-parsed request parameters (decoded form or query params), if
    /// any.
    fn params(&self) -> Option<&HashMap<String, String>>;
}

/// Filesystem existence check for candidate static files.
pub trait FileSystem: Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }
}

/// Delegate that turns a resolved file path into a response.
///
/// The responder never reads file bytes itself; sending, and the status
/// and headers of the result, are entirely the sender's concern.
#[async_trait]
pub trait FileSender: Send + Sync {
    /// Serve the file at `path`, however the host does that.
    async fn send_file(&self, path: &Path) -> anyhow::Result<Response>;
}

/// Minimal response shape emitted by the responder or a file sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Set a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// A 200 response carrying `value` serialized as JSON.
    pub fn json(value: &Value) -> Self {
        // Serializing a serde_json::Value cannot fail.
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }
}

/// Terminal outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A registered stub matched; its canned value serialized as JSON.
    Stubbed(Response),
    /// No stub matched but a static file did; the sender's response,
    /// verbatim.
    StaticFile(Response),
    /// Neither a stub nor a static file resolved the request. The status
    /// code to render is the caller's decision.
    NotFound,
}

impl Resolution {
    /// The response carried by this outcome, if any.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Resolution::Stubbed(response) | Resolution::StaticFile(response) => Some(response),
            Resolution::NotFound => None,
        }
    }
}

/// Request-level failures surfaced by [`Responder::respond`].
#[derive(Debug, Error)]
pub enum RespondError {
    /// The request declared a JSON content type but its body does not
    /// parse as a JSON object.
    #[error("request body is not a JSON object: {0}")]
    MalformedJsonBody(#[source] serde_json::Error),

    /// The existence check or file sender failed for the resolved path.
    /// The collaborator's error is propagated unchanged.
    #[error("static file collaborator failed for {path:?}: {source}")]
    Collaborator {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Stub-first responder with static file fallback.
///
/// Holds the shared stub registry, the static file settings and the
/// filesystem collaborators. Safe to call from many concurrent requests;
/// no call mutates the registry.
pub struct Responder {
    registry: Arc<StubRegistry>,
    static_files: StaticFileConfig,
    fs: Arc<dyn FileSystem>,
    sender: Arc<dyn FileSender>,
    /// Total requests resolved.
    requests_total: AtomicU64,
    /// Requests answered by a stub.
    requests_matched: AtomicU64,
    /// Requests delegated to the file sender.
    files_sent: AtomicU64,
    /// Requests that resolved to not-found.
    requests_unmatched: AtomicU64,
}

impl Responder {
    /// Create a responder over `registry`, delegating file sends to
    /// `sender`.
    ///
    /// Static file settings default to [`StaticFileConfig::default`]
    /// (root `dist`, no virtual directory) and existence checks to
    /// [`StdFs`].
    pub fn new(registry: Arc<StubRegistry>, sender: Arc<dyn FileSender>) -> Self {
        Self {
            registry,
            static_files: StaticFileConfig::default(),
            fs: Arc::new(StdFs),
            sender,
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            files_sent: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    /// Replace the static file settings.
    pub fn with_static_files(mut self, config: StaticFileConfig) -> Self {
        self.static_files = config;
        self
    }

    /// Replace the filesystem existence collaborator.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Get total requests resolved.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests answered by a stub.
    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests delegated to the file sender.
    pub fn total_files_sent(&self) -> u64 {
        self.files_sent.load(Ordering::Relaxed)
    }

    /// Get total requests that resolved to not-found.
    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    /// Resolve one request.
    ///
    /// Queries the registry with the request's path, method and effective
    /// parameters; on a hit returns the stub's response as JSON, on a miss
    /// maps the path onto the static file root and delegates to the file
    /// sender if the candidate exists. A malformed JSON body or a failing
    /// collaborator is fatal for this request only and leaves the registry
    /// untouched.
    pub async fn respond(&self, request: &dyn Request) -> Result<Resolution, RespondError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let params = effective_params(request)?;
        let path = request.path();
        let method = request.method();

        if let Some(stub) = self.registry.find(path, method, &params) {
            self.requests_matched.fetch_add(1, Ordering::Relaxed);
            info!(method = %method, path = %path, "request matched stub");
            return Ok(Resolution::Stubbed(Response::json(&stub.response)));
        }

        let Some(candidate) = self.static_files.resolve(path) else {
            self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(method = %method, path = %path, "request path escapes the static file root");
            return Ok(Resolution::NotFound);
        };

        let exists = self
            .fs
            .exists(&candidate)
            .map_err(|e| RespondError::Collaborator {
                path: candidate.clone(),
                source: e.into(),
            })?;

        if exists {
            debug!(file = %candidate.display(), "delegating to file sender");
            let response =
                self.sender
                    .send_file(&candidate)
                    .await
                    .map_err(|e| RespondError::Collaborator {
                        path: candidate.clone(),
                        source: e,
                    })?;
            self.files_sent.fetch_add(1, Ordering::Relaxed);
            return Ok(Resolution::StaticFile(response));
        }

        self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
        warn!(method = %method, path = %path, "no stub and no static file");
        Ok(Resolution::NotFound)
    }
}

/// Effective parameters for stub matching.
///
/// A request declaring a JSON content type has its body parsed as a JSON
/// object; anything else falls back to the pre-parsed parameters, mapped
/// to JSON string values. A JSON-declared body that does not parse as an
/// object is fatal, never silently treated as empty.
fn effective_params(request: &dyn Request) -> Result<ParamMap, RespondError> {
    if declares_json(request.content_type()) {
        let body = request.body().unwrap_or_default();
        return serde_json::from_slice(body).map_err(RespondError::MalformedJsonBody);
    }

    Ok(request
        .params()
        .map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect()
        })
        .unwrap_or_default())
}

/// Whether a declared content type is `application/json`, ignoring
/// parameters such as `; charset=UTF-8`.
fn declares_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
