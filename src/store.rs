//! The remote resource store boundary.
//!
//! [`ResourceStore`] is the sole seam between the assembly engine and the
//! repository. [`HttpStore`] speaks the Fedora/LDP REST dialect over HTTP;
//! [`MemoryStore`] assigns deterministic URIs in process and records every
//! operation, backing `--dry-run` and the test suite.
//!
//! Any response outside the 2xx range is a [`IngestError::RemoteCallFailed`];
//! there is no partial-success handling.

use crate::config;
use crate::error::{IngestError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, info};

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// POSTs a Turtle body under `parent`; returns the assigned URI.
    /// The slug is a path hint the store may reject or rewrite.
    async fn create(&self, parent: &str, turtle: String, slug: Option<&str>) -> Result<String>;

    /// POSTs raw bytes under `parent` as a binary child resource.
    async fn create_binary(
        &self,
        parent: &str,
        data: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<String>;

    /// PATCHes a SPARQL-update body against `target`.
    async fn update(&self, target: &str, sparql: String) -> Result<()>;

    /// Deletes `target`.
    async fn delete(&self, target: &str) -> Result<()>;

    /// URIs of the `ldp:contains` children of `target`.
    async fn list_children(&self, target: &str) -> Result<Vec<String>>;

    /// Repository base URL; the parent of top-level containers.
    fn base_url(&self) -> &str;
}

fn remote_failure(op: &'static str, target: &str, detail: impl ToString) -> IngestError {
    IngestError::RemoteCallFailed {
        op,
        target: target.to_string(),
        detail: detail.to_string(),
    }
}

/// Fedora/LDP REST client with a per-request timeout.
pub struct HttpStore {
    client: reqwest::Client,
    base: String,
}

impl HttpStore {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config::HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Verifies the repository answers at the base URL, retrying a few times
    /// before giving up.
    pub async fn probe(&self) -> anyhow::Result<()> {
        let delay = std::time::Duration::from_secs(config::CONNECT_RETRY_DELAY_SECS);
        for attempt in 1..=config::CONNECT_MAX_RETRIES {
            match self.client.get(&self.base).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) if attempt < config::CONNECT_MAX_RETRIES => {
                    info!(attempt, status = %resp.status(), "Repository not ready, retrying");
                    tokio::time::sleep(delay).await;
                }
                Ok(resp) => {
                    anyhow::bail!(
                        "Repository at {} answered {} after {} attempts",
                        self.base,
                        resp.status(),
                        config::CONNECT_MAX_RETRIES
                    );
                }
                Err(e) if attempt < config::CONNECT_MAX_RETRIES => {
                    info!(attempt, "Cannot reach repository at {}: {e}", self.base);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Cannot reach repository at {} after {} attempts",
                        self.base,
                        config::CONNECT_MAX_RETRIES
                    ));
                }
            }
        }
        anyhow::bail!("Cannot reach repository at {}", self.base)
    }

    async fn read_created_uri(
        &self,
        op: &'static str,
        target: &str,
        resp: reqwest::Response,
    ) -> Result<String> {
        let status = resp.status();
        if !status.is_success() {
            return Err(remote_failure(op, target, format!("status {status}")));
        }
        // Fedora returns the assigned URI as the response body.
        let uri = resp
            .text()
            .await
            .map_err(|e| remote_failure(op, target, e))?;
        Ok(uri.trim().to_string())
    }
}

#[async_trait]
impl ResourceStore for HttpStore {
    async fn create(&self, parent: &str, turtle: String, slug: Option<&str>) -> Result<String> {
        let mut req = self
            .client
            .post(parent)
            .header(CONTENT_TYPE, "text/turtle")
            .body(turtle);
        if let Some(slug) = slug {
            req = req.header("Slug", slug);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| remote_failure("create", parent, e))?;
        let uri = self.read_created_uri("create", parent, resp).await?;
        debug!(parent, uri, "Created resource");
        Ok(uri)
    }

    async fn create_binary(
        &self,
        parent: &str,
        data: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<String> {
        let resp = self
            .client
            .post(parent)
            .header(CONTENT_TYPE, content_type)
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .body(data)
            .send()
            .await
            .map_err(|e| remote_failure("create-binary", parent, e))?;
        let uri = self.read_created_uri("create-binary", parent, resp).await?;
        debug!(parent, uri, filename, "Created binary");
        Ok(uri)
    }

    async fn update(&self, target: &str, sparql: String) -> Result<()> {
        let resp = self
            .client
            .patch(target)
            .header(CONTENT_TYPE, "application/sparql-update")
            .body(sparql)
            .send()
            .await
            .map_err(|e| remote_failure("update", target, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(remote_failure("update", target, format!("status {status}")));
        }
        Ok(())
    }

    async fn delete(&self, target: &str) -> Result<()> {
        let resp = self
            .client
            .delete(target)
            .send()
            .await
            .map_err(|e| remote_failure("delete", target, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(remote_failure("delete", target, format!("status {status}")));
        }
        Ok(())
    }

    async fn list_children(&self, target: &str) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(target)
            .header("Accept", "application/ld+json")
            .send()
            .await
            .map_err(|e| remote_failure("list", target, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(remote_failure("list", target, format!("status {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| remote_failure("list", target, e))?;
        let doc: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| remote_failure("list", target, format!("bad JSON-LD: {e}")))?;
        Ok(contained_uris(&doc, target))
    }

    fn base_url(&self) -> &str {
        &self.base
    }
}

/// Extracts `ldp:contains` child URIs for `target` from a JSON-LD document.
fn contained_uris(doc: &serde_json::Value, target: &str) -> Vec<String> {
    const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
    let target = target.trim_end_matches('/');

    let nodes: Vec<&serde_json::Value> = match doc {
        serde_json::Value::Array(items) => items.iter().collect(),
        other => match other.get("@graph") {
            Some(serde_json::Value::Array(items)) => items.iter().collect(),
            _ => vec![other],
        },
    };

    let mut children = Vec::new();
    for node in nodes {
        let id = node.get("@id").and_then(|id| id.as_str()).unwrap_or("");
        if id.trim_end_matches('/') != target {
            continue;
        }
        match node.get(LDP_CONTAINS) {
            Some(serde_json::Value::Array(entries)) => {
                for entry in entries {
                    if let Some(uri) = entry.get("@id").and_then(|id| id.as_str()) {
                        children.push(uri.to_string());
                    }
                }
            }
            Some(entry) => {
                if let Some(uri) = entry.get("@id").and_then(|id| id.as_str()) {
                    children.push(uri.to_string());
                }
            }
            None => {}
        }
    }
    children
}

/// One recorded store operation, for inspection in dry runs and tests.
#[derive(Debug, Clone)]
pub struct StoreOp {
    pub op: &'static str,
    pub target: String,
    pub body: String,
    pub slug: Option<String>,
    /// URI assigned by the operation, for creates.
    pub assigned: Option<String>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    ops: Vec<StoreOp>,
    children: HashMap<String, Vec<String>>,
    fail_slugs: HashSet<String>,
}

/// In-process store with deterministic URI assignment.
pub struct MemoryStore {
    base: String,
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_base("mem://repo")
    }

    pub fn with_base(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// Makes every future `create` carrying this slug fail, simulating a
    /// rejected resource creation.
    pub fn fail_on_slug(&self, slug: &str) {
        self.lock().fail_slugs.insert(slug.to_string());
    }

    /// All operations recorded so far, in call order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    /// Assigned URIs of every successful `create`/`create-binary`.
    pub fn created(&self) -> Vec<String> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| op.assigned.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn assign(&self, inner: &mut MemoryInner, parent: &str, slug: Option<&str>) -> String {
        let uri = match slug {
            Some(slug) => format!("{parent}/{slug}"),
            None => {
                inner.next_id += 1;
                format!("{parent}/res{}", inner.next_id)
            }
        };
        inner
            .children
            .entry(parent.to_string())
            .or_default()
            .push(uri.clone());
        uri
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn create(&self, parent: &str, turtle: String, slug: Option<&str>) -> Result<String> {
        let mut inner = self.lock();
        if slug.is_some_and(|slug| inner.fail_slugs.contains(slug)) {
            inner.ops.push(StoreOp {
                op: "create",
                target: parent.to_string(),
                body: turtle,
                slug: slug.map(String::from),
                assigned: None,
            });
            return Err(remote_failure("create", parent, "status 409 Conflict"));
        }
        let uri = self.assign(&mut inner, parent, slug);
        inner.ops.push(StoreOp {
            op: "create",
            target: parent.to_string(),
            body: turtle,
            slug: slug.map(String::from),
            assigned: Some(uri.clone()),
        });
        Ok(uri)
    }

    async fn create_binary(
        &self,
        parent: &str,
        data: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<String> {
        let mut inner = self.lock();
        let uri = self.assign(&mut inner, parent, Some(filename));
        inner.ops.push(StoreOp {
            op: "create-binary",
            target: parent.to_string(),
            body: format!("{content_type}; {} bytes", data.len()),
            slug: Some(filename.to_string()),
            assigned: Some(uri.clone()),
        });
        Ok(uri)
    }

    async fn update(&self, target: &str, sparql: String) -> Result<()> {
        self.lock().ops.push(StoreOp {
            op: "update",
            target: target.to_string(),
            body: sparql,
            slug: None,
            assigned: None,
        });
        Ok(())
    }

    async fn delete(&self, target: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.children.remove(target);
        for children in inner.children.values_mut() {
            children.retain(|child| child != target);
        }
        inner.ops.push(StoreOp {
            op: "delete",
            target: target.to_string(),
            body: String::new(),
            slug: None,
            assigned: None,
        });
        Ok(())
    }

    async fn list_children(&self, target: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .children
            .get(target.trim_end_matches('/'))
            .cloned()
            .unwrap_or_default())
    }

    fn base_url(&self) -> &str {
        &self.base
    }
}
