use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{EntityKey, EntityType},
    error::{ApiError, ApiException},
    protocol::{CollectionDocument, CollectionMeta, Document, WriteDocument},
};
use tokio::sync::RwLock;
use tracing::info;

use crate::fixtures::{Fixtures, SearchQuery};

/// A canned failure for requests matching `method` and `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRule {
    pub method: String,
    pub path: String,
    #[serde(default = "default_failure_status")]
    pub status: u16,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

fn default_failure_status() -> u16 {
    500
}

impl FailureRule {
    fn matches(&self, method: &str, path: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
            && self.path.trim_matches('/') == path.trim_matches('/')
    }

    fn exception(&self) -> ApiException {
        let errors = if self.errors.is_empty() {
            vec![ApiError::new("There was an error")]
        } else {
            self.errors.clone()
        };
        ApiException::new(self.status, errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub delay_ms: u64,
}

#[derive(Clone)]
pub struct ApiContext {
    pub fixtures: Arc<RwLock<Fixtures>>,
    failures: Arc<RwLock<Vec<FailureRule>>>,
    delay_ms: Arc<AtomicU64>,
}

impl ApiContext {
    pub fn new(fixtures: Fixtures, delay_ms: u64) -> Self {
        Self {
            fixtures: Arc::new(RwLock::new(fixtures)),
            failures: Arc::new(RwLock::new(Vec::new())),
            delay_ms: Arc::new(AtomicU64::new(delay_ms)),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::Relaxed))
    }
}

fn not_found(key: &EntityKey) -> ApiException {
    ApiException::new(404, vec![ApiError::new(format!("{key} not found"))])
}

pub fn parse_kind(raw: &str) -> Result<EntityType, ApiException> {
    raw.parse::<EntityType>().map_err(|err| {
        ApiException::new(404, vec![ApiError::new(err.to_string())])
    })
}

pub async fn find_resource(ctx: &ApiContext, key: &EntityKey) -> Result<Document, ApiException> {
    let fixtures = ctx.fixtures.read().await;
    fixtures
        .get(key)
        .map(Document::new)
        .ok_or_else(|| not_found(key))
}

pub async fn search(
    ctx: &ApiContext,
    kind: EntityType,
    parent: Option<&EntityKey>,
    query: &SearchQuery,
) -> Result<CollectionDocument, ApiException> {
    let fixtures = ctx.fixtures.read().await;
    if let Some(parent) = parent {
        if fixtures.get(parent).is_none() {
            return Err(not_found(parent));
        }
    }
    let (data, total_results) = fixtures.search(kind, parent, query);
    Ok(CollectionDocument {
        data,
        meta: CollectionMeta { total_results },
        included: Vec::new(),
    })
}

pub async fn update_resource(
    ctx: &ApiContext,
    key: &EntityKey,
    body: WriteDocument,
) -> Result<Document, ApiException> {
    if body.data.kind != key.kind {
        return Err(ApiException::new(
            409,
            vec![ApiError::new(format!(
                "type {} does not match {}",
                body.data.kind.json_name(),
                key.kind.json_name()
            ))],
        ));
    }
    if body.data.id.as_ref().is_some_and(|id| *id != key.id) {
        return Err(ApiException::new(
            409,
            vec![ApiError::new("id does not match the resource path")],
        ));
    }

    let mut fixtures = ctx.fixtures.write().await;
    let resource = fixtures
        .update(key, body.data.attributes)
        .ok_or_else(|| not_found(key))?;
    info!(kind = %key.kind, id = %key.id, "resource updated");
    Ok(Document::new(resource))
}

pub async fn create_title(ctx: &ApiContext, body: WriteDocument) -> Result<Document, ApiException> {
    if body.data.kind != EntityType::Titles {
        return Err(ApiException::new(
            409,
            vec![ApiError::new("only titles can be created")],
        ));
    }
    let blank_name = body
        .data
        .attributes
        .get("name")
        .and_then(|name| name.as_str())
        .map_or(true, |name| name.trim().is_empty());
    if blank_name {
        return Err(ApiException::new(
            422,
            vec![ApiError::new("Name can't be blank")],
        ));
    }

    let mut fixtures = ctx.fixtures.write().await;
    let (title, resource) = fixtures
        .create_title(body.data)
        .map_err(|message| ApiException::new(422, vec![ApiError::new(message)]))?;
    info!(id = %title.id, with_resource = resource.is_some(), "custom title created");

    Ok(Document {
        data: title,
        included: resource.into_iter().collect(),
    })
}

pub async fn add_failure(ctx: &ApiContext, rule: FailureRule) {
    info!(method = %rule.method, path = %rule.path, status = rule.status, "failure rule added");
    ctx.failures.write().await.push(rule);
}

pub async fn clear_failures(ctx: &ApiContext) -> usize {
    let mut failures = ctx.failures.write().await;
    let cleared = failures.len();
    failures.clear();
    cleared
}

/// The injected failure for this request, if any rule matches.
pub async fn failure_for(ctx: &ApiContext, method: &str, path: &str) -> Option<ApiException> {
    ctx.failures
        .read()
        .await
        .iter()
        .find(|rule| rule.matches(method, path))
        .map(FailureRule::exception)
}

pub fn set_timing(ctx: &ApiContext, timing: Timing) {
    ctx.delay_ms.store(timing.delay_ms, Ordering::Relaxed);
    info!(delay_ms = timing.delay_ms, "response delay changed");
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
