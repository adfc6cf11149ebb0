use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{EntityId, EntityKey, EntityType},
    protocol::{
        Attributes, CollectionDocument, Document, Relationship, ResourceWrite, WriteDocument,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod request;
pub mod selection;
pub mod store;
pub mod toast;
pub mod transport;
pub mod validation;

pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, ClientResult};
pub use query::{ItemSlot, QueryCollection, QueryScope, SearchParams, SelectedFilter, SortOrder};
pub use request::{did_resolve, Request, RequestKey, RequestState, RequestTicket};

use request::{RequestKind, RequestTarget};
pub use selection::DeselectionPhase;
pub use store::{Entity, EntityStore};
pub use toast::{Toast, Toaster};
pub use transport::{HttpTransport, Method, ResourceTransport};

use request::RequestTracker;
use selection::{Selections, ToggleOutcome};
use toast::error_toasts;
use validation::{
    validate_all, FieldErrors, PackageFormValues, ProviderFormValues, TitleFormValues,
    PACKAGE_EDIT_VALIDATORS, PROVIDER_EDIT_VALIDATORS, TITLE_CREATE_VALIDATORS,
    TITLE_EDIT_VALIDATORS,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    EntityChanged { key: EntityKey },
    EntitiesUnloaded { keys: Vec<EntityKey> },
    RequestChanged { key: RequestKey, state: RequestState },
    /// An update went from pending to resolved; edit views leave edit mode on it.
    EntitySaved { key: EntityKey },
    CollectionChanged { cache_key: String },
    Toast(Toast),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange {
    /// The write resolved; holds the entity the server returned.
    Saved(Entity),
    /// A deselection is waiting for confirm or cancel.
    AwaitingConfirmation,
}

/// Everything the client caches, behind one lock.
#[derive(Debug, Default)]
pub struct ClientState {
    pub store: EntityStore,
    pub requests: RequestTracker,
    pub selections: Selections,
    collections: HashMap<String, QueryCollection>,
}

impl ClientState {
    pub fn collection(&self, scope: &QueryScope, params: &SearchParams) -> Option<&QueryCollection> {
        self.collections
            .get(&QueryCollection::cache_key(scope, params))
    }

    fn collection_mut(
        &mut self,
        scope: &QueryScope,
        params: &SearchParams,
        page_size: u32,
    ) -> &mut QueryCollection {
        self.collections
            .entry(QueryCollection::cache_key(scope, params))
            .or_insert_with(|| QueryCollection::new(scope.clone(), params.clone(), page_size))
    }

    /// Starts an update of a cached entity with `changes` laid over its attributes.
    fn begin_save(
        &mut self,
        key: &EntityKey,
        changes: &Attributes,
    ) -> ClientResult<(RequestTicket, WriteDocument)> {
        let entity = self
            .store
            .get_key(key)
            .ok_or_else(|| ClientError::NotFound { key: key.clone() })?;
        let body = WriteDocument {
            data: entity.to_write(changes),
        };
        let ticket = self.requests.begin(RequestKey::update(key.clone()));
        Ok((ticket, body))
    }

    /// Releases the selection overlay written by an update ticket.
    fn release_selection(&mut self, ticket: &RequestTicket) {
        if ticket.key.kind != RequestKind::Update {
            return;
        }
        if let RequestTarget::Entity(key) = &ticket.key.target {
            self.selections.release(key, ticket.generation());
        }
    }

    /// Drops tracker cells and idle overlays of entities no longer cached.
    fn forget_entities(&mut self, keys: &[EntityKey]) {
        if keys.is_empty() {
            return;
        }
        self.selections.forget(keys);
        let pruned = self.requests.prune(|request| match &request.target {
            RequestTarget::Entity(key) => !keys.contains(key),
            _ => true,
        });
        debug!(entities = keys.len(), pruned, "forgot request cells of unloaded entities");
    }

    /// Drops the related collections under `parent` along with their page requests.
    fn drop_collections_of(&mut self, parent: &EntityKey) {
        let mut prefixes = Vec::new();
        self.collections.retain(|_, collection| match &collection.scope {
            QueryScope::Related { parent: owner, .. } if owner == parent => {
                prefixes.push(format!("{}?", collection.scope.path()));
                false
            }
            _ => true,
        });
        if prefixes.is_empty() {
            return;
        }
        self.requests.prune(|request| match &request.target {
            RequestTarget::Collection(path) => {
                !prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
            }
            _ => true,
        });
    }

    /// Customer resources belonging to a package, by relationship or by `packageId`.
    fn customer_resources_of(&self, package: &EntityKey) -> Vec<EntityKey> {
        let mut keys = self
            .store
            .get_key(package)
            .map(|entity| entity.related("customerResources"))
            .unwrap_or_default();
        keys.extend(
            self.store
                .of_type(EntityType::CustomerResources)
                .filter(|entity| entity.attr_str("packageId") == Some(package.id.as_str()))
                .map(|entity| entity.key.clone()),
        );
        keys.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        keys.dedup();
        keys
    }
}

/// Async client over the eholdings REST API.
///
/// Network awaits never hold the state lock: an operation locks to go
/// pending, releases, awaits, then locks again to reconcile.
pub struct EholdingsClient {
    transport: Arc<dyn ResourceTransport>,
    page_size: u32,
    inner: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl EholdingsClient {
    pub fn new(settings: &ClientSettings) -> ClientResult<Arc<Self>> {
        let transport = HttpTransport::new(settings)?;
        info!(base_url = %transport.base_url(), "eholdings client configured");
        Ok(Self::with_transport(Arc::new(transport), settings.page_size))
    }

    pub fn with_transport(transport: Arc<dyn ResourceTransport>, page_size: u32) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            transport,
            page_size: page_size.max(1),
            inner: Mutex::new(ClientState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Runs `f` against a consistent view of the cached state.
    pub async fn state<R>(&self, f: impl FnOnce(&ClientState) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    pub async fn entity(&self, key: &EntityKey) -> Option<Entity> {
        self.inner.lock().await.store.get_key(key).cloned()
    }

    pub async fn request(&self, key: &RequestKey) -> Request {
        self.inner.lock().await.requests.get(key)
    }

    /// Error toasts for the latest request under `key`.
    pub async fn toaster(&self, key: &RequestKey) -> Toaster {
        Toaster::for_request(&self.request(key).await)
    }

    pub async fn collection(
        &self,
        scope: &QueryScope,
        params: &SearchParams,
    ) -> Option<QueryCollection> {
        self.inner
            .lock()
            .await
            .collection(scope, params)
            .cloned()
    }

    pub async fn find(&self, key: &EntityKey) -> ClientResult<Entity> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.requests.begin(RequestKey::find(key.clone()))
        };
        self.emit_request(&ticket.key, RequestState::Pending);

        let result = self
            .transport
            .send(Method::Get, &key.resource_path(), None)
            .await
            .and_then(decode::<Document>);

        match result {
            Ok(document) => {
                let entity = {
                    let mut guard = self.inner.lock().await;
                    let entity = self.store_document(&mut guard, document);
                    self.settle_resolved(&mut guard, &ticket);
                    entity
                };
                Ok(entity)
            }
            Err(err) => Err(self.fail(&ticket, err).await),
        }
    }

    /// Fetches several entities at once; results keep the order of `keys`.
    pub async fn find_many(&self, keys: &[EntityKey]) -> Vec<ClientResult<Entity>> {
        join_all(keys.iter().map(|key| self.find(key))).await
    }

    pub async fn root_proxy(&self) -> ClientResult<Entity> {
        self.find(&EntityKey::new(EntityType::RootProxies, "root-proxy"))
            .await
    }

    pub async fn proxy_types(&self) -> ClientResult<Vec<Entity>> {
        let scope = QueryScope::Root(EntityType::ProxyTypes);
        let keys = self.query_page(&scope, &SearchParams::default(), 1).await?;
        let guard = self.inner.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| guard.store.get_key(key).cloned())
            .collect())
    }

    /// Loads one page of a search or relationship collection.
    pub async fn query_page(
        &self,
        scope: &QueryScope,
        params: &SearchParams,
        page: u32,
    ) -> ClientResult<Vec<EntityKey>> {
        let (path, ticket) = {
            let mut guard = self.inner.lock().await;
            let path = guard
                .collection_mut(scope, params, self.page_size)
                .page_path(page);
            let ticket = guard.requests.begin(RequestKey::query(path.clone()));
            (path, ticket)
        };
        self.emit_request(&ticket.key, RequestState::Pending);

        let result = self
            .transport
            .send(Method::Get, &path, None)
            .await
            .and_then(decode::<CollectionDocument>);

        match result {
            Ok(document) => {
                let total = document.meta.total_results;
                let keys = {
                    let mut guard = self.inner.lock().await;
                    let keys = guard.store.put_all(document.data);
                    guard.store.put_all(document.included);
                    guard
                        .collection_mut(scope, params, self.page_size)
                        .record_page(page, keys.clone(), total);
                    self.settle_resolved(&mut guard, &ticket);
                    keys
                };
                info!(%path, page, total, loaded = keys.len(), "collection page loaded");
                self.emit(ClientEvent::CollectionChanged {
                    cache_key: QueryCollection::cache_key(scope, params),
                });
                Ok(keys)
            }
            Err(err) => Err(self.fail(&ticket, err).await),
        }
    }

    /// Ensures every page covering `len` rows from `offset` is loaded, fetching
    /// the missing ones concurrently.
    ///
    /// With no result count yet, the first page is fetched alone and the rest
    /// are planned from the count it reports.
    pub async fn query_range(
        &self,
        scope: &QueryScope,
        params: &SearchParams,
        offset: u64,
        len: u64,
    ) -> ClientResult<QueryCollection> {
        let (first, counted) = self.plan_range(scope, params, offset, len).await;
        let missing = if counted {
            first
        } else {
            for page in first {
                self.query_page(scope, params, page).await?;
            }
            self.plan_range(scope, params, offset, len).await.0
        };

        let results = join_all(
            missing
                .iter()
                .map(|page| self.query_page(scope, params, *page)),
        )
        .await;
        for result in results {
            result?;
        }

        let mut guard = self.inner.lock().await;
        Ok(guard.collection_mut(scope, params, self.page_size).clone())
    }

    async fn plan_range(
        &self,
        scope: &QueryScope,
        params: &SearchParams,
        offset: u64,
        len: u64,
    ) -> (Vec<u32>, bool) {
        let mut guard = self.inner.lock().await;
        let collection = guard.collection_mut(scope, params, self.page_size);
        (
            collection.pages_in_range(offset, len),
            collection.total_results().is_some(),
        )
    }

    /// Writes `changes` over a cached entity.
    pub async fn update(&self, key: &EntityKey, changes: Attributes) -> ClientResult<Entity> {
        let (ticket, body) = {
            let mut guard = self.inner.lock().await;
            guard.begin_save(key, &changes)?
        };
        self.complete_save(ticket, body).await
    }

    pub async fn update_title(
        &self,
        key: &EntityKey,
        values: &TitleFormValues,
    ) -> ClientResult<Entity> {
        reject_invalid(validate_all(values, TITLE_EDIT_VALIDATORS))?;
        self.update(key, values.to_attributes()).await
    }

    /// Saves the package's custom coverage; an empty form clears it.
    pub async fn update_package_coverage(
        &self,
        key: &EntityKey,
        values: &PackageFormValues,
    ) -> ClientResult<Entity> {
        reject_invalid(validate_all(values, PACKAGE_EDIT_VALIDATORS))?;
        let coverage = values.custom_coverages.first().copied().unwrap_or_default();
        self.update(key, coverage.to_attributes()).await
    }

    /// Saves proxy and token settings, keeping the token's prompt and help text.
    pub async fn update_provider(
        &self,
        key: &EntityKey,
        values: &ProviderFormValues,
    ) -> ClientResult<Entity> {
        reject_invalid(validate_all(values, PROVIDER_EDIT_VALIDATORS))?;

        let changes = {
            let guard = self.inner.lock().await;
            let entity = guard
                .store
                .get_key(key)
                .ok_or_else(|| ClientError::NotFound { key: key.clone() })?;

            let mut changes = Attributes::new();
            if let Some(proxy_id) = &values.proxy_id {
                changes.insert("proxy".into(), json!({ "id": proxy_id }));
            }
            if let Some(token) = &values.provider_token {
                let mut provider_token = entity
                    .attr("providerToken")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                provider_token.insert("value".into(), json!(token));
                changes.insert("providerToken".into(), Value::Object(provider_token));
            }
            changes
        };
        self.update(key, changes).await
    }

    /// Creates a custom title inside the chosen package.
    pub async fn create_title(&self, values: &TitleFormValues) -> ClientResult<Entity> {
        reject_invalid(validate_all(values, TITLE_CREATE_VALIDATORS))?;

        let mut data = ResourceWrite {
            kind: EntityType::Titles,
            id: None,
            attributes: values.to_attributes(),
            relationships: Default::default(),
        };
        if let Some(package_id) = values.package_id.as_deref().map(str::trim) {
            data.relationships.insert(
                "packages".into(),
                Relationship::one(EntityType::Packages, package_id),
            );
        }

        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.requests.begin(RequestKey::create(EntityType::Titles))
        };
        self.emit_request(&ticket.key, RequestState::Pending);

        let body = WriteDocument { data };
        let result = self
            .transport
            .send(Method::Post, EntityType::Titles.path(), Some(&body))
            .await
            .and_then(decode::<Document>);

        match result {
            Ok(document) => {
                let entity = {
                    let mut guard = self.inner.lock().await;
                    let entity = self.store_document(&mut guard, document);
                    self.settle_resolved(&mut guard, &ticket);
                    entity
                };
                info!(id = %entity.key.id, name = %values.name.trim(), "custom title created");
                Ok(entity)
            }
            Err(err) => Err(self.fail(&ticket, err).await),
        }
    }

    /// Drops cached entities; the next read has to fetch them again.
    pub async fn unload(&self, kind: EntityType, ids: &[EntityId]) -> Vec<EntityKey> {
        let removed = {
            let mut guard = self.inner.lock().await;
            let removed = guard.store.unload(kind, ids);
            guard.forget_entities(&removed);
            removed
        };
        if !removed.is_empty() {
            self.emit(ClientEvent::EntitiesUnloaded {
                keys: removed.clone(),
            });
        }
        removed
    }

    /// Flips the selection of a package or customer resource.
    ///
    /// Selecting saves at once. Deselecting only records the desired value and
    /// waits for [`confirm_deselection`](Self::confirm_deselection) or
    /// [`cancel_deselection`](Self::cancel_deselection).
    pub async fn toggle_selection(&self, key: &EntityKey) -> ClientResult<SelectionChange> {
        if !key.kind.is_selectable() {
            return Err(ClientError::NotSelectable { key: key.clone() });
        }

        let save = {
            let mut guard = self.inner.lock().await;
            let actual = guard
                .store
                .get_key(key)
                .map(Entity::is_selected)
                .ok_or_else(|| ClientError::NotFound { key: key.clone() })?;
            let pending = guard.requests.is_pending(&RequestKey::update(key.clone()));

            match guard.selections.toggle(key, actual, pending)? {
                ToggleOutcome::Save { desired } => {
                    let (ticket, body) = guard.begin_save(key, &selection_changes(desired))?;
                    guard.selections.attach(key, ticket.generation());
                    Some((ticket, body))
                }
                ToggleOutcome::AwaitingConfirmation => None,
            }
        };
        self.emit(ClientEvent::EntityChanged { key: key.clone() });

        match save {
            Some((ticket, body)) => {
                info!(kind = %key.kind, id = %key.id, "selecting");
                self.finish_selection(key, ticket, body)
                    .await
                    .map(SelectionChange::Saved)
            }
            None => Ok(SelectionChange::AwaitingConfirmation),
        }
    }

    pub async fn confirm_deselection(&self, key: &EntityKey) -> ClientResult<Entity> {
        let (ticket, body) = {
            let mut guard = self.inner.lock().await;
            let desired = guard.selections.confirm(key)?;
            match guard.begin_save(key, &selection_changes(desired)) {
                Ok((ticket, body)) => {
                    guard.selections.attach(key, ticket.generation());
                    (ticket, body)
                }
                Err(err) => {
                    guard.selections.settle(key);
                    return Err(err);
                }
            }
        };
        info!(kind = %key.kind, id = %key.id, "deselection confirmed");
        self.finish_selection(key, ticket, body).await
    }

    /// Abandons a deselection awaiting confirmation; nothing is sent.
    pub async fn cancel_deselection(&self, key: &EntityKey) -> ClientResult<()> {
        {
            let mut guard = self.inner.lock().await;
            guard.selections.cancel(key)?;
        }
        info!(kind = %key.kind, id = %key.id, "deselection cancelled");
        self.emit(ClientEvent::EntityChanged { key: key.clone() });
        Ok(())
    }

    /// Selection as a view shows it: the desired value while one is outstanding.
    pub async fn is_selected(&self, key: &EntityKey) -> Option<bool> {
        let guard = self.inner.lock().await;
        guard
            .store
            .get_key(key)
            .map(|entity| guard.selections.is_selected(key, entity.is_selected()))
    }

    pub async fn is_selecting(&self, key: &EntityKey) -> bool {
        self.inner
            .lock()
            .await
            .requests
            .is_pending(&RequestKey::update(key.clone()))
    }

    pub async fn is_toggleable(&self, key: &EntityKey) -> bool {
        !self.is_selecting(key).await
    }

    pub async fn deselection_phase(&self, key: &EntityKey) -> DeselectionPhase {
        self.inner.lock().await.selections.phase(key)
    }

    async fn finish_selection(
        &self,
        key: &EntityKey,
        ticket: RequestTicket,
        body: WriteDocument,
    ) -> ClientResult<Entity> {
        // The overlay is released with the ticket; a failure falls back to the cached entity.
        let result = self.complete_save(ticket, body).await;
        if result.is_err() {
            warn!(kind = %key.kind, id = %key.id, "selection save failed, reverted");
        }
        self.emit(ClientEvent::EntityChanged { key: key.clone() });
        result
    }

    async fn complete_save(&self, ticket: RequestTicket, body: WriteDocument) -> ClientResult<Entity> {
        self.emit_request(&ticket.key, RequestState::Pending);

        let path = match &body.data.id {
            Some(id) => format!("{}/{}", body.data.kind.path(), id),
            None => body.data.kind.path().to_string(),
        };
        let result = self
            .transport
            .send(Method::Put, &path, Some(&body))
            .await
            .and_then(decode::<Document>);

        match result {
            Ok(document) => {
                let (entity, unloaded) = {
                    let mut guard = self.inner.lock().await;
                    let entity = self.store_document(&mut guard, document);
                    let resolved = self.settle_resolved(&mut guard, &ticket);
                    guard.release_selection(&ticket);

                    let mut unloaded = Vec::new();
                    if resolved && entity.key.kind == EntityType::Packages {
                        let resources = guard.customer_resources_of(&entity.key);
                        unloaded = guard.store.unload_keys(&resources);
                        guard.forget_entities(&unloaded);
                        guard.drop_collections_of(&entity.key);
                    }
                    (entity, unloaded)
                };

                info!(kind = %entity.key.kind, id = %entity.key.id, "entity saved");
                if !unloaded.is_empty() {
                    info!(
                        package = %entity.key.id,
                        unloaded = unloaded.len(),
                        "unloaded customer resources of updated package"
                    );
                    self.emit(ClientEvent::EntitiesUnloaded { keys: unloaded });
                }
                Ok(entity)
            }
            Err(err) => Err(self.fail(&ticket, err).await),
        }
    }

    /// Caches the document and returns its primary entity. Lands even for a
    /// superseded request: the most recently arrived payload wins.
    fn store_document(&self, state: &mut ClientState, document: Document) -> Entity {
        let entity = Entity::from(document.data);
        state.store.put(entity.clone());
        let included = state.store.put_all(document.included);

        self.emit(ClientEvent::EntityChanged {
            key: entity.key.clone(),
        });
        for key in included {
            self.emit(ClientEvent::EntityChanged { key });
        }
        entity
    }

    fn settle_resolved(&self, state: &mut ClientState, ticket: &RequestTicket) -> bool {
        let previous = state.requests.get(&ticket.key);
        let resolved = state.requests.resolve(ticket);
        if resolved {
            self.emit_request(&ticket.key, RequestState::Resolved);
            if let (RequestKind::Update, RequestTarget::Entity(key)) =
                (ticket.key.kind, &ticket.key.target)
            {
                if did_resolve(&previous, &state.requests.get(&ticket.key)) {
                    self.emit(ClientEvent::EntitySaved { key: key.clone() });
                }
            }
        }
        resolved
    }

    /// Rejects the ticket's request and raises its error toasts.
    async fn fail(&self, ticket: &RequestTicket, err: ClientError) -> ClientError {
        let toasts = {
            let mut guard = self.inner.lock().await;
            guard.release_selection(ticket);
            if guard.requests.reject(ticket, err.api_errors()) {
                Some(error_toasts(&guard.requests.get(&ticket.key)))
            } else {
                None
            }
        };

        warn!(request = %ticket.key.target, kind = ?ticket.key.kind, error = %err, "request failed");
        if let Some(toasts) = toasts {
            self.emit_request(&ticket.key, RequestState::Rejected);
            for toast in toasts {
                self.emit(ClientEvent::Toast(toast));
            }
        }
        err
    }

    fn emit_request(&self, key: &RequestKey, state: RequestState) {
        self.emit(ClientEvent::RequestChanged {
            key: key.clone(),
            state,
        });
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

fn selection_changes(desired: bool) -> Attributes {
    let mut changes = Attributes::new();
    changes.insert("isSelected".into(), Value::Bool(desired));
    changes
}

fn reject_invalid(errors: FieldErrors) -> ClientResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Validation(errors))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
