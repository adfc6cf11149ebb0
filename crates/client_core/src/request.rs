use std::{collections::HashMap, fmt};

use chrono::Utc;
use shared::{
    domain::{EntityKey, EntityType},
    error::ApiError,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Find,
    Query,
    Create,
    Update,
    Destroy,
}

/// What a request is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    Entity(EntityKey),
    /// An entity of this type that has no id yet.
    New(EntityType),
    /// A collection path with its encoded query string.
    Collection(String),
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestTarget::Entity(key) => write!(f, "{key}"),
            RequestTarget::New(kind) => write!(f, "{kind}/new"),
            RequestTarget::Collection(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub kind: RequestKind,
    pub target: RequestTarget,
}

impl RequestKey {
    pub fn find(key: EntityKey) -> Self {
        Self {
            kind: RequestKind::Find,
            target: RequestTarget::Entity(key),
        }
    }

    pub fn update(key: EntityKey) -> Self {
        Self {
            kind: RequestKind::Update,
            target: RequestTarget::Entity(key),
        }
    }

    pub fn create(kind: EntityType) -> Self {
        Self {
            kind: RequestKind::Create,
            target: RequestTarget::New(kind),
        }
    }

    pub fn query(path: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Query,
            target: RequestTarget::Collection(path.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

/// Lifecycle of the latest request issued for one key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub state: RequestState,
    pub errors: Vec<ApiError>,
    /// Milliseconds since the epoch when the request went pending; keys toast identity.
    pub timestamp: Option<i64>,
    generation: u64,
}

impl Request {
    pub fn is_idle(&self) -> bool {
        self.state == RequestState::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state == RequestState::Resolved
    }

    pub fn is_rejected(&self) -> bool {
        self.state == RequestState::Rejected
    }
}

/// True when `current` is the settled success of the request `previous` was waiting on.
pub fn did_resolve(previous: &Request, current: &Request) -> bool {
    previous.is_pending() && current.is_resolved() && previous.generation == current.generation
}

/// Handle for one issued request; completing a superseded ticket leaves the cell alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub key: RequestKey,
    pub timestamp: i64,
    generation: u64,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    requests: HashMap<RequestKey, Request>,
    last_timestamp: i64,
    next_generation: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RequestKey) -> Request {
        self.requests.get(key).cloned().unwrap_or_default()
    }

    pub fn is_pending(&self, key: &RequestKey) -> bool {
        self.requests.get(key).is_some_and(Request::is_pending)
    }

    /// Moves the cell to pending from any state, discarding earlier errors.
    pub fn begin(&mut self, key: RequestKey) -> RequestTicket {
        let timestamp = self.next_timestamp();
        self.next_generation += 1;
        let generation = self.next_generation;

        self.requests.insert(
            key.clone(),
            Request {
                state: RequestState::Pending,
                errors: Vec::new(),
                timestamp: Some(timestamp),
                generation,
            },
        );
        debug!(request = %key.target, kind = ?key.kind, timestamp, "request pending");

        RequestTicket {
            key,
            timestamp,
            generation,
        }
    }

    pub fn resolve(&mut self, ticket: &RequestTicket) -> bool {
        self.settle(ticket, RequestState::Resolved, Vec::new())
    }

    pub fn reject(&mut self, ticket: &RequestTicket, errors: Vec<ApiError>) -> bool {
        self.settle(ticket, RequestState::Rejected, errors)
    }

    /// Drops settled cells `keep` rejects; pending cells always stay so their
    /// completion still lands.
    pub fn prune(&mut self, mut keep: impl FnMut(&RequestKey) -> bool) -> usize {
        let before = self.requests.len();
        self.requests
            .retain(|key, request| request.is_pending() || keep(key));
        before - self.requests.len()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn settle(&mut self, ticket: &RequestTicket, state: RequestState, errors: Vec<ApiError>) -> bool {
        let Some(request) = self.requests.get_mut(&ticket.key) else {
            return false;
        };
        if request.generation != ticket.generation || !request.is_pending() {
            debug!(
                request = %ticket.key.target,
                kind = ?ticket.key.kind,
                "ignoring completion of superseded request"
            );
            return false;
        }

        request.state = state;
        request.errors = errors;
        true
    }

    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }
}
