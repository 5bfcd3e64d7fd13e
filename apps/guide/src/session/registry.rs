//! SessionRegistry: one Orchestrator per session id.
//!
//! Each session sits behind its own mutex, so queries for one session are
//! serialized while different sessions never contend past the map lookup.
//! Sessions left idle longer than the configured TTL are evicted on the next
//! `create` or `get`; a session busy with a query is never evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::generation::Generator;
use crate::reference::ReferenceSource;
use crate::retrieval::Clock;
use crate::session::orchestrator::{Orchestrator, PipelineSettings, SessionError};

pub type SessionHandle = Arc<Mutex<Orchestrator>>;

struct SessionEntry {
    handle: SessionHandle,
    last_used: Instant,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    source: Arc<dyn ReferenceSource>,
    generator: Arc<dyn Generator>,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(
        source: Arc<dyn ReferenceSource>,
        generator: Arc<dyn Generator>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            source,
            generator,
            clock,
            settings,
            idle_ttl,
        }
    }

    /// Creates and initializes a session. It starts with no city selected.
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let mut orchestrator = Orchestrator::new(
            self.source.clone(),
            self.generator.clone(),
            self.clock.clone(),
            self.settings,
        );
        orchestrator.initialize();

        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(orchestrator));

        let mut sessions = self.sessions.write().await;
        evict_idle(&mut sessions, self.idle_ttl);
        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_used: Instant::now(),
            },
        );
        info!("Session {id} created ({} active)", sessions.len());
        (id, handle)
    }

    /// Looks up a session and marks it as used.
    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        evict_idle(&mut sessions, self.idle_ttl);

        let entry = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        entry.last_used = Instant::now();
        Ok(entry.handle.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!("Session {id} ended");
                Ok(())
            }
            None => Err(SessionError::UnknownSession(id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, SessionEntry>, idle_ttl: Duration) {
    let now = Instant::now();
    sessions.retain(|id, entry| {
        // A locked session is mid-query.
        let keep = now.duration_since(entry.last_used) < idle_ttl
            || entry.handle.try_lock().is_err();
        if !keep {
            info!("Session {id} evicted after {}s idle", idle_ttl.as_secs());
        }
        keep
    });
}
