//! Registry of REST chat sessions.
//!
//! Each session owns its own orchestrator behind an async mutex, which
//! serializes turns within a session. Sessions never share state. A session
//! ends when it is deleted or when it has been idle longer than the
//! configured timeout.

use parley_core::turn::TurnOrchestrator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub type SharedConversation = Arc<Mutex<TurnOrchestrator>>;

struct Entry {
    conversation: SharedConversation,
    last_active: Instant,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionRegistry {
    /// Registers a conversation under a new id.
    pub async fn insert(&self, conversation: TurnOrchestrator) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            Entry {
                conversation: Arc::new(Mutex::new(conversation)),
                last_active: Instant::now(),
            },
        );
        info!(session_id = %id, "Session created");
        id
    }

    /// Looks up a session and marks it active.
    pub async fn get(&self, id: Uuid) -> Option<SharedConversation> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_active = Instant::now();
        Some(entry.conversation.clone())
    }

    /// Ends a session, dropping its transcript. Returns false if unknown.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    /// Drops every session idle for longer than `idle_timeout`.
    ///
    /// A session still held by a request is never evicted, however long its
    /// turn takes. Returns the number of sessions dropped.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let in_use = Arc::strong_count(&entry.conversation) > 1;
            let keep = in_use || entry.last_active.elapsed() <= idle_timeout;
            if !keep {
                info!(session_id = %id, "Session expired after inactivity");
            }
            keep
        });
        before - sessions.len()
    }

    /// Starts a background task that evicts idle sessions every `period`.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        idle_timeout: Duration,
        period: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let evicted = registry.evict_idle(idle_timeout).await;
                if evicted > 0 {
                    let remaining = registry.len().await;
                    debug!(evicted, remaining, "Idle session sweep");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{
        language::WhatlangDetector,
        llm_client::EchoClient,
        speech::GoogleTranslateTts,
        turn::Collaborators,
    };

    fn conversation() -> TurnOrchestrator {
        let collaborators = Collaborators {
            llm: Arc::new(EchoClient),
            detector: Arc::new(WhatlangDetector),
            synthesizer: Arc::new(GoogleTranslateTts::default()),
        };
        TurnOrchestrator::new(&collaborators, 50)
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::default();
        assert!(registry.is_empty().await);

        let id = registry.insert(conversation()).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(id).await.is_some());

        assert!(registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
        assert!(!registry.remove(id).await);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let registry = SessionRegistry::default();
        let first = registry.insert(conversation()).await;
        let second = registry.insert(conversation()).await;
        assert_ne!(first, second);

        let a = registry.get(first).await.unwrap();
        let b = registry.get(second).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let registry = SessionRegistry::default();
        let idle = registry.insert(conversation()).await;
        let active = registry.insert(conversation()).await;

        tokio::time::advance(Duration::from_secs(20)).await;
        registry.get(active).await;
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(registry.evict_idle(Duration::from_secs(30)).await, 1);
        assert!(registry.get(idle).await.is_none());
        assert!(registry.get(active).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_in_use_is_not_evicted() {
        let registry = SessionRegistry::default();
        let id = registry.insert(conversation()).await;
        let held = registry.get(id).await.unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(30)).await, 0);

        drop(held);
        assert_eq!(registry.evict_idle(Duration::from_secs(30)).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_abandoned_sessions() {
        let registry = Arc::new(SessionRegistry::default());
        for _ in 0..3 {
            registry.insert(conversation()).await;
        }
        let sweeper = registry.spawn_sweeper(Duration::from_secs(30), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(registry.is_empty().await);
        sweeper.abort();
    }
}
