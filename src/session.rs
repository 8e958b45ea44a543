//! Per-chat session state (language + last search results)
//!
//! The store is the single synchronization boundary of the bot: handlers
//! hold no session data across calls and always go through this API.
//! Each chat gets its own `RwLock`ed entry, so bursts within one chat
//! serialize on that entry while unrelated chats proceed in parallel.
//! Entries are evicted after an idle TTL to bound memory over long runs;
//! an evicted chat only loses its language pick and a stale track list.

use crate::i18n::Lang;
use crate::provider::Track;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct Session {
    lang: Option<Lang>,
    results: Option<Vec<Track>>,
}

/// Concurrency-safe store of per-chat sessions
pub struct SessionStore {
    sessions: Cache<i64, Arc<RwLock<Session>>>,
    default_lang: Lang,
}

impl SessionStore {
    /// Create a store with the given fallback language and eviction
    /// parameters
    #[must_use]
    pub fn new(default_lang: Lang, idle_ttl: Duration, max_capacity: u64) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle_ttl)
            .build();
        Self {
            sessions,
            default_lang,
        }
    }

    /// Get-or-create the entry for a chat
    async fn entry(&self, chat_id: i64) -> Arc<RwLock<Session>> {
        self.sessions
            .get_with(chat_id, async { Arc::new(RwLock::new(Session::default())) })
            .await
    }

    /// Active language for a chat, falling back to the configured default.
    ///
    /// Never fails and never creates an entry.
    pub async fn language(&self, chat_id: i64) -> Lang {
        match self.sessions.get(&chat_id).await {
            Some(entry) => entry.read().await.lang.unwrap_or(self.default_lang),
            None => self.default_lang,
        }
    }

    /// Store an explicit language pick, overwriting unconditionally
    pub async fn set_language(&self, chat_id: i64, lang: Lang) {
        let entry = self.entry(chat_id).await;
        entry.write().await.lang = Some(lang);
    }

    /// Replace the chat's result set wholesale.
    ///
    /// Callers must not pass an empty list: a search with no results
    /// leaves the previous set addressable.
    pub async fn set_results(&self, chat_id: i64, tracks: Vec<Track>) {
        let entry = self.entry(chat_id).await;
        entry.write().await.results = Some(tracks);
    }

    /// Track at `index` in the chat's current result set.
    ///
    /// Returns `None` when the chat has no result set or the index is out
    /// of range against the set installed by the most recent completed
    /// [`set_results`](Self::set_results). Indices from superseded sets
    /// are rejected the same way, never remapped.
    pub async fn track_at(&self, chat_id: i64, index: usize) -> Option<Track> {
        let entry = self.sessions.get(&chat_id).await?;
        let session = entry.read().await;
        session.results.as_ref()?.get(index).cloned()
    }

    /// Number of live sessions, for monitoring
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}
