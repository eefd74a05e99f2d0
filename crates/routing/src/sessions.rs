//! In-memory record of submitted tasks.
//!
//! One entry per session id. Writes are append-or-overwrite by key; readers
//! only ever receive copies. There is no persistence.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AgentId, BranchName, IssueSummary, SessionId, SessionMode, Timestamp};

/// A tracked submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub issue: IssueSummary,
    pub branch: BranchName,
    pub base_branch: String,
    pub repository: String,
    pub mode: SessionMode,
    pub created_at: Timestamp,
}

#[derive(Debug)]
struct Entry {
    // Write order; the smallest sequence is the oldest entry.
    seq: u64,
    session: Session,
}

#[derive(Debug, Default)]
struct Table {
    next_seq: u64,
    entries: HashMap<SessionId, Entry>,
}

/// Concurrent session table.
///
/// Unbounded unless constructed with [`SessionTracker::with_retention`], in
/// which case the oldest entries are dropped once the table grows past the
/// limit.
#[derive(Debug, Default)]
pub struct SessionTracker {
    table: RwLock<Table>,
    retention: Option<NonZeroUsize>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker that keeps at most `limit` sessions.
    pub fn with_retention(limit: NonZeroUsize) -> Self {
        Self {
            table: RwLock::default(),
            retention: Some(limit),
        }
    }

    /// Inserts or overwrites the entry for `session.session_id`.
    ///
    /// Colliding ids are last-write-wins.
    pub fn record(&self, session: Session) {
        let mut table = self.write();
        let seq = table.next_seq;
        table.next_seq += 1;
        table
            .entries
            .insert(session.session_id.clone(), Entry { seq, session });

        if let Some(limit) = self.retention {
            while table.entries.len() > limit.get() {
                let Some(oldest) = table
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.seq)
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                table.entries.remove(&oldest);
                debug!(session_id = %oldest, "evicted session past retention limit");
            }
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.read()
            .entries
            .get(session_id)
            .map(|entry| entry.session.clone())
    }

    /// A copy of every tracked session, keyed by id.
    pub fn list(&self) -> BTreeMap<SessionId, Session> {
        self.read()
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.session.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave an entry half-written:
    // every mutation is a single map insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
