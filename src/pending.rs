//! Optimistic check-in creation.
//!
//! A check-in is shown locally as soon as it is logged, then either replaced
//! by the record the backend saved or dropped when the save fails. The list
//! is rebuilt by the pure merge functions below; [`Tracker`] drives them
//! against an injected [`CheckInBackend`].

use crate::aggregate::build_dashboard;
use crate::backend::CheckInBackend;
use crate::errors::BackendError;
use crate::models::{CheckIn, Dashboard, Mood, NewCheckIn};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Entries kept in a tracker's local list.
pub const LOCAL_CAP: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum PendingState {
    Pending,
    Confirmed(CheckIn),
    RolledBack { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCheckIn {
    pub temp_id: String,
    pub user_id: String,
    pub mood: Mood,
    pub notes: Option<String>,
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub state: PendingState,
}

impl PendingCheckIn {
    pub fn new(temp_id: impl Into<String>, user_id: impl Into<String>, mood: Mood) -> Self {
        Self {
            temp_id: temp_id.into(),
            user_id: user_id.into(),
            mood,
            notes: None,
            emotion: None,
            created_at: Utc::now(),
            state: PendingState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PendingState::Pending)
    }

    /// Moves a pending entry to `Confirmed` or `RolledBack`.
    pub fn settle(&mut self, outcome: &Result<CheckIn, BackendError>) -> Result<(), BackendError> {
        if !self.is_pending() {
            return Err(BackendError::AlreadySettled(self.temp_id.clone()));
        }
        self.state = match outcome {
            Ok(saved) => PendingState::Confirmed(saved.clone()),
            Err(err) => PendingState::RolledBack {
                reason: err.to_string(),
            },
        };
        Ok(())
    }

    fn to_request(&self) -> NewCheckIn {
        NewCheckIn {
            user_id: self.user_id.clone(),
            mood: i64::from(self.mood.value()),
            notes: self.notes.clone(),
            emotion: self.emotion.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Pending(PendingCheckIn),
    Saved(CheckIn),
}

impl LedgerEntry {
    pub fn mood(&self) -> Mood {
        match self {
            Self::Pending(pending) => pending.mood,
            Self::Saved(saved) => saved.mood,
        }
    }

    fn temp_id(&self) -> Option<&str> {
        match self {
            Self::Pending(pending) => Some(&pending.temp_id),
            Self::Saved(_) => None,
        }
    }
}

/// Prepends a pending entry, keeping at most `cap` entries.
pub fn insert_optimistic(
    entries: Vec<LedgerEntry>,
    pending: PendingCheckIn,
    cap: usize,
) -> Vec<LedgerEntry> {
    std::iter::once(LedgerEntry::Pending(pending))
        .chain(entries)
        .take(cap)
        .collect()
}

/// Drops the entry matching a settled check-in and, when it was confirmed,
/// puts the saved record at the front.
pub fn reconcile(
    entries: Vec<LedgerEntry>,
    settled: &PendingCheckIn,
    cap: usize,
) -> Vec<LedgerEntry> {
    let rest = entries
        .into_iter()
        .filter(|entry| entry.temp_id() != Some(settled.temp_id.as_str()));

    match &settled.state {
        PendingState::Confirmed(saved) => std::iter::once(LedgerEntry::Saved(saved.clone()))
            .chain(rest)
            .take(cap)
            .collect(),
        PendingState::Pending | PendingState::RolledBack { .. } => rest.take(cap).collect(),
    }
}

/// Local, optimistic view of one user's recent check-ins.
pub struct Tracker {
    backend: Arc<dyn CheckInBackend>,
    user_id: String,
    entries: Vec<LedgerEntry>,
    cap: usize,
    sequence: u64,
}

impl Tracker {
    pub fn new(backend: Arc<dyn CheckInBackend>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            entries: Vec::new(),
            cap: LOCAL_CAP,
            sequence: 0,
        }
    }

    pub async fn load(&mut self) -> Result<(), BackendError> {
        let rows = self.backend.list_recent(&self.user_id, self.cap).await?;
        self.entries = rows.into_iter().map(LedgerEntry::Saved).collect();
        Ok(())
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Confirmed check-ins, most recent first.
    pub fn saved(&self) -> Vec<CheckIn> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LedgerEntry::Saved(saved) => Some(saved.clone()),
                LedgerEntry::Pending(_) => None,
            })
            .collect()
    }

    pub fn dashboard(&self) -> Dashboard {
        build_dashboard(&self.saved())
    }

    /// Shows the check-in immediately, then settles it against the backend.
    ///
    /// Dropping the returned future before the backend answers rolls the
    /// optimistic entry back.
    pub async fn log_mood(
        &mut self,
        mood: i64,
        notes: Option<String>,
        emotion: Option<String>,
    ) -> Result<CheckIn, BackendError> {
        let mood = Mood::new(mood)?;
        let mut pending = PendingCheckIn {
            notes,
            emotion,
            ..PendingCheckIn::new(self.next_temp_id(), self.user_id.clone(), mood)
        };
        let backend = Arc::clone(&self.backend);
        let cap = self.cap;
        self.entries = insert_optimistic(std::mem::take(&mut self.entries), pending.clone(), cap);

        let mut guard = RollbackOnDrop {
            entries: &mut self.entries,
            temp_id: pending.temp_id.clone(),
            armed: true,
        };
        let outcome = backend.create_check_in(pending.to_request()).await;
        guard.armed = false;
        pending.settle(&outcome)?;
        *guard.entries = reconcile(std::mem::take(guard.entries), &pending, cap);

        match &outcome {
            Ok(saved) => info!("check-in {} confirmed as {}", pending.temp_id, saved.id),
            Err(err) => warn!("check-in {} rolled back: {err}", pending.temp_id),
        }
        outcome
    }

    fn next_temp_id(&mut self) -> String {
        self.sequence += 1;
        format!("temp-{}-{}", Utc::now().timestamp_millis(), self.sequence)
    }
}

/// Removes an optimistic entry whose save never settled.
struct RollbackOnDrop<'a> {
    entries: &'a mut Vec<LedgerEntry>,
    temp_id: String,
    armed: bool,
}

impl Drop for RollbackOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let temp_id = self.temp_id.as_str();
        self.entries.retain(|entry| entry.temp_id() != Some(temp_id));
        warn!("check-in {temp_id} rolled back: save was cancelled");
    }
}
