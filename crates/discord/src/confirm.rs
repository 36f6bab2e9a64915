//! Confirmation workflow state.
//!
//! One explicit state machine per prompt message, kept in an in-memory map
//! and resolved by lookup-and-replace. The only invariant is that a terminal
//! state never transitions again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::components::disabled_confirm_rows;
use crate::rest::ChannelApi;

/// How long a prompt stays clickable before it auto-expires.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the sweeper looks for expired prompts.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The originating message a confirmation is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalCandidate {
    pub author_id: String,
    pub channel_id: String,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Pending,
    ResolvedYes,
    ResolvedNo,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

/// Outcome of a click against the stored state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// No pending confirmation for this message (stale or already swept).
    NotFound,
    /// Clicker is not the proposal author; state is unchanged.
    NotAuthor,
    /// The 60-second window had already elapsed; state moved to `Expired`.
    Expired,
    /// Valid click by the author; state moved to the terminal decision.
    Resolved { candidate: ProposalCandidate, state: WorkflowState },
}

#[derive(Debug)]
struct Confirmation {
    candidate: ProposalCandidate,
    state: WorkflowState,
    created_at: Instant,
}

/// Pending confirmations keyed by the prompt message id.
pub struct ConfirmationStore {
    entries: Mutex<HashMap<String, Confirmation>>,
    timeout: Duration,
}

impl Default for ConfirmationStore {
    fn default() -> Self {
        Self::with_timeout(CONFIRMATION_TIMEOUT)
    }
}

impl ConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), timeout }
    }

    pub async fn insert(&self, prompt_message_id: impl Into<String>, candidate: ProposalCandidate) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            prompt_message_id.into(),
            Confirmation { candidate, state: WorkflowState::Pending, created_at: Instant::now() },
        );
    }

    /// Apply a click. Only a `Pending` entry clicked by its author within the
    /// window transitions; every other case leaves the stored state alone
    /// (except a late click, which marks the entry `Expired`).
    pub async fn resolve(
        &self,
        prompt_message_id: &str,
        clicker_id: &str,
        decision: Decision,
    ) -> Resolution {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(prompt_message_id) else {
            return Resolution::NotFound;
        };

        if entry.state != WorkflowState::Pending {
            return Resolution::NotFound;
        }

        if entry.created_at.elapsed() >= self.timeout {
            entry.state = WorkflowState::Expired;
            return Resolution::Expired;
        }

        if entry.candidate.author_id != clicker_id {
            return Resolution::NotAuthor;
        }

        entry.state = match decision {
            Decision::Accept => WorkflowState::ResolvedYes,
            Decision::Decline => WorkflowState::ResolvedNo,
        };
        Resolution::Resolved { candidate: entry.candidate.clone(), state: entry.state }
    }

    /// Move timed-out `Pending` entries to `Expired` and return them so the
    /// caller can disable their buttons. Terminal entries are dropped; no
    /// reference to a resolved confirmation is kept.
    pub async fn sweep_expired(&self) -> Vec<(String, ProposalCandidate)> {
        let mut entries = self.entries.lock().await;
        let mut expired = Vec::new();

        for (prompt_message_id, entry) in entries.iter_mut() {
            if entry.state == WorkflowState::Pending && entry.created_at.elapsed() >= self.timeout {
                entry.state = WorkflowState::Expired;
                expired.push((prompt_message_id.clone(), entry.candidate.clone()));
            }
        }

        entries.retain(|_, entry| entry.state == WorkflowState::Pending);
        expired
    }

    pub async fn state_of(&self, prompt_message_id: &str) -> Option<WorkflowState> {
        let entries = self.entries.lock().await;
        entries.get(prompt_message_id).map(|entry| entry.state)
    }

    pub async fn pending_count(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.state == WorkflowState::Pending).count()
    }
}

/// Background task that disables the buttons on expired prompts. The
/// original platform handled this timeout itself; here it is explicit.
pub fn spawn_expiry_sweeper<A>(api: Arc<A>, store: Arc<ConfirmationStore>) -> JoinHandle<()>
where
    A: ChannelApi + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_pass(api.as_ref(), store.as_ref()).await;
        }
    })
}

/// One sweeper tick: expire stale prompts and disable their controls. A
/// failed edit is logged and the pass continues with the rest.
async fn sweep_pass<A>(api: &A, store: &ConfirmationStore)
where
    A: ChannelApi,
{
    for (prompt_message_id, candidate) in store.sweep_expired().await {
        info!(
            event_name = "session.confirmation_expired",
            prompt_message_id = %prompt_message_id,
            channel_id = %candidate.channel_id,
            "confirmation expired without a click"
        );
        if let Err(error) = api
            .edit_message_components(
                &candidate.channel_id,
                &prompt_message_id,
                &disabled_confirm_rows(),
            )
            .await
        {
            warn!(
                prompt_message_id = %prompt_message_id,
                error = %error,
                "failed to disable controls on expired prompt"
            );
        }
    }
}
