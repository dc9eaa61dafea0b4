//! Setup wizard state machine.
//!
//! An approved administrator declares how many reward channels they want,
//! sends that many `<id> <link>` lines, then does the same for gate groups.
//! Every accepted line is written to the [`ConfigStore`] immediately, so a
//! session abandoned half-way keeps what was already entered.

use std::{
    collections::HashMap,
    fmt,
    num::NonZeroU32,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
    Error, Result,
    store::ConfigStore,
    types::{ChatRecord, RecordKind, UserId},
};

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    AwaitingChannelCount,
    AwaitingChannelDetail,
    AwaitingGroupCount,
    AwaitingGroupDetail,
    Complete,
}

impl SetupPhase {
    /// The record kind this phase collects, if any.
    pub fn kind(self) -> Option<RecordKind> {
        match self {
            Self::AwaitingChannelCount | Self::AwaitingChannelDetail => Some(RecordKind::Channel),
            Self::AwaitingGroupCount | Self::AwaitingGroupDetail => Some(RecordKind::Group),
            Self::Complete => None,
        }
    }

    pub fn is_count(self) -> bool {
        matches!(self, Self::AwaitingChannelCount | Self::AwaitingGroupCount)
    }
}

impl fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingChannelCount => "awaiting_channel_count",
            Self::AwaitingChannelDetail => "awaiting_channel_detail",
            Self::AwaitingGroupCount => "awaiting_group_count",
            Self::AwaitingGroupDetail => "awaiting_group_detail",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Transient per-administrator dialogue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupSession {
    pub phase: SetupPhase,
    pub channel_target: u32,
    pub channels_received: u32,
    pub group_target: u32,
    pub groups_received: u32,
    /// Chat the session was opened from; input from elsewhere is ignored.
    pub chat_id: i64,
    epoch: u64,
    last_touched: Instant,
}

impl SetupSession {
    fn new(epoch: u64, chat_id: i64, now: Instant) -> Self {
        Self {
            phase: SetupPhase::AwaitingChannelCount,
            channel_target: 0,
            channels_received: 0,
            group_target: 0,
            groups_received: 0,
            chat_id,
            epoch,
            last_touched: now,
        }
    }

    /// Same session, same phase, same progress.
    fn is_at(&self, other: &SetupSession) -> bool {
        self.epoch == other.epoch
            && self.phase == other.phase
            && self.channels_received == other.channels_received
            && self.groups_received == other.groups_received
    }

    fn accept_count(&mut self, count: NonZeroU32) {
        match self.phase {
            SetupPhase::AwaitingChannelCount => {
                self.channel_target = count.get();
                self.channels_received = 0;
                self.phase = SetupPhase::AwaitingChannelDetail;
            },
            SetupPhase::AwaitingGroupCount => {
                self.group_target = count.get();
                self.groups_received = 0;
                self.phase = SetupPhase::AwaitingGroupDetail;
            },
            _ => {},
        }
    }

    /// Count one stored record and advance once the target is reached.
    fn record_stored(&mut self) {
        match self.phase {
            SetupPhase::AwaitingChannelDetail => {
                self.channels_received += 1;
                if self.channels_received >= self.channel_target {
                    self.phase = SetupPhase::AwaitingGroupCount;
                }
            },
            SetupPhase::AwaitingGroupDetail => {
                self.groups_received += 1;
                if self.groups_received >= self.group_target {
                    self.phase = SetupPhase::Complete;
                }
            },
            _ => {},
        }
    }

    fn progress(&self, kind: RecordKind) -> (u32, u32) {
        match kind {
            RecordKind::Channel => (self.channels_received, self.channel_target),
            RecordKind::Group => (self.groups_received, self.group_target),
        }
    }
}

/// What a single line of administrator input did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStep {
    /// A count was accepted; the first detail line is expected next.
    CountAccepted { kind: RecordKind },
    /// A record was stored and more of the same kind are expected.
    RecordStored {
        kind: RecordKind,
        received: u32,
        target: u32,
    },
    /// The last channel was stored; the group count is expected next.
    ChannelsComplete,
    /// The last group was stored and the session was cleared.
    SetupComplete,
    /// Input did not parse; the session stays where it was.
    Rejected { phase: SetupPhase, reason: String },
}

/// Parse a declared count: a strictly positive integer.
pub fn parse_count(text: &str) -> Result<NonZeroU32> {
    text.trim()
        .parse::<NonZeroU32>()
        .map_err(|e| Error::invalid_argument(format!("not a positive count: {text:?} ({e})")))
}

/// Owns every open setup session, keyed by administrator.
pub struct SetupWizard {
    store: Arc<dyn ConfigStore>,
    // Only ever locked for synchronous map operations, never across `.await`.
    sessions: Mutex<HashMap<UserId, SetupSession>>,
    // One input is processed at a time per administrator, store write included.
    turns: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
    next_epoch: AtomicU64,
    idle_timeout: Option<Duration>,
}

impl SetupWizard {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            turns: Mutex::new(HashMap::new()),
            next_epoch: AtomicU64::new(1),
            idle_timeout: None,
        }
    }

    /// Expire sessions that saw no input for `timeout`. `None` disables
    /// expiry.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<UserId, SetupSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn turn(&self, admin: UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(turns.entry(admin).or_default())
    }

    fn is_expired(&self, session: &SetupSession, now: Instant) -> bool {
        self.idle_timeout
            .is_some_and(|ttl| now.duration_since(session.last_touched) >= ttl)
    }

    /// Open a fresh session for `admin` in `chat_id`, discarding any open
    /// one.
    ///
    /// Returns `true` when an existing session was replaced.
    pub fn start(&self, admin: UserId, chat_id: i64) -> bool {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .sessions()
            .insert(admin, SetupSession::new(epoch, chat_id, Instant::now()))
            .is_some();
        info!(admin_id = admin.0, chat_id, replaced, "setup session started");
        replaced
    }

    /// Snapshot of the live session for `admin`, expiring it if idle.
    pub fn session(&self, admin: UserId) -> Option<SetupSession> {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let session = *sessions.get(&admin)?;
        if self.is_expired(&session, now) {
            sessions.remove(&admin);
            info!(admin_id = admin.0, phase = %session.phase, "setup session expired");
            return None;
        }
        Some(session)
    }

    pub fn phase(&self, admin: UserId) -> Option<SetupPhase> {
        self.session(admin).map(|s| s.phase)
    }

    /// Drop the session for `admin`. Returns `true` if one was open.
    pub fn abandon(&self, admin: UserId) -> bool {
        let removed = self.sessions().remove(&admin).is_some();
        if removed {
            info!(admin_id = admin.0, "setup session abandoned");
        }
        removed
    }

    /// Remove every idle session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        if self.idle_timeout.is_none() {
            return 0;
        }
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "expired idle setup sessions");
        }
        removed
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }

    /// Feed one line of text sent by `admin` in `chat_id` into their session.
    ///
    /// Returns `Ok(None)` when `admin` has no open session in that chat.
    pub async fn advance(
        &self,
        admin: UserId,
        chat_id: i64,
        text: &str,
    ) -> Result<Option<WizardStep>> {
        let turn = self.turn(admin);
        let _turn = turn.lock().await;

        let Some(snapshot) = self.session(admin) else {
            return Ok(None);
        };
        if snapshot.chat_id != chat_id {
            debug!(
                admin_id = admin.0,
                chat_id,
                session_chat_id = snapshot.chat_id,
                "ignoring setup input from another chat"
            );
            return Ok(None);
        }
        let Some(kind) = snapshot.phase.kind() else {
            self.sessions().remove(&admin);
            return Ok(None);
        };

        if snapshot.phase.is_count() {
            let count = match parse_count(text) {
                Ok(count) => count,
                Err(e) => return Ok(Some(self.reject(admin, snapshot.phase, e))),
            };
            let applied = self.update(admin, &snapshot, |s| s.accept_count(count));
            if applied.is_none() {
                return Ok(None);
            }
            info!(admin_id = admin.0, %kind, count = count.get(), "setup count accepted");
            return Ok(Some(WizardStep::CountAccepted { kind }));
        }

        let record: ChatRecord = match text.parse() {
            Ok(record) => record,
            Err(e) => return Ok(Some(self.reject(admin, snapshot.phase, e))),
        };
        self.store.upsert(admin, kind, &record).await?;

        let Some(session) = self.update(admin, &snapshot, SetupSession::record_stored) else {
            return Ok(None);
        };
        let (received, target) = session.progress(kind);
        debug!(
            admin_id = admin.0,
            %kind,
            chat_id = %record.chat_id,
            received,
            target,
            "setup record stored"
        );

        let step = match session.phase {
            SetupPhase::Complete => {
                self.sessions().remove(&admin);
                info!(admin_id = admin.0, "setup complete");
                WizardStep::SetupComplete
            },
            SetupPhase::AwaitingGroupCount => WizardStep::ChannelsComplete,
            _ => WizardStep::RecordStored {
                kind,
                received,
                target,
            },
        };
        Ok(Some(step))
    }

    fn reject(&self, admin: UserId, phase: SetupPhase, error: Error) -> WizardStep {
        debug!(admin_id = admin.0, %phase, %error, "setup input rejected");
        if let Some(session) = self.sessions().get_mut(&admin) {
            session.last_touched = Instant::now();
        }
        WizardStep::Rejected {
            phase,
            reason: error.to_string(),
        }
    }

    /// Apply `f` to the session if it has not moved since `snapshot`.
    fn update(
        &self,
        admin: UserId,
        snapshot: &SetupSession,
        f: impl FnOnce(&mut SetupSession),
    ) -> Option<SetupSession> {
        let mut sessions = self.sessions();
        let session = sessions.get_mut(&admin)?;
        if !session.is_at(snapshot) {
            debug!(admin_id = admin.0, "setup session moved during input, dropping step");
            return None;
        }
        f(session);
        session.last_touched = Instant::now();
        Some(*session)
    }
}
