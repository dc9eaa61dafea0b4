//! Join-gate core.
//!
//! Administrators configure a list of gate groups and reward channels
//! through a guided setup dialogue. Visitors arriving through an
//! administrator's deep link must be members of every gate group before the
//! reward channels are revealed.
//!
//! This crate holds the transport-neutral parts: the approval registry, the
//! configuration store, the setup wizard state machine, the verification
//! gate and the command dispatcher that ties them together. Platform crates
//! feed it [`Inbound`] events and execute the returned [`Reply`] values.

pub mod approval;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod memory;
pub mod prompts;
pub mod reply;
pub mod sqlite;
pub mod store;
pub mod types;
pub mod wizard;

pub use {
    approval::ApprovalRegistry,
    dispatch::{Command, Dispatcher, Event, Inbound},
    error::{Error, Result},
    gate::{MembershipProbe, VerificationGate, VerificationOutcome},
    memory::MemoryStore,
    reply::{Button, ButtonAction, Keyboard, MessageHandle, Reply},
    sqlite::SqliteStore,
    store::{ApprovalStore, ConfigStore},
    types::{ChatRecord, MemberStatus, RecordKind, Sender, UserId},
    wizard::{SetupPhase, SetupWizard, WizardStep},
};

/// Run database migrations for the gate tables.
///
/// Creates the `approvals`, `channels` and `groups` tables. Call once at
/// startup before constructing a [`SqliteStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
