//! Linear multi-step wizard over a shared document draft.
//!
//! A [`WizardController`] holds the validated step list and the seed mapping;
//! each [`WizardSession`] it opens owns one draft, walks the steps in order
//! and hands the finished draft back on completion. Persistence and lookups
//! stay with the caller through the collaborator traits below.

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{Immersion, ImmersionId, LogbookId, Operation, OperationId, TeamId, TeamMember},
    protocol::NewLogbook,
};

pub mod bitacora;
pub mod code;
pub mod draft;
pub mod error;
pub mod roster;
pub mod session;
pub mod step;

pub use code::DocumentCode;
pub use draft::{patch, Draft, FieldMap};
pub use error::WizardError;
pub use roster::RosterFilter;
pub use session::{Advance, AutoPopulate, CompletionRefused, Unseeded, WizardController, WizardSession};
pub use step::{predicates, StepDefinition, StepPredicate};

#[async_trait]
pub trait ImmersionSource: Send + Sync {
    async fn immersion(&self, immersion_id: ImmersionId) -> Result<Option<Immersion>>;
    async fn operation(&self, operation_id: OperationId) -> Result<Option<Operation>>;
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn team_roster(&self, team_id: TeamId) -> Result<Vec<TeamMember>>;
    /// Team to read a roster from when an immersion has none assigned.
    async fn fallback_team(&self) -> Result<Option<TeamId>>;
}

#[async_trait]
pub trait LogbookSink: Send + Sync {
    async fn submit_logbook(&self, logbook: NewLogbook) -> Result<LogbookId>;
}
