use serde::Serialize;
use shared::{
    domain::{ComplianceKind, Immersion, ImmersionId, ImmersionState, LogbookId, OperationId, TeamId},
    error::{ApiError, ErrorCode},
    protocol::{DocumentValidationStatus, NewImmersion},
};
use storage::{Storage, StorageError};
use tracing::{info, warn};
use wizard_core::{
    bitacora::{self, LogbookPopulator},
    DocumentCode, Draft, LogbookSink, RosterFilter, WizardController, WizardError, WizardSession,
};

pub mod listing;
pub mod navigation;

use listing::{LogbookPage, LogbookQuery};

pub const IMMERSION_CODE_PREFIX: &str = "IMM";

pub type LogbookSession = WizardSession<LogbookPopulator>;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub logbook_wizard: WizardController<LogbookPopulator>,
}

impl ApiContext {
    pub fn new(storage: Storage, document_prefix: &str, roles: RosterFilter) -> Result<Self, ApiError> {
        let logbook_wizard = bitacora::logbook_controller(document_prefix, roles)
            .map_err(|err| ApiError::internal(err.to_string()))?;
        Ok(Self {
            storage,
            logbook_wizard,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedLogbook {
    pub logbook_id: LogbookId,
    pub code: String,
}

/// Opens a logbook wizard seeded from the immersion, its operation and
/// its team roster.
pub async fn start_logbook_wizard(
    ctx: &ApiContext,
    immersion_id: ImmersionId,
) -> Result<LogbookSession, ApiError> {
    let seed = bitacora::load_logbook_seed(&ctx.storage, &ctx.storage, immersion_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("immersion {immersion_id} not found")))?;
    Ok(ctx.logbook_wizard.initialize(Some(&seed)))
}

/// Reloads the seed for `immersion_id` and lets the session recompute its
/// auto-populated fields. A vanished immersion clears the seed.
pub async fn refresh_logbook_seed(
    ctx: &ApiContext,
    session: &mut LogbookSession,
    immersion_id: ImmersionId,
) -> Result<bool, ApiError> {
    let seed = bitacora::load_logbook_seed(&ctx.storage, &ctx.storage, immersion_id)
        .await
        .map_err(internal)?;
    if seed.is_none() {
        warn!(%immersion_id, code = %session.draft().code(), "seed immersion disappeared");
    }
    Ok(session.refresh_seed(seed.as_ref()))
}

pub async fn submit_logbook(ctx: &ApiContext, draft: &Draft) -> Result<SubmittedLogbook, ApiError> {
    let record = bitacora::logbook_from_draft(draft).map_err(wizard_error)?;
    ctx.storage
        .get_immersion(record.immersion_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::not_found(format!("immersion {} not found", record.immersion_id))
        })?;

    let code = record.code.clone();
    let logbook_id = ctx
        .storage
        .submit_logbook(record)
        .await
        .map_err(storage_error)?;
    Ok(SubmittedLogbook { logbook_id, code })
}

/// Completes the session and persists the resulting draft.
pub async fn finish_logbook_wizard(
    ctx: &ApiContext,
    session: LogbookSession,
) -> Result<SubmittedLogbook, ApiError> {
    let draft = session.complete().map_err(|refused| wizard_error(refused.error))?;
    submit_logbook(ctx, &draft).await
}

pub async fn list_logbooks(ctx: &ApiContext, query: &LogbookQuery) -> Result<LogbookPage, ApiError> {
    let entries = ctx.storage.list_logbooks().await.map_err(internal)?;
    Ok(query.apply(&entries))
}

pub async fn create_immersion(
    ctx: &ApiContext,
    request: NewImmersion,
) -> Result<Immersion, ApiError> {
    let date = request
        .date
        .ok_or_else(|| ApiError::validation("immersion date is required"))?;
    if request.objective.trim().is_empty() {
        return Err(ApiError::validation("immersion objective is required"));
    }
    if let Some(operation_id) = request.operation_id {
        ensure_operation(ctx, operation_id).await?;
    }
    if let Some(team_id) = request.team_id {
        ensure_team(ctx, team_id).await?;
    }

    let code = match request.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => DocumentCode::generate(IMMERSION_CODE_PREFIX).into_string(),
    };
    let immersion_id = ctx
        .storage
        .insert_immersion(&code, date, &request)
        .await
        .map_err(storage_error)?;
    ctx.storage
        .get_immersion(immersion_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::internal(format!("immersion {immersion_id} vanished after insert")))
}

pub async fn execute_immersion(ctx: &ApiContext, immersion_id: ImmersionId) -> Result<(), ApiError> {
    transition_immersion(ctx, immersion_id, ImmersionState::InProgress).await
}

pub async fn complete_immersion(ctx: &ApiContext, immersion_id: ImmersionId) -> Result<(), ApiError> {
    transition_immersion(ctx, immersion_id, ImmersionState::Completed).await
}

/// Checks for the signed HPT and Anexo Bravo an operation needs before
/// its immersions can be executed.
pub async fn validate_operation_documents(
    ctx: &ApiContext,
    operation_id: OperationId,
) -> Result<DocumentValidationStatus, ApiError> {
    ensure_operation(ctx, operation_id).await?;
    let hpt_code = ctx
        .storage
        .signed_compliance_code(operation_id, ComplianceKind::Hpt)
        .await
        .map_err(internal)?;
    let anexo_bravo_code = ctx
        .storage
        .signed_compliance_code(operation_id, ComplianceKind::AnexoBravo)
        .await
        .map_err(internal)?;

    let has_valid_hpt = hpt_code.is_some();
    let has_valid_anexo_bravo = anexo_bravo_code.is_some();
    Ok(DocumentValidationStatus {
        has_valid_hpt,
        has_valid_anexo_bravo,
        can_execute: has_valid_hpt && has_valid_anexo_bravo,
        hpt_code,
        anexo_bravo_code,
    })
}

async fn transition_immersion(
    ctx: &ApiContext,
    immersion_id: ImmersionId,
    state: ImmersionState,
) -> Result<(), ApiError> {
    let updated = ctx
        .storage
        .set_immersion_state(immersion_id, state)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::not_found(format!("immersion {immersion_id} not found")));
    }
    info!(%immersion_id, state = state.as_str(), "immersion transitioned");
    Ok(())
}

async fn ensure_operation(ctx: &ApiContext, operation_id: OperationId) -> Result<(), ApiError> {
    ctx.storage
        .get_operation(operation_id)
        .await
        .map_err(internal)?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("operation {operation_id} not found")))
}

async fn ensure_team(ctx: &ApiContext, team_id: TeamId) -> Result<(), ApiError> {
    ctx.storage
        .get_team(team_id)
        .await
        .map_err(internal)?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("dive team {team_id} not found")))
}

fn wizard_error(err: WizardError) -> ApiError {
    ApiError::new(ErrorCode::Validation, err.to_string())
}

fn storage_error(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<StorageError>() {
        Some(duplicate @ StorageError::DuplicateCode(_)) => {
            ApiError::new(ErrorCode::Conflict, duplicate.to_string())
        }
        None => internal(err),
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
