//! Supervisor logbook ("bitácora de supervisor") wizard opened from an immersion.

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::{json, Value};
use shared::{
    domain::{Immersion, ImmersionId, Operation, Participant, TeamId, TeamMember},
    protocol::NewLogbook,
};
use tracing::{debug, warn};

use crate::{
    draft::{Draft, FieldMap},
    error::WizardError,
    roster::RosterFilter,
    session::{AutoPopulate, WizardController},
    step::{predicates, StepDefinition},
    ImmersionSource, RosterSource,
};

pub const DOCUMENT_PREFIX: &str = "BS";

pub mod fields {
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const WORK_SITE: &str = "work_site";
    pub const SUPERVISOR: &str = "supervisor";
    pub const SUPERVISOR_NAME_LICENSE: &str = "supervisor_name_license";
    pub const SEA_STATE: &str = "sea_state";
    pub const BOTTOM_VISIBILITY: &str = "bottom_visibility";
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const DIVE_NARRATIVE: &str = "dive_narrative";
    pub const INCIDENTS: &str = "incidents";
    pub const GENERAL_ASSESSMENT: &str = "general_assessment";
    pub const OPERATION_ID: &str = "operation_id";
    pub const DIVERS: &str = "divers";
    pub const ASSISTANT_DIVERS: &str = "assistant_divers";
    pub const EQUIPMENT_USED: &str = "equipment_used";
    pub const WORK_TO_PERFORM: &str = "work_to_perform";
    pub const WORK_DESCRIPTION: &str = "work_description";
    pub const GENERAL_OBSERVATIONS: &str = "general_observations";
    pub const SUPPORT_VESSEL: &str = "support_vessel";
    pub const DIVING_RECORDS: &str = "diving_records";
    pub const CONTRACTOR_VALIDATION: &str = "contractor_validation";
    pub const VALIDATION_COMMENTS: &str = "validation_comments";
}

const LEAD_DIVER_ROLE: &str = "buzo_principal";

pub fn steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(
            1,
            "Información General",
            "Datos básicos de la bitácora",
            predicates::required_text(&[fields::DIVE_NARRATIVE, fields::GENERAL_ASSESSMENT]),
        ),
        StepDefinition::new(
            2,
            "Buzos y Datos",
            "Personal buzo y datos de inmersión",
            predicates::non_empty_list(fields::DIVERS),
        ),
        StepDefinition::new(
            3,
            "Equipos Utilizados",
            "Equipos y herramientas",
            predicates::always,
        ),
        StepDefinition::new(
            4,
            "Trabajos Realizados",
            "Descripción de actividades",
            predicates::any_text(&[fields::WORK_TO_PERFORM, fields::WORK_DESCRIPTION]),
        ),
        StepDefinition::new(
            5,
            "Resumen y Validación",
            "Resumen final y validación",
            predicates::always,
        ),
        StepDefinition::new(6, "Firmas", "Firmas digitales", predicates::always),
    ]
}

/// Everything the logbook wizard derives its initial fields from.
#[derive(Debug, Clone, PartialEq)]
pub struct LogbookSeed {
    pub immersion: Immersion,
    pub operation: Option<Operation>,
    /// Team the roster was read from; `None` when no team was available.
    pub roster_team: Option<TeamId>,
    pub roster: Vec<TeamMember>,
}

#[derive(Debug, Clone, Default)]
pub struct LogbookPopulator {
    roles: RosterFilter,
}

impl LogbookPopulator {
    pub fn new(roles: RosterFilter) -> Self {
        Self { roles }
    }
}

impl AutoPopulate for LogbookPopulator {
    type Seed = LogbookSeed;

    fn defaults(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::DIVE_NARRATIVE.into(), json!(""));
        map.insert(fields::GENERAL_ASSESSMENT.into(), json!(""));
        map.insert(fields::DIVERS.into(), json!([]));
        map.insert(fields::ASSISTANT_DIVERS.into(), json!([]));
        map.insert(fields::EQUIPMENT_USED.into(), json!([]));
        map.insert(fields::DIVING_RECORDS.into(), json!([]));
        map
    }

    fn seed_identity(&self, seed: &LogbookSeed) -> String {
        let operation = seed
            .operation
            .as_ref()
            .map_or_else(|| "-".to_string(), |op| op.operation_id.to_string());
        let team = seed
            .roster_team
            .map_or_else(|| "-".to_string(), |team| team.to_string());
        format!(
            "{}:{operation}:{team}:{}",
            seed.immersion.immersion_id,
            roster_fingerprint(&seed.roster)
        )
    }

    fn seed_reference(&self, seed: &LogbookSeed) -> Option<String> {
        Some(seed.immersion.immersion_id.to_string())
    }

    fn populate(&self, seed: &LogbookSeed) -> FieldMap {
        let mut map = FieldMap::new();
        let immersion = &seed.immersion;

        if let Some(supervisor) = &immersion.supervisor {
            map.insert(fields::SUPERVISOR.into(), json!(supervisor));
            map.insert(fields::SUPERVISOR_NAME_LICENSE.into(), json!(supervisor));
        }
        map.insert(
            fields::START_DATE.into(),
            json!(immersion.date.format("%Y-%m-%d").to_string()),
        );
        if let Some(operation) = &seed.operation {
            map.insert(fields::WORK_SITE.into(), json!(operation.name));
            map.insert(fields::OPERATION_ID.into(), json!(operation.operation_id.0));
        }

        let divers = self.roles.project(&seed.roster);
        match serde_json::to_value(&divers) {
            Ok(value) => {
                map.insert(fields::DIVERS.into(), value);
            }
            Err(error) => warn!(%error, "could not encode roster participants"),
        }
        map
    }
}

/// Order-independent summary of who is on the roster and in which role, so a
/// membership change on the same team counts as a new seed.
fn roster_fingerprint(roster: &[TeamMember]) -> String {
    let mut entries: Vec<String> = roster
        .iter()
        .map(|member| {
            let who = member.member_id.as_deref().unwrap_or(&member.display_name);
            format!("{who}={}", member.role.trim().to_ascii_lowercase())
        })
        .collect();
    entries.sort();
    entries.join(",")
}

pub fn logbook_controller(
    code_prefix: &str,
    roles: RosterFilter,
) -> Result<WizardController<LogbookPopulator>, WizardError> {
    WizardController::new(code_prefix, steps(), LogbookPopulator::new(roles))
}

/// Resolves the seed for an immersion: the immersion itself, its operation,
/// and the roster of its assigned team or, failing that, the fallback team.
/// `Ok(None)` when the immersion does not exist.
pub async fn load_logbook_seed(
    immersions: &dyn ImmersionSource,
    rosters: &dyn RosterSource,
    immersion_id: ImmersionId,
) -> Result<Option<LogbookSeed>> {
    let Some(immersion) = immersions.immersion(immersion_id).await? else {
        return Ok(None);
    };

    let operation = match immersion.operation_id {
        Some(operation_id) => immersions.operation(operation_id).await?,
        None => None,
    };

    let roster_team = match immersion.team_id {
        Some(team_id) => Some(team_id),
        None => rosters.fallback_team().await?,
    };
    let roster = match roster_team {
        Some(team_id) => rosters.team_roster(team_id).await?,
        None => Vec::new(),
    };
    debug!(
        immersion = %immersion.immersion_id,
        team = ?roster_team,
        members = roster.len(),
        "logbook seed resolved"
    );

    Ok(Some(LogbookSeed {
        immersion,
        operation,
        roster_team,
        roster,
    }))
}

/// Converts a finished draft into the record persistence expects.
pub fn logbook_from_draft(draft: &Draft) -> Result<NewLogbook, WizardError> {
    let immersion_id = draft
        .seed_ref()
        .and_then(|seed_ref| seed_ref.parse::<i64>().ok())
        .map(ImmersionId)
        .ok_or_else(|| WizardError::MissingSeedReference {
            code: draft.code().to_string(),
        })?;

    let date = match draft.text(fields::START_DATE) {
        Some(raw) if !raw.trim().is_empty() => Some(
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
                WizardError::InvalidField {
                    field: fields::START_DATE.into(),
                    reason: err.to_string(),
                }
            })?,
        ),
        _ => None,
    };

    let divers: Vec<Participant> = draft.decode(fields::DIVERS)?.unwrap_or_default();
    let lead_diver = divers
        .iter()
        .find(|p| p.role.eq_ignore_ascii_case(LEAD_DIVER_ROLE))
        .or_else(|| divers.first())
        .map(|p| format!("{} {}", p.given_name, p.surname).trim().to_string());

    Ok(NewLogbook {
        code: draft.code().to_string(),
        immersion_id,
        supervisor: non_blank(draft, fields::SUPERVISOR),
        date,
        work_site: non_blank(draft, fields::WORK_SITE),
        dive_narrative: draft.text(fields::DIVE_NARRATIVE).unwrap_or_default().to_string(),
        general_assessment: draft
            .text(fields::GENERAL_ASSESSMENT)
            .unwrap_or_default()
            .to_string(),
        lead_diver,
        payload: draft.to_json(),
    })
}

fn non_blank(draft: &Draft, key: &str) -> Option<String> {
    draft
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/bitacora_tests.rs"]
mod tests;
