use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ApprovalState, ImmersionId, LogbookId, OperationId, TeamId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOperation {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewImmersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_diver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_diver: Option<String>,
    #[serde(default)]
    pub max_depth: f64,
}

/// Supervisor logbook as handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogbook {
    pub code: String,
    pub immersion_id: ImmersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_site: Option<String>,
    pub dive_narrative: String,
    pub general_assessment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_diver: Option<String>,
    /// Every field the wizard collected.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogbookSummary {
    pub logbook_id: LogbookId,
    pub code: String,
    pub immersion_id: ImmersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immersion_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_diver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub signed: bool,
    pub approval_state: ApprovalState,
    pub created_at: DateTime<Utc>,
}

impl LogbookSummary {
    pub fn is_signed(&self) -> bool {
        self.signed || self.approval_state == ApprovalState::Approved
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentValidationStatus {
    pub has_valid_hpt: bool,
    pub has_valid_anexo_bravo: bool,
    pub can_execute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpt_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anexo_bravo_code: Option<String>,
}
