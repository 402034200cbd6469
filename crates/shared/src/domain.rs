use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(OperationId);
id_newtype!(ImmersionId);
id_newtype!(TeamId);
id_newtype!(LogbookId);

/// Placeholder used wherever a person's name is missing from the backend.
pub const UNNAMED: &str = "Sin nombre";

/// Role tag assumed for roster members that carry none.
pub const DEFAULT_ROSTER_ROLE: &str = "buzo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "buzo")]
    Diver,
    #[serde(rename = "supervisor")]
    Supervisor,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "jefe_faena")]
    SiteManager,
    #[serde(rename = "superuser")]
    Superuser,
    #[serde(rename = "admin_salmonera")]
    SalmonFarmAdmin,
    #[serde(rename = "admin_servicio")]
    ServiceAdmin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diver => "buzo",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
            Self::SiteManager => "jefe_faena",
            Self::Superuser => "superuser",
            Self::SalmonFarmAdmin => "admin_salmonera",
            Self::ServiceAdmin => "admin_servicio",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buzo" => Ok(Self::Diver),
            "supervisor" => Ok(Self::Supervisor),
            "admin" => Ok(Self::Admin),
            "jefe_faena" => Ok(Self::SiteManager),
            "superuser" => Ok(Self::Superuser),
            "admin_salmonera" => Ok(Self::SalmonFarmAdmin),
            "admin_servicio" => Ok(Self::ServiceAdmin),
            other => Err(format!("unknown user role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImmersionState {
    #[default]
    #[serde(rename = "planificada")]
    Planned,
    #[serde(rename = "en_progreso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl ImmersionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planificada",
            Self::InProgress => "en_progreso",
            Self::Completed => "completada",
            Self::Cancelled => "cancelada",
        }
    }
}

impl FromStr for ImmersionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planificada" => Ok(Self::Planned),
            "en_progreso" => Ok(Self::InProgress),
            "completada" => Ok(Self::Completed),
            "cancelada" => Ok(Self::Cancelled),
            other => Err(format!("unknown immersion state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApprovalState {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "aprobada")]
    Approved,
    #[serde(rename = "rechazada")]
    Rejected,
}

impl ApprovalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Approved => "aprobada",
            Self::Rejected => "rechazada",
        }
    }
}

impl FromStr for ApprovalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(Self::Pending),
            "aprobada" => Ok(Self::Approved),
            "rechazada" => Ok(Self::Rejected),
            other => Err(format!("unknown approval state '{other}'")),
        }
    }
}

/// Compliance documents that gate immersion execution for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceKind {
    Hpt,
    AnexoBravo,
}

impl ComplianceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hpt => "hpt",
            Self::AnexoBravo => "anexo_bravo",
        }
    }
}

impl FromStr for ComplianceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hpt" => Ok(Self::Hpt),
            "anexo_bravo" => Ok(Self::AnexoBravo),
            other => Err(format!("unknown compliance document kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: OperationId,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Immersion {
    pub immersion_id: ImmersionId,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub date: NaiveDate,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_diver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_diver: Option<String>,
    pub max_depth: f64,
    pub state: ImmersionState,
    pub is_independent: bool,
    pub operation_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveTeam {
    pub team_id: TeamId,
    pub name: String,
}

/// Canonical roster entry; produced only by [`crate::normalize::normalize_member`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub role: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
}

/// A diver entry inside a logbook draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub given_name: String,
    pub surname: String,
    pub rut: String,
    pub role: String,
    #[serde(default)]
    pub working_depth: f64,
    #[serde(default)]
    pub immersion_minutes: f64,
    #[serde(default)]
    pub max_depth: f64,
    #[serde(default)]
    pub bottom_minutes: f64,
    #[serde(default)]
    pub decompression_minutes: f64,
    #[serde(default)]
    pub water_entry_time: String,
    #[serde(default)]
    pub water_exit_time: String,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub from_dive_team: bool,
}
