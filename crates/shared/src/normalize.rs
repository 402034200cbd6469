//! One-shot conversion of loosely-shaped backend records into canonical types.
//!
//! Backend rows reach us with several alternative spellings for the same
//! attribute (a member's name may live on the member or on its nested user,
//! its role under `rol_equipo` or `rol`). Every alternative is resolved here
//! so nothing downstream ever probes fallback fields.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{
    Immersion, ImmersionId, ImmersionState, OperationId, TeamId, TeamMember,
    DEFAULT_ROSTER_ROLE, UNNAMED,
};

pub const INDEPENDENT_OPERATION_NAME: &str = "Inmersión Independiente";
pub const MISSING_OPERATION_NAME: &str = "Sin operación";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDiverProfile {
    #[serde(default)]
    pub rut: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub apellido: Option<String>,
    #[serde(default)]
    pub perfil_buzo: Option<RawDiverProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTeamMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub usuario_id: Option<String>,
    #[serde(default)]
    pub rol_equipo: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub rut: Option<String>,
    #[serde(default)]
    pub usuario: Option<RawUser>,
}

pub fn normalize_member(raw: RawTeamMember) -> TeamMember {
    let user = raw.usuario.unwrap_or_default();

    let joined_user_name = match (non_blank(user.nombre), non_blank(user.apellido)) {
        (Some(given), Some(surname)) => Some(format!("{given} {surname}")),
        _ => None,
    };
    let display_name = non_blank(user.nombre_completo)
        .or_else(|| non_blank(raw.nombre_completo))
        .or(joined_user_name)
        .or_else(|| non_blank(raw.nombre))
        .unwrap_or_else(|| UNNAMED.to_string());

    let role = non_blank(raw.rol_equipo)
        .or_else(|| non_blank(raw.rol))
        .unwrap_or_else(|| DEFAULT_ROSTER_ROLE.to_string());

    let rut = user
        .perfil_buzo
        .and_then(|profile| non_blank(profile.rut))
        .or_else(|| non_blank(raw.rut));

    TeamMember {
        member_id: non_blank(raw.id).or_else(|| non_blank(raw.usuario_id)),
        role,
        display_name,
        rut,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOperationRef {
    #[serde(default)]
    pub nombre: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImmersionMetadata {
    #[serde(default)]
    pub cuadrilla_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImmersion {
    pub inmersion_id: i64,
    pub codigo: String,
    pub fecha_inmersion: NaiveDate,
    #[serde(default)]
    pub objetivo: Option<String>,
    #[serde(default)]
    pub supervisor: Option<String>,
    #[serde(default)]
    pub buzo_principal: Option<String>,
    #[serde(default)]
    pub buzo_asistente: Option<String>,
    #[serde(default)]
    pub profundidad_max: Option<f64>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub operacion_id: Option<i64>,
    #[serde(default)]
    pub operacion: Option<RawOperationRef>,
    #[serde(default)]
    pub is_independent: Option<bool>,
    #[serde(default)]
    pub cuadrilla_id: Option<i64>,
    #[serde(default)]
    pub metadata: Option<RawImmersionMetadata>,
}

pub fn normalize_immersion(raw: RawImmersion) -> Immersion {
    let is_independent = raw.is_independent.unwrap_or(raw.operacion_id.is_none());
    let operation_name = raw
        .operacion
        .and_then(|op| non_blank(op.nombre))
        .unwrap_or_else(|| {
            if is_independent {
                INDEPENDENT_OPERATION_NAME.to_string()
            } else {
                MISSING_OPERATION_NAME.to_string()
            }
        });
    let team_id = raw
        .cuadrilla_id
        .or_else(|| raw.metadata.and_then(|meta| meta.cuadrilla_id))
        .map(TeamId);
    let state = raw
        .estado
        .as_deref()
        .and_then(|estado| estado.parse::<ImmersionState>().ok())
        .unwrap_or_default();

    Immersion {
        immersion_id: ImmersionId(raw.inmersion_id),
        code: raw.codigo,
        operation_id: raw.operacion_id.map(OperationId),
        team_id,
        date: raw.fecha_inmersion,
        objective: raw.objetivo.unwrap_or_default(),
        supervisor: non_blank(raw.supervisor),
        lead_diver: non_blank(raw.buzo_principal),
        assistant_diver: non_blank(raw.buzo_asistente),
        max_depth: raw.profundidad_max.unwrap_or(0.0),
        state,
        is_independent,
        operation_name,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
