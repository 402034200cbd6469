use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

use shared::{
    domain::{
        ApprovalState, ComplianceKind, DiveTeam, Immersion, ImmersionId, ImmersionState,
        LogbookId, Operation, OperationId, TeamId, TeamMember,
    },
    normalize::{normalize_immersion, RawImmersion, RawOperationRef},
    protocol::{LogbookSummary, NewImmersion, NewLogbook, NewOperation},
};
use wizard_core::{ImmersionSource, LogbookSink, RosterSource};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("a record with code '{0}' already exists")]
    DuplicateCode(String),
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_operation(&self, operation: &NewOperation) -> Result<OperationId> {
        let rec = sqlx::query(
            "INSERT INTO operations (code, name, site_name, created_at) VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&operation.code)
        .bind(&operation.name)
        .bind(&operation.site_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| duplicate_or(err, &operation.code))?;
        let operation_id = OperationId(rec.get::<i64, _>(0));
        info!(%operation_id, code = %operation.code, "operation created");
        Ok(operation_id)
    }

    pub async fn get_operation(&self, operation_id: OperationId) -> Result<Option<Operation>> {
        let row = sqlx::query("SELECT id, code, name, site_name FROM operations WHERE id = ?")
            .bind(operation_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Operation {
            operation_id: OperationId(r.get::<i64, _>(0)),
            code: r.get::<String, _>(1),
            name: r.get::<String, _>(2),
            site_name: r.get::<Option<String>, _>(3),
        }))
    }

    pub async fn create_team(&self, name: &str) -> Result<TeamId> {
        let rec = sqlx::query("INSERT INTO dive_teams (name, created_at) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| duplicate_or(err, name))?;
        let team_id = TeamId(rec.get::<i64, _>(0));
        info!(%team_id, name, "dive team created");
        Ok(team_id)
    }

    pub async fn list_teams(&self) -> Result<Vec<DiveTeam>> {
        let rows = sqlx::query("SELECT id, name FROM dive_teams ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| DiveTeam {
                team_id: TeamId(r.get::<i64, _>(0)),
                name: r.get::<String, _>(1),
            })
            .collect())
    }

    pub async fn get_team(&self, team_id: TeamId) -> Result<Option<DiveTeam>> {
        let row = sqlx::query("SELECT id, name FROM dive_teams WHERE id = ?")
            .bind(team_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| DiveTeam {
            team_id: TeamId(r.get::<i64, _>(0)),
            name: r.get::<String, _>(1),
        }))
    }

    /// Stores an already-normalized roster member.
    pub async fn add_team_member(&self, team_id: TeamId, member: &TeamMember) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO team_members (team_id, member_ref, role, display_name, rut)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(team_id.0)
        .bind(&member.member_id)
        .bind(&member.role)
        .bind(&member.display_name)
        .bind(&member.rut)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to add member to team {team_id}"))?;
        debug!(%team_id, role = %member.role, "team member added");
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn list_team_members(&self, team_id: TeamId) -> Result<Vec<TeamMember>> {
        let rows = sqlx::query(
            "SELECT id, member_ref, role, display_name, rut
             FROM team_members
             WHERE team_id = ?
             ORDER BY id ASC",
        )
        .bind(team_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| TeamMember {
                member_id: Some(
                    r.get::<Option<String>, _>(1)
                        .unwrap_or_else(|| r.get::<i64, _>(0).to_string()),
                ),
                role: r.get::<String, _>(2),
                display_name: r.get::<String, _>(3),
                rut: r.get::<Option<String>, _>(4),
            })
            .collect())
    }

    pub async fn first_team(&self) -> Result<Option<TeamId>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM dive_teams ORDER BY id ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(TeamId))
    }

    pub async fn insert_immersion(
        &self,
        code: &str,
        date: NaiveDate,
        request: &NewImmersion,
    ) -> Result<ImmersionId> {
        let rec = sqlx::query(
            "INSERT INTO immersions (
                code, operation_id, team_id, immersion_date, objective, supervisor,
                lead_diver, assistant_diver, max_depth, state, is_independent, created_at
             )
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(code)
        .bind(request.operation_id.map(|id| id.0))
        .bind(request.team_id.map(|id| id.0))
        .bind(date)
        .bind(&request.objective)
        .bind(&request.supervisor)
        .bind(&request.lead_diver)
        .bind(&request.assistant_diver)
        .bind(request.max_depth)
        .bind(ImmersionState::Planned.as_str())
        .bind(request.operation_id.is_none())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| duplicate_or(err, code))?;
        let immersion_id = ImmersionId(rec.get::<i64, _>(0));
        info!(%immersion_id, code, "immersion created");
        Ok(immersion_id)
    }

    pub async fn get_immersion(&self, immersion_id: ImmersionId) -> Result<Option<Immersion>> {
        let row = sqlx::query(&format!("{IMMERSION_SELECT} WHERE i.id = ?"))
            .bind(immersion_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(immersion_from_row))
    }

    pub async fn list_immersions(&self) -> Result<Vec<Immersion>> {
        let rows = sqlx::query(&format!("{IMMERSION_SELECT} ORDER BY i.created_at DESC, i.id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(immersion_from_row).collect())
    }

    /// Returns false when no immersion has that id.
    pub async fn set_immersion_state(
        &self,
        immersion_id: ImmersionId,
        state: ImmersionState,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE immersions SET state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(immersion_id.0)
            .execute(&self.pool)
            .await?;
        let updated = result.rows_affected() > 0;
        if updated {
            info!(%immersion_id, state = state.as_str(), "immersion state changed");
        }
        Ok(updated)
    }

    pub async fn record_compliance_document(
        &self,
        operation_id: OperationId,
        kind: ComplianceKind,
        code: &str,
        signed: bool,
    ) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO compliance_documents (operation_id, kind, code, signed, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(operation_id.0)
        .bind(kind.as_str())
        .bind(code)
        .bind(signed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.get::<i64, _>(0))
    }

    /// Code of the most recent signed document of `kind` for the operation.
    pub async fn signed_compliance_code(
        &self,
        operation_id: OperationId,
        kind: ComplianceKind,
    ) -> Result<Option<String>> {
        let code: Option<String> = sqlx::query_scalar(
            "SELECT code FROM compliance_documents
             WHERE operation_id = ? AND kind = ? AND signed = 1
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(operation_id.0)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    pub async fn insert_logbook(&self, logbook: &NewLogbook) -> Result<LogbookId> {
        let payload = serde_json::to_string(&logbook.payload)?;
        let rec = sqlx::query(
            "INSERT INTO supervisor_logbooks (
                code, immersion_id, supervisor, logbook_date, work_site, lead_diver,
                dive_narrative, general_assessment, signed, approval_state, payload, created_at
             )
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
             RETURNING id",
        )
        .bind(&logbook.code)
        .bind(logbook.immersion_id.0)
        .bind(&logbook.supervisor)
        .bind(logbook.date)
        .bind(&logbook.work_site)
        .bind(&logbook.lead_diver)
        .bind(&logbook.dive_narrative)
        .bind(&logbook.general_assessment)
        .bind(ApprovalState::Pending.as_str())
        .bind(payload)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| duplicate_or(err, &logbook.code))?;
        let logbook_id = LogbookId(rec.get::<i64, _>(0));
        info!(%logbook_id, code = %logbook.code, immersion_id = %logbook.immersion_id, "supervisor logbook stored");
        Ok(logbook_id)
    }

    pub async fn logbook_payload(&self, logbook_id: LogbookId) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT payload FROM supervisor_logbooks WHERE id = ?")
                .bind(logbook_id.0)
                .fetch_optional(&self.pool)
                .await?;
        raw.map(|raw| serde_json::from_str(&raw).context("corrupt logbook payload"))
            .transpose()
    }

    pub async fn list_logbooks(&self) -> Result<Vec<LogbookSummary>> {
        let rows = sqlx::query(
            "SELECT l.id, l.code, l.immersion_id, i.code, l.supervisor, l.lead_diver,
                    l.logbook_date, l.signed, l.approval_state, l.created_at
             FROM supervisor_logbooks l
             LEFT JOIN immersions i ON i.id = l.immersion_id
             ORDER BY l.created_at DESC, l.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<LogbookSummary> {
                let approval_raw = r.get::<String, _>(8);
                let approval_state = ApprovalState::from_str(&approval_raw)
                    .map_err(anyhow::Error::msg)?;
                Ok(LogbookSummary {
                    logbook_id: LogbookId(r.get::<i64, _>(0)),
                    code: r.get::<String, _>(1),
                    immersion_id: ImmersionId(r.get::<i64, _>(2)),
                    immersion_code: r.get::<Option<String>, _>(3),
                    supervisor: r.get::<Option<String>, _>(4),
                    lead_diver: r.get::<Option<String>, _>(5),
                    date: r.get::<Option<NaiveDate>, _>(6),
                    signed: r.get::<bool, _>(7),
                    approval_state,
                    created_at: r.get::<DateTime<Utc>, _>(9),
                })
            })
            .collect()
    }

    pub async fn sign_logbook(&self, logbook_id: LogbookId) -> Result<bool> {
        let result = sqlx::query("UPDATE supervisor_logbooks SET signed = 1 WHERE id = ?")
            .bind(logbook_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_logbook_approval(
        &self,
        logbook_id: LogbookId,
        state: ApprovalState,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE supervisor_logbooks SET approval_state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(logbook_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const IMMERSION_SELECT: &str = "SELECT i.id, i.code, i.immersion_date, i.objective, i.supervisor,
        i.lead_diver, i.assistant_diver, i.max_depth, i.state, i.operation_id, o.name,
        i.is_independent, i.team_id
     FROM immersions i
     LEFT JOIN operations o ON o.id = i.operation_id";

fn immersion_from_row(r: SqliteRow) -> Immersion {
    normalize_immersion(RawImmersion {
        inmersion_id: r.get::<i64, _>(0),
        codigo: r.get::<String, _>(1),
        fecha_inmersion: r.get::<NaiveDate, _>(2),
        objetivo: Some(r.get::<String, _>(3)),
        supervisor: r.get::<Option<String>, _>(4),
        buzo_principal: r.get::<Option<String>, _>(5),
        buzo_asistente: r.get::<Option<String>, _>(6),
        profundidad_max: Some(r.get::<f64, _>(7)),
        estado: Some(r.get::<String, _>(8)),
        operacion_id: r.get::<Option<i64>, _>(9),
        operacion: Some(RawOperationRef {
            nombre: r.get::<Option<String>, _>(10),
        }),
        is_independent: Some(r.get::<bool, _>(11)),
        cuadrilla_id: r.get::<Option<i64>, _>(12),
        metadata: None,
    })
}

fn duplicate_or(err: sqlx::Error, code: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::DuplicateCode(code.to_string()).into()
        }
        _ => anyhow::Error::new(err),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl ImmersionSource for Storage {
    async fn immersion(&self, immersion_id: ImmersionId) -> Result<Option<Immersion>> {
        self.get_immersion(immersion_id).await
    }

    async fn operation(&self, operation_id: OperationId) -> Result<Option<Operation>> {
        self.get_operation(operation_id).await
    }
}

#[async_trait]
impl RosterSource for Storage {
    async fn team_roster(&self, team_id: TeamId) -> Result<Vec<TeamMember>> {
        self.list_team_members(team_id).await
    }

    async fn fallback_team(&self) -> Result<Option<TeamId>> {
        self.first_team().await
    }
}

#[async_trait]
impl LogbookSink for Storage {
    async fn submit_logbook(&self, logbook: NewLogbook) -> Result<LogbookId> {
        self.insert_logbook(&logbook).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
