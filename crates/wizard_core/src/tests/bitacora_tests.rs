use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use shared::domain::{ImmersionState, OperationId};

use super::*;
use crate::{draft::patch, session::Advance};

fn immersion(team_id: Option<TeamId>, operation_id: Option<OperationId>) -> Immersion {
    Immersion {
        immersion_id: ImmersionId(11),
        code: "IMM-11".into(),
        operation_id,
        team_id,
        date: NaiveDate::from_ymd_opt(2024, 6, 3).expect("date"),
        objective: "Cambio de redes".into(),
        supervisor: Some("Jane Doe".into()),
        lead_diver: None,
        assistant_diver: None,
        max_depth: 18.0,
        state: ImmersionState::Planned,
        is_independent: operation_id.is_none(),
        operation_name: "Centro Chonchi".into(),
    }
}

fn operation() -> Operation {
    Operation {
        operation_id: OperationId(3),
        code: "OP-3".into(),
        name: "Centro Chonchi".into(),
        site_name: None,
    }
}

fn member(role: &str, name: &str) -> TeamMember {
    TeamMember {
        member_id: None,
        role: role.into(),
        display_name: name.into(),
        rut: Some("11.111.111-1".into()),
    }
}

struct FakeBackend {
    immersion: Option<Immersion>,
    operation: Option<Operation>,
    rosters: HashMap<TeamId, Vec<TeamMember>>,
    fallback: Option<TeamId>,
}

#[async_trait]
impl ImmersionSource for FakeBackend {
    async fn immersion(&self, immersion_id: ImmersionId) -> Result<Option<Immersion>> {
        Ok(self
            .immersion
            .clone()
            .filter(|imm| imm.immersion_id == immersion_id))
    }

    async fn operation(&self, operation_id: OperationId) -> Result<Option<Operation>> {
        Ok(self
            .operation
            .clone()
            .filter(|op| op.operation_id == operation_id))
    }
}

#[async_trait]
impl RosterSource for FakeBackend {
    async fn team_roster(&self, team_id: TeamId) -> Result<Vec<TeamMember>> {
        Ok(self.rosters.get(&team_id).cloned().unwrap_or_default())
    }

    async fn fallback_team(&self) -> Result<Option<TeamId>> {
        Ok(self.fallback)
    }
}

fn seed(roster: Vec<TeamMember>) -> LogbookSeed {
    LogbookSeed {
        immersion: immersion(Some(TeamId(1)), Some(OperationId(3))),
        operation: Some(operation()),
        roster_team: Some(TeamId(1)),
        roster,
    }
}

#[test]
fn step_table_matches_logbook_rules() {
    let steps = steps();
    assert_eq!(steps.len(), 6);
    assert!(steps
        .iter()
        .enumerate()
        .all(|(index, step)| step.ordinal == index + 1));
}

#[test]
fn populates_supervisor_site_date_and_divers() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let seed = seed(vec![
        member("buzo_principal", "Luis Vera Soto"),
        member("supervisor", "Marta Gil"),
    ]);
    let session = controller.initialize(Some(&seed));
    let draft = session.draft();

    assert!(draft.code().as_str().starts_with("BS-"));
    assert_eq!(draft.seed_ref(), Some("11"));
    assert_eq!(draft.text(fields::SUPERVISOR), Some("Jane Doe"));
    assert_eq!(draft.text(fields::SUPERVISOR_NAME_LICENSE), Some("Jane Doe"));
    assert_eq!(draft.text(fields::START_DATE), Some("2024-06-03"));
    assert_eq!(draft.text(fields::WORK_SITE), Some("Centro Chonchi"));
    assert_eq!(draft.get(fields::OPERATION_ID), Some(&json!(3)));

    let divers: Vec<Participant> = draft.decode(fields::DIVERS).expect("decode").expect("divers");
    assert_eq!(divers.len(), 1);
    assert_eq!(divers[0].given_name, "Luis");
    assert_eq!(divers[0].surname, "Vera Soto");
    assert_eq!(divers[0].rut, "11.111.111-1");
}

#[test]
fn walks_all_six_steps_and_builds_the_record() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let seed = seed(vec![member("buzo", "Ana Ruiz")]);
    let mut session = controller.initialize(Some(&seed));

    assert_eq!(session.advance(), Advance::Blocked);
    session.apply_patch(patch(json!({
        "dive_narrative": "Sin novedades",
        "general_assessment": "Buena"
    })));
    assert_eq!(session.advance(), Advance::Moved { from: 1, to: 2 });
    assert_eq!(session.advance(), Advance::Moved { from: 2, to: 3 });
    assert_eq!(session.advance(), Advance::Moved { from: 3, to: 4 });
    assert_eq!(session.advance(), Advance::Blocked);
    session.apply_patch(patch(json!({ "work_description": "Reparación de malla" })));
    assert_eq!(session.advance(), Advance::Moved { from: 4, to: 5 });
    assert_eq!(session.advance(), Advance::Moved { from: 5, to: 6 });

    let draft = session.complete().expect("complete");
    let record = logbook_from_draft(&draft).expect("record");
    assert_eq!(record.code, draft.code().as_str());
    assert_eq!(record.immersion_id, ImmersionId(11));
    assert_eq!(record.supervisor.as_deref(), Some("Jane Doe"));
    assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 6, 3));
    assert_eq!(record.lead_diver.as_deref(), Some("Ana Ruiz"));
    assert_eq!(record.payload["work_description"], json!("Reparación de malla"));
}

#[test]
fn step_two_blocks_without_divers() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let seed = seed(vec![member("supervisor", "Marta Gil")]);
    let mut session = controller.initialize(Some(&seed));
    session.apply_patch(patch(json!({
        "dive_narrative": "x",
        "general_assessment": "y"
    })));
    session.advance();
    assert_eq!(session.advance(), Advance::Blocked);
    assert_eq!(session.active_step(), 2);
}

#[test]
fn record_requires_a_seed_reference() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let session = controller.initialize(None);
    let err = logbook_from_draft(session.draft()).expect_err("no seed");
    assert!(matches!(err, WizardError::MissingSeedReference { .. }));
}

#[test]
fn lead_diver_prefers_principal_role() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let seed = seed(vec![
        member("buzo_asistente", "Pablo Ruiz"),
        member("buzo_principal", "Luis Vera"),
    ]);
    let session = controller.initialize(Some(&seed));
    let record = logbook_from_draft(session.draft()).expect("record");
    assert_eq!(record.lead_diver.as_deref(), Some("Luis Vera"));
}

#[tokio::test]
async fn seed_uses_assigned_team_roster() {
    let backend = FakeBackend {
        immersion: Some(immersion(Some(TeamId(2)), Some(OperationId(3)))),
        operation: Some(operation()),
        rosters: HashMap::from([
            (TeamId(1), vec![member("buzo", "Fallback Diver")]),
            (TeamId(2), vec![member("buzo", "Assigned Diver")]),
        ]),
        fallback: Some(TeamId(1)),
    };
    let seed = load_logbook_seed(&backend, &backend, ImmersionId(11))
        .await
        .expect("load")
        .expect("seed");
    assert_eq!(seed.roster_team, Some(TeamId(2)));
    assert_eq!(seed.roster[0].display_name, "Assigned Diver");
    assert_eq!(seed.operation, Some(operation()));
}

#[tokio::test]
async fn seed_falls_back_to_first_team_then_empty() {
    let mut backend = FakeBackend {
        immersion: Some(immersion(None, None)),
        operation: None,
        rosters: HashMap::from([(TeamId(1), vec![member("buzo", "Fallback Diver")])]),
        fallback: Some(TeamId(1)),
    };
    let seed = load_logbook_seed(&backend, &backend, ImmersionId(11))
        .await
        .expect("load")
        .expect("seed");
    assert_eq!(seed.roster_team, Some(TeamId(1)));
    assert!(seed.operation.is_none());

    backend.fallback = None;
    let seed = load_logbook_seed(&backend, &backend, ImmersionId(11))
        .await
        .expect("load")
        .expect("seed");
    assert!(seed.roster.is_empty());

    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let session = controller.initialize(Some(&seed));
    assert_eq!(session.draft().list_len(fields::DIVERS), 0);
    assert!(session.draft().get(fields::WORK_SITE).is_none());
}

#[tokio::test]
async fn missing_immersion_yields_no_seed() {
    let backend = FakeBackend {
        immersion: None,
        operation: None,
        rosters: HashMap::new(),
        fallback: None,
    };
    let seed = load_logbook_seed(&backend, &backend, ImmersionId(99))
        .await
        .expect("load");
    assert!(seed.is_none());
}

#[test]
fn roster_change_on_same_team_repopulates_divers() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let empty = seed(Vec::new());
    let mut session = controller.initialize(Some(&empty));
    assert_eq!(session.draft().list_len(fields::DIVERS), 0);

    let joined = seed(vec![member("buzo", "Ana Ruiz")]);
    assert!(session.refresh_seed(Some(&joined)));
    assert_eq!(session.draft().list_len(fields::DIVERS), 1);

    let reordered = seed(vec![member("buzo", "Ana Ruiz")]);
    assert!(!session.refresh_seed(Some(&reordered)));
}

#[test]
fn roster_change_keeps_hand_edited_divers() {
    let controller = logbook_controller(DOCUMENT_PREFIX, RosterFilter::default()).expect("wizard");
    let mut session = controller.initialize(Some(&seed(vec![member("buzo", "Ana Ruiz")])));
    session.apply_patch(patch(json!({ "divers": [] })));

    let grown = seed(vec![
        member("buzo", "Ana Ruiz"),
        member("buzo_principal", "Luis Vera"),
    ]);
    assert!(session.refresh_seed(Some(&grown)));
    assert_eq!(session.draft().list_len(fields::DIVERS), 0);
}
