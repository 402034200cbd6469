use serde_json::json;
use shared::domain::{Participant, TeamMember};
use wizard_core::{
    patch, predicates, Advance, AutoPopulate, FieldMap, RosterFilter, StepDefinition,
    WizardController,
};

struct ImmersionRecord {
    id: &'static str,
    supervisor: &'static str,
    roster: Vec<TeamMember>,
}

struct ReportPopulator {
    roles: RosterFilter,
}

impl AutoPopulate for ReportPopulator {
    type Seed = ImmersionRecord;

    fn seed_identity(&self, seed: &ImmersionRecord) -> String {
        seed.id.to_string()
    }

    fn populate(&self, seed: &ImmersionRecord) -> FieldMap {
        let participants = self.roles.project(&seed.roster);
        patch(json!({
            "supervisor": seed.supervisor,
            "participants": participants,
        }))
    }
}

fn roster_entry(role: &str, name: &str) -> TeamMember {
    TeamMember {
        member_id: None,
        role: role.into(),
        display_name: name.into(),
        rut: None,
    }
}

#[test]
fn three_step_report_from_immersion() {
    let steps = vec![
        StepDefinition::new(1, "Header", "", predicates::required_text(&["supervisor"])),
        StepDefinition::new(2, "Narrative", "", predicates::required_text(&["narrative"])),
        StepDefinition::new(3, "Review", "", predicates::always),
    ];
    let controller = WizardController::new(
        "BS",
        steps,
        ReportPopulator {
            roles: RosterFilter::new(["diver"]),
        },
    )
    .expect("controller");

    let seed = ImmersionRecord {
        id: "IMM-1",
        supervisor: "Jane Doe",
        roster: vec![
            roster_entry("diver", "John Smith"),
            roster_entry("topside", "Amy Lee"),
        ],
    };

    let mut session = controller.initialize(Some(&seed));
    let code = session.draft().code().clone();
    assert_eq!(session.draft().text("supervisor"), Some("Jane Doe"));

    let participants: Vec<Participant> = session
        .draft()
        .decode("participants")
        .expect("decode")
        .expect("participants");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].given_name, "John");
    assert_eq!(participants[0].surname, "Smith");
    assert_eq!(participants[0].role, "diver");

    assert!(session.can_advance());
    assert_eq!(session.advance(), Advance::Moved { from: 1, to: 2 });

    session.apply_patch(patch(json!({ "narrative": "Dive proceeded as planned." })));
    assert_eq!(session.advance(), Advance::Moved { from: 2, to: 3 });
    assert!(session.is_final_step());

    let draft = session.complete().expect("complete");
    assert_eq!(draft.code(), &code);
    assert_eq!(draft.seed_ref(), Some("IMM-1"));
    assert_eq!(draft.text("supervisor"), Some("Jane Doe"));
    assert_eq!(draft.text("narrative"), Some("Dive proceeded as planned."));
    assert_eq!(draft.list_len("participants"), 1);
}

#[test]
fn cancelled_session_releases_without_side_effects() {
    let controller = WizardController::new(
        "BS",
        vec![StepDefinition::new(1, "Only", "", predicates::always)],
        ReportPopulator {
            roles: RosterFilter::default(),
        },
    )
    .expect("controller");
    let session = controller.initialize(None);
    assert!(session.draft().fields().is_empty());
    session.cancel();
}
