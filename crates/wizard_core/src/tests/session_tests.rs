use serde_json::json;

use super::*;
use crate::{draft::patch, step::predicates};

#[derive(Debug, Clone)]
struct Site {
    id: &'static str,
    name: &'static str,
    date: Option<&'static str>,
}

struct SitePopulator;

impl AutoPopulate for SitePopulator {
    type Seed = Site;

    fn defaults(&self) -> FieldMap {
        patch(json!({ "site": "", "notes": "" }))
    }

    fn seed_identity(&self, seed: &Site) -> String {
        seed.id.to_string()
    }

    fn populate(&self, seed: &Site) -> FieldMap {
        let mut map = patch(json!({ "site": seed.name }));
        if let Some(date) = seed.date {
            map.insert("date".into(), json!(date));
        }
        map
    }
}

fn three_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(1, "Site", "", predicates::required_text(&["site"])),
        StepDefinition::new(2, "Notes", "", predicates::required_text(&["notes"])),
        StepDefinition::new(3, "Sign", "", predicates::always),
    ]
}

fn controller() -> WizardController<SitePopulator> {
    WizardController::new("T", three_steps(), SitePopulator).expect("controller")
}

fn north() -> Site {
    Site {
        id: "S-1",
        name: "North pen",
        date: Some("2024-05-01"),
    }
}

#[test]
fn empty_step_list_is_a_configuration_error() {
    let err = WizardController::new("T", Vec::new(), Unseeded).err();
    assert!(matches!(err, Some(WizardError::Configuration(_))));
}

#[test]
fn ordinals_must_be_contiguous_from_one() {
    let steps = vec![
        StepDefinition::new(1, "a", "", predicates::always),
        StepDefinition::new(3, "b", "", predicates::always),
    ];
    let err = WizardController::new("T", steps, Unseeded).err();
    assert!(matches!(err, Some(WizardError::Configuration(_))));
}

#[test]
fn initialize_starts_at_step_one_with_distinct_codes() {
    let controller = controller();
    let first = controller.initialize(None);
    let second = controller.initialize(None);
    assert_eq!(first.active_step(), 1);
    assert!(!first.draft().code().as_str().is_empty());
    assert_ne!(first.draft().code(), second.draft().code());
    assert!((first.progress() - 1.0 / 3.0).abs() < f64::EPSILON);
}

#[test]
fn absent_seed_leaves_defaults_in_place() {
    let session = controller().initialize(None);
    assert_eq!(session.draft().text("site"), Some(""));
    assert!(session.draft().get("date").is_none());
    assert!(session.draft().seed_ref().is_none());
}

#[test]
fn seed_fields_and_reference_are_populated() {
    let site = north();
    let session = controller().initialize(Some(&site));
    assert_eq!(session.draft().text("site"), Some("North pen"));
    assert_eq!(session.draft().text("date"), Some("2024-05-01"));
    assert_eq!(session.draft().seed_ref(), Some("S-1"));
}

#[test]
fn blocked_advance_changes_nothing() {
    let mut session = controller().initialize(None);
    let before = session.draft().clone();
    assert!(!session.can_advance());
    assert_eq!(session.advance(), Advance::Blocked);
    assert_eq!(session.active_step(), 1);
    assert_eq!(session.draft(), &before);
}

#[test]
fn advance_reports_final_step() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    assert_eq!(session.advance(), Advance::Moved { from: 1, to: 2 });
    session.apply_patch(patch(json!({ "notes": "calm" })));
    assert_eq!(session.advance(), Advance::Moved { from: 2, to: 3 });
    assert!(session.is_final_step());
    assert_eq!(session.advance(), Advance::AtFinalStep);
    assert_eq!(session.active_step(), 3);
    assert!((session.progress() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn retreat_floors_at_one_and_keeps_data() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    assert_eq!(session.retreat(), 1);
    session.advance();
    session.apply_patch(patch(json!({ "notes": "kept" })));
    assert_eq!(session.retreat(), 1);
    assert_eq!(session.retreat(), 1);
    assert_eq!(session.draft().text("notes"), Some("kept"));
}

#[test]
fn patches_on_distinct_keys_compose() {
    let controller = controller();
    let mut split = controller.initialize(None);
    split.apply_patch(patch(json!({ "a": 1 })));
    split.apply_patch(patch(json!({ "b": 2 })));

    let mut joined = controller.initialize(None);
    joined.apply_patch(patch(json!({ "a": 1, "b": 2 })));

    assert_eq!(split.draft().fields(), joined.draft().fields());
}

#[test]
fn last_write_wins_and_lists_are_replaced() {
    let mut session = controller().initialize(None);
    session.apply_patch(patch(json!({ "a": 1, "crew": [1, 2, 3] })));
    session.apply_patch(patch(json!({ "a": 2, "crew": [9] })));
    assert_eq!(session.draft().get("a"), Some(&json!(2)));
    assert_eq!(session.draft().get("crew"), Some(&json!([9])));
}

#[test]
fn unknown_fields_are_stored() {
    let mut session = controller().initialize(None);
    session.apply_patch(patch(json!({ "anything": { "nested": true } })));
    assert_eq!(
        session.draft().get("anything"),
        Some(&json!({ "nested": true }))
    );
}

#[test]
fn refresh_with_same_seed_is_idempotent() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    let before = session.draft().clone();
    assert!(!session.refresh_seed(Some(&site)));
    assert_eq!(session.draft(), &before);
}

#[test]
fn refresh_never_overwrites_user_edits() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    session.apply_patch(patch(json!({ "site": "Typed by hand" })));

    let south = Site {
        id: "S-2",
        name: "South pen",
        date: None,
    };
    assert!(session.refresh_seed(Some(&south)));
    assert_eq!(session.draft().text("site"), Some("Typed by hand"));
    assert_eq!(session.draft().seed_ref(), Some("S-2"));
}

#[test]
fn refresh_drops_stale_seed_fields() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    let south = Site {
        id: "S-2",
        name: "South pen",
        date: None,
    };
    session.refresh_seed(Some(&south));
    assert_eq!(session.draft().text("site"), Some("South pen"));
    assert!(session.draft().get("date").is_none());

    session.refresh_seed(None);
    assert_eq!(session.draft().text("site"), Some(""));
    assert!(session.draft().seed_ref().is_none());
}

#[test]
fn code_survives_refresh_and_patches() {
    let site = north();
    let mut session = controller().initialize(Some(&site));
    let code = session.draft().code().clone();
    session.apply_patch(patch(json!({ "code": "overwritten?" })));
    session.refresh_seed(None);
    assert_eq!(session.draft().code(), &code);
}

#[test]
fn complete_before_final_step_is_refused() {
    let site = north();
    let session = controller().initialize(Some(&site));
    let refused = session.complete().expect_err("not on final step");
    assert_eq!(refused.error, WizardError::NotFinalStep { step: 1, total: 3 });
    assert_eq!(refused.into_session().active_step(), 1);
}

#[test]
fn complete_with_unmet_final_predicate_is_refused() {
    let steps = vec![
        StepDefinition::new(1, "Only", "", predicates::required_text(&["site"])),
    ];
    let controller = WizardController::new("T", steps, SitePopulator).expect("controller");
    let session = controller.initialize(None);
    let refused = session.complete().expect_err("predicate unmet");
    assert_eq!(refused.error, WizardError::NotReady { step: 1 });

    let mut session = refused.into_session();
    session.apply_patch(patch(json!({ "site": "Dock" })));
    let draft = session.complete().expect("complete");
    assert_eq!(draft.text("site"), Some("Dock"));
}

#[test]
fn edited_fields_are_tracked() {
    let mut session = controller().initialize(None);
    session.apply_patch(patch(json!({ "b": 1, "a": 2 })));
    assert_eq!(session.edited_fields().collect::<Vec<_>>(), ["a", "b"]);
}
