use std::collections::BTreeSet;

use shared::domain::{Participant, TeamMember, DEFAULT_ROSTER_ROLE, UNNAMED};

pub const DEFAULT_ACCEPTED_ROLES: [&str; 3] = ["buzo", "buzo_principal", "buzo_asistente"];

/// Which roster role tags become logbook participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterFilter {
    accepted: BTreeSet<String>,
}

impl Default for RosterFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTED_ROLES)
    }
}

impl RosterFilter {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            accepted: roles
                .into_iter()
                .map(|role| role.as_ref().trim().to_ascii_lowercase())
                .filter(|role| !role.is_empty())
                .collect(),
        }
    }

    pub fn accepts(&self, role: &str) -> bool {
        self.accepted.contains(&role.trim().to_ascii_lowercase())
    }

    /// Keeps accepted members and projects them into participant entries.
    /// Members without an id get a positional `temp_N` id so the projection
    /// is deterministic.
    pub fn project(&self, roster: &[TeamMember]) -> Vec<Participant> {
        roster
            .iter()
            .map(|member| (member, role_or_default(&member.role)))
            .filter(|(_, role)| self.accepts(role))
            .enumerate()
            .map(|(index, (member, role))| {
                let (given_name, surname) = split_display_name(&member.display_name);
                Participant {
                    id: member
                        .member_id
                        .clone()
                        .unwrap_or_else(|| format!("temp_{}", index + 1)),
                    given_name,
                    surname,
                    rut: member.rut.clone().unwrap_or_default(),
                    role: role.to_string(),
                    working_depth: 0.0,
                    immersion_minutes: 0.0,
                    max_depth: 0.0,
                    bottom_minutes: 0.0,
                    decompression_minutes: 0.0,
                    water_entry_time: String::new(),
                    water_exit_time: String::new(),
                    observations: String::new(),
                    from_dive_team: true,
                }
            })
            .collect()
    }
}

fn role_or_default(role: &str) -> &str {
    if role.trim().is_empty() {
        DEFAULT_ROSTER_ROLE
    } else {
        role
    }
}

/// Splits on the first space: `"Ana María Pérez"` gives `("Ana", "María Pérez")`.
pub fn split_display_name(name: &str) -> (String, String) {
    let name = name.trim();
    if name.is_empty() || name == UNNAMED {
        return (UNNAMED.to_string(), String::new());
    }
    match name.split_once(' ') {
        Some((given, surname)) => (given.to_string(), surname.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: &str, name: &str, id: Option<&str>) -> TeamMember {
        TeamMember {
            member_id: id.map(str::to_string),
            role: role.into(),
            display_name: name.into(),
            rut: None,
        }
    }

    #[test]
    fn keeps_only_accepted_roles_case_insensitively() {
        let filter = RosterFilter::default();
        let roster = vec![
            member("Buzo_Principal", "Luis Vera", Some("a")),
            member("supervisor", "Marta Gil", Some("b")),
            member("buzo_asistente", "Pablo Ruiz", Some("c")),
        ];
        let participants = filter.project(&roster);
        let ids: Vec<_> = participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(participants[0].role, "Buzo_Principal");
        assert!(participants.iter().all(|p| p.from_dive_team));
    }

    #[test]
    fn positional_ids_are_stable_across_projections() {
        let filter = RosterFilter::new(["diver"]);
        let roster = vec![member("diver", "A B", None), member("diver", "C D", None)];
        assert_eq!(filter.project(&roster), filter.project(&roster));
        assert_eq!(filter.project(&roster)[1].id, "temp_2");
    }

    #[test]
    fn blank_role_counts_as_diver() {
        let participants = RosterFilter::default().project(&[member(" ", "Ana Ruiz", None)]);
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].role, "buzo");
        assert_eq!(participants[0].id, "temp_1");
    }

    #[test]
    fn splits_on_first_space_only() {
        assert_eq!(
            split_display_name("Ana María Pérez"),
            ("Ana".to_string(), "María Pérez".to_string())
        );
        assert_eq!(
            split_display_name("Cher"),
            ("Cher".to_string(), String::new())
        );
    }

    #[test]
    fn placeholder_name_is_not_split() {
        assert_eq!(
            split_display_name(UNNAMED),
            (UNNAMED.to_string(), String::new())
        );
        assert_eq!(split_display_name("  "), (UNNAMED.to_string(), String::new()));
    }
}
