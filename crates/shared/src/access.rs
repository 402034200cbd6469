//! Read-only view of who is acting and which optional modules they can reach.
//!
//! The context is built once by the caller (after profile lookup) and passed
//! explicitly to anything with role-gated behavior.

use std::collections::BTreeSet;

use crate::domain::UserRole;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    pub role: Option<UserRole>,
    /// Whether the user belongs to a salmon farm or a service company.
    pub assigned: bool,
    pub modules: BTreeSet<String>,
}

impl AccessContext {
    pub fn new(role: Option<UserRole>, assigned: bool) -> Self {
        Self {
            role,
            assigned,
            modules: BTreeSet::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.insert(module.into());
        self
    }

    pub fn is_superuser(&self) -> bool {
        self.role == Some(UserRole::Superuser)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == Some(role)
    }

    pub fn has_module_access(&self, module: &str) -> bool {
        self.is_superuser() || self.modules.contains(module)
    }
}
