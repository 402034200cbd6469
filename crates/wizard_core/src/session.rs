use std::{collections::BTreeSet, fmt, mem, sync::Arc};

use tracing::{debug, info};

use crate::{
    code::DocumentCode,
    draft::{Draft, FieldMap},
    error::WizardError,
    step::StepDefinition,
};

/// Maps a seed entity onto draft fields.
pub trait AutoPopulate: Send + Sync {
    type Seed;

    /// Fields every fresh draft starts with, before any seed data.
    fn defaults(&self) -> FieldMap {
        FieldMap::new()
    }

    /// Stable identity of a seed; population re-runs only when it changes.
    fn seed_identity(&self, seed: &Self::Seed) -> String;

    /// Foreign key recorded on the draft.
    fn seed_reference(&self, seed: &Self::Seed) -> Option<String> {
        Some(self.seed_identity(seed))
    }

    fn populate(&self, seed: &Self::Seed) -> FieldMap;
}

/// Populator for wizards that are never seeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unseeded;

impl AutoPopulate for Unseeded {
    type Seed = ();

    fn seed_identity(&self, _seed: &()) -> String {
        String::new()
    }

    fn seed_reference(&self, _seed: &()) -> Option<String> {
        None
    }

    fn populate(&self, _seed: &()) -> FieldMap {
        FieldMap::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { from: usize, to: usize },
    /// The active step's predicate is false; nothing changed.
    Blocked,
    /// Already on the last step; the caller should offer "finish".
    AtFinalStep,
}

/// Validated step list plus populator; opens sessions.
pub struct WizardController<P: AutoPopulate> {
    code_prefix: String,
    steps: Arc<[StepDefinition]>,
    populator: Arc<P>,
}

impl<P: AutoPopulate> Clone for WizardController<P> {
    fn clone(&self) -> Self {
        Self {
            code_prefix: self.code_prefix.clone(),
            steps: Arc::clone(&self.steps),
            populator: Arc::clone(&self.populator),
        }
    }
}

impl<P: AutoPopulate> WizardController<P> {
    pub fn new(
        code_prefix: impl Into<String>,
        steps: Vec<StepDefinition>,
        populator: P,
    ) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::Configuration(
                "a wizard needs at least one step".into(),
            ));
        }
        for (index, step) in steps.iter().enumerate() {
            if step.ordinal != index + 1 {
                return Err(WizardError::Configuration(format!(
                    "step '{}' has ordinal {} but sits at position {}",
                    step.title,
                    step.ordinal,
                    index + 1
                )));
            }
        }

        Ok(Self {
            code_prefix: code_prefix.into(),
            steps: steps.into(),
            populator: Arc::new(populator),
        })
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn populator(&self) -> &P {
        &self.populator
    }

    /// Opens a session at step 1 with a freshly minted document code.
    pub fn initialize(&self, seed: Option<&P::Seed>) -> WizardSession<P> {
        let code = DocumentCode::generate(&self.code_prefix);
        let defaults = self.populator.defaults();
        let mut session = WizardSession {
            steps: Arc::clone(&self.steps),
            populator: Arc::clone(&self.populator),
            active: 1,
            draft: Draft::new(code, defaults.clone()),
            defaults,
            seed_identity: None,
            auto_keys: BTreeSet::new(),
            edited: BTreeSet::new(),
        };
        session.refresh_seed(seed);
        info!(
            code = %session.draft.code(),
            total_steps = session.total_steps(),
            seeded = session.seed_identity.is_some(),
            "wizard session initialized"
        );
        session
    }
}

/// One live pass through a wizard.
///
/// `complete` and `cancel` consume the session, so nothing can touch it once
/// it has terminated.
pub struct WizardSession<P: AutoPopulate> {
    steps: Arc<[StepDefinition]>,
    populator: Arc<P>,
    active: usize,
    draft: Draft,
    defaults: FieldMap,
    seed_identity: Option<String>,
    auto_keys: BTreeSet<String>,
    edited: BTreeSet<String>,
}

impl<P: AutoPopulate> fmt::Debug for WizardSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardSession")
            .field("active", &self.active)
            .field("total", &self.steps.len())
            .field("draft", &self.draft)
            .field("seed_identity", &self.seed_identity)
            .field("edited", &self.edited)
            .finish_non_exhaustive()
    }
}

impl<P: AutoPopulate> WizardSession<P> {
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn active_step(&self) -> usize {
        self.active
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.steps[self.active - 1]
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn is_final_step(&self) -> bool {
        self.active == self.steps.len()
    }

    /// Active step over total steps, in `(0, 1]`.
    pub fn progress(&self) -> f64 {
        self.active as f64 / self.steps.len() as f64
    }

    /// Fields the user has written explicitly; auto-population leaves them alone.
    pub fn edited_fields(&self) -> impl Iterator<Item = &str> {
        self.edited.iter().map(String::as_str)
    }

    /// Shallow-merges `patch` into the draft. Last write wins per key.
    pub fn apply_patch(&mut self, patch: FieldMap) -> &Draft {
        debug!(
            code = %self.draft.code(),
            step = self.active,
            keys = ?patch.keys().collect::<Vec<_>>(),
            "applying draft patch"
        );
        for key in patch.keys() {
            self.edited.insert(key.clone());
        }
        self.draft.merge(patch);
        &self.draft
    }

    pub fn can_advance(&self) -> bool {
        self.current_step().is_satisfied_by(&self.draft)
    }

    pub fn advance(&mut self) -> Advance {
        if !self.can_advance() {
            debug!(code = %self.draft.code(), step = self.active, "advance blocked");
            return Advance::Blocked;
        }
        if self.is_final_step() {
            return Advance::AtFinalStep;
        }

        let from = self.active;
        self.active += 1;
        info!(code = %self.draft.code(), from, to = self.active, "wizard advanced");
        Advance::Moved {
            from,
            to: self.active,
        }
    }

    /// Steps back one page, flooring at step 1. Entered data is kept.
    pub fn retreat(&mut self) -> usize {
        if self.active > 1 {
            self.active -= 1;
            debug!(code = %self.draft.code(), to = self.active, "wizard retreated");
        }
        self.active
    }

    /// Re-derives seed fields when the seed identity differs from the last one
    /// applied. Fields the user patched are never touched. Returns whether
    /// anything was recomputed.
    pub fn refresh_seed(&mut self, seed: Option<&P::Seed>) -> bool {
        let identity = seed.map(|seed| self.populator.seed_identity(seed));
        if identity == self.seed_identity {
            return false;
        }

        let derived = seed
            .map(|seed| self.populator.populate(seed))
            .unwrap_or_default();

        for key in mem::take(&mut self.auto_keys) {
            if self.edited.contains(&key) || derived.contains_key(&key) {
                continue;
            }
            match self.defaults.get(&key) {
                Some(default) => self.draft.set(key, default.clone()),
                None => self.draft.remove(&key),
            }
        }

        for (key, value) in derived {
            if self.edited.contains(&key) {
                continue;
            }
            self.draft.set(key.clone(), value);
            self.auto_keys.insert(key);
        }

        self.draft
            .set_seed_ref(seed.and_then(|seed| self.populator.seed_reference(seed)));
        debug!(
            code = %self.draft.code(),
            seed = ?identity,
            auto_fields = self.auto_keys.len(),
            "seed fields recomputed"
        );
        self.seed_identity = identity;
        true
    }

    /// Terminates the session and hands back the finished draft.
    ///
    /// Refused unless the session is on its final step and that step's
    /// predicate holds; the refusal returns the session untouched.
    pub fn complete(self) -> Result<Draft, CompletionRefused<P>> {
        if !self.is_final_step() {
            let error = WizardError::NotFinalStep {
                step: self.active,
                total: self.steps.len(),
            };
            return Err(CompletionRefused::new(self, error));
        }
        if !self.can_advance() {
            let error = WizardError::NotReady { step: self.active };
            return Err(CompletionRefused::new(self, error));
        }

        info!(code = %self.draft.code(), "wizard completed");
        Ok(self.draft)
    }

    pub fn cancel(self) {
        info!(code = %self.draft.code(), step = self.active, "wizard cancelled");
    }
}

/// A refused `complete`, carrying the still-live session back to the caller.
pub struct CompletionRefused<P: AutoPopulate> {
    pub session: Box<WizardSession<P>>,
    pub error: WizardError,
}

impl<P: AutoPopulate> CompletionRefused<P> {
    fn new(session: WizardSession<P>, error: WizardError) -> Self {
        Self {
            session: Box::new(session),
            error,
        }
    }

    pub fn into_session(self) -> WizardSession<P> {
        *self.session
    }
}

impl<P: AutoPopulate> fmt::Debug for CompletionRefused<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRefused")
            .field("error", &self.error)
            .field("step", &self.session.active)
            .finish()
    }
}

impl<P: AutoPopulate> fmt::Display for CompletionRefused<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completion refused: {}", self.error)
    }
}

impl<P: AutoPopulate> std::error::Error for CompletionRefused<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
