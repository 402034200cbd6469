use std::{fmt, sync::Arc};

use crate::draft::Draft;

/// Pure validity check over the draft; gates forward navigation.
pub type StepPredicate = Arc<dyn Fn(&Draft) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct StepDefinition {
    pub ordinal: usize,
    pub title: String,
    pub description: String,
    predicate: StepPredicate,
}

impl StepDefinition {
    pub fn new(
        ordinal: usize,
        title: impl Into<String>,
        description: impl Into<String>,
        predicate: impl Fn(&Draft) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            ordinal,
            title: title.into(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn is_satisfied_by(&self, draft: &Draft) -> bool {
        (self.predicate)(draft)
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("ordinal", &self.ordinal)
            .field("title", &self.title)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Predicate building blocks for step definitions.
pub mod predicates {
    use crate::draft::Draft;

    pub fn always(_: &Draft) -> bool {
        true
    }

    pub fn required_text(keys: &'static [&'static str]) -> impl Fn(&Draft) -> bool + Send + Sync {
        move |draft| keys.iter().all(|key| draft.has_text(key))
    }

    pub fn any_text(keys: &'static [&'static str]) -> impl Fn(&Draft) -> bool + Send + Sync {
        move |draft| keys.iter().any(|key| draft.has_text(key))
    }

    pub fn non_empty_list(key: &'static str) -> impl Fn(&Draft) -> bool + Send + Sync {
        move |draft| draft.list_len(key) > 0
    }
}
