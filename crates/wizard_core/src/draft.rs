use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{code::DocumentCode, error::WizardError};

/// Open mapping from field name to value.
pub type FieldMap = serde_json::Map<String, Value>;

/// Builds a patch from a JSON object literal; anything else yields an empty patch.
pub fn patch(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

/// The document under construction.
///
/// The code is fixed when the draft is created. Field values are whatever the
/// step editors wrote; nothing is validated until a step tries to advance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    code: DocumentCode,
    seed_ref: Option<String>,
    fields: FieldMap,
}

impl Draft {
    pub(crate) fn new(code: DocumentCode, fields: FieldMap) -> Self {
        Self {
            code,
            seed_ref: None,
            fields,
        }
    }

    pub fn code(&self) -> &DocumentCode {
        &self.code
    }

    /// Identifier of the seed entity this draft was opened from.
    pub fn seed_ref(&self) -> Option<&str> {
        self.seed_ref.as_deref()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// True when the field is a string with at least one non-whitespace char.
    pub fn has_text(&self, key: &str) -> bool {
        self.text(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn list_len(&self, key: &str) -> usize {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Decodes a field into a typed value; `Ok(None)` when the field is absent.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WizardError> {
        let Some(value) = self.fields.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| WizardError::InvalidField {
                field: key.to_string(),
                reason: err.to_string(),
            })
    }

    /// Shallow merge; sequences and objects are replaced wholesale.
    pub(crate) fn merge(&mut self, patch: FieldMap) {
        for (key, value) in patch {
            self.fields.insert(key, value);
        }
    }

    pub(crate) fn set(&mut self, key: String, value: Value) {
        self.fields.insert(key, value);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.fields.remove(key);
    }

    pub(crate) fn set_seed_ref(&mut self, seed_ref: Option<String>) {
        self.seed_ref = seed_ref;
    }

    /// Flat JSON view: every field plus `code` and, when known, `seed_ref`.
    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("code".into(), Value::String(self.code.to_string()));
        if let Some(seed_ref) = &self.seed_ref {
            map.insert("seed_ref".into(), Value::String(seed_ref.clone()));
        }
        Value::Object(map)
    }
}
