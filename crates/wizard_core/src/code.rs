use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 12;

/// Identifying code of a document under construction.
///
/// Layout: `PREFIX-<unix millis>-<12 uppercase hex>`. The hex part comes from
/// a v4 UUID, so two codes minted within the same millisecond collide with
/// probability 2^-48.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCode(String);

impl DocumentCode {
    pub fn generate(prefix: &str) -> Self {
        let millis = Utc::now().timestamp_millis();
        let random = Uuid::new_v4().simple().to_string();
        let suffix = random[..RANDOM_SUFFIX_LEN].to_ascii_uppercase();
        let prefix = prefix.trim();
        if prefix.is_empty() {
            Self(format!("{millis}-{suffix}"))
        } else {
            Self(format!("{prefix}-{millis}-{suffix}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
