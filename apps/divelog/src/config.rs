use std::{fs, path::Path};

use serde::Deserialize;
use wizard_core::roster::DEFAULT_ACCEPTED_ROLES;

pub const CONFIG_FILE: &str = "divelog.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub page_size: usize,
    pub document_prefix: String,
    pub accepted_roles: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/divelog.db".into(),
            page_size: 10,
            document_prefix: "BS".into(),
            accepted_roles: DEFAULT_ACCEPTED_ROLES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    page_size: Option<usize>,
    document_prefix: Option<String>,
    accepted_roles: Option<Vec<String>>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(CONFIG_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let file_cfg = match toml::from_str::<FileSettings>(&raw) {
        Ok(cfg) => cfg,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v.max(1);
    }
    if let Some(v) = file_cfg.document_prefix {
        settings.document_prefix = v;
    }
    if let Some(v) = file_cfg.accepted_roles {
        settings.accepted_roles = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.page_size = parsed.max(1);
        }
    }

    if let Some(v) = var("APP__DOCUMENT_PREFIX") {
        settings.document_prefix = v;
    }

    if let Some(v) = var("APP__ACCEPTED_ROLES") {
        let roles: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();
        if !roles.is_empty() {
            settings.accepted_roles = roles;
        }
    }
}

/// Turns plain file paths into `sqlite://` urls. The parent directory is
/// created when storage opens the database.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
