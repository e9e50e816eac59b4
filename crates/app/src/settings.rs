use std::fmt;
use std::path::Path;

use anyhow::Context;
use exam_core::model::UserId;
use exam_core::{ExamConfig, QuestionBank, catalog};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::filter::{Directive, LevelFilter};

#[derive(Debug)]
pub enum SettingsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Everything a command needs, resolved from flags, environment and defaults.
pub struct Settings {
    pub config: ExamConfig,
    pub db_url: String,
    pub user_id: UserId,
    pub user_generated: bool,
    pub bank: QuestionBank,
    pub rng: StdRng,
}

impl Settings {
    pub fn resolve(
        config_path: Option<&Path>,
        db: &str,
        user: Option<&str>,
        bank_path: Option<&Path>,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ExamConfig::from_toml_str(&raw)
                    .with_context(|| format!("loading config {}", path.display()))?
            }
            None => ExamConfig::default(),
        };

        if db.trim().is_empty() {
            return Err(SettingsError::InvalidDbUrl { raw: db.to_owned() }.into());
        }
        let db_url = normalize_sqlite_url(db.to_owned());

        let (user_id, user_generated) = match user {
            Some(raw) => (UserId::new(raw).context("invalid --user")?, false),
            None => (UserId::generate(), true),
        };

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let bank = match bank_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading question bank {}", path.display()))?;
                QuestionBank::from_json(&raw)
                    .with_context(|| format!("loading question bank {}", path.display()))?
            }
            None => catalog::builtin_bank_with_targets(&config.domain_weights, &mut rng)
                .context("building the built-in question bank")?,
        };
        info!(questions = bank.len(), db = %db_url, "settings resolved");

        Ok(Self {
            config,
            db_url,
            user_id,
            user_generated,
            bank,
            rng,
        })
    }
}

/// Parse a log directive, falling back to `info` for everything.
pub fn directive(raw: &str) -> Directive {
    raw.parse().unwrap_or_else(|_| LevelFilter::INFO.into())
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist so sqlx can open it.
pub fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| SettingsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(SettingsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_full_urls_are_kept() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/x.db".into()),
            "sqlite:///tmp/x.db"
        );
    }

    #[test]
    fn bare_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("/var/data/exam.db".into());
        assert_eq!(url, "sqlite:///var/data/exam.db");

        let url = normalize_sqlite_url("sqlite:exam.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/exam.db"));
    }

    #[test]
    fn prepare_rejects_non_file_urls() {
        assert!(prepare_sqlite_file("postgres://db").is_err());
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
    }

    #[test]
    fn seeded_settings_use_the_builtin_bank() {
        let settings =
            Settings::resolve(None, "sqlite::memory:", Some("ana"), None, Some(4)).unwrap();
        assert_eq!(settings.bank.len(), 150);
        assert_eq!(settings.user_id.as_str(), "ana");
        assert!(!settings.user_generated);
    }

    #[test]
    fn bad_directive_falls_back_to_info() {
        assert_eq!(
            directive("[[[").to_string(),
            Directive::from(LevelFilter::INFO).to_string()
        );
    }
}
