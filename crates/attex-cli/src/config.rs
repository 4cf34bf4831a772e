//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use attex_core::SanitizeMode;
use attex_export::{ExportConfig, Restriction};
use attex_sfdc::Credentials;

/// Global configuration for attex
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub salesforce: SalesforceSection,
    pub export: ExportSection,
    pub restrictions: RestrictionsSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SalesforceSection {
    pub username: String,
    pub password: String,
    /// Appended to the password at login; empty for orgs with trusted IPs.
    pub security_token: String,
    /// Custom My Domain prefix; takes precedence over `sandbox`.
    pub domain: Option<String>,
    pub sandbox: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub output_dir: PathBuf,
    /// Manifest CSV path. Defaults to `<output_dir>/manifest.csv`.
    pub manifest_csv: Option<PathBuf>,
    pub structured: bool,
    pub workers: usize,
    /// Rows per bulk result page.
    pub batch_size: u32,
    pub resume: bool,
    pub resume_at_id: Option<String>,
    pub filename_pattern: Option<String>,
    pub log_level: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./attachments"),
            manifest_csv: None,
            structured: false,
            workers: 4,
            batch_size: 10_000,
            resume: false,
            resume_at_id: None,
            filename_pattern: None,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RestrictionsSection {
    pub object_name: Option<String>,
    pub object_where: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Treat empty strings as unset; `key = ""` in TOML means "not configured".
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Search order: `./attex.toml`, then `~/.config/attex/config.toml`.
    /// Returns the config and where it came from (None = defaults).
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        let local = PathBuf::from("attex.toml");
        if local.exists() {
            return Ok((Self::from_file(&local)?, Some(local)));
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "attex") {
            let user = dirs.config_dir().join("config.toml");
            if user.exists() {
                return Ok((Self::from_file(&user)?, Some(user)));
            }
        }

        Ok((Self::default(), None))
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Check required settings. Fatal before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.salesforce.username.trim().is_empty() {
            bail!("salesforce.username is not set");
        }
        if self.salesforce.password.trim().is_empty() {
            bail!("salesforce.password is not set");
        }
        if self.export.resume_at_id.as_deref().is_some_and(|id| !id.trim().is_empty())
            && !self.export.resume
        {
            bail!("export.resume_at_id requires export.resume = true");
        }
        Ok(())
    }

    /// Login host: custom domain wins, then sandbox, then production.
    pub fn login_host(&self) -> String {
        match non_empty(self.salesforce.domain.as_deref()) {
            Some(domain) => format!("{domain}.my.salesforce.com"),
            None if self.salesforce.sandbox => "test.salesforce.com".to_string(),
            None => "login.salesforce.com".to_string(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.salesforce.username.clone(),
            password: self.salesforce.password.clone(),
            security_token: self.salesforce.security_token.clone(),
            login_host: self.login_host(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.export
            .manifest_csv
            .clone()
            .unwrap_or_else(|| self.export.output_dir.join("manifest.csv"))
    }

    pub fn results_path(&self) -> PathBuf {
        self.export.output_dir.join("downloaded.csv")
    }

    /// One-line description of the configured restriction for display.
    pub fn restriction_summary(&self) -> String {
        let r = &self.restrictions;
        match (
            non_empty(r.object_name.as_deref()),
            non_empty(r.start_date.as_deref()),
            non_empty(r.end_date.as_deref()),
        ) {
            (Some(name), _, _) => match non_empty(r.object_where.as_deref()) {
                Some(clause) => format!("parent object {name} where {clause}"),
                None => format!("parent object {name}"),
            },
            (None, Some(start), Some(end)) => format!("created {start} .. {end}"),
            _ => "none (full table)".to_string(),
        }
    }

    /// Build the immutable pipeline configuration. The CLI's only override
    /// is the filename pattern.
    pub fn export_config(&self, filename_pattern: Option<String>) -> Result<ExportConfig> {
        let restriction = Restriction::from_options(
            non_empty(self.restrictions.object_name.as_deref()),
            non_empty(self.restrictions.object_where.as_deref()),
            non_empty(self.restrictions.start_date.as_deref()),
            non_empty(self.restrictions.end_date.as_deref()),
        )?;

        Ok(ExportConfig {
            output_dir: self.export.output_dir.clone(),
            manifest_path: self.manifest_path(),
            results_path: self.results_path(),
            structured: self.export.structured,
            workers: self.export.workers.max(1),
            batch_size: self.export.batch_size,
            resume: self.export.resume,
            resume_at_id: non_empty(self.export.resume_at_id.as_deref()),
            filename_pattern: filename_pattern
                .as_deref()
                .and_then(|p| non_empty(Some(p)))
                .or_else(|| non_empty(self.export.filename_pattern.as_deref())),
            sanitize: SanitizeMode::for_platform(),
            restriction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.export.output_dir, PathBuf::from("./attachments"));
        assert_eq!(config.export.workers, 4);
        assert_eq!(config.export.batch_size, 10_000);
        assert!(!config.export.resume);
        assert_eq!(config.export.log_level, "info");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[salesforce]
username = "exports@acme.example"
password = "hunter2"
security_token = "tok"
sandbox = true

[export]
output_dir = "/data/attachments"
structured = true
workers = 8
batch_size = 50000
resume = true
resume_at_id = "00P5e00001abcde"

[restrictions]
object_name = "Account"
object_where = "Industry = 'Energy'"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.salesforce.username, "exports@acme.example");
        assert!(config.export.structured);
        assert_eq!(config.export.workers, 8);
        assert_eq!(config.export.batch_size, 50_000);
        assert_eq!(
            config.export.resume_at_id.as_deref(),
            Some("00P5e00001abcde")
        );
        assert_eq!(config.restrictions.object_name.as_deref(), Some("Account"));
    }

    #[test]
    fn login_host_production_by_default() {
        let config = Config::default();
        assert_eq!(config.login_host(), "login.salesforce.com");
    }

    #[test]
    fn login_host_sandbox() {
        let mut config = Config::default();
        config.salesforce.sandbox = true;
        assert_eq!(config.login_host(), "test.salesforce.com");
    }

    #[test]
    fn login_host_custom_domain_wins_over_sandbox() {
        let mut config = Config::default();
        config.salesforce.sandbox = true;
        config.salesforce.domain = Some("acme".to_string());
        assert_eq!(config.login_host(), "acme.my.salesforce.com");
    }

    #[test]
    fn empty_domain_string_is_unset() {
        let mut config = Config::default();
        config.salesforce.domain = Some(String::new());
        assert_eq!(config.login_host(), "login.salesforce.com");
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn validate_rejects_checkpoint_without_resume() {
        let mut config = Config::default();
        config.salesforce.username = "u".to_string();
        config.salesforce.password = "p".to_string();
        config.export.resume_at_id = Some("00P123".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("resume"));
    }

    #[test]
    fn manifest_path_defaults_beside_output() {
        let config = Config::default();
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("./attachments/manifest.csv")
        );
    }

    #[test]
    fn cli_pattern_overrides_config_pattern() {
        let mut config = Config::default();
        config.export.filename_pattern = Some("{id}".to_string());
        let ec = config.export_config(Some("{parent}-{name}".to_string())).unwrap();
        assert_eq!(ec.filename_pattern.as_deref(), Some("{parent}-{name}"));

        let ec = config.export_config(None).unwrap();
        assert_eq!(ec.filename_pattern.as_deref(), Some("{id}"));
    }

    #[test]
    fn conflicting_restrictions_rejected() {
        let mut config = Config::default();
        config.restrictions.object_name = Some("Account".to_string());
        config.restrictions.start_date = Some("2024-01-01".to_string());
        config.restrictions.end_date = Some("2024-02-01".to_string());
        assert!(config.export_config(None).is_err());
    }

    #[test]
    fn empty_restriction_strings_mean_unrestricted() {
        let mut config = Config::default();
        config.restrictions.object_name = Some(String::new());
        config.restrictions.object_where = Some(String::new());
        let ec = config.export_config(None).unwrap();
        assert_eq!(ec.restriction, Restriction::Unrestricted);
    }
}
