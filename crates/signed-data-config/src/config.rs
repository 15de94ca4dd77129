// crates/signed-data-config/src/config.rs
// ============================================================================
// Module: Signed Data Configuration
// Description: Configuration loading and validation for signed-data verifiers.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: signed-data-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Root certificates are referenced by path and read as DER when the config is
//! converted into a [`VerifierConfig`]. Relative certificate paths resolve
//! against the directory of the config file.
//!
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use signed_data_core::Environment;
use thiserror::Error;

use crate::verifier::VerifierConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "signed-data.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SIGNED_DATA_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum bundle identifier length.
pub(crate) const MAX_BUNDLE_ID_LENGTH: usize = 255;
/// Maximum number of configured root certificates.
pub(crate) const MAX_ROOT_CERTIFICATES: usize = 16;
/// Maximum size of one DER root certificate in bytes.
pub(crate) const MAX_ROOT_CERTIFICATE_SIZE: usize = 64 * 1024;
/// Default OCSP request timeout in milliseconds.
pub(crate) const DEFAULT_OCSP_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for the OCSP request timeout.
pub(crate) const MAX_OCSP_TIMEOUT_MS: u64 = 30_000;
/// Default OCSP response size limit in bytes.
pub(crate) const DEFAULT_OCSP_MAX_RESPONSE_BYTES: usize = 64 * 1024;
/// Upper bound for the OCSP response size limit.
pub(crate) const MAX_OCSP_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Signed-data verifier configuration as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedDataConfig {
    /// Bundle identifier payloads must carry.
    pub bundle_id: String,
    /// Environment payloads must come from.
    pub environment: Environment,
    /// Numeric app identifier (required in production).
    #[serde(default)]
    pub app_apple_id: Option<i64>,
    /// Enables revocation checks and the chain cache.
    #[serde(default = "default_enable_online_checks")]
    pub enable_online_checks: bool,
    /// Paths to DER-encoded root certificates.
    #[serde(default)]
    pub root_certificates: Vec<String>,
    /// OCSP transport configuration.
    #[serde(default)]
    pub ocsp: OcspConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Directory relative certificate paths resolve against (not serialized).
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl SignedDataConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.base_dir = resolved.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identity(&self.bundle_id, self.environment, self.app_apple_id)?;
        if self.root_certificates.is_empty() {
            return Err(ConfigError::Invalid("root_certificates must be non-empty".to_string()));
        }
        if self.root_certificates.len() > MAX_ROOT_CERTIFICATES {
            return Err(ConfigError::Invalid("too many root_certificates".to_string()));
        }
        for path in &self.root_certificates {
            validate_path_string("root_certificates", path)?;
        }
        self.ocsp.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Reads the configured root certificates and builds the runtime config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a certificate file cannot be read or the
    /// resulting configuration is invalid.
    pub fn into_verifier_config(self) -> Result<VerifierConfig, ConfigError> {
        self.validate()?;
        let mut roots = Vec::with_capacity(self.root_certificates.len());
        for path in &self.root_certificates {
            roots.push(read_root_certificate(&self.resolve_certificate_path(path))?);
        }
        let config = VerifierConfig {
            bundle_id: self.bundle_id,
            environment: self.environment,
            app_apple_id: self.app_apple_id,
            root_certificates: roots,
            enable_online_checks: self.enable_online_checks,
            ocsp: self.ocsp,
            audit: self.audit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolves a certificate path against the config directory.
    fn resolve_certificate_path(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path.trim());
        match &self.base_dir {
            Some(base) if candidate.is_relative() => base.join(candidate),
            _ => candidate,
        }
    }
}

/// OCSP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcspConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_ocsp_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_ocsp_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent sent with OCSP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for OcspConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_OCSP_TIMEOUT_MS,
            max_response_bytes: DEFAULT_OCSP_MAX_RESPONSE_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

impl OcspConfig {
    /// Validates OCSP limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a limit is zero or above its bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 || self.timeout_ms > MAX_OCSP_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "ocsp.timeout_ms must be between 1 and {MAX_OCSP_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_OCSP_MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "ocsp.max_response_bytes must be between 1 and {MAX_OCSP_MAX_RESPONSE_BYTES}"
            )));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() || agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid(
                "ocsp.user_agent must be non-empty and at most 256 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit disabled.
    #[default]
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink has no usable path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default for `enable_online_checks`.
const fn default_enable_online_checks() -> bool {
    true
}

/// Default for `ocsp.timeout_ms`.
const fn default_ocsp_timeout_ms() -> u64 {
    DEFAULT_OCSP_TIMEOUT_MS
}

/// Default for `ocsp.max_response_bytes`.
const fn default_ocsp_max_response_bytes() -> usize {
    DEFAULT_OCSP_MAX_RESPONSE_BYTES
}

/// Default for `ocsp.user_agent`.
fn default_user_agent() -> String {
    concat!("signed-data-verifier/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Validates bundle id, environment, and app id together.
pub(crate) fn validate_identity(
    bundle_id: &str,
    environment: Environment,
    app_apple_id: Option<i64>,
) -> Result<(), ConfigError> {
    if bundle_id.trim().is_empty() {
        return Err(ConfigError::Invalid("bundle_id must be non-empty".to_string()));
    }
    if bundle_id.len() > MAX_BUNDLE_ID_LENGTH {
        return Err(ConfigError::Invalid("bundle_id exceeds max length".to_string()));
    }
    if environment.requires_app_apple_id() && app_apple_id.is_none() {
        return Err(ConfigError::Invalid(
            "app_apple_id is required for the production environment".to_string(),
        ));
    }
    Ok(())
}

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Reads one DER root certificate with a size limit.
fn read_root_certificate(path: &Path) -> Result<Vec<u8>, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| {
        ConfigError::Io(format!("root certificate {}: {err}", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(ConfigError::Invalid(format!("root certificate {} is empty", path.display())));
    }
    if bytes.len() > MAX_ROOT_CERTIFICATE_SIZE {
        return Err(ConfigError::Invalid(format!(
            "root certificate {} exceeds size limit",
            path.display()
        )));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions on deterministic fixtures."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("root_certificates", "   ");
        assert!(result.is_err(), "whitespace-only path should fail");
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let component = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let result = validate_path_string("audit.path", &component);
        assert!(result.unwrap_err().to_string().contains("component too long"));
    }

    #[test]
    fn relative_certificate_paths_resolve_against_base_dir() {
        let mut config = SignedDataConfig::from_toml_str(
            r#"
            bundle_id = "com.example"
            environment = "sandbox"
            root_certificates = ["certs/root.cer", "/abs/root.cer"]
            "#,
        )
        .unwrap();
        config.base_dir = Some(PathBuf::from("/etc/signed-data"));
        assert_eq!(
            config.resolve_certificate_path("certs/root.cer"),
            PathBuf::from("/etc/signed-data/certs/root.cer")
        );
        let absolute = config.resolve_certificate_path("/abs/root.cer");
        assert_eq!(absolute, PathBuf::from("/abs/root.cer"));
    }
}
