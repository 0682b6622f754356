//! Configuration management infrastructure.
//!
//! TOML file holding signing defaults and the verification policy. Values are
//! kept as plain strings in the file and validated when converted into the
//! typed options the services take.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

use crate::domain::crypto::HashAlgorithm;
use crate::domain::signature::SignatureType;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{ConfigError, ConfigResult};
use crate::services::signing::SigningOptions;
use crate::services::trust_store::TrustStore;
use crate::services::verification::VerificationOptions;

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfiguration {
    pub signing: SigningDefaults,
    pub verification: VerificationPolicyConfig,
}

/// Defaults applied when creating signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningDefaults {
    pub hash_algorithm: String,
    pub signature_type: String,
    /// RFC 3161 authority; unset means signatures are not timestamped.
    pub timestamp_url: Option<String>,
    pub timestamp_timeout_seconds: u64,
}

impl Default for SigningDefaults {
    fn default() -> Self {
        Self {
            hash_algorithm: "sha256".to_string(),
            signature_type: "author".to_string(),
            timestamp_url: None,
            timestamp_timeout_seconds: 30,
        }
    }
}

/// Verification policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationPolicyConfig {
    pub allow_untrusted_root: bool,
    pub require_timestamp: bool,
    pub verify_timestamp: bool,
    pub allowed_signature_types: Vec<String>,
    pub allowed_hash_algorithms: Vec<String>,
    /// Also trust the platform certificate store.
    pub use_system_roots: bool,
    pub trusted_root_pem_files: Vec<PathBuf>,
}

impl Default for VerificationPolicyConfig {
    fn default() -> Self {
        Self {
            allow_untrusted_root: false,
            require_timestamp: false,
            verify_timestamp: true,
            allowed_signature_types: vec!["author".to_string(), "repository".to_string()],
            allowed_hash_algorithms: vec![
                "sha256".to_string(),
                "sha384".to_string(),
                "sha512".to_string(),
            ],
            use_system_roots: false,
            trusted_root_pem_files: Vec::new(),
        }
    }
}

/// Timestamp authority settings resolved from [`SigningDefaults`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampSettings {
    pub url: Option<TimestampUrl>,
    pub timeout: Duration,
}

impl SignatureConfiguration {
    /// Check every value that a conversion would reject.
    pub fn validate(&self) -> ConfigResult<()> {
        self.hash_algorithm()?;
        self.signature_type()?;
        self.timestamp_settings()?;
        self.allowed_signature_types()?;
        self.allowed_hash_algorithms()?;
        Ok(())
    }

    pub fn hash_algorithm(&self) -> ConfigResult<HashAlgorithm> {
        parse_hash_algorithm(&self.signing.hash_algorithm)
    }

    pub fn signature_type(&self) -> ConfigResult<SignatureType> {
        parse_signature_type(&self.signing.signature_type)
    }

    pub fn timestamp_settings(&self) -> ConfigResult<TimestampSettings> {
        if self.signing.timestamp_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timestamp timeout must be greater than 0".to_string(),
            ));
        }
        let url = self
            .signing
            .timestamp_url
            .as_deref()
            .map(|url| {
                TimestampUrl::new(url)
                    .map_err(|e| ConfigError::InvalidValue(format!("timestamp_url: {e}")))
            })
            .transpose()?;
        Ok(TimestampSettings {
            url,
            timeout: Duration::from_secs(self.signing.timestamp_timeout_seconds),
        })
    }

    fn allowed_signature_types(&self) -> ConfigResult<Vec<SignatureType>> {
        self.verification
            .allowed_signature_types
            .iter()
            .map(|name| parse_signature_type(name))
            .collect()
    }

    fn allowed_hash_algorithms(&self) -> ConfigResult<Vec<HashAlgorithm>> {
        self.verification
            .allowed_hash_algorithms
            .iter()
            .map(|name| parse_hash_algorithm(name))
            .collect()
    }

    /// Signing options for `certificate`/`private_key` with these defaults.
    pub fn signing_options(
        &self,
        certificate: X509,
        private_key: PKey<Private>,
    ) -> ConfigResult<SigningOptions> {
        let settings = self.timestamp_settings()?;
        let mut options = SigningOptions::new(certificate, private_key)
            .with_hash_algorithm(self.hash_algorithm()?)
            .with_signature_type(self.signature_type()?);
        options.timestamp_timeout = settings.timeout;
        options.timestamp_url = settings.url;
        Ok(options)
    }

    /// Trust store from the configured PEM files (and system roots if enabled).
    pub fn build_trust_store(&self) -> ConfigResult<TrustStore> {
        let mut store = TrustStore::new();
        if self.verification.use_system_roots {
            store = store.with_system_roots();
        }
        for path in &self.verification.trusted_root_pem_files {
            let trusted_root = |reason: String| ConfigError::TrustedRoot {
                path: path.display().to_string(),
                reason,
            };
            let pem = fs::read(path).map_err(|e| trusted_root(e.to_string()))?;
            let certificates =
                X509::stack_from_pem(&pem).map_err(|e| trusted_root(e.to_string()))?;
            if certificates.is_empty() {
                return Err(trusted_root("no certificates found".to_string()));
            }
            let count = certificates.len();
            for certificate in certificates {
                store
                    .add_certificate(certificate)
                    .map_err(|e| trusted_root(e.to_string()))?;
            }
            log::debug!("loaded {count} trusted roots from {}", path.display());
        }
        Ok(store)
    }

    /// Verification options over `trust_store` with this policy.
    pub fn to_verification_options(
        &self,
        trust_store: Arc<TrustStore>,
    ) -> ConfigResult<VerificationOptions> {
        let policy = &self.verification;
        Ok(VerificationOptions::new(trust_store)
            .allow_untrusted_root(policy.allow_untrusted_root)
            .require_timestamp(policy.require_timestamp)
            .verify_timestamp(policy.verify_timestamp)
            .with_allowed_signature_types(self.allowed_signature_types()?)
            .with_allowed_hash_algorithms(self.allowed_hash_algorithms()?))
    }
}

fn parse_hash_algorithm(name: &str) -> ConfigResult<HashAlgorithm> {
    name.parse::<HashAlgorithm>()
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))
}

fn parse_signature_type(name: &str) -> ConfigResult<SignatureType> {
    name.parse::<SignatureType>().map_err(ConfigError::InvalidValue)
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> ConfigResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("nuget-package-signing").join("config.toml"))
        } else {
            Ok(PathBuf::from("nuget-package-signing.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> ConfigResult<SignatureConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SignatureConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> ConfigResult<SignatureConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());
        let content = fs::read_to_string(&self.config_path)?;
        let config: SignatureConfiguration = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SignatureConfiguration) -> ConfigResult<()> {
        config.validate()?;
        log::info!("Saving configuration to: {}", self.config_path.display());
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut config = self.load()?;
        let parse_bool = |value: &str| {
            value
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid boolean value: {value}")))
        };

        match key {
            "signing.hash_algorithm" => {
                parse_hash_algorithm(value)?;
                config.signing.hash_algorithm = value.to_string();
            }
            "signing.signature_type" => {
                parse_signature_type(value)?;
                config.signing.signature_type = value.to_string();
            }
            "signing.timestamp_url" => {
                config.signing.timestamp_url = (!value.is_empty()).then(|| value.to_string());
            }
            "signing.timestamp_timeout_seconds" => {
                config.signing.timestamp_timeout_seconds = value.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid timeout value: {value}"))
                })?;
            }
            "verification.allow_untrusted_root" => {
                config.verification.allow_untrusted_root = parse_bool(value)?;
            }
            "verification.require_timestamp" => {
                config.verification.require_timestamp = parse_bool(value)?;
            }
            "verification.verify_timestamp" => {
                config.verification.verify_timestamp = parse_bool(value)?;
            }
            "verification.use_system_roots" => {
                config.verification.use_system_roots = parse_bool(value)?;
            }
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = SignatureConfiguration::default();
        assert_eq!(config.hash_algorithm().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(config.signature_type().unwrap(), SignatureType::Author);
        let settings = config.timestamp_settings().unwrap();
        assert_eq!(settings.url, None);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(config.verification.verify_timestamp);
        assert!(!config.verification.allow_untrusted_root);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SignatureConfiguration = toml::from_str(
            "[verification]\nallow_untrusted_root = true\n",
        )
        .unwrap();
        assert!(config.verification.allow_untrusted_root);
        assert_eq!(config.signing, SigningDefaults::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = SignatureConfiguration::default();
        config.signing.hash_algorithm = "sha1".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = SignatureConfiguration::default();
        config.signing.timestamp_timeout_seconds = 0;
        assert!(config.timestamp_settings().is_err());

        let mut config = SignatureConfiguration::default();
        config.verification.allowed_signature_types = vec!["publisher".to_string()];
        assert!(config.validate().is_err());

        let mut config = SignatureConfiguration::default();
        config.signing.timestamp_url = Some("ftp://tsa.example".to_string());
        assert!(config.timestamp_settings().is_err());
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.load().unwrap(), config);

        manager
            .update_value("signing.timestamp_url", "http://tsa.example.test")
            .unwrap();
        manager
            .update_value("verification.require_timestamp", "true")
            .unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(
            loaded.signing.timestamp_url.as_deref(),
            Some("http://tsa.example.test")
        );
        assert!(loaded.verification.require_timestamp);
        assert!(manager.update_value("no.such.key", "1").is_err());
    }

    #[test]
    fn test_system_roots_flag_reaches_trust_store() {
        let mut config = SignatureConfiguration::default();
        assert!(!config.build_trust_store().unwrap().uses_system_roots());

        config.verification.use_system_roots = true;
        let store = config.build_trust_store().unwrap();
        assert!(store.uses_system_roots());
        assert!(!store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_missing_trusted_root_file() {
        let mut config = SignatureConfiguration::default();
        config.verification.trusted_root_pem_files = vec![PathBuf::from("/nonexistent/root.pem")];
        assert!(matches!(
            config.build_trust_store(),
            Err(ConfigError::TrustedRoot { .. })
        ));
    }
}
