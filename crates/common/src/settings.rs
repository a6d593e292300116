use std::fmt;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::SignatureError;
use crate::request_signing::{decode_private_key, AccountKey};

pub const ENVIRONMENT_PREFIX: &str = "TENPAY";

#[derive(Clone, Deserialize, Validate)]
pub struct MerchantSettings {
    #[validate(length(min = 1))]
    pub app_id: String,
    #[validate(length(min = 1))]
    pub mch_id: String,
    #[serde(default)]
    pub sub_mch_id: String,
    /// Serial number of the merchant API certificate, sent as `serial_no`.
    #[validate(length(min = 1))]
    pub certificate_serial: String,
    /// Base64 PKCS#8 private key; PEM armor is tolerated.
    #[validate(custom(function = "validate_private_key"))]
    pub private_key: String,
}

impl MerchantSettings {
    #[must_use]
    pub fn account_key(&self) -> AccountKey {
        AccountKey::new(self.mch_id.clone(), self.sub_mch_id.clone())
    }
}

impl fmt::Debug for MerchantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantSettings")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("sub_mch_id", &self.sub_mch_id)
            .field("certificate_serial", &self.certificate_serial)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn validate_private_key(value: &str) -> Result<(), ValidationError> {
    decode_private_key(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_private_key"))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct KeyCacheSettings {
    /// Seconds a fetched platform key set stays fresh; absent keeps it for the
    /// life of the process.
    #[validate(range(min = 1))]
    pub ttl_secs: Option<u64>,
    pub min_refetch_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub merchant: MerchantSettings,
    #[serde(default)]
    #[validate(nested)]
    pub key_cache: KeyCacheSettings,
}

impl Settings {
    /// Parses TOML and merges `TENPAY__`-prefixed environment overrides, e.g.
    /// `TENPAY__MERCHANT__APP_ID` overrides `merchant.app_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the TOML is malformed, a
    /// required field is missing, or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<SignatureError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(SignatureError::Configuration {
                message: "Failed to build configuration".into(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(SignatureError::Configuration {
                    message: "Failed to deserialize settings".into(),
                })?;

        settings
            .validate()
            .change_context(SignatureError::Configuration {
                message: "Settings validation failed".into(),
            })?;

        Ok(settings)
    }

    /// Reads a TOML settings file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the file cannot be read or
    /// [`Settings::from_toml`] fails.
    pub fn from_file(path: &Path) -> Result<Self, Report<SignatureError>> {
        let content =
            std::fs::read_to_string(path).change_context(SignatureError::Configuration {
                message: format!("Failed to read settings file {}", path.display()),
            })?;

        Self::from_toml(&content).attach(format!("while loading {}", path.display()))
    }
}
