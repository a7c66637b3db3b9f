//! Service-account credentials for the recognition service.
//!
//! Loaded once per process from the JSON key file issued by the cloud
//! console. The private key stays wrapped in a [`SecretBox`] so it never
//! shows up in `Debug` output or logs.

use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Deserializer};

use crate::models::error::StreamError;

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// A service-account key document.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    private_key: SecretBox<String>,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub auth_uri: String,
    #[serde(default)]
    pub token_uri: String,
    #[serde(default)]
    pub auth_provider_x509_cert_url: String,
    #[serde(default)]
    pub client_x509_cert_url: String,
    #[serde(default)]
    pub universe_domain: String,
}

impl ServiceAccountKey {
    /// Parse and validate a key document.
    pub fn from_json(text: &str) -> Result<Self, StreamError> {
        let key: ServiceAccountKey = serde_json::from_str(text)
            .map_err(|e| StreamError::InvalidCredentials(format!("failed to parse key file: {}", e)))?;
        key.validate()?;
        Ok(key)
    }

    /// Read, parse and validate a key file.
    pub fn load(path: &Path) -> Result<Self, StreamError> {
        let text = fs::read_to_string(path).map_err(|e| {
            StreamError::CredentialsUnavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let key = Self::from_json(&text)?;
        log::info!(
            "Loaded service account {} for project {}",
            key.client_email,
            key.project_id
        );
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(StreamError::InvalidCredentials(format!(
                "unsupported key type: {:?}",
                self.key_type
            )));
        }
        if self.project_id.trim().is_empty() {
            return Err(StreamError::InvalidCredentials("project_id is missing".into()));
        }
        if self.client_email.trim().is_empty() {
            return Err(StreamError::InvalidCredentials("client_email is missing".into()));
        }
        if self.private_key.expose_secret().trim().is_empty() {
            return Err(StreamError::InvalidCredentials("private_key is missing".into()));
        }
        Ok(())
    }

    /// PEM-encoded private key. Only transports that sign tokens need this.
    pub fn private_key(&self) -> &str {
        self.private_key.expose_secret()
    }

    /// Resource name of a recognizer in this key's project.
    pub fn recognizer_path(&self, location: &str, recognizer_id: &str) -> String {
        format!(
            "projects/{}/locations/{}/recognizers/{}",
            self.project_id, location, recognizer_id
        )
    }
}

fn empty_secret() -> SecretBox<String> {
    SecretBox::new(Box::default())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretBox<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(SecretBox::new(Box::new(value)))
}
