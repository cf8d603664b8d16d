//! Encrypted credential storage
//!
//! API keys live in `.time2code/credentials.enc`, a JSON envelope holding a salt, a
//! nonce and an AES-256-GCM ciphertext. The plaintext is a map of credential names to
//! values, so several keys can share one file and one password.

use crate::config::CONFIG_DIR_NAME;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable checked first for the chat-completion API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the password for the credential file
pub const PASSWORD_ENV: &str = "T2C_CREDENTIAL_PASSWORD";

/// Name under which the API key is stored
pub const API_KEY_NAME: &str = "openai_api_key";

/// Errors that can occur during credential storage operations
#[derive(Error, Debug)]
pub enum CredentialStoreError {
    /// IO error while reading or writing credentials
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Encryption error
    #[error("Encryption error")]
    Encryption,

    /// Wrong password or tampered file
    #[error("Decryption error")]
    Decryption,

    /// Invalid credential format
    #[error("Invalid credential format")]
    InvalidFormat,

    /// Credential not found
    #[error("Credential not found: {0}")]
    NotFound(String),

    /// No API key in the environment and none stored
    #[error("No API key: set OPENAI_API_KEY, or store one with `t2c set-key` and export T2C_CREDENTIAL_PASSWORD")]
    MissingApiKey,
}

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(iterations) => iterations,
    None => panic!("PBKDF2 iteration count must be non-zero"),
};

const SALT_LENGTH: usize = 32;

const NONCE_LENGTH: usize = 12;

/// On-disk envelope, all fields base64
#[derive(Debug, Serialize, Deserialize)]
struct SealedCredentials {
    salt: String,
    nonce: String,
    ciphertext: String,
}

/// Password-protected store of named secrets
pub struct CredentialStore {
    credentials_path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by the given file
    pub fn new<P: AsRef<Path>>(credentials_path: P) -> Self {
        Self {
            credentials_path: credentials_path.as_ref().to_path_buf(),
        }
    }

    /// Store in the project's `.time2code` directory
    pub fn for_project<P: AsRef<Path>>(project_root: P) -> Self {
        Self::new(
            project_root
                .as_ref()
                .join(CONFIG_DIR_NAME)
                .join("credentials.enc"),
        )
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.credentials_path
    }

    /// Check if the credentials file exists
    pub fn exists(&self) -> bool {
        self.credentials_path.exists()
    }

    /// Store or replace one credential, keeping the others
    pub fn set(&self, name: &str, value: &str, password: &str) -> Result<(), CredentialStoreError> {
        let mut entries = if self.exists() {
            self.load(password)?
        } else {
            BTreeMap::new()
        };
        entries.insert(name.to_string(), value.to_string());
        self.save(&entries, password)
    }

    /// Read one credential
    pub fn get(&self, name: &str, password: &str) -> Result<String, CredentialStoreError> {
        if !self.exists() {
            return Err(CredentialStoreError::NotFound(name.to_string()));
        }
        self.load(password)?
            .remove(name)
            .ok_or_else(|| CredentialStoreError::NotFound(name.to_string()))
    }

    fn load(&self, password: &str) -> Result<BTreeMap<String, String>, CredentialStoreError> {
        let json = std::fs::read_to_string(&self.credentials_path)?;
        let sealed: SealedCredentials = serde_json::from_str(&json)?;

        let salt = decode(&sealed.salt)?;
        let nonce_bytes = decode(&sealed.nonce)?;
        let ciphertext = decode(&sealed.ciphertext)?;
        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(CredentialStoreError::InvalidFormat);
        }

        let cipher = cipher_for(password, &salt);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CredentialStoreError::Decryption)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn save(
        &self,
        entries: &BTreeMap<String, String>,
        password: &str,
    ) -> Result<(), CredentialStoreError> {
        let rng = SystemRandom::new();
        let mut salt = [0u8; SALT_LENGTH];
        rng.fill(&mut salt)
            .map_err(|_| CredentialStoreError::Encryption)?;
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| CredentialStoreError::Encryption)?;

        let plaintext = serde_json::to_vec(entries)?;
        let ciphertext = cipher_for(password, &salt)
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|_| CredentialStoreError::Encryption)?;

        let sealed = SealedCredentials {
            salt: BASE64.encode(salt),
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(ciphertext),
        };

        if let Some(parent) = self.credentials_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(
            &self.credentials_path,
            serde_json::to_string_pretty(&sealed)?,
        )?;

        Ok(())
    }
}

fn decode(field: &str) -> Result<Vec<u8>, CredentialStoreError> {
    BASE64
        .decode(field)
        .map_err(|_| CredentialStoreError::InvalidFormat)
}

fn cipher_for(password: &str, salt: &[u8]) -> Aes256Gcm {
    let mut derived_key = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt,
        password.as_bytes(),
        &mut derived_key,
    );
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived_key))
}

/// Find the chat-completion API key.
///
/// `OPENAI_API_KEY` wins when set and non-empty. Otherwise the project's credential
/// store is opened with the password from `T2C_CREDENTIAL_PASSWORD`.
pub fn resolve_api_key<P: AsRef<Path>>(project_root: P) -> Result<String, CredentialStoreError> {
    let from_env = std::env::var(API_KEY_ENV).ok();
    let password = std::env::var(PASSWORD_ENV).ok();
    resolve_api_key_from(project_root.as_ref(), from_env, password)
}

fn resolve_api_key_from(
    project_root: &Path,
    from_env: Option<String>,
    password: Option<String>,
) -> Result<String, CredentialStoreError> {
    if let Some(key) = from_env.filter(|key| !key.trim().is_empty()) {
        return Ok(key);
    }

    let store = CredentialStore::for_project(project_root);
    match password {
        Some(password) if store.exists() => store.get(API_KEY_NAME, &password),
        _ => Err(CredentialStoreError::MissingApiKey),
    }
}
