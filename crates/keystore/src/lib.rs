//! Lootledger Keystore
//!
//! File-based credential persistence with platform-aware paths.
//! The key file holds the 32-byte secp256k1 secret as a single hex line.

use std::fs;
use std::path::{Path, PathBuf};

use lootledger_crypto::SigningKeypair;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Failed to read key file: {0}")]
    ReadError(String),
    #[error("Failed to write key file: {0}")]
    WriteError(String),
    #[error("Invalid key format: {0}")]
    InvalidFormat(String),
    #[error("Key file already exists: {0}")]
    AlreadyExists(String),
    #[error("Failed to create directory: {0}")]
    CreateDirError(String),
}

pub type Result<T> = std::result::Result<T, KeystoreError>;

/// Load a signing keypair from a hex key file.
pub fn load_keypair(path: &Path) -> Result<SigningKeypair> {
    debug!("Loading credential from {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| KeystoreError::ReadError(e.to_string()))?;
    SigningKeypair::from_hex(&text).map_err(|e| KeystoreError::InvalidFormat(e.to_string()))
}

/// Load the keypair at `path` if the file exists.
pub fn load_keypair_if_present(path: &Path) -> Result<Option<SigningKeypair>> {
    if path.exists() {
        load_keypair(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Generate a new keypair and save it. Never overwrites an existing file.
pub fn generate_keypair(path: &Path) -> Result<SigningKeypair> {
    if path.exists() {
        return Err(KeystoreError::AlreadyExists(path.display().to_string()));
    }
    let keypair = SigningKeypair::generate();
    save_keypair(path, &keypair)?;
    info!(address = %keypair.address(), "Generated new credential at {}", path.display());
    Ok(keypair)
}

/// Save a keypair as hex, creating parent directories as needed.
pub fn save_keypair(path: &Path, keypair: &SigningKeypair) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| KeystoreError::CreateDirError(e.to_string()))?;
    }
    let line = format!("0x{}\n", hex::encode(keypair.secret_key_bytes()));
    fs::write(path, line).map_err(|e| KeystoreError::WriteError(e.to_string()))
}

/// Get the default keystore directory for a given service name.
///
/// - macOS: `~/Library/Application Support/{ServiceName}/keys`
/// - Linux: `~/.local/share/{service_name}/keys`
/// - Windows: `%APPDATA%\{ServiceName}\keys`
pub fn default_keystore_dir_for(service: &str) -> PathBuf {
    data_dir(service).join("keys")
}

/// Get the default config directory for a given service name.
///
/// - macOS: `~/Library/Application Support/{ServiceName}`
/// - Linux: `~/.config/{service_name}`
/// - Windows: `%APPDATA%\{ServiceName}`
pub fn default_config_dir_for(service: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(capitalize(service))
    }
    #[cfg(target_os = "linux")]
    {
        let xdg = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"));
        xdg.join(service.to_lowercase())
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"));
        appdata.join(capitalize(service))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        home_dir().join(format!(".{}", service.to_lowercase()))
    }
}

/// Get the default data directory for a given service name.
pub fn data_dir(service: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(capitalize(service))
    }
    #[cfg(target_os = "linux")]
    {
        let xdg = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".local").join("share"));
        xdg.join(service.to_lowercase())
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"));
        appdata.join(capitalize(service))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        home_dir().join(format!(".{}", service.to_lowercase()))
    }
}

/// Get the default credential file path for a service.
pub fn default_key_path_for(service: &str) -> PathBuf {
    default_keystore_dir_for(service).join("operator.key")
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => home_dir().join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
    }
}
