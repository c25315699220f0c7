//! Lootledger App
//!
//! Unified initialization: logging, then settings (file and environment),
//! then the signing credential. Hands out the gateway and screen built from
//! the resulting configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lootledger_crypto::{CryptoError, SigningKeypair};
use lootledger_gateway::{EvmGateway, LedgerGateway};
use lootledger_keystore::{default_key_path_for, expand_path, load_keypair, load_keypair_if_present};
use lootledger_logging::LogLevel;
use lootledger_round::LedgerScreen;
use lootledger_settings::{LedgerConfig, Settings, SettingsError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Initialization failed: {0}")]
    InitError(String),
    #[error("Settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Keystore error: {0}")]
    KeystoreError(#[from] lootledger_keystore::KeystoreError),
    #[error("Invalid private key: {0}")]
    CredentialError(#[from] CryptoError),
}

/// Initialized application context
pub struct App {
    pub service: String,
    /// The settings file as loaded, before environment overrides.
    pub settings: Settings<LedgerConfig>,
    /// Effective configuration. Immutable from here on.
    pub config: LedgerConfig,
    pub signer: Option<SigningKeypair>,
    key_path: PathBuf,
}

impl App {
    /// Credential file used by this app (configured or default).
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// JSON-RPC gateway to the configured ledger contract.
    pub fn gateway(&self) -> Result<Arc<dyn LedgerGateway>, AppError> {
        let contract = self.config.contract()?;
        let gateway = EvmGateway::new(&self.config.rpc_url, contract)
            .with_signer(self.signer.clone())
            .with_gas_limit(self.config.gas_limit)
            .with_confirmation_timeout(self.config.confirmation_timeout())
            .with_poll_interval(self.config.poll_interval());
        Ok(Arc::new(gateway))
    }

    /// A reporting screen over [`App::gateway`].
    pub fn screen(&self) -> Result<LedgerScreen, AppError> {
        Ok(LedgerScreen::new(self.config.clone(), self.gateway()?))
    }
}

/// Builder for constructing an App with configurable options.
pub struct AppBuilder {
    service: String,
    log_level: LogLevel,
    skip_logging: bool,
    skip_banner: bool,
    skip_env: bool,
    config_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
}

impl AppBuilder {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            log_level: LogLevel::Info,
            skip_logging: false,
            skip_banner: false,
            skip_env: false,
            config_path: None,
            key_path: None,
        }
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.log_level = LogLevel::from_verbose(verbose);
        self
    }

    pub fn skip_logging(mut self) -> Self {
        self.skip_logging = true;
        self
    }

    pub fn skip_banner(mut self) -> Self {
        self.skip_banner = true;
        self
    }

    /// Ignore `LOOTLEDGER_*` variables.
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Credential file to fall back on when neither `private_key` nor
    /// `key_file` is configured.
    pub fn key_path(mut self, path: impl AsRef<Path>) -> Self {
        self.key_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<App, AppError> {
        if !self.skip_logging {
            let _ = lootledger_logging::try_init(self.log_level);
        }

        let settings: Settings<LedgerConfig> =
            Settings::load_or_default(&self.service, self.config_path.as_deref())?;
        debug!(path = %settings.path().display(), "Settings loaded");

        let config = if self.skip_env {
            settings.config.clone()
        } else {
            settings.config.clone().with_env_overrides()?
        };
        config.validate()?;

        let default_key_path = self
            .key_path
            .clone()
            .unwrap_or_else(|| default_key_path_for(&self.service));
        let key_path = config
            .key_file
            .as_deref()
            .map(expand_path)
            .unwrap_or(default_key_path);
        let signer = load_signer(&config, &key_path)?;

        if !self.skip_banner {
            info!(
                "{} {} starting, rpc: {}, signer: {}",
                self.service,
                env!("CARGO_PKG_VERSION"),
                config.rpc_url,
                signer
                    .as_ref()
                    .map(|s| s.address().to_string())
                    .unwrap_or_else(|| "none".to_string()),
            );
        }

        Ok(App {
            service: self.service,
            settings,
            config,
            signer,
            key_path,
        })
    }
}

/// `private_key` wins, then an explicit `key_file` (which must exist), then
/// the default credential file if present.
fn load_signer(config: &LedgerConfig, key_path: &Path) -> Result<Option<SigningKeypair>, AppError> {
    if let Some(secret) = &config.private_key {
        return Ok(Some(SigningKeypair::from_hex(secret)?));
    }
    if config.key_file.is_some() {
        return Ok(Some(load_keypair(key_path)?));
    }
    Ok(load_keypair_if_present(key_path)?)
}
