use std::path::{Path, PathBuf};

use clap::Args;
use framelink_session::{CheckoutOptions, Ui};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Checkout options from an optional JSON file plus flag overrides.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// JSON file holding checkout options (camelCase keys).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Checkout endpoint.
    #[arg(long, env = "FRAMELINK_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Checkout user interface (fullscreen, modal, inline).
    #[arg(long)]
    pub ui: Option<Ui>,
    /// Checkout language, e.g. en-US.
    #[arg(long)]
    pub language: Option<String>,
    /// Present checkout in demo mode.
    #[arg(long)]
    pub demo: bool,
    /// Client version tag sent to the frame.
    #[arg(long, value_name = "VERSION")]
    pub client_version: Option<String>,
    /// Embedding system name appended to the version tag.
    #[arg(long)]
    pub system: Option<String>,
}

impl OptionArgs {
    pub fn resolve(&self) -> CliResult<CheckoutOptions> {
        let mut options = match &self.config {
            Some(path) => load_options(path)?,
            None => CheckoutOptions::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            options.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(ui) = self.ui {
            options.ui = Some(ui);
        }
        if let Some(language) = &self.language {
            options.language = language.clone();
        }
        if self.demo {
            options.demo = Some(true);
        }
        if let Some(version) = &self.client_version {
            options.version = Some(version.clone());
        }
        if let Some(system) = &self.system {
            options.system = Some(system.clone());
        }
        Ok(options)
    }
}

pub fn load_options(path: &Path) -> CliResult<CheckoutOptions> {
    let context = format!("failed to read config {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|err| io_error(&context, err))?;
    serde_json::from_str(&raw).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("invalid config {}: {err}", path.display()),
        )
    })
}
