//! Runtime configuration: the `bus.*`, `context_loop.*`, `intensity.*`,
//! `storage.*`, `classifier.*`, `shutdown.*`, and `audit.*` options, loaded
//! from an optional TOML file, environment variables (`TENANT_` prefix),
//! and CLI flags, in that order of increasing precedence.
//!
//! Grounded on `toka-orchestration-service`'s CLI/config-loading split in
//! `main.rs`, generalized from a bespoke TOML reader to the `config` crate's
//! layered builder so environment overrides come for free.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line entry point. Any flag here overrides the same key loaded
/// from file or environment.
#[derive(Parser, Debug)]
#[command(name = "tenant-runtime")]
#[command(about = "Semptify core runtime: event bus, context loop, vault, and document intake, behind an HTTP/websocket edge")]
#[command(version)]
pub struct Cli {
    /// Configuration file path (TOML). Missing file is not an error;
    /// defaults and environment/CLI overrides still apply.
    #[arg(long, default_value = "config/runtime.toml")]
    pub config: String,

    /// HTTP/websocket bind port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Storage backend for the vault: `memory` or `fs`.
    #[arg(long)]
    pub storage: Option<String>,

    /// Root directory for the `fs` storage backend.
    #[arg(long)]
    pub storage_root: Option<String>,

    /// Directory the audit log is written under.
    #[arg(long)]
    pub audit_log_dir: Option<String>,
}

/// `bus.*` tunables, mapped onto [`tenant_bus_core::BusConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    /// `bus.queue_high_water`
    pub queue_high_water: usize,
    /// `bus.per_user_mailbox`
    pub per_user_mailbox: usize,
    /// `bus.history_per_type`
    pub history_per_type: usize,
    /// `bus.history_per_user`
    pub history_per_user: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            queue_high_water: 10_000,
            per_user_mailbox: 1000,
            history_per_type: 1000,
            history_per_user: 500,
        }
    }
}

/// `context_loop.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextLoopSettings {
    /// `context_loop.idle_ttl_seconds`
    pub idle_ttl_seconds: u64,
}

impl Default for ContextLoopSettings {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 86_400,
        }
    }
}

/// `intensity.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensitySettings {
    /// `intensity.rolling_window`
    pub rolling_window: usize,
}

impl Default for IntensitySettings {
    fn default() -> Self {
        Self { rolling_window: 100 }
    }
}

/// `storage.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// `memory` or `fs`.
    pub backend: String,
    /// Root directory, only meaningful for `backend = "fs"`.
    pub root: String,
    /// `storage.timeout_seconds`
    pub timeout_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            root: "data/vault".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// `classifier.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// `classifier.timeout_seconds`
    pub timeout_seconds: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

/// `shutdown.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSettings {
    /// `shutdown.deadline_seconds`
    pub deadline_seconds: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self { deadline_seconds: 30 }
    }
}

/// `audit.*` tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// `audit.log_dir`
    pub log_dir: String,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs/audit".to_string(),
        }
    }
}

/// The full, merged runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// HTTP/websocket bind port.
    pub port: u16,
    /// Log level passed to the `EnvFilter`.
    pub log_level: String,
    /// Event bus tunables.
    pub bus: BusSettings,
    /// Context loop tunables.
    pub context_loop: ContextLoopSettings,
    /// Intensity scoring tunables.
    pub intensity: IntensitySettings,
    /// Vault storage backend tunables.
    pub storage: StorageSettings,
    /// Classifier tunables.
    pub classifier: ClassifierSettings,
    /// Shutdown tunables.
    pub shutdown: ShutdownSettings,
    /// Audit log tunables.
    pub audit: AuditSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            bus: BusSettings::default(),
            context_loop: ContextLoopSettings::default(),
            intensity: IntensitySettings::default(),
            storage: StorageSettings::default(),
            classifier: ClassifierSettings::default(),
            shutdown: ShutdownSettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load defaults, layer in `config_path` (if it exists), then
    /// `TENANT_*` environment variables, then CLI flags, in that order.
    pub fn load(cli: &Cli) -> Result<Self> {
        let defaults = RuntimeConfig::default();
        let defaults_value = serde_json::to_value(&defaults)
            .context("serializing default runtime config")?;

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&defaults_value).context("loading defaults")?);

        if std::path::Path::new(&cli.config).exists() {
            builder = builder.add_source(config::File::with_name(&cli.config));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TENANT")
                .separator("__")
                .try_parsing(true),
        );

        let mut merged: RuntimeConfig = builder
            .build()
            .context("building layered configuration")?
            .try_deserialize()
            .context("deserializing runtime configuration")?;

        if let Some(port) = cli.port {
            merged.port = port;
        }
        merged.log_level = cli.log_level.clone();
        if let Some(backend) = &cli.storage {
            merged.storage.backend = backend.clone();
        }
        if let Some(root) = &cli.storage_root {
            merged.storage.root = root.clone();
        }
        if let Some(log_dir) = &cli.audit_log_dir {
            merged.audit.log_dir = log_dir.clone();
        }

        Ok(merged)
    }

    /// [`ContextLoopSettings::idle_ttl_seconds`] as a [`Duration`].
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.context_loop.idle_ttl_seconds)
    }

    /// [`ShutdownSettings::deadline_seconds`] as a [`Duration`].
    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown.deadline_seconds)
    }

    /// Translate into a [`tenant_bus_core::BusConfig`].
    pub fn bus_config(&self) -> tenant_bus_core::BusConfig {
        tenant_bus_core::BusConfig {
            queue_high_water: self.bus.queue_high_water,
            history_per_type: self.bus.history_per_type,
            history_per_user: self.bus.history_per_user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_options() {
        let config = RuntimeConfig::default();
        assert_eq!(config.bus.queue_high_water, 10_000);
        assert_eq!(config.context_loop.idle_ttl_seconds, 86_400);
        assert_eq!(config.intensity.rolling_window, 100);
        assert_eq!(config.storage.timeout_seconds, 60);
        assert_eq!(config.classifier.timeout_seconds, 30);
        assert_eq!(config.shutdown.deadline_seconds, 30);
        assert_eq!(config.audit.log_dir, "logs/audit");
    }

    #[test]
    fn file_layer_overrides_defaults_and_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("runtime.toml");
        std::fs::write(
            &config_path,
            "port = 9000\n\n[storage]\nbackend = \"fs\"\nroot = \"/tmp/vault\"\ntimeout_seconds = 60\n",
        )
        .unwrap();

        let cli = Cli {
            config: config_path.to_string_lossy().into_owned(),
            port: None,
            log_level: "info".to_string(),
            storage: None,
            storage_root: None,
            audit_log_dir: None,
        };
        let loaded = RuntimeConfig::load(&cli).unwrap();
        assert_eq!(loaded.port, 9000);
        assert_eq!(loaded.storage.backend, "fs");

        let cli_override = Cli {
            storage: Some("memory".to_string()),
            ..cli
        };
        let overridden = RuntimeConfig::load(&cli_override).unwrap();
        assert_eq!(overridden.port, 9000);
        assert_eq!(overridden.storage.backend, "memory");
    }
}
