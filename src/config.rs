use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use serde::Deserialize;

use crate::results::Sdk;

#[derive(Parser)]
#[command(name = "playground", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,

    /// Number of workers executing jobs concurrently
    #[arg(long = "workers", short = 'w', default_value_t = 4)]
    pub workers: u8,
}

impl CliArgs {
    /// Load the configuration from the specified file
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let file = std::fs::File::open(&self.config_path)?;
        let reader = std::io::BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.check()?;
        Ok(config)
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub languages: Vec<LanguageConfig>,
}

impl Config {
    /// Rejects configurations that would only fail later at runtime
    pub fn check(&self) -> anyhow::Result<()> {
        if self.cache.capacity == 0 {
            bail!("cache capacity must be positive");
        }
        if self.cache.sweep_interval_secs == 0 {
            bail!("cache sweep interval must be positive");
        }
        let mut seen = HashSet::new();
        for language in &self.languages {
            if !seen.insert(language.sdk) {
                bail!("language {} is configured more than once", language.sdk);
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_capacity() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    5
}

#[derive(Deserialize, Debug, Default)]
pub struct WorkspaceConfig {
    pub root: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct LimitsConfig {
    #[serde(default = "default_compile_timeout_secs")]
    pub compile_timeout_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl LimitsConfig {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: default_compile_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

fn default_compile_timeout_secs() -> u64 {
    30
}

fn default_run_timeout_secs() -> u64 {
    60
}

/// Toolchain settings of one SDK
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    pub sdk: Sdk,
    /// Extension of source files, without the leading dot
    pub file_extension: String,
    /// Absent for interpreted SDKs
    pub compile: Option<CommandConfig>,
    pub run: CommandConfig,
    pub test: Option<CommandConfig>,
    /// Classpath components, only consulted for Java
    #[serde(default)]
    pub classpath: Vec<String>,
    /// Root of the build-tool project, only consulted for SCIO
    pub project_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_config: LogConfigTemplate,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Placeholder in run arguments that is replaced with the job's logging
/// configuration file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogConfigTemplate {
    pub placeholder: String,
    pub file_name: String,
}

impl Default for LogConfigTemplate {
    fn default() -> Self {
        Self {
            placeholder: "{logConfigFilePath}".to_string(),
            file_name: "logging.properties".to_string(),
        }
    }
}
