//! Layered client configuration: defaults, YAML file, `HUB_` env, CLI flags.

use std::path::Path;

use clap::{Args, Parser, ValueEnum};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::upload::{DEFAULT_CHAT_IMAGE_MAX_BYTES, DEFAULT_CLASSIFY_MAX_BYTES, ImageLimits};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "hub.yaml";

/// Prefix for environment overrides, e.g. `HUB_SERVER__BASE_URL`.
pub const ENV_PREFIX: &str = "HUB";

/// Global options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file path
    #[arg(short, long, global = true, env = "HUB_CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the hub server
    #[arg(long, global = true, env = "HUB_BASE_URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Disable the chat panel
    #[arg(long, global = true)]
    pub no_chat: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Standalone parser used by [`AppConfig::load_from_args`].
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ConfigCli {
    #[command(flatten)]
    args: ConfigArgs,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub features: FeaturesConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeaturesConfig {
    pub chat: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub classify_max_bytes: u64,
    pub chat_image_max_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl LimitsConfig {
    /// Limits in the form the upload validator takes.
    #[must_use]
    pub fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            classify_max_bytes: self.classify_max_bytes,
            chat_image_max_bytes: self.chat_image_max_bytes,
        }
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = ConfigCli::try_parse_from(args)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_args(&cli.args)
    }

    /// Resolve configuration. Priority: CLI flag > env > config file > defaults.
    pub fn from_args(args: &ConfigArgs) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.base_url", "http://localhost:8000")?
            .set_default("server.timeout_secs", 30)?
            .set_default("features.chat", true)?
            .set_default("limits.classify_max_bytes", DEFAULT_CLASSIFY_MAX_BYTES)?
            .set_default("limits.chat_image_max_bytes", DEFAULT_CHAT_IMAGE_MAX_BYTES)?
            .set_default("logging.format", LogFormat::Plain.as_str())?
            .set_default("logging.filter", "info")?;

        // 2. Config file: explicit path must exist, ./hub.yaml is optional
        if let Some(path) = &args.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml));
        }

        // 3. Environment variables, e.g. HUB_SERVER__BASE_URL=http://gpu-box:8000
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI overrides
        if let Some(url) = &args.base_url {
            builder = builder.set_override("server.base_url", url.as_str())?;
        }
        if let Some(secs) = args.timeout_secs {
            builder = builder.set_override("server.timeout_secs", secs)?;
        }
        if args.no_chat {
            builder = builder.set_override("features.chat", false)?;
        }
        if let Some(format) = args.log_format {
            builder = builder.set_override("logging.format", format.as_str())?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
