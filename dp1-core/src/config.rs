use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Process-wide, immutable configuration.
///
/// Loaded once at startup via a layered `config::Config` build (defaults ->
/// optional file -> `DP1_*` env vars).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub signing: SigningConfig,
    pub auth: AuthConfig,
    pub resolver: ResolverConfig,
    pub dp_version: DpVersionConfig,
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("signing", &"<redacted>")
            .field("auth", &"<redacted>")
            .field("resolver", &self.resolver)
            .field("dp_version", &self.dp_version)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

/// Ed25519 signing key material. PEM or hex, decoded lazily on first sign;
/// an absent key is not an error until that first signing attempt.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub ed25519_private_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_secret: String,
    pub jwt_public_key: Option<String>,
    pub jwt_jwks_url: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Comma-separated list of `host[:port]` values this deployment owns.
    pub self_hosted_domains: Vec<String>,
    pub fetch_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            self_hosted_domains: Vec::new(),
            fetch_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DpVersionConfig {
    pub min_dp_version: String,
}

impl Default for DpVersionConfig {
    fn default() -> Self {
        Self {
            min_dp_version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from an optional file path layered under defaults
    /// and `DP1_`-prefixed environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8787)?
            .set_default("resolver.fetch_timeout_secs", 5)?
            .set_default("dp_version.min_dp_version", "1.0.0")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let built = builder
            .add_source(Environment::with_prefix("DP1").separator("__"))
            .build()?;

        let config: Self = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on a clearly broken deployment: `min_dp_version` must parse
    /// as semver. The Ed25519 key itself is validated lazily, at first use.
    fn validate(&self) -> Result<(), ConfigError> {
        semver::Version::parse(&self.dp_version.min_dp_version).map_err(|e| {
            ConfigError::Message(format!(
                "invalid dp_version.min_dp_version '{}': {e}",
                self.dp_version.min_dp_version
            ))
        })?;
        Ok(())
    }
}
