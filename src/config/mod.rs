mod settings;

use std::net::{IpAddr, SocketAddr};

use config::{Config, ConfigError, Environment, File};

use crate::config::settings::PartialSettings;

pub use settings::{LoggingSettings, ServerSettings, Settings};

/// Prefix of environment overrides, e.g. `POSTBOX_SERVER__HOST`.
pub const ENV_PREFIX: &str = "POSTBOX";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server and logging configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

impl ServerSettings {
    /// Socket address to bind, with `port` overriding the configured one.
    pub fn bind_addr(&self, port: Option<u16>) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid server.host {:?}: {e}", self.host)))?;
        Ok(SocketAddr::new(ip, port.unwrap_or(self.port)))
    }
}
