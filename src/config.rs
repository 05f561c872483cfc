use std::env;

/// Runtime settings for the CLI, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,
    #[error("DB_MAX_CONNECTIONS must be a positive integer (found '{0}')")]
    InvalidMaxConnections(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;
        let max_connections = parse_max_connections(env::var("DB_MAX_CONNECTIONS").ok())?;
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_max_connections(raw: Option<String>) -> Result<u32, ConfigError> {
    match raw {
        None => Ok(5),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::InvalidMaxConnections(value)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_defaults_to_five() {
        assert_eq!(parse_max_connections(None).unwrap(), 5);
        assert_eq!(parse_max_connections(Some(" 12 ".to_string())).unwrap(), 12);
    }

    #[test]
    fn max_connections_rejects_zero_and_garbage() {
        assert!(matches!(
            parse_max_connections(Some("0".to_string())),
            Err(ConfigError::InvalidMaxConnections(_))
        ));
        assert!(parse_max_connections(Some("many".to_string())).is_err());
    }
}
