use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's backend API.
    pub base_url: String,
    /// Secret API key. Only ever read from the environment.
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capability keys older than this are invalid.
    pub key_ttl_minutes: u64,
    /// Cadence of the background sweep that evicts expired keys.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_teams_owned_per_user: i64,
    pub max_members_per_team: i64,
    pub max_channels_per_team: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of chats returned by history endpoints.
    pub history_page_size: i64,
    pub max_message_length: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HUDDLE_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        // Identity provider overrides
        if let Ok(v) = env::var("IDENTITY_API_URL") {
            self.identity.base_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_SECRET_KEY") {
            self.identity.secret_key = v;
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_KEY_TTL_MINUTES") {
            self.session.key_ttl_minutes = v.parse().unwrap_or(self.session.key_ttl_minutes);
        }
        if let Ok(v) = env::var("SESSION_SWEEP_INTERVAL_SECS") {
            self.session.sweep_interval_secs =
                v.parse().unwrap_or(self.session.sweep_interval_secs);
        }

        // Limit overrides
        if let Ok(v) = env::var("LIMITS_MAX_TEAMS_OWNED_PER_USER") {
            self.limits.max_teams_owned_per_user =
                v.parse().unwrap_or(self.limits.max_teams_owned_per_user);
        }
        if let Ok(v) = env::var("LIMITS_MAX_MEMBERS_PER_TEAM") {
            self.limits.max_members_per_team =
                v.parse().unwrap_or(self.limits.max_members_per_team);
        }
        if let Ok(v) = env::var("LIMITS_MAX_CHANNELS_PER_TEAM") {
            self.limits.max_channels_per_team =
                v.parse().unwrap_or(self.limits.max_channels_per_team);
        }

        // Chat overrides
        if let Ok(v) = env::var("CHAT_HISTORY_PAGE_SIZE") {
            self.chat.history_page_size = v.parse().unwrap_or(self.chat.history_page_size);
        }
        if let Ok(v) = env::var("CHAT_MAX_MESSAGE_LENGTH") {
            self.chat.max_message_length = v.parse().unwrap_or(self.chat.max_message_length);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            identity: IdentityConfig {
                base_url: "https://api.clerk.com".to_string(),
                secret_key: String::new(),
            },
            session: SessionConfig {
                key_ttl_minutes: 60,
                sweep_interval_secs: 300,
            },
            limits: LimitsConfig {
                max_teams_owned_per_user: 3,
                max_members_per_team: 25,
                max_channels_per_team: 10,
            },
            chat: ChatConfig {
                history_page_size: 50,
                max_message_length: 256,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_cors: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
            },
            session: SessionConfig {
                key_ttl_minutes: 60,
                sweep_interval_secs: 60,
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.session.key_ttl_minutes, 60);
        assert_eq!(config.chat.history_page_size, 50);
        assert!(config.server.enable_cors);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.server.enable_cors);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.session.sweep_interval_secs, 60);
    }
}
