//! Typed environment configuration, loaded once at process start.

use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    /// Carries every required variable that was missing, not just the
    /// first one found, so an operator fixes a misconfigured deployment in
    /// one pass instead of one restart per variable.
    MissingRequired(Vec<String>),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(vars) => {
                writeln!(f, "missing required environment variables:")?;
                for var in vars {
                    writeln!(f, "  - {var}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    pub timeout: Duration,
    pub max_conns: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub amqp_url: String,
    pub delete_queue_name: String,
    pub reconciler_interval: Duration,
    pub reconciler_threshold: Duration,
}

#[derive(Debug, Clone)]
pub struct AlertingConfig {
    pub gmail_user: Option<String>,
    pub gmail_app_password: Option<String>,
}

impl AlertingConfig {
    pub fn is_configured(&self) -> bool {
        self.gmail_user.is_some() && self.gmail_app_password.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub super_admins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    pub alerting: AlertingConfig,
    pub auth: AuthConfig,
    pub event_bus_buffer: usize,
}

struct Loader {
    missing: Vec<String>,
}

impl Loader {
    fn new() -> Self {
        Self { missing: Vec::new() }
    }

    fn required(&mut self, key: &str) -> String {
        match env::var(key) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn with_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn duration(&mut self, key: &str, default: &str) -> Duration {
        let raw = self.with_default(key, default);
        match humantime::parse_duration(&raw) {
            Ok(d) => d,
            Err(_) => {
                self.missing.push(format!("{key} (invalid duration '{raw}')"));
                Duration::from_secs(0)
            }
        }
    }

    fn number<T: std::str::FromStr>(&mut self, key: &str, default: &str) -> T {
        let raw = self.with_default(key, default);
        raw.parse().unwrap_or_else(|_| {
            self.missing.push(format!("{key} (invalid integer '{raw}')"));
            default.parse().unwrap_or_else(|_| unreachable!("default '{default}' for {key} must itself parse"))
        })
    }
}

impl Config {
    /// Reads `.env` first via `dotenvy::dotenv().ok()` — which only fills
    /// gaps `std::env::var` hasn't already found — so a real process env
    /// var always wins over the file, and the file always wins over the
    /// built-in defaults below.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut loader = Loader::new();

        let database = DatabaseConfig {
            uri: loader.required("DATABASE_URI"),
            name: loader.required("DATABASE_NAME"),
            timeout: loader.duration("DATABASE_TIMEOUT", "10s"),
            max_conns: loader.number("DATABASE_MAX_CONNS", "100"),
        };

        let server = ServerConfig {
            port: loader.number("SERVER_PORT", "8080"),
            read_timeout: loader.duration("SERVER_READ_TIMEOUT", "15s"),
            write_timeout: loader.duration("SERVER_WRITE_TIMEOUT", "15s"),
        };

        let broker = BrokerConfig {
            amqp_url: loader.required("BROKER_AMQP_URL"),
            delete_queue_name: loader.with_default("BROKER_DELETE_QUEUE_NAME", "task.delete"),
            reconciler_interval: loader.duration("BROKER_RECONCILER_INTERVAL", "5m"),
            reconciler_threshold: loader.duration("BROKER_RECONCILER_THRESHOLD", "10m"),
        };

        let alerting = AlertingConfig {
            gmail_user: loader.optional("GMAIL_USER"),
            gmail_app_password: loader.optional("GMAIL_APP_PASSWORD"),
        };

        let auth = AuthConfig {
            jwt_secret: loader.optional("JWT_SECRET"),
            super_admins: loader
                .optional("SUPER_ADMINS")
                .map(|v| v.split(',').map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()).collect())
                .unwrap_or_default(),
        };

        let event_bus_buffer = loader.number("EVENT_BUS_BUFFER", "128");

        if !loader.missing.is_empty() {
            return Err(ConfigError::MissingRequired(loader.missing));
        }

        tracing::info!(port = server.port, "configuration loaded");

        Ok(Config {
            database,
            server,
            broker,
            alerting,
            auth,
            event_bus_buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "DATABASE_URI",
            "DATABASE_NAME",
            "DATABASE_TIMEOUT",
            "DATABASE_MAX_CONNS",
            "SERVER_PORT",
            "SERVER_READ_TIMEOUT",
            "SERVER_WRITE_TIMEOUT",
            "BROKER_AMQP_URL",
            "BROKER_DELETE_QUEUE_NAME",
            "BROKER_RECONCILER_INTERVAL",
            "BROKER_RECONCILER_THRESHOLD",
            "GMAIL_USER",
            "GMAIL_APP_PASSWORD",
            "JWT_SECRET",
            "SUPER_ADMINS",
            "EVENT_BUS_BUFFER",
        ] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn accumulates_every_missing_required_variable() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = Config::load().unwrap_err();
        let ConfigError::MissingRequired(vars) = err;
        assert!(vars.iter().any(|v| v == "DATABASE_URI"));
        assert!(vars.iter().any(|v| v == "DATABASE_NAME"));
        assert!(vars.iter().any(|v| v == "BROKER_AMQP_URL"));
    }

    #[test]
    fn applies_defaults_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DATABASE_URI", "mongodb://localhost");
            env::set_var("DATABASE_NAME", "cron");
            env::set_var("BROKER_AMQP_URL", "amqp://localhost");
        }
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.broker.delete_queue_name, "task.delete");
        assert_eq!(cfg.event_bus_buffer, 128);
        assert!(!cfg.alerting.is_configured());
    }

    #[test]
    fn process_env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DATABASE_URI", "mongodb://localhost");
            env::set_var("DATABASE_NAME", "cron");
            env::set_var("BROKER_AMQP_URL", "amqp://localhost");
            env::set_var("SERVER_PORT", "9090");
        }
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.server.port, 9090);
    }
}
