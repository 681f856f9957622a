//! Application configuration module
//! Handles environment variable loading and validation for the payment workflow

use std::env;
use std::time::Duration;

/// Main configuration for the payment workflow
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub poller: PollerConfig,
    pub phone: PhoneConfig,
    pub logging: LoggingConfig,
}

/// Payment gateway endpoint configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub initiate_path: String,
    pub status_path: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

/// Status polling configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

/// Phone normalization rules
#[derive(Debug, Clone)]
pub struct PhoneConfig {
    pub country_code: String,
    pub min_digits: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            gateway: GatewayConfig::from_env()?,
            poller: PollerConfig::from_env()?,
            phone: PhoneConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.poller.validate()?;
        self.phone.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            initiate_path: "/api/mpesa".to_string(),
            status_path: "/api/mpesa".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(GatewayConfig {
            base_url: env::var("MPESA_GATEWAY_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("MPESA_GATEWAY_BASE_URL".to_string()))?
                .trim_end_matches('/')
                .to_string(),
            initiate_path: env::var("MPESA_INITIATE_PATH").unwrap_or(defaults.initiate_path),
            status_path: env::var("MPESA_STATUS_PATH").unwrap_or(defaults.status_path),
            timeout_secs: env::var("MPESA_GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.timeout_secs.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_GATEWAY_TIMEOUT_SECS".to_string()))?,
            api_key: env::var("MPESA_GATEWAY_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "MPESA_GATEWAY_BASE_URL must be a valid URL".to_string(),
            ));
        }

        for (name, path) in [
            ("MPESA_INITIATE_PATH", &self.initiate_path),
            ("MPESA_STATUS_PATH", &self.status_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with '/'",
                    name
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_GATEWAY_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 24,
        }
    }
}

impl PollerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(PollerConfig {
            interval_secs: env::var("MPESA_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| defaults.interval_secs.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_POLL_INTERVAL_SECS".to_string()))?,
            max_attempts: env::var("MPESA_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| defaults.max_attempts.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_POLL_MAX_ATTEMPTS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_POLL_INTERVAL_SECS cannot be 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_POLL_MAX_ATTEMPTS cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            country_code: "254".to_string(),
            min_digits: 9,
        }
    }
}

impl PhoneConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(PhoneConfig {
            country_code: env::var("MPESA_COUNTRY_CODE").unwrap_or(defaults.country_code),
            min_digits: env::var("MPESA_MIN_PHONE_DIGITS")
                .unwrap_or_else(|_| defaults.min_digits.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_MIN_PHONE_DIGITS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidValue(
                "MPESA_COUNTRY_CODE must contain digits only".to_string(),
            ));
        }

        if self.min_digits == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_MIN_PHONE_DIGITS".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_poller_defaults_match_gateway_contract() {
        let config = PollerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.max_attempts, 24);
    }

    #[test]
    fn test_zero_interval_validation() {
        let config = PollerConfig {
            interval_secs: 0,
            max_attempts: 24,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url_validation() {
        let config = GatewayConfig {
            base_url: "gateway.local".to_string(),
            ..GatewayConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_path_validation() {
        let config = GatewayConfig {
            status_path: "api/mpesa".to_string(),
            ..GatewayConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_numeric_country_code_validation() {
        let config = PhoneConfig {
            country_code: "+254".to_string(),
            min_digits: 9,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_validation() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            format: LogFormat::Plain,
        };

        assert!(config.validate().is_err());
    }
}
