use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub momence_base_url: Url,
    pub momence_client_id: String,
    pub momence_client_secret: String,
    pub momence_username: String,
    pub momence_password: String,
    pub location_id: i64,
    pub lookback_days: i64,
    pub page_size: u32,
    pub timezone: Tz,
    pub debug: bool,
    pub auth_token: String,
    pub contact_unlock_key: Option<String>,
    pub enable_swagger: bool,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_AUTH_TOKEN -> auth_token
            .add_source(Environment::with_prefix("APP").prefix_separator("_"))
            .set_default("momence_base_url", "https://api.momence.com/api/v2")?
            .set_default("momence_client_id", "")?
            .set_default("momence_client_secret", "")?
            .set_default("momence_username", "")?
            .set_default("momence_password", "")?
            .set_default("location_id", 36372)?
            .set_default("lookback_days", 30)?
            .set_default("page_size", 200)?
            .set_default("timezone", "Asia/Kolkata")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.lookback_days, 30);
        assert_eq!(settings.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(
            settings.momence_base_url.as_str(),
            "https://api.momence.com/api/v2"
        );
    }

    #[test]
    #[serial]
    fn test_env_override() {
        // SAFETY: serialised with the other env tests
        unsafe {
            std::env::set_var("APP_PAGE_SIZE", "50");
            std::env::set_var("APP_TIMEZONE", "Europe/Warsaw");
        }
        let settings = Settings::from_env();
        unsafe {
            std::env::remove_var("APP_PAGE_SIZE");
            std::env::remove_var("APP_TIMEZONE");
        }
        let settings = settings.unwrap();
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.timezone, chrono_tz::Europe::Warsaw);
    }
}
