use serde::Deserialize;
use std::time::Duration;

use crate::cases::models::AccountId;
use crate::error::AppResult;
use crate::settlement::models::SentinelAccounts;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub database_max_connections: u32,

    /// Account id stamped on payments funded from a customer wallet
    pub wallet_account_id: AccountId,
    /// Internal account whose payments are never announced to the customer
    pub no_notify_account_id: Option<AccountId>,

    pub admin_notification_email: Option<String>,
    pub notification_timeout_secs: u64,

    pub resend_api_key: Option<String>,
    pub resend_from_email: String,

    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub twilio_content_sid: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Values stay strings until deserialized so phone numbers and tokens keep
    /// their `+` and leading zeros. Blank variables count as unset.
    fn load(overrides: Option<config::Map<String, String>>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database_url", "postgresql://localhost/settlement")?
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("database_max_connections", 20_i64)?
            .set_default("wallet_account_id", 0_i64)?
            .set_default("notification_timeout_secs", 10_i64)?
            .set_default("resend_from_email", "noreply@example.com")?
            .add_source(
                config::Environment::default()
                    .ignore_empty(true)
                    .source(overrides),
            )
            .build()?
            .try_deserialize()
    }

    pub fn sentinels(&self) -> AppResult<SentinelAccounts> {
        SentinelAccounts::new(self.wallet_account_id, self.no_notify_account_id)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgresql://localhost/test".into(),
            bind_address: "127.0.0.1:0".into(),
            database_max_connections: 1,
            wallet_account_id: 0,
            no_notify_account_id: Some(31),
            admin_notification_email: None,
            notification_timeout_secs: 3,
            resend_api_key: None,
            resend_from_email: "noreply@example.com".into(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_from_number: None,
            twilio_content_sid: None,
        }
    }

    #[test]
    fn test_colliding_sentinels_fail_startup() {
        let mut cfg = config();
        assert!(cfg.sentinels().is_ok());
        cfg.no_notify_account_id = Some(0);
        assert!(cfg.sentinels().is_err());
    }

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_credentials_are_loaded_verbatim() {
        let cfg = Config::load(Some(env(&[
            ("TWILIO_FROM_NUMBER", "+15551234567"),
            ("TWILIO_AUTH_TOKEN", "0123456789"),
            ("NO_NOTIFY_ACCOUNT_ID", "31"),
            ("DATABASE_MAX_CONNECTIONS", "5"),
        ])))
        .unwrap();

        assert_eq!(cfg.twilio_from_number.as_deref(), Some("+15551234567"));
        assert_eq!(cfg.twilio_auth_token.as_deref(), Some("0123456789"));
        assert_eq!(cfg.no_notify_account_id, Some(31));
        assert_eq!(cfg.database_max_connections, 5);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let cfg = Config::load(Some(env(&[
            ("RESEND_API_KEY", ""),
            ("ADMIN_NOTIFICATION_EMAIL", ""),
            ("NO_NOTIFY_ACCOUNT_ID", ""),
        ])))
        .unwrap();

        assert_eq!(cfg.resend_api_key, None);
        assert_eq!(cfg.admin_notification_email, None);
        assert_eq!(cfg.no_notify_account_id, None);
        assert_eq!(cfg.wallet_account_id, 0);
        assert_eq!(cfg.notification_timeout_secs, 10);
    }

    #[test]
    fn test_notification_timeout() {
        assert_eq!(config().notification_timeout(), Duration::from_secs(3));
    }
}
