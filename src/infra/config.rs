use std::net::SocketAddr;

use chrono::Duration;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::use_cases::checkout::PriceCatalog;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Public origin of the dashboard; checkout and portal redirects land here.
    pub app_origin: Url,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    pub stripe_prices: PriceCatalog,
    /// Emails that always get admin entitlements.
    pub admin_emails: Vec<String>,
    pub deletion_grace: Duration,
    pub deletion_sweep_interval_secs: u64,
    /// Maximum age of a webhook signature timestamp.
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let database_url: String = get_env("DATABASE_URL");
        let app_origin: Url = get_env("APP_ORIGIN");

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let stripe_prices = PriceCatalog {
            monthly: get_env("STRIPE_PRICE_MONTHLY"),
            yearly: get_env("STRIPE_PRICE_YEARLY"),
            lifetime: get_env("STRIPE_PRICE_LIFETIME"),
        };

        let admin_emails = parse_email_list(&get_env_default("ADMIN_EMAILS", String::new()));

        let deletion_grace_hours: i64 = get_env_default("DELETION_GRACE_HOURS", 24);
        let deletion_sweep_interval_secs: u64 = get_env_default("DELETION_SWEEP_INTERVAL_SECS", 3600);
        let webhook_tolerance_secs: i64 = get_env_default("WEBHOOK_TOLERANCE_SECS", 300);

        Self {
            bind_addr,
            database_url,
            app_origin,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_prices,
            admin_emails,
            deletion_grace: Duration::hours(deletion_grace_hours),
            deletion_sweep_interval_secs,
            webhook_tolerance_secs,
        }
    }
}

/// Splits a comma-separated list, dropping blanks.
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_list_parsing() {
        assert_eq!(
            parse_email_list(" Boss@Example.com, ,ops@example.com,"),
            vec!["boss@example.com", "ops@example.com"]
        );
        assert!(parse_email_list("").is_empty());
    }
}
