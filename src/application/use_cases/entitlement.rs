use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use crate::app_error::AppResult;
use crate::domain::entities::{
    account::Account, entitlement::Entitlement, plan_tier::PlanTier,
    subscription_status::SubscriptionStatus,
};
use crate::use_cases::{account::AccountRepo, devices::DeviceRepo};
use crate::validators::{normalize_email, parse_email};

/// Admin accounts are reported with a billing date this far ahead.
const ADMIN_HORIZON_DAYS: i64 = 365 * 100;

/// Emails granted admin entitlements regardless of the stored plan.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    emails: HashSet<String>,
}

impl AdminPolicy {
    pub fn new(emails: impl IntoIterator<Item = String>) -> Self {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize_email(&e))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn entitlement(&self, account: &Account) -> Entitlement {
        Entitlement::resolve(
            account.plan_type,
            account.subscription_status,
            self.is_admin(&account.email),
        )
    }

    /// Entitlement for an email with no stored account.
    pub fn entitlement_without_account(&self, email: &str) -> Entitlement {
        Entitlement::resolve(PlanTier::Free, SubscriptionStatus::Inactive, self.is_admin(email))
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionView {
    pub entitlement: Entitlement,
    pub current_period_end: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusView {
    pub user: String,
    pub entitlement: Entitlement,
    pub device_count: i64,
}

/// Status plus whether it is the fallback served after a failed lookup.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub view: StatusView,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct EntitlementUseCases {
    accounts: Arc<dyn AccountRepo>,
    devices: Arc<dyn DeviceRepo>,
    admin: AdminPolicy,
}

impl EntitlementUseCases {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        devices: Arc<dyn DeviceRepo>,
        admin: AdminPolicy,
    ) -> Self {
        Self {
            accounts,
            devices,
            admin,
        }
    }

    /// Unknown accounts get the free defaults rather than an error.
    #[instrument(skip(self))]
    pub async fn get_subscription(&self, email: &str) -> AppResult<SubscriptionView> {
        let email = parse_email(email)?;

        if self.admin.is_admin(&email) {
            let horizon = Utc::now() + Duration::days(ADMIN_HORIZON_DAYS);
            let account = self.accounts.get_by_email(&email).await?;
            return Ok(SubscriptionView {
                entitlement: self.admin.entitlement_without_account(&email),
                current_period_end: Some(horizon),
                next_billing_date: Some(horizon),
                stripe_customer_id: account.as_ref().and_then(|a| a.stripe_customer_id.clone()),
                stripe_subscription_id: account.and_then(|a| a.stripe_subscription_id),
            });
        }

        let Some(account) = self.accounts.get_by_email(&email).await? else {
            return Ok(SubscriptionView {
                entitlement: Entitlement::free(),
                current_period_end: None,
                next_billing_date: None,
                stripe_customer_id: None,
                stripe_subscription_id: None,
            });
        };

        let entitlement = self.admin.entitlement(&account);
        let renews = matches!(account.plan_type, PlanTier::ProMonthly | PlanTier::ProYearly)
            && account.subscription_status == SubscriptionStatus::Active;

        Ok(SubscriptionView {
            entitlement,
            current_period_end: account.current_period_end,
            next_billing_date: if renews { account.current_period_end } else { None },
            stripe_customer_id: account.stripe_customer_id,
            stripe_subscription_id: account.stripe_subscription_id,
        })
    }

    #[instrument(skip(self))]
    pub async fn status(&self, user: &str) -> AppResult<StatusView> {
        let email = parse_email(user)?;

        let view = match self.accounts.get_by_email(&email).await? {
            Some(account) => StatusView {
                entitlement: self.admin.entitlement(&account),
                device_count: self.devices.count(account.id).await?,
                user: email,
            },
            None => StatusView {
                entitlement: self.admin.entitlement_without_account(&email),
                device_count: 0,
                user: email,
            },
        };

        Ok(view)
    }

    /// Polling read that never fails. Lookup errors produce the free body
    /// flagged as degraded.
    pub async fn status_or_default(&self, user: &str) -> StatusReport {
        match self.status(user).await {
            Ok(view) => StatusReport {
                view,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Status lookup failed, serving free fallback");
                StatusReport {
                    view: StatusView {
                        user: normalize_email(user),
                        entitlement: Entitlement::free(),
                        device_count: 0,
                    },
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::entitlement::QuotaClass;
    use crate::test_utils::{
        FailingAccountRepo, InMemoryAccountRepo, InMemoryDeviceRepo, create_test_account,
        create_test_device,
    };

    fn use_cases(
        accounts: Arc<dyn AccountRepo>,
        devices: Arc<InMemoryDeviceRepo>,
        admins: &[&str],
    ) -> EntitlementUseCases {
        EntitlementUseCases::new(
            accounts,
            devices,
            AdminPolicy::new(admins.iter().map(|s| s.to_string())),
        )
    }

    #[tokio::test]
    async fn unknown_account_gets_free_defaults() {
        let uc = use_cases(
            Arc::new(InMemoryAccountRepo::new()),
            Arc::new(InMemoryDeviceRepo::new()),
            &[],
        );

        let view = uc.get_subscription("nobody@example.com").await.unwrap();
        assert!(!view.entitlement.is_pro);
        assert_eq!(view.entitlement.plan_type, PlanTier::Free);
        assert_eq!(view.entitlement.subscription_status, SubscriptionStatus::Inactive);
        assert!(view.current_period_end.is_none());
    }

    #[tokio::test]
    async fn admin_email_reports_far_future_dates() {
        let uc = use_cases(
            Arc::new(InMemoryAccountRepo::new()),
            Arc::new(InMemoryDeviceRepo::new()),
            &["Boss@Example.com"],
        );

        let view = uc.get_subscription("boss@example.com").await.unwrap();
        assert!(view.entitlement.is_admin);
        assert_eq!(view.entitlement.plan_type, PlanTier::Admin);
        let end = view.current_period_end.unwrap();
        assert!(end > Utc::now() + Duration::days(365 * 99));
    }

    #[tokio::test]
    async fn active_monthly_reports_next_billing_date() {
        let period_end = Utc::now() + Duration::days(20);
        let account = create_test_account(|a| {
            a.email = "pro@example.com".into();
            a.plan_type = PlanTier::ProMonthly;
            a.subscription_status = SubscriptionStatus::Active;
            a.current_period_end = Some(period_end);
        });
        let uc = use_cases(
            Arc::new(InMemoryAccountRepo::with_accounts(vec![account])),
            Arc::new(InMemoryDeviceRepo::new()),
            &[],
        );

        let view = uc.get_subscription("pro@example.com").await.unwrap();
        assert!(view.entitlement.is_pro);
        assert_eq!(view.next_billing_date, Some(period_end));
    }

    #[tokio::test]
    async fn lifetime_has_no_billing_date() {
        let account = create_test_account(|a| {
            a.email = "life@example.com".into();
            a.plan_type = PlanTier::ProLifetime;
            a.subscription_status = SubscriptionStatus::Lifetime;
        });
        let uc = use_cases(
            Arc::new(InMemoryAccountRepo::with_accounts(vec![account])),
            Arc::new(InMemoryDeviceRepo::new()),
            &[],
        );

        let view = uc.get_subscription("life@example.com").await.unwrap();
        assert!(view.entitlement.is_pro);
        assert!(view.current_period_end.is_none());
        assert!(view.next_billing_date.is_none());
    }

    #[tokio::test]
    async fn status_counts_devices() {
        let account = create_test_account(|a| a.email = "a@example.com".into());
        let devices = Arc::new(InMemoryDeviceRepo::with_devices(vec![
            create_test_device(account.id, |d| d.device_id = "d1".into()),
            create_test_device(account.id, |d| d.device_id = "d2".into()),
        ]));
        let uc = use_cases(
            Arc::new(InMemoryAccountRepo::with_accounts(vec![account])),
            devices,
            &[],
        );

        let report = uc.status_or_default("a@example.com").await;
        assert!(!report.degraded);
        assert_eq!(report.view.device_count, 2);
        assert_eq!(report.view.entitlement.quota, QuotaClass::Free);
    }

    #[tokio::test]
    async fn status_falls_back_when_store_fails() {
        let uc = use_cases(
            Arc::new(FailingAccountRepo),
            Arc::new(InMemoryDeviceRepo::new()),
            &[],
        );

        let report = uc.status_or_default("a@example.com").await;
        assert!(report.degraded);
        assert!(!report.view.entitlement.is_pro);
        assert_eq!(report.view.entitlement.max_devices(), 2);
    }
}
