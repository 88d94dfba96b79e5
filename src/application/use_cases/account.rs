use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::account::{Account, BillingFields};
use crate::validators::parse_email;

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Account>>;
    /// Inserts a free account unless one exists for the email.
    /// Returns the row and whether it was created by this call.
    async fn create_if_absent(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> AppResult<(Account, bool)>;
    /// Locks the account row, computes the new billing columns from the
    /// current ones and writes them when they differ.
    /// Returns the resulting row and whether anything changed.
    async fn update_billing_with(
        &self,
        account_id: Uuid,
        transition: &(dyn for<'b> Fn(&'b BillingFields) -> BillingFields + Send + Sync),
    ) -> AppResult<(Account, bool)>;
    async fn set_deletion_schedule(
        &self,
        account_id: Uuid,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> AppResult<Account>;
    /// Hard-deletes accounts whose deletion time has passed. Devices cascade.
    async fn purge_scheduled(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct AccountUseCases {
    repo: Arc<dyn AccountRepo>,
    deletion_grace: Duration,
}

impl AccountUseCases {
    pub fn new(repo: Arc<dyn AccountRepo>, deletion_grace: Duration) -> Self {
        Self {
            repo,
            deletion_grace,
        }
    }

    /// Called on every sign-in. Provisions a free account the first time.
    #[instrument(skip(self))]
    pub async fn sync_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> AppResult<(Account, bool)> {
        let email = parse_email(email)?;
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        let (account, created) = self.repo.create_if_absent(&email, display_name).await?;
        if created {
            tracing::info!(account_id = %account.id, "Provisioned new account");
        }
        Ok((account, created))
    }

    #[instrument(skip(self))]
    pub async fn get_or_provision(&self, email: &str) -> AppResult<Account> {
        let (account, _) = self.sync_user(email, None).await?;
        Ok(account)
    }

    /// Schedules the account for removal after the grace period.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, email: &str) -> AppResult<DateTime<Utc>> {
        let account = self.require(email).await?;
        let scheduled_at = Utc::now() + self.deletion_grace;

        self.repo
            .set_deletion_schedule(account.id, Some(scheduled_at))
            .await?;

        tracing::info!(account_id = %account.id, %scheduled_at, "Account deletion scheduled");
        Ok(scheduled_at)
    }

    #[instrument(skip(self))]
    pub async fn restore_account(&self, email: &str) -> AppResult<Account> {
        let account = self.require(email).await?;
        if account.deletion_scheduled_at.is_none() {
            return Ok(account);
        }

        let restored = self.repo.set_deletion_schedule(account.id, None).await?;
        tracing::info!(account_id = %restored.id, "Account deletion cancelled");
        Ok(restored)
    }

    #[instrument(skip(self))]
    pub async fn purge_due_accounts(&self) -> AppResult<u64> {
        self.repo.purge_scheduled(Utc::now()).await
    }

    async fn require(&self, email: &str) -> AppResult<Account> {
        let email = parse_email(email)?;
        self.repo
            .get_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryAccountRepo, create_test_account};

    fn use_cases(repo: Arc<InMemoryAccountRepo>) -> AccountUseCases {
        AccountUseCases::new(repo, Duration::hours(24))
    }

    #[tokio::test]
    async fn sync_user_provisions_once() {
        let repo = Arc::new(InMemoryAccountRepo::new());
        let uc = use_cases(repo.clone());

        let (first, created) = uc.sync_user(" New@Example.com ", Some("New")).await.unwrap();
        assert!(created);
        assert_eq!(first.email, "new@example.com");
        assert_eq!(first.display_name.as_deref(), Some("New"));

        let (second, created) = uc.sync_user("new@example.com", None).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn sync_user_rejects_invalid_email() {
        let uc = use_cases(Arc::new(InMemoryAccountRepo::new()));
        let result = uc.sync_user("not-an-email", None).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn delete_then_restore_clears_schedule() {
        let account = create_test_account(|a| a.email = "a@example.com".into());
        let repo = Arc::new(InMemoryAccountRepo::with_accounts(vec![account.clone()]));
        let uc = use_cases(repo.clone());

        let scheduled_at = uc.delete_account("a@example.com").await.unwrap();
        let minutes = (scheduled_at - Utc::now()).num_minutes();
        assert!((23 * 60..=24 * 60).contains(&minutes));
        assert!(repo.get(account.id).unwrap().deletion_scheduled_at.is_some());

        let restored = uc.restore_account("a@example.com").await.unwrap();
        assert!(restored.deletion_scheduled_at.is_none());
    }

    #[tokio::test]
    async fn delete_unknown_account_is_not_found() {
        let uc = use_cases(Arc::new(InMemoryAccountRepo::new()));
        let result = uc.delete_account("ghost@example.com").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn purge_only_removes_due_accounts() {
        let due = create_test_account(|a| {
            a.email = "due@example.com".into();
            a.deletion_scheduled_at = Some(Utc::now() - Duration::minutes(1));
        });
        let pending = create_test_account(|a| {
            a.email = "pending@example.com".into();
            a.deletion_scheduled_at = Some(Utc::now() + Duration::hours(3));
        });
        let kept = create_test_account(|a| a.email = "kept@example.com".into());
        let repo = Arc::new(InMemoryAccountRepo::with_accounts(vec![
            due.clone(),
            pending.clone(),
            kept.clone(),
        ]));
        let uc = use_cases(repo.clone());

        assert_eq!(uc.purge_due_accounts().await.unwrap(), 1);
        assert!(repo.get(due.id).is_none());
        assert!(repo.get(pending.id).is_some());
        assert!(repo.get(kept.id).is_some());
    }
}
