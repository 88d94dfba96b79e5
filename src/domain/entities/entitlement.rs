use super::{plan_tier::PlanTier, subscription_status::SubscriptionStatus};

/// Device quota bucket derived from the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaClass {
    Free,
    Pro,
    Admin,
}

impl QuotaClass {
    pub fn max_devices(&self) -> i64 {
        match self {
            QuotaClass::Free => 2,
            QuotaClass::Pro => 3,
            // Large enough to never bind while keeping the comparison uniform
            QuotaClass::Admin => 999,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaClass::Free => "free",
            QuotaClass::Pro => "pro",
            QuotaClass::Admin => "admin",
        }
    }
}

/// What an account may use right now. Derived per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    pub is_pro: bool,
    pub is_admin: bool,
    pub plan_type: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub quota: QuotaClass,
}

impl Entitlement {
    pub fn free() -> Self {
        Self {
            is_pro: false,
            is_admin: false,
            plan_type: PlanTier::Free,
            subscription_status: SubscriptionStatus::Inactive,
            quota: QuotaClass::Free,
        }
    }

    /// `is_admin_email` comes from the configured admin list and overrides the stored plan.
    pub fn resolve(plan: PlanTier, status: SubscriptionStatus, is_admin_email: bool) -> Self {
        if is_admin_email || plan == PlanTier::Admin {
            return Self {
                is_pro: true,
                is_admin: true,
                plan_type: PlanTier::Admin,
                subscription_status: SubscriptionStatus::Active,
                quota: QuotaClass::Admin,
            };
        }

        let is_pro = plan.is_paid() && status.grants_access();
        Self {
            is_pro,
            is_admin: false,
            plan_type: plan,
            subscription_status: status,
            quota: if is_pro { QuotaClass::Pro } else { QuotaClass::Free },
        }
    }

    pub fn max_devices(&self) -> i64 {
        self.quota.max_devices()
    }
}
