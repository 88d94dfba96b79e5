use serde::{Deserialize, Serialize};

/// Purchased plan recorded on the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "plan_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    ProMonthly,
    ProYearly,
    ProLifetime,
    Admin,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::ProMonthly => "pro_monthly",
            PlanTier::ProYearly => "pro_yearly",
            PlanTier::ProLifetime => "pro_lifetime",
            PlanTier::Admin => "admin",
        }
    }

    /// Map a recurring price interval to the subscription plan.
    ///
    /// Anything that is not yearly is treated as monthly.
    pub fn from_interval(interval: Option<&str>) -> Self {
        match interval {
            Some("year") => PlanTier::ProYearly,
            _ => PlanTier::ProMonthly,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            PlanTier::ProMonthly | PlanTier::ProYearly | PlanTier::ProLifetime
        )
    }

    /// Plans that provider subscription events must not overwrite.
    pub fn is_sticky(&self) -> bool {
        matches!(self, PlanTier::ProLifetime | PlanTier::Admin)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro_monthly" => Ok(PlanTier::ProMonthly),
            "pro_yearly" => Ok(PlanTier::ProYearly),
            "pro_lifetime" => Ok(PlanTier::ProLifetime),
            "admin" => Ok(PlanTier::Admin),
            _ => Err(format!("Invalid plan type: {}", s)),
        }
    }
}
