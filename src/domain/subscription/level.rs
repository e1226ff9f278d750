//! Subscription level (plan) reference data.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionLevelId, ValidationError};

/// Plan tier offered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelTier {
    Basic,
    Premium,
    Ultra,
}

impl LevelTier {
    pub fn display_name(&self) -> &'static str {
        match self {
            LevelTier::Basic => "Basic",
            LevelTier::Premium => "Premium",
            LevelTier::Ultra => "Ultra",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Ok(LevelTier::Basic),
            "premium" => Ok(LevelTier::Premium),
            "ultra" => Ok(LevelTier::Ultra),
            _ => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", value),
            )),
        }
    }
}

impl std::fmt::Display for LevelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Recurrence unit governing how billing dates advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingFrequency {
    /// Number of calendar months in one billing period.
    pub fn months(&self) -> u32 {
        match self {
            BillingFrequency::Monthly => 1,
            BillingFrequency::Quarterly => 3,
            BillingFrequency::Yearly => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingFrequency::Monthly => "monthly",
            BillingFrequency::Quarterly => "quarterly",
            BillingFrequency::Yearly => "yearly",
        }
    }

    /// Parses a stored frequency. Unknown values yield `None` so callers can
    /// treat the billing frequency as undetermined rather than failing a load.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "monthly" => Some(BillingFrequency::Monthly),
            "quarterly" => Some(BillingFrequency::Quarterly),
            "yearly" | "annual" | "annually" => Some(BillingFrequency::Yearly),
            _ => None,
        }
    }
}

/// A purchasable plan.
///
/// Immutable from the lifecycle's point of view. `billing_frequency` is
/// optional because legacy rows may carry values we do not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLevel {
    pub id: SubscriptionLevelId,
    pub tier: LevelTier,
    /// Price per billing period in the smallest currency unit.
    pub price_cents: i64,
    /// ISO 4217 code, lowercase as the payment provider expects.
    pub currency: String,
    pub billing_frequency: Option<BillingFrequency>,
    /// Payment provider price reference (e.g. `price_...`).
    pub external_price_id: String,
}

impl SubscriptionLevel {
    pub fn new(
        tier: LevelTier,
        price_cents: i64,
        currency: impl Into<String>,
        billing_frequency: BillingFrequency,
        external_price_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if price_cents < 0 {
            return Err(ValidationError::out_of_range("price_cents", 0, i64::MAX, price_cents));
        }
        let external_price_id = external_price_id.into();
        if external_price_id.trim().is_empty() {
            return Err(ValidationError::empty_field("external_price_id"));
        }
        Ok(Self {
            id: SubscriptionLevelId::new(),
            tier,
            price_cents,
            currency: currency.into().to_ascii_lowercase(),
            billing_frequency: Some(billing_frequency),
            external_price_id,
        })
    }

    /// Name used in notifications and level-change events.
    pub fn name(&self) -> &'static str {
        self.tier.display_name()
    }
}
