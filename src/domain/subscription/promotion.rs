//! Promotion value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PromotionId, Timestamp, ValidationError};

/// A time-boxed promotional discount.
///
/// # Invariants
///
/// - `valid_from < valid_until`
/// - `discount_percentage` in 1..=100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    /// Code entered by the customer, stored uppercase.
    pub code: String,
    pub description: Option<String>,
    pub discount_percentage: u8,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,
    pub active: bool,
}

impl Promotion {
    pub fn new(
        code: &str,
        discount_percentage: u8,
        valid_from: Timestamp,
        valid_until: Timestamp,
    ) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        if !(1..=100).contains(&discount_percentage) {
            return Err(ValidationError::out_of_range(
                "discount_percentage",
                1,
                100,
                i64::from(discount_percentage),
            ));
        }
        if !valid_from.is_before(&valid_until) {
            return Err(ValidationError::invalid_format(
                "valid_until",
                "must be after valid_from",
            ));
        }

        Ok(Self {
            id: PromotionId::new(),
            code: code.to_uppercase(),
            description: None,
            discount_percentage,
            valid_from,
            valid_until,
            active: true,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A promotion applies only while active and strictly inside its window.
    pub fn is_applicable_at(&self, now: Timestamp) -> bool {
        self.active && self.valid_from.is_before(&now) && now.is_before(&self.valid_until)
    }

    /// Discounted price for a base price in cents. The discount rounds down.
    pub fn discounted_price(&self, base_cents: i64) -> i64 {
        base_cents - base_cents * i64::from(self.discount_percentage) / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (Timestamp, Timestamp) {
        let now = Timestamp::now();
        (now.minus_days(1), now.add_days(1))
    }

    #[test]
    fn applicable_inside_window_when_active() {
        let (from, until) = window();
        let promo = Promotion::new("spring25", 25, from, until).unwrap();
        assert!(promo.is_applicable_at(Timestamp::now()));
        assert_eq!(promo.code, "SPRING25");
    }

    #[test]
    fn not_applicable_outside_window() {
        let (from, until) = window();
        let promo = Promotion::new("SPRING25", 25, from, until).unwrap();
        assert!(!promo.is_applicable_at(from.minus_days(1)));
        assert!(!promo.is_applicable_at(until.add_days(1)));
    }

    #[test]
    fn not_applicable_at_window_edges() {
        let (from, until) = window();
        let promo = Promotion::new("EDGE", 10, from, until).unwrap();
        assert!(!promo.is_applicable_at(from));
        assert!(!promo.is_applicable_at(until));
    }

    #[test]
    fn inactive_promotion_never_applies() {
        let (from, until) = window();
        let mut promo = Promotion::new("OFF", 10, from, until).unwrap();
        promo.active = false;
        assert!(!promo.is_applicable_at(Timestamp::now()));
    }

    #[test]
    fn rejects_inverted_window_and_bad_discount() {
        let (from, until) = window();
        assert!(Promotion::new("X", 10, until, from).is_err());
        assert!(Promotion::new("X", 0, from, until).is_err());
        assert!(Promotion::new("X", 101, from, until).is_err());
        assert!(Promotion::new("  ", 10, from, until).is_err());
    }

    #[test]
    fn discounted_price_rounds_down() {
        let (from, until) = window();
        let promo = Promotion::new("HALF", 50, from, until).unwrap();
        assert_eq!(promo.discounted_price(999), 500);
    }
}
