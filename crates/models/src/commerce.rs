use serde::Serialize;

/// The money columns of an order. Construct through [`OrderAmounts::new`] so
/// that `final_amount` always equals `total_amount - discount_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderAmounts {
    total_amount: f64,
    discount_amount: f64,
    final_amount: f64,
}

impl OrderAmounts {
    /// The discount is clamped to `[0, total]`
    pub fn new(total_amount: f64, discount_amount: f64) -> Self {
        let discount_amount = discount_amount.clamp(0.0, total_amount.max(0.0));
        Self {
            total_amount,
            discount_amount,
            final_amount: total_amount - discount_amount,
        }
    }

    /// A single course bought at its list price. Nothing populates discounts
    /// yet.
    pub fn at_price(price: f64) -> Self {
        Self::new(price, 0.0)
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount_amount
    }

    pub fn final_amount(&self) -> f64 {
        self.final_amount
    }

    pub fn is_free(&self) -> bool {
        self.final_amount == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_amount_is_derived() {
        let amounts = OrderAmounts::new(299.0, 50.0);
        assert_eq!(amounts.final_amount(), 249.0);
        assert!(!amounts.is_free());
    }

    #[test]
    fn test_discount_is_clamped() {
        let amounts = OrderAmounts::new(100.0, 150.0);
        assert_eq!(amounts.discount_amount(), 100.0);
        assert_eq!(amounts.final_amount(), 0.0);

        let amounts = OrderAmounts::new(100.0, -5.0);
        assert_eq!(amounts.discount_amount(), 0.0);
    }

    #[test]
    fn test_free_course() {
        assert!(OrderAmounts::at_price(0.0).is_free());
    }
}
