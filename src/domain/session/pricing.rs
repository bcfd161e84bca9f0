//! Energy and cost arithmetic for charging sessions
//!
//! Percentages are battery state-of-charge readings; costs are whole
//! currency units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::shared::errors::DomainError;

/// Energy delivered per percentage point of state of charge: 0.5 kWh
pub fn kwh_per_percent() -> Decimal {
    Decimal::new(5, 1)
}

pub fn validate_percentage(value: i32) -> Result<(), DomainError> {
    if !(0..=100).contains(&value) {
        return Err(DomainError::InvalidInput(format!(
            "percentage {} outside 0..=100",
            value
        )));
    }
    Ok(())
}

/// `(end - start) * 0.5 kWh`; `end` must not be below `start`.
pub fn kwh_used(start_percentage: i32, end_percentage: i32) -> Result<Decimal, DomainError> {
    validate_percentage(start_percentage)?;
    validate_percentage(end_percentage)?;
    if end_percentage < start_percentage {
        return Err(DomainError::InvalidInput(format!(
            "end percentage {} below start percentage {}",
            end_percentage, start_percentage
        )));
    }
    Ok(Decimal::from(end_percentage - start_percentage) * kwh_per_percent())
}

/// `kwh * rate * (1 - discount/100)`, rounded half-up to a whole unit.
///
/// Discounts outside 0..=100 are clamped.
pub fn discounted_cost(
    kwh: Decimal,
    rate_per_kwh: i64,
    discount_percent: Decimal,
) -> Result<i64, DomainError> {
    let discount = discount_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let raw = kwh * Decimal::from(rate_per_kwh);
    let factor = (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
    round_currency(raw * factor)
}

pub fn round_currency(amount: Decimal) -> Result<i64, DomainError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("amount {} out of range", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kwh_from_percentages() {
        assert_eq!(kwh_used(20, 80).unwrap(), Decimal::from(30));
        assert_eq!(kwh_used(10, 11).unwrap(), Decimal::new(5, 1));
        assert_eq!(kwh_used(50, 50).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn end_below_start_is_invalid() {
        assert!(matches!(kwh_used(80, 20), Err(DomainError::InvalidInput(_))));
        assert!(matches!(kwh_used(-1, 20), Err(DomainError::InvalidInput(_))));
        assert!(matches!(kwh_used(0, 101), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn cost_without_discount() {
        let cost = discounted_cost(Decimal::from(30), 3000, Decimal::ZERO).unwrap();
        assert_eq!(cost, 90_000);
    }

    #[test]
    fn cost_with_fifteen_percent_discount() {
        let cost = discounted_cost(Decimal::from(30), 3000, Decimal::from(15)).unwrap();
        assert_eq!(cost, 76_500);
    }

    #[test]
    fn rounding_is_half_up() {
        // 0.5 kWh * 3 = 1.5 -> 2
        assert_eq!(discounted_cost(Decimal::new(5, 1), 3, Decimal::ZERO).unwrap(), 2);
        // 0.5 kWh * 5 = 2.5 -> 3
        assert_eq!(discounted_cost(Decimal::new(5, 1), 5, Decimal::ZERO).unwrap(), 3);
        // 1 kWh * 7 * 0.9 = 6.3 -> 6
        assert_eq!(discounted_cost(Decimal::ONE, 7, Decimal::from(10)).unwrap(), 6);
    }

    #[test]
    fn discount_is_clamped() {
        assert_eq!(discounted_cost(Decimal::from(10), 100, Decimal::from(150)).unwrap(), 0);
        assert_eq!(discounted_cost(Decimal::from(10), 100, Decimal::from(-5)).unwrap(), 1000);
    }
}
