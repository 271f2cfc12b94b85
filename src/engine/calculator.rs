//! Commission calculator
//!
//! Converts a [`PointsSnapshot`] into currency. Each component is truncated on its
//! own before it is summed; the deduction is truncated to cents.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use crate::domain::aggregates::{CommissionBreakdown, PointsSnapshot};
use crate::{NetworkError, Result};

/// Fixed commission percentages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommissionRates {
    /// Share of personal points that is commissionable (20%).
    pub personal_share: Decimal,
    /// Payout rate applied to commissionable points (55%).
    pub payout_rate: Decimal,
    /// Payout rate applied to the five generation totals (55%).
    pub generation_rate: Decimal,
    /// Website development deduction (3%).
    pub website_development_rate: Decimal,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            personal_share: Decimal::new(20, 2),
            payout_rate: Decimal::new(55, 2),
            generation_rate: Decimal::new(55, 2),
            website_development_rate: Decimal::new(3, 2),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommissionCalculator { rates: CommissionRates }

impl CommissionCalculator {
    pub fn new(rates: CommissionRates) -> Self { Self { rates } }

    pub fn rates(&self) -> &CommissionRates { &self.rates }

    pub fn calculate(&self, points: &PointsSnapshot, leadership_profit: Decimal, customer_purchase_commission: Decimal) -> Result<CommissionBreakdown> {
        if points.personal.is_negative() {
            return Err(NetworkError::DataIntegrity(format!("negative personal points: {}", points.personal)));
        }
        if let Some((i, p)) = points.generations.iter().enumerate().find(|(_, p)| p.is_negative()) {
            return Err(NetworkError::DataIntegrity(format!("negative generation {} points: {}", i + 1, p)));
        }
        if leadership_profit < Decimal::ZERO {
            return Err(NetworkError::DataIntegrity(format!("negative leadership profit: {}", leadership_profit)));
        }
        if customer_purchase_commission < Decimal::ZERO {
            return Err(NetworkError::DataIntegrity(format!("negative customer purchase commission: {}", customer_purchase_commission)));
        }

        let r = &self.rates;
        let overflow = || NetworkError::DataIntegrity("commission amounts overflow".into());
        let personal_commission = points.personal.to_decimal().checked_mul(r.personal_share)
            .and_then(|v| v.checked_mul(r.payout_rate))
            .ok_or_else(overflow)?
            .floor();
        let generation_commission = points.generation_total().to_decimal().checked_mul(r.generation_rate)
            .ok_or_else(overflow)?
            .floor();
        let total_profit_before_deduction = [generation_commission, leadership_profit, customer_purchase_commission]
            .into_iter()
            .try_fold(personal_commission, |acc, v| acc.checked_add(v))
            .ok_or_else(overflow)?;
        let website_development_commission = total_profit_before_deduction.checked_mul(r.website_development_rate)
            .ok_or_else(overflow)?
            .round_dp_with_strategy(2, RoundingStrategy::ToZero);

        Ok(CommissionBreakdown {
            personal_commission,
            generation_commission,
            leadership_profit,
            customer_purchase_commission,
            total_profit_before_deduction,
            website_development_commission,
            total_profit: total_profit_before_deduction - website_development_commission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Points;

    fn snapshot(personal: i64, generations: [i64; 5]) -> PointsSnapshot {
        PointsSnapshot { personal: Points::new(personal), generations: generations.map(Points::new) }
    }

    #[test]
    fn test_personal_commission() {
        let c = CommissionCalculator::default().calculate(&snapshot(1000, [0; 5]), Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(c.personal_commission, Decimal::from(110));
    }

    #[test]
    fn test_generation_commission_uses_combined_points() {
        let c = CommissionCalculator::default().calculate(&snapshot(0, [100, 100, 100, 100, 100]), Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(c.generation_commission, Decimal::from(275));
    }

    #[test]
    fn test_components_are_floored_individually() {
        // 7 * 0.11 = 0.77 and 3 * 0.55 = 1.65, floored separately to 0 and 1
        let c = CommissionCalculator::default().calculate(&snapshot(7, [3, 0, 0, 0, 0]), Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(c.personal_commission, Decimal::ZERO);
        assert_eq!(c.generation_commission, Decimal::ONE);
        assert_eq!(c.total_profit_before_deduction, Decimal::ONE);
        assert_eq!(c.website_development_commission, Decimal::new(3, 2));
        assert_eq!(c.total_profit, Decimal::new(97, 2));
    }

    #[test]
    fn test_deduction_on_one_thousand() {
        // 1000 personal points -> 110, 1618 generation points -> 889, plus 1 of leadership
        let c = CommissionCalculator::default().calculate(&snapshot(1000, [1618, 0, 0, 0, 0]), Decimal::ONE, Decimal::ZERO).unwrap();
        assert_eq!(c.total_profit_before_deduction, Decimal::from(1000));
        assert_eq!(c.website_development_commission, Decimal::new(3000, 2));
        assert_eq!(c.total_profit, Decimal::new(97000, 2));
    }

    #[test]
    fn test_zero_points_pass_external_amounts_through() {
        let leadership = Decimal::new(25050, 2);
        let customer = Decimal::new(4950, 2);
        let c = CommissionCalculator::default().calculate(&PointsSnapshot::default(), leadership, customer).unwrap();
        assert_eq!(c.personal_commission, Decimal::ZERO);
        assert_eq!(c.generation_commission, Decimal::ZERO);
        assert_eq!(c.total_profit_before_deduction, Decimal::from(300));
        assert_eq!(c.website_development_commission, Decimal::from(9));
        assert_eq!(c.total_profit, Decimal::from(291));
    }

    #[test]
    fn test_deduction_is_truncated_to_cents() {
        let c = CommissionCalculator::default().calculate(&PointsSnapshot::default(), Decimal::new(3333, 2), Decimal::ZERO).unwrap();
        // 33.33 * 0.03 = 0.9999
        assert_eq!(c.website_development_commission, Decimal::new(99, 2));
        assert_eq!(c.total_profit, Decimal::new(3234, 2));
    }

    #[test]
    fn test_negative_inputs_are_integrity_errors() {
        let calc = CommissionCalculator::default();
        assert!(matches!(calc.calculate(&snapshot(-1, [0; 5]), Decimal::ZERO, Decimal::ZERO), Err(NetworkError::DataIntegrity(_))));
        assert!(matches!(calc.calculate(&snapshot(0, [0, 0, -3, 0, 0]), Decimal::ZERO, Decimal::ZERO), Err(NetworkError::DataIntegrity(_))));
        assert!(matches!(calc.calculate(&snapshot(0, [0; 5]), Decimal::NEGATIVE_ONE, Decimal::ZERO), Err(NetworkError::DataIntegrity(_))));
    }

    #[test]
    fn test_overflowing_inputs_are_integrity_errors() {
        let calc = CommissionCalculator::default();
        let result = calc.calculate(&PointsSnapshot::default(), Decimal::MAX, Decimal::MAX);
        assert!(matches!(result, Err(NetworkError::DataIntegrity(_))));
        let extreme = calc.calculate(&snapshot(i64::MAX, [i64::MAX; 5]), Decimal::ZERO, Decimal::ZERO).unwrap();
        assert!(extreme.total_profit > Decimal::ZERO);
    }
}
