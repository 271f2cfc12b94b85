//! Profit engine: referral graph, points aggregation, commission math and rank promotion.
pub mod aggregator;
pub mod calculator;
pub mod downline;
pub mod promotion;

pub use aggregator::{Aggregate, LedgerEntry, PointsAggregator};
pub use calculator::{CommissionCalculator, CommissionRates};
pub use downline::{Downline, IntegrityViolation, SponsorGraph};
pub use promotion::{bronze_lines, plan_promotions};
