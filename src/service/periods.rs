//! Period snapshot management: calculate, recalculate, close and read profit periods.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;
use crate::domain::aggregates::{ExternalInputs, Member, MemberId, MemberProfit, PeriodId, PeriodStatus, ProfitPeriod};
use crate::domain::events::{DomainEvent, PeriodEvent};
use crate::domain::value_objects::DateRange;
use crate::engine::{LedgerEntry, PointsAggregator, SponsorGraph};
use crate::service::{NetworkService, MAX_AMOUNT_UNITS};
use crate::{NetworkError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CalculatePeriodRequest {
    #[validate(length(min = 1, max = 120))]
    pub period_name: String,
    #[validate(range(min = 1))]
    pub period_number: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub leadership_profits: BTreeMap<MemberId, Decimal>,
    #[serde(default)]
    pub customer_purchase_commissions: BTreeMap<MemberId, Decimal>,
}

/// A member's slice of one period, as shown in their earnings view.
#[derive(Debug, Clone, Serialize)]
pub struct MemberEarning {
    pub period_id: PeriodId,
    pub period_name: String,
    pub period_number: u32,
    #[serde(flatten)]
    pub range: DateRange,
    pub status: PeriodStatus,
    pub profit: MemberProfit,
}

impl CalculatePeriodRequest {
    /// Checks everything that does not need stored data.
    fn validated(self) -> Result<(String, Option<u32>, DateRange, ExternalInputs)> {
        self.validate()?;
        let name = self.period_name.trim();
        if name.is_empty() { return Err(NetworkError::Validation("period_name must not be blank".into())); }
        let start = self.start_date.ok_or_else(|| NetworkError::Validation("start_date is required".into()))?;
        let end = self.end_date.ok_or_else(|| NetworkError::Validation("end_date is required".into()))?;
        let range = DateRange::new(start, end)?;
        let max = Decimal::from(MAX_AMOUNT_UNITS);
        let amounts = self.leadership_profits.iter().chain(self.customer_purchase_commissions.iter());
        if let Some((member, amount)) = amounts.into_iter().find(|(_, amount)| **amount > max) {
            return Err(NetworkError::Validation(format!("input {} for member {} exceeds {}", amount, member, max)));
        }
        let inputs = ExternalInputs { leadership_profits: self.leadership_profits, customer_purchase_commissions: self.customer_purchase_commissions };
        Ok((name.to_string(), self.period_number, range, inputs))
    }
}

impl NetworkService {
    pub async fn calculate_period(&self, request: CalculatePeriodRequest) -> Result<ProfitPeriod> {
        let (name, number, range, inputs) = request.validated()?;

        let _guard = self.calculation_lock.lock().await;
        tracing::info!(period = %name, start = %range.start(), end = %range.end(), "calculating profit period");

        let members = self.store.list_members().await?;
        let ledger = self.store.ledger_entries(range).await?;
        let profits = self.build_profits(&members, &ledger, range, &inputs)?;

        let existing = self.store.list_periods().await?;
        for other in existing.iter().filter(|p| p.range().overlaps(&range)) {
            tracing::warn!(period = %name, overlaps = %other.period_name(), "profit period overlaps an existing period");
        }
        let number = match number {
            Some(n) => n,
            None => self.store.next_period_number().await?,
        };

        let period = ProfitPeriod::calculated(name, number, range, inputs, profits);
        self.store.insert_period(&period).await?;

        tracing::info!(period_id = %period.id(), members = period.member_profits().len(), payout = %period.total_payout(), "profit period calculated");
        self.events.publish(vec![DomainEvent::Period(PeriodEvent::Calculated {
            period_id: period.id(), period_name: period.period_name().to_string(),
            start_date: range.start(), end_date: range.end(),
            members: period.member_profits().len(), total_payout: period.total_payout(),
        })]).await;
        Ok(period)
    }

    /// Rebuild the snapshot of a period that has not been paid yet, using its stored
    /// range and inputs against current member and order data.
    pub async fn recalculate_period(&self, id: PeriodId) -> Result<ProfitPeriod> {
        let _guard = self.calculation_lock.lock().await;
        let mut period = self.get_period(id).await?;
        if period.is_paid() {
            tracing::warn!(period_id = %id, "rejected recalculation of a paid period");
            return Err(NetworkError::AlreadyClosed(id));
        }

        let members = self.store.list_members().await?;
        let ledger = self.store.ledger_entries(period.range()).await?;
        let profits = self.build_profits(&members, &ledger, period.range(), period.inputs())?;
        period.replace_profits(profits)?;
        self.store.update_unpaid_period(&period).await?;

        tracing::info!(period_id = %id, members = period.member_profits().len(), "profit period recalculated");
        self.events.publish(vec![DomainEvent::Period(PeriodEvent::Recalculated {
            period_id: id, members: period.member_profits().len(), total_payout: period.total_payout(),
        })]).await;
        Ok(period)
    }

    /// Mark a period paid. Only ever succeeds once per period. Holds the
    /// calculation lock so the snapshot it freezes is the latest one written.
    pub async fn close_period(&self, id: PeriodId) -> Result<ProfitPeriod> {
        let _guard = self.calculation_lock.lock().await;
        let mut period = self.get_period(id).await?;
        let event = period.close().map_err(|e| {
            tracing::warn!(period_id = %id, "rejected second close of a paid period");
            NetworkError::from(e)
        })?;
        self.store.update_unpaid_period(&period).await?;
        tracing::info!(period_id = %id, payout = %period.total_payout(), "profit period paid");
        self.events.publish(vec![event]).await;
        Ok(period)
    }

    pub async fn get_period(&self, id: PeriodId) -> Result<ProfitPeriod> {
        self.store.find_period(id).await?.ok_or_else(|| NetworkError::NotFound(format!("Profit period {}", id)))
    }

    pub async fn list_periods(&self) -> Result<Vec<ProfitPeriod>> { self.store.list_periods().await }

    pub async fn member_earnings(&self, member: MemberId) -> Result<Vec<MemberEarning>> {
        self.get_member(member).await?;
        let periods = self.store.list_periods().await?;
        Ok(periods.iter().filter_map(|p| p.profit_for(member).map(|profit| MemberEarning {
            period_id: p.id(), period_name: p.period_name().to_string(), period_number: p.period_number(),
            range: p.range(), status: p.status(), profit: profit.clone(),
        })).collect())
    }

    /// Pure calculation step shared by calculate and recalculate. Any integrity
    /// error aborts the whole run before anything is written.
    fn build_profits(&self, members: &[Member], ledger: &[LedgerEntry], range: DateRange, inputs: &ExternalInputs) -> Result<Vec<MemberProfit>> {
        let graph = SponsorGraph::new(members);
        for id in inputs.leadership_profits.keys().chain(inputs.customer_purchase_commissions.keys()) {
            match graph.member(*id) {
                Some(m) if m.is_network_member() => {}
                Some(_) => return Err(NetworkError::Validation(format!("member {} does not earn commission", id))),
                None => return Err(NetworkError::Validation(format!("unknown member {} in period inputs", id))),
            }
        }

        let aggregator = PointsAggregator::new(&graph, ledger, range)?;
        let mut profits = Vec::new();
        for member in members.iter().filter(|m| m.is_network_member()) {
            let aggregate = aggregator.aggregate(member.id)?;
            let commission = self.calculator.calculate(
                &aggregate.points,
                inputs.leadership_profit(member.id),
                inputs.customer_purchase_commission(member.id),
            )?;
            if commission.total_profit_before_deduction <= Decimal::ZERO { continue; }
            profits.push(MemberProfit {
                member_id: member.id, name: member.name.clone(), username: member.username.clone(), rank: member.rank,
                points: aggregate.points, personal_sales: aggregate.personal_sales, group_sales: aggregate.group_sales,
                commission,
            });
        }
        Ok(profits)
    }
}
