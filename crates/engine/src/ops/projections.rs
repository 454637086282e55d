//! Projection engine: pure, read-only computations over space state and
//! balance history. Nothing in this module writes to the store.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::TransactionTrait;

use crate::{
    BalanceSnapshot, EngineError, ResultEngine, Space, SpaceKind, TransferFrequency,
};

use super::{Engine, with_tx};

/// Derived goal metrics for a space with a target amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalMetrics {
    pub progress_pct: Decimal,
    pub remaining: Decimal,
    pub completed: bool,
    pub estimated_completion: Option<DateTime<Utc>>,
}

/// A space together with its goal metrics, when a target is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub space: Space,
    pub metrics: Option<GoalMetrics>,
}

/// Aggregated view over one space's snapshot history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceAnalytics {
    pub space: Space,
    pub opening: Option<Decimal>,
    pub closing: Option<Decimal>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub net_change: Decimal,
    pub pct_change: Option<Decimal>,
    pub series: Vec<BalanceSnapshot>,
    pub goal: Option<GoalMetrics>,
}

/// Fixed output precision for percentage-like metrics.
fn fixed(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(10, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes goal metrics for a space. Returns `None` when no target amount
/// is set.
fn goal_metrics(space: &Space, now: DateTime<Utc>) -> Option<GoalMetrics> {
    let target = space.target_amount?;
    let completed = space.balance >= target;
    let remaining = (target - space.balance).max(Decimal::ZERO);
    let progress_pct = if target.is_zero() {
        Decimal::ONE_HUNDRED
    } else {
        fixed(space.balance / target * Decimal::ONE_HUNDRED)
    };

    let estimated_completion = if space.target_date.is_some()
        && !completed
        && space.balance > Decimal::ZERO
    {
        estimate_completion(space, remaining, now)
    } else {
        None
    };

    Some(GoalMetrics {
        progress_pct,
        remaining,
        completed,
        estimated_completion,
    })
}

/// Estimates the completion date from the average growth since creation.
///
/// `daily_growth = balance / days_since_creation` treats the whole current
/// balance as saved linearly since the space was created; the estimate is
/// `now + remaining / daily_growth` days, rounded up to whole days.
fn estimate_completion(
    space: &Space,
    remaining: Decimal,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let days_since_creation = (now - space.created_at).num_days().max(1);
    let daily_growth = space.balance / Decimal::from(days_since_creation);
    if daily_growth <= Decimal::ZERO {
        return None;
    }
    let days_needed = (remaining / daily_growth).ceil().to_i64()?;
    Some(now + Duration::days(days_needed))
}

/// Runs the month-by-month simulation over a working copy of the balances.
///
/// The authoritative store is never touched: balances are copied into a
/// local map, automatic transfers are replayed against it, and the final
/// map is returned. A source with insufficient projected funds skips that
/// month silently.
fn simulate_months(spaces: &[Space], months: u32) -> HashMap<Uuid, Decimal> {
    struct Plan {
        target: Uuid,
        source: Option<Uuid>,
        frequency: TransferFrequency,
        monthly_amount: Decimal,
    }

    let mut balances: HashMap<Uuid, Decimal> =
        spaces.iter().map(|space| (space.id, space.balance)).collect();
    let main_id = spaces
        .iter()
        .find(|space| space.kind == SpaceKind::Main)
        .map(|space| space.id);

    let plans: Vec<Plan> = spaces
        .iter()
        .filter_map(|space| {
            let auto = space.auto_transfer.as_ref().filter(|auto| auto.is_runnable())?;
            let frequency = auto.frequency?;
            let amount = auto.amount?;
            Some(Plan {
                target: space.id,
                source: auto.source_space_id,
                frequency,
                monthly_amount: frequency.monthly_equivalent(amount),
            })
        })
        .collect();

    for month in 0..months {
        for plan in &plans {
            if !plan.frequency.fires_in_month(month) {
                continue;
            }
            let Some(source) = plan.source.or(main_id) else {
                continue;
            };
            if source == plan.target {
                continue;
            }
            let Some(available) = balances.get(&source).copied() else {
                continue;
            };
            if available < plan.monthly_amount {
                continue;
            }
            balances.insert(source, available - plan.monthly_amount);
            if let Some(target_balance) = balances.get_mut(&plan.target) {
                *target_balance += plan.monthly_amount;
            }
        }
    }

    balances
}

impl Engine {
    /// Returns a space together with its goal metrics.
    ///
    /// Spaces without a target amount come back with `metrics: None`.
    pub async fn goal_progress(&self, space_id: Uuid) -> ResultEngine<GoalProgress> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            let space = Space::try_from(model)?;
            let metrics = goal_metrics(&space, now);
            Ok(GoalProgress { space, metrics })
        })
    }

    /// Projects all space balances of an account `months` months into the
    /// future under the configured automatic transfers.
    pub async fn simulate(
        &self,
        account_id: &str,
        months: u32,
    ) -> ResultEngine<HashMap<Uuid, Decimal>> {
        if months == 0 {
            return Err(EngineError::Validation(
                "months must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let models = self.account_spaces(&db_tx, account_id).await?;
            let mut spaces = Vec::with_capacity(models.len());
            for model in models {
                spaces.push(Space::try_from(model)?);
            }
            Ok(simulate_months(&spaces, months))
        })
    }

    /// Each space's share of the account total, in percent.
    ///
    /// Returns an empty map when the account holds no funds.
    pub async fn balance_distribution(
        &self,
        account_id: &str,
    ) -> ResultEngine<HashMap<Uuid, Decimal>> {
        with_tx!(self, |db_tx| {
            let models = self.account_spaces(&db_tx, account_id).await?;
            let mut spaces = Vec::with_capacity(models.len());
            for model in models {
                spaces.push(Space::try_from(model)?);
            }

            let total: Decimal = spaces.iter().map(|space| space.balance).sum();
            if total <= Decimal::ZERO {
                return Ok(HashMap::new());
            }
            Ok(spaces
                .iter()
                .map(|space| {
                    (
                        space.id,
                        fixed(space.balance / total * Decimal::ONE_HUNDRED),
                    )
                })
                .collect())
        })
    }

    /// Approximate daily growth rate per space over `[start, end]`.
    ///
    /// Spaces created after `start` report 0. For the rest the rate is
    /// `balance / elapsed_days`, a single-snapshot proxy kept for
    /// compatibility; a true rate needs the historical series.
    pub async fn growth_rates(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResultEngine<HashMap<Uuid, Decimal>> {
        if start >= end {
            return Err(EngineError::Validation(
                "invalid range: start must be < end".to_string(),
            ));
        }
        let elapsed_days = Decimal::from((end - start).num_days().max(1));

        with_tx!(self, |db_tx| {
            let models = self.account_spaces(&db_tx, account_id).await?;
            let mut rates = HashMap::with_capacity(models.len());
            for model in models {
                let space = Space::try_from(model)?;
                let rate = if space.created_at > start {
                    Decimal::ZERO
                } else {
                    fixed(space.balance / elapsed_days)
                };
                rates.insert(space.id, rate);
            }
            Ok(rates)
        })
    }

    /// Combined analytics for one space: opening/closing/min/max over the
    /// snapshot history in `[from, to)`, net and percentage change, the
    /// series itself, and goal metrics when a target is set.
    pub async fn space_analytics(
        &self,
        space_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<SpaceAnalytics> {
        if let (Some(from), Some(to)) = (from, to)
            && from >= to
        {
            return Err(EngineError::Validation(
                "invalid range: from must be < to".to_string(),
            ));
        }
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            let space = Space::try_from(model)?;
            let series = self
                .snapshots_in_range(&db_tx, &space.account_id, Some(space.id), from, to)
                .await?;

            let opening = series.first().map(|snapshot| snapshot.amount);
            let closing = series.last().map(|snapshot| snapshot.amount);
            let min = series.iter().map(|snapshot| snapshot.amount).min();
            let max = series.iter().map(|snapshot| snapshot.amount).max();
            let net_change = match (opening, closing) {
                (Some(opening), Some(closing)) => closing - opening,
                _ => Decimal::ZERO,
            };
            let pct_change = opening.and_then(|opening| {
                (opening > Decimal::ZERO)
                    .then(|| fixed(net_change / opening * Decimal::ONE_HUNDRED))
            });
            let goal = goal_metrics(&space, now);

            Ok(SpaceAnalytics {
                space,
                opening,
                closing,
                min,
                max,
                net_change,
                pct_change,
                series,
                goal,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::AutoTransfer;

    use super::*;

    fn space(name: &str, kind: SpaceKind, balance: &str) -> Space {
        Space::new(
            "acct-1".to_string(),
            name.to_string(),
            kind,
            Decimal::from_str_exact(balance).unwrap(),
            true,
            None,
            None,
            Utc::now(),
        )
    }

    fn auto(frequency: TransferFrequency, amount: &str, source: Option<Uuid>) -> AutoTransfer {
        AutoTransfer {
            enabled: true,
            frequency: Some(frequency),
            amount: Some(Decimal::from_str_exact(amount).unwrap()),
            source_space_id: source,
        }
    }

    #[test]
    fn goal_metrics_halfway() {
        let mut space = space("Vacation", SpaceKind::Goal, "500.00");
        space.target_amount = Some(Decimal::from_str_exact("1000.00").unwrap());

        let metrics = goal_metrics(&space, Utc::now()).unwrap();
        assert_eq!(metrics.progress_pct, Decimal::from(50));
        assert_eq!(metrics.remaining, Decimal::from_str_exact("500.00").unwrap());
        assert!(!metrics.completed);
    }

    #[test]
    fn goal_metrics_overfunded_is_completed() {
        let mut space = space("Vacation", SpaceKind::Goal, "1200.00");
        space.target_amount = Some(Decimal::from_str_exact("1000.00").unwrap());

        let metrics = goal_metrics(&space, Utc::now()).unwrap();
        assert!(metrics.completed);
        assert_eq!(metrics.remaining, Decimal::ZERO);
        assert_eq!(metrics.estimated_completion, None);
    }

    #[test]
    fn goal_metrics_absent_without_target() {
        let space = space("Buffer", SpaceKind::Savings, "500.00");
        assert_eq!(goal_metrics(&space, Utc::now()), None);
    }

    #[test]
    fn goal_metrics_estimates_completion_from_creation_growth() {
        let now = Utc::now();
        let mut space = space("Vacation", SpaceKind::Goal, "500.00");
        space.created_at = now - Duration::days(30);
        space.target_amount = Some(Decimal::from_str_exact("1000.00").unwrap());
        space.target_date = Some(now + Duration::days(365));

        let metrics = goal_metrics(&space, now).unwrap();
        // 500 over 30 days, 500 remaining: 30 more days at the same pace.
        assert_eq!(metrics.estimated_completion, Some(now + Duration::days(30)));
    }

    #[test]
    fn goal_metrics_no_estimate_without_target_date() {
        let now = Utc::now();
        let mut space = space("Vacation", SpaceKind::Goal, "500.00");
        space.created_at = now - Duration::days(30);
        space.target_amount = Some(Decimal::from_str_exact("1000.00").unwrap());

        let metrics = goal_metrics(&space, now).unwrap();
        assert_eq!(metrics.estimated_completion, None);
    }

    #[test]
    fn simulate_monthly_transfers_from_main() {
        let main = space("Main", SpaceKind::Main, "1000.00");
        let mut savings = space("Savings", SpaceKind::Savings, "500.00");
        savings.auto_transfer = Some(auto(TransferFrequency::Monthly, "100.00", None));

        let spaces = vec![main.clone(), savings.clone()];
        let balances = simulate_months(&spaces, 3);

        assert_eq!(
            balances[&main.id],
            Decimal::from_str_exact("700.00").unwrap()
        );
        assert_eq!(
            balances[&savings.id],
            Decimal::from_str_exact("800.00").unwrap()
        );
    }

    #[test]
    fn simulate_scales_daily_and_weekly_amounts() {
        let main = space("Main", SpaceKind::Main, "10000.00");
        let mut daily = space("Daily", SpaceKind::Savings, "0.00");
        daily.auto_transfer = Some(auto(TransferFrequency::Daily, "1.00", None));
        let mut weekly = space("Weekly", SpaceKind::Savings, "0.00");
        weekly.auto_transfer = Some(auto(TransferFrequency::Weekly, "10.00", None));

        let spaces = vec![main.clone(), daily.clone(), weekly.clone()];
        let balances = simulate_months(&spaces, 1);

        assert_eq!(balances[&daily.id], Decimal::from_str_exact("30.00").unwrap());
        assert_eq!(balances[&weekly.id], Decimal::from_str_exact("40.00").unwrap());
    }

    #[test]
    fn simulate_quarterly_fires_in_months_zero_three_six() {
        let main = space("Main", SpaceKind::Main, "1000.00");
        let mut quarterly = space("Quarterly", SpaceKind::Savings, "0.00");
        quarterly.auto_transfer = Some(auto(TransferFrequency::Quarterly, "50.00", None));

        let spaces = vec![main.clone(), quarterly.clone()];
        // Months 0..7 contain firing months 0, 3 and 6.
        let balances = simulate_months(&spaces, 7);

        assert_eq!(
            balances[&quarterly.id],
            Decimal::from_str_exact("150.00").unwrap()
        );
    }

    #[test]
    fn simulate_skips_underfunded_source_silently() {
        let main = space("Main", SpaceKind::Main, "150.00");
        let mut savings = space("Savings", SpaceKind::Savings, "0.00");
        savings.auto_transfer = Some(auto(TransferFrequency::Monthly, "100.00", None));

        let spaces = vec![main.clone(), savings.clone()];
        let balances = simulate_months(&spaces, 3);

        // Only the first month is funded.
        assert_eq!(balances[&main.id], Decimal::from_str_exact("50.00").unwrap());
        assert_eq!(
            balances[&savings.id],
            Decimal::from_str_exact("100.00").unwrap()
        );
    }

    #[test]
    fn simulate_without_main_skips_implicit_sources() {
        let mut savings = space("Savings", SpaceKind::Savings, "100.00");
        savings.auto_transfer = Some(auto(TransferFrequency::Monthly, "10.00", None));

        let spaces = vec![savings.clone()];
        let balances = simulate_months(&spaces, 3);
        assert_eq!(
            balances[&savings.id],
            Decimal::from_str_exact("100.00").unwrap()
        );
    }

    #[test]
    fn simulate_explicit_source_chains() {
        let main = space("Main", SpaceKind::Main, "1000.00");
        let mut savings = space("Savings", SpaceKind::Savings, "200.00");
        let mut goal = space("Goal", SpaceKind::Goal, "0.00");
        savings.auto_transfer = Some(auto(TransferFrequency::Monthly, "100.00", None));
        goal.auto_transfer = Some(auto(
            TransferFrequency::Monthly,
            "50.00",
            Some(savings.id),
        ));

        let spaces = vec![main.clone(), savings.clone(), goal.clone()];
        let balances = simulate_months(&spaces, 2);

        assert_eq!(balances[&main.id], Decimal::from_str_exact("800.00").unwrap());
        assert_eq!(
            balances[&savings.id],
            Decimal::from_str_exact("300.00").unwrap()
        );
        assert_eq!(balances[&goal.id], Decimal::from_str_exact("100.00").unwrap());
    }
}
