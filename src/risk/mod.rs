//! Risk aggregation engine.
//!
//! Turns raw factor, country and partner records into the numbers the
//! risk view shows: per-category averages, the weighted overall score,
//! trend directions and distribution summaries. Every level in here is
//! derived through `RiskLevel::from_score`.

pub mod provider;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{
    CountryRisk, PartnerRisk, RiskCategory, RiskDashboard, RiskFactor, RiskInsight, RiskLevel,
    TrendDirection, TrendPoint,
};

pub use provider::{RiskInsightProvider, SnapshotInsightProvider};
#[cfg(test)]
pub use provider::MockRiskInsightProvider;

/// Weight of the insight component in the overall score.
pub const INSIGHT_WEIGHT: f64 = 0.4;
/// Weight of the factor component in the overall score.
pub const FACTOR_WEIGHT: f64 = 0.6;
/// Percent change beyond which a series counts as moving.
pub const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Arithmetic mean, 0.0 for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Average `value` of the factors in `category` (0.0 if none).
pub fn category_average(factors: &[RiskFactor], category: RiskCategory) -> f64 {
    mean(
        factors
            .iter()
            .filter(|f| f.category == category)
            .map(|f| f.value),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: RiskCategory,
    pub average: f64,
    pub level: RiskLevel,
    pub factor_count: usize,
}

/// One summary per category, in `RiskCategory::ALL` order. Empty
/// categories are included with a zero average.
pub fn category_rollup(factors: &[RiskFactor]) -> Vec<CategorySummary> {
    RiskCategory::ALL
        .iter()
        .map(|&category| {
            let average = category_average(factors, category);
            CategorySummary {
                category,
                average,
                level: RiskLevel::from_score(average),
                factor_count: factors.iter().filter(|f| f.category == category).count(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Overall score
// ---------------------------------------------------------------------------

/// `0.4 × mean(insight level score) + 0.6 × mean(factor value)`.
pub fn overall_score(insights: &[RiskInsight], factors: &[RiskFactor]) -> f64 {
    let insight_avg = mean(insights.iter().map(|i| i.risk_level.insight_score()));
    let factor_avg = mean(factors.iter().map(|f| f.value));
    INSIGHT_WEIGHT * insight_avg + FACTOR_WEIGHT * factor_avg
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Percent change from the earliest to the latest point.
///
/// `None` with fewer than two points or when the earliest value is zero.
pub fn percent_change(points: &[TrendPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);

    let first = sorted.first()?.value;
    let last = sorted.last()?.value;
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Classify a dated series as increasing (> +5%), decreasing (< -5%) or stable.
///
/// A series starting at zero is increasing if it ended above zero and
/// stable otherwise. Fewer than two points is stable.
pub fn trend_direction(points: &[TrendPoint]) -> TrendDirection {
    if points.len() < 2 {
        return TrendDirection::Stable;
    }

    match percent_change(points) {
        Some(pct) if pct > TREND_THRESHOLD_PCT => TrendDirection::Increasing,
        Some(pct) if pct < -TREND_THRESHOLD_PCT => TrendDirection::Decreasing,
        Some(_) => TrendDirection::Stable,
        None => {
            // Earliest value is zero.
            let last = points
                .iter()
                .max_by_key(|p| p.date)
                .map(|p| p.value)
                .unwrap_or(0.0);
            if last > 0.0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Stable
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// How many items fall in each risk level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDistribution {
    pub counts: BTreeMap<RiskLevel, usize>,
    pub total: usize,
}

impl LevelDistribution {
    pub fn from_levels(levels: impl IntoIterator<Item = RiskLevel>) -> Self {
        let mut counts: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|&l| (l, 0)).collect();
        let mut total = 0;
        for level in levels {
            *counts.entry(level).or_insert(0) += 1;
            total += 1;
        }
        Self { counts, total }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Share of items at `level` as a percentage; 0 when empty.
    pub fn percentage(&self, level: RiskLevel) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(level) as f64 / self.total as f64 * 100.0
        }
    }

    /// HIGH + CRITICAL.
    pub fn elevated(&self) -> usize {
        self.counts
            .iter()
            .filter(|(level, _)| level.is_elevated())
            .map(|(_, n)| n)
            .sum()
    }
}

/// Partners grouped by level. Every level is present, possibly empty.
pub fn partners_by_risk_level(partners: &[PartnerRisk]) -> BTreeMap<RiskLevel, Vec<&PartnerRisk>> {
    let mut grouped: BTreeMap<RiskLevel, Vec<&PartnerRisk>> =
        RiskLevel::ALL.iter().map(|&l| (l, Vec::new())).collect();
    for partner in partners {
        grouped.entry(partner.risk_level).or_default().push(partner);
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSummary {
    pub partner_count: usize,
    pub total_trade_volume: Decimal,
    pub avg_transaction_size: Decimal,
    pub avg_credit_score: f64,
    pub avg_on_time_rate: f64,
    /// Partners at HIGH or CRITICAL.
    pub high_risk_count: usize,
    pub distribution: LevelDistribution,
}

impl PartnerSummary {
    pub fn from_partners(partners: &[PartnerRisk]) -> Self {
        let total_trade_volume: Decimal = partners.iter().map(|p| p.total_trade_volume).sum();
        let avg_transaction_size = if partners.is_empty() {
            Decimal::ZERO
        } else {
            let sum: Decimal = partners.iter().map(|p| p.avg_transaction_size).sum();
            (sum / Decimal::from(partners.len() as u64)).round_dp(2)
        };
        let grouped = partners_by_risk_level(partners);
        let high_risk_count = grouped[&RiskLevel::High].len() + grouped[&RiskLevel::Critical].len();

        Self {
            partner_count: partners.len(),
            total_trade_volume,
            avg_transaction_size,
            avg_credit_score: mean(partners.iter().map(|p| p.credit_score)),
            avg_on_time_rate: mean(partners.iter().map(|p| p.payment_history.on_time_rate())),
            high_risk_count,
            distribution: LevelDistribution::from_levels(partners.iter().map(|p| p.risk_level)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySummary {
    pub country_count: usize,
    pub avg_overall_score: f64,
    pub restricted_count: usize,
    pub total_trading_partners: u64,
    pub high_risk_count: usize,
    pub distribution: LevelDistribution,
}

impl CountrySummary {
    pub fn from_countries(countries: &[CountryRisk]) -> Self {
        let distribution = LevelDistribution::from_levels(countries.iter().map(|c| c.risk_level));
        Self {
            country_count: countries.len(),
            avg_overall_score: mean(countries.iter().map(|c| c.overall_risk_score)),
            restricted_count: countries.iter().filter(|c| c.has_restrictions()).count(),
            total_trading_partners: countries
                .iter()
                .map(|c| c.trading_partner_count as u64)
                .sum(),
            high_risk_count: distribution.elevated(),
            distribution,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Headline numbers for the risk view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub last_updated: DateTime<Utc>,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub badge_class: &'static str,
    pub insight_count: usize,
    pub critical_insight_count: usize,
    pub categories: Vec<CategorySummary>,
    pub partners: PartnerSummary,
    pub countries: CountrySummary,
    /// Prediction ids ordered by expected severity, highest first.
    pub top_predictions: Vec<String>,
}

impl RiskDashboard {
    /// Re-derive every level, trend direction and the overall score from
    /// the raw numbers, whatever the provider sent.
    pub fn normalize(&mut self) {
        for factor in &mut self.risk_factors {
            factor.level = RiskLevel::from_score(factor.value);
        }
        for country in &mut self.country_risks {
            country.risk_level = RiskLevel::from_score(country.overall_risk_score);
        }
        for partner in &mut self.partner_risks {
            partner.risk_level = RiskLevel::from_score(partner.risk_score());
        }
        for trend in &mut self.trends {
            trend.history.sort_by_key(|p| p.date);
            trend.direction = trend_direction(&trend.history);
        }

        self.overall_risk_score = overall_score(&self.insights, &self.risk_factors);
        self.risk_level = RiskLevel::from_score(self.overall_risk_score);

        debug!(
            overall = format!("{:.1}", self.overall_risk_score),
            level = %self.risk_level,
            factors = self.risk_factors.len(),
            "Dashboard normalised"
        );
    }

    pub fn summary(&self) -> DashboardSummary {
        let mut predictions: Vec<_> = self.predictions.iter().collect();
        predictions.sort_by(|a, b| {
            b.expected_severity()
                .partial_cmp(&a.expected_severity())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        DashboardSummary {
            last_updated: self.last_updated,
            overall_risk_score: self.overall_risk_score,
            risk_level: self.risk_level,
            badge_class: self.risk_level.badge_class(),
            insight_count: self.insights.len(),
            critical_insight_count: self
                .insights
                .iter()
                .filter(|i| i.risk_level == RiskLevel::Critical)
                .count(),
            categories: category_rollup(&self.risk_factors),
            partners: PartnerSummary::from_partners(&self.partner_risks),
            countries: CountrySummary::from_countries(&self.country_risks),
            top_predictions: predictions.iter().take(3).map(|p| p.id.clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
