// 📊 Aggregator - grouping, monthly series and counterparty rankings
//
// Every function here is a pure transformation over borrowed records.
// Grouped outputs keep first-occurrence order of their keys.

use crate::loader::{CompanyRecord, TransactionRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Key used when a record has no value for the grouping field.
pub const MISSING_KEY: &str = "N/A";

// ============================================================================
// GROUPING
// ============================================================================

/// Count records per key. Missing keys are counted under "N/A".
pub fn group_count<T, K>(records: &[T], key: K) -> Vec<(String, usize)>
where
    K: Fn(&T) -> Option<&str>,
{
    let mut groups: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        *groups
            .entry(key(record).unwrap_or(MISSING_KEY).to_string())
            .or_default() += 1;
    }
    groups.into_iter().collect()
}

/// Sum a numeric field per key. Missing keys go under "N/A"; absent or NaN
/// values add 0.
pub fn group_sum<T, K, V>(records: &[T], key: K, value: V) -> Vec<(String, f64)>
where
    K: Fn(&T) -> Option<&str>,
    V: Fn(&T) -> Option<f64>,
{
    let mut groups: IndexMap<String, f64> = IndexMap::new();
    for record in records {
        let amount = value(record).filter(|v| !v.is_nan()).unwrap_or(0.0);
        *groups
            .entry(key(record).unwrap_or(MISSING_KEY).to_string())
            .or_default() += amount;
    }
    groups.into_iter().collect()
}

/// First record per identifier, original order preserved.
pub fn unique_by_id(companies: &[CompanyRecord]) -> Vec<&CompanyRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for company in companies {
        if seen.insert(company.id.as_str()) {
            unique.push(company);
        }
    }
    unique
}

/// Each count as a rounded integer percentage of the total.
pub fn share_percentages(counts: &[(String, usize)]) -> Vec<(String, i64)> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    counts
        .iter()
        .map(|(key, n)| {
            let pct = if total == 0 {
                0
            } else {
                round_half_up(*n as f64 / total as f64 * 100.0)
            };
            (key.clone(), pct)
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Round to nearest integer, halves towards +∞ (2.5 → 3, -2.5 → -2).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

// ============================================================================
// MONTHLY SERIES
// ============================================================================

/// Net flow per calendar month for `entity`: inflow as payee minus outflow as
/// payer. Every month present in `transactions` gets a bucket, even when the
/// entity had no activity in it. Sorted ascending by "YYYY-MM".
///
/// Transactions carrying the invalid-date sentinel have no month and are skipped.
pub fn monthly_net_flow(entity: &str, transactions: &[TransactionRecord]) -> Vec<(String, f64)> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();

    for tx in transactions {
        let Some(month) = tx.date.year_month() else {
            continue;
        };

        let inflow = if tx.payee == entity { tx.amount } else { 0.0 };
        let outflow = if tx.payer == entity { tx.amount } else { 0.0 };
        *months.entry(month).or_insert(0.0) += inflow - outflow;
    }

    months.into_iter().collect()
}

/// Signed sum of all transaction amounts per calendar month, ascending.
pub fn monthly_totals(transactions: &[TransactionRecord]) -> Vec<(String, f64)> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();

    for tx in transactions {
        if let Some(month) = tx.date.year_month() {
            *months.entry(month).or_insert(0.0) += tx.amount;
        }
    }

    months.into_iter().collect()
}

// ============================================================================
// COUNTERPARTIES
// ============================================================================

/// Parties `entity` traded with, ranked by total absolute amount.
///
/// Ties keep the order in which the counterparties were first seen. A
/// transaction where the entity pays itself is accumulated against itself.
pub fn top_counterparties(
    entity: &str,
    transactions: &[TransactionRecord],
    limit: usize,
) -> Vec<(String, f64)> {
    let mut groups: IndexMap<String, f64> = IndexMap::new();

    for tx in transactions.iter().filter(|tx| tx.touches(entity)) {
        let other = if tx.payer == entity { &tx.payee } else { &tx.payer };
        *groups.entry(other.clone()).or_default() += tx.amount.abs();
    }

    let mut ranked: Vec<(String, f64)> = groups.into_iter().collect();
    // stable sort: ties stay in first-seen order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

// ============================================================================
// GROWTH KPI
// ============================================================================

/// Change between the first and last bucket of a monthly series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "percent", rename_all = "snake_case")]
pub enum GrowthRate {
    /// Fewer than two months of data
    Unavailable,
    /// First bucket is exactly zero; reported as 0%
    ZeroBase,
    /// Percent change from first to last bucket
    Change(f64),
}

impl GrowthRate {
    pub const PLACEHOLDER: &'static str = "—";

    pub fn percent(&self) -> Option<f64> {
        match self {
            GrowthRate::Unavailable => None,
            GrowthRate::ZeroBase => Some(0.0),
            GrowthRate::Change(pct) => Some(*pct),
        }
    }
}

impl fmt::Display for GrowthRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthRate::Unavailable => f.write_str(Self::PLACEHOLDER),
            GrowthRate::ZeroBase => f.write_str("0%"),
            GrowthRate::Change(pct) => {
                let sign = if *pct >= 0.0 { "+" } else { "" };
                write!(f, "{}{}%", sign, round_half_up(*pct))
            }
        }
    }
}

/// Growth from the first to the last bucket of an ascending monthly series.
pub fn growth_rate(series: &[(String, f64)]) -> GrowthRate {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first.1, last.1),
        _ => return GrowthRate::Unavailable,
    };

    if first == 0.0 {
        return GrowthRate::ZeroBase;
    }
    GrowthRate::Change((last - first) / first * 100.0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::{parse_date, DateValue};
    use chrono::NaiveDate;

    fn tx(payer: &str, payee: &str, amount: f64, date: &str) -> TransactionRecord {
        TransactionRecord {
            payer: payer.to_string(),
            payee: payee.to_string(),
            amount,
            kind: None,
            date: DateValue::Valid(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        }
    }

    fn series(values: &[f64]) -> Vec<(String, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("2024-{:02}", i + 1), *v))
            .collect()
    }

    #[test]
    fn test_group_count_first_occurrence_order() {
        let kinds = vec![Some("PIX"), None, Some("TED"), Some("PIX"), None];
        let counts = group_count(&kinds, |k| *k);

        assert_eq!(
            counts,
            vec![
                ("PIX".to_string(), 2),
                ("N/A".to_string(), 2),
                ("TED".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_group_sum_treats_missing_values_as_zero() {
        let rows = vec![
            (Some("PIX"), Some(10.0)),
            (Some("BOLETO"), None),
            (None, Some(2.5)),
            (Some("PIX"), Some(f64::NAN)),
            (Some("PIX"), Some(5.0)),
        ];
        let sums = group_sum(&rows, |r| r.0, |r| r.1);

        assert_eq!(
            sums,
            vec![
                ("PIX".to_string(), 15.0),
                ("BOLETO".to_string(), 0.0),
                ("N/A".to_string(), 2.5)
            ]
        );
    }

    #[test]
    fn test_group_sum_over_transactions() {
        let mut a = tx("A", "B", 100.0, "2024-01-05");
        a.kind = Some("PIX".to_string());
        let b = tx("B", "C", 40.0, "2024-01-06");
        let sums = group_sum(&[a, b], |t| t.kind.as_deref(), |t| Some(t.amount));

        assert_eq!(sums, vec![("PIX".to_string(), 100.0), ("N/A".to_string(), 40.0)]);
    }

    #[test]
    fn test_monthly_net_flow_example() {
        let txs = vec![
            tx("A", "B", 100.0, "2024-01-05"),
            tx("B", "A", 40.0, "2024-01-20"),
        ];

        assert_eq!(monthly_net_flow("A", &txs), vec![("2024-01".to_string(), -60.0)]);
    }

    #[test]
    fn test_monthly_net_flow_sorted_and_includes_idle_months() {
        let txs = vec![
            tx("A", "B", 10.0, "2024-03-01"),
            tx("C", "D", 99.0, "2024-02-10"),
            tx("B", "A", 25.0, "2023-12-31"),
        ];

        assert_eq!(
            monthly_net_flow("A", &txs),
            vec![
                ("2023-12".to_string(), 25.0),
                ("2024-02".to_string(), 0.0),
                ("2024-03".to_string(), -10.0),
            ]
        );
    }

    #[test]
    fn test_monthly_net_flow_self_transfer_nets_zero() {
        let txs = vec![tx("A", "A", 500.0, "2024-01-01")];
        assert_eq!(monthly_net_flow("A", &txs), vec![("2024-01".to_string(), 0.0)]);
    }

    #[test]
    fn test_monthly_net_flow_skips_invalid_dates() {
        let mut bad = tx("A", "B", 10.0, "2024-01-01");
        bad.date = DateValue::Invalid;
        assert!(monthly_net_flow("A", &[bad]).is_empty());
    }

    #[test]
    fn test_monthly_net_flow_uses_rolled_over_month() {
        let txs = vec![TransactionRecord {
            payer: "A".to_string(),
            payee: "B".to_string(),
            amount: 100.0,
            kind: None,
            date: parse_date(Some("31/02/2024")).unwrap(),
        }];

        assert_eq!(monthly_net_flow("A", &txs), vec![("2024-03".to_string(), -100.0)]);
    }

    #[test]
    fn test_monthly_totals() {
        let txs = vec![
            tx("A", "B", 100.0, "2024-02-05"),
            tx("B", "C", 50.0, "2024-01-20"),
            tx("C", "A", -20.0, "2024-02-07"),
        ];

        assert_eq!(
            monthly_totals(&txs),
            vec![("2024-01".to_string(), 50.0), ("2024-02".to_string(), 80.0)]
        );
    }

    #[test]
    fn test_top_counterparties_ranking_and_limit() {
        let txs = vec![
            tx("A", "B", 100.0, "2024-01-01"),
            tx("C", "A", -300.0, "2024-01-02"),
            tx("A", "D", 50.0, "2024-01-03"),
            tx("B", "A", 25.0, "2024-01-04"),
            tx("X", "Y", 1000.0, "2024-01-05"),
        ];

        assert_eq!(
            top_counterparties("A", &txs, 2),
            vec![("C".to_string(), 300.0), ("B".to_string(), 125.0)]
        );
    }

    #[test]
    fn test_top_counterparties_ties_keep_first_seen_order() {
        let txs = vec![
            tx("A", "Z", 10.0, "2024-01-01"),
            tx("M", "A", 10.0, "2024-01-02"),
            tx("A", "B", 10.0, "2024-01-03"),
        ];

        let ranked: Vec<String> = top_counterparties("A", &txs, 5)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ranked, vec!["Z", "M", "B"]);
    }

    #[test]
    fn test_growth_rate() {
        assert_eq!(growth_rate(&series(&[100.0])), GrowthRate::Unavailable);
        assert_eq!(growth_rate(&[]), GrowthRate::Unavailable);
        assert_eq!(growth_rate(&series(&[100.0, 150.0])).to_string(), "+50%");
        assert_eq!(growth_rate(&series(&[0.0, 50.0])).to_string(), "0%");
        assert_eq!(growth_rate(&series(&[200.0, 999.0, 50.0])).to_string(), "-75%");
        assert_eq!(growth_rate(&series(&[100.0])).to_string(), "—");
    }

    #[test]
    fn test_growth_rate_rounding() {
        assert_eq!(GrowthRate::Change(12.5).to_string(), "+13%");
        assert_eq!(GrowthRate::Change(-12.5).to_string(), "-12%");
        assert_eq!(GrowthRate::Change(-0.3).to_string(), "0%");
        assert_eq!(GrowthRate::Change(0.0).to_string(), "+0%");
    }

    #[test]
    fn test_unique_by_id_keeps_first() {
        let companies = vec![
            CompanyRecord::new("A").with_revenue(1.0),
            CompanyRecord::new("B"),
            CompanyRecord::new("A").with_revenue(2.0),
        ];

        let unique = unique_by_id(&companies);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].revenue, Some(1.0));
        assert_eq!(unique[1].id, "B");
    }

    #[test]
    fn test_share_percentages() {
        let counts = vec![
            ("Startup".to_string(), 1),
            ("Mature".to_string(), 2),
        ];
        assert_eq!(
            share_percentages(&counts),
            vec![("Startup".to_string(), 33), ("Mature".to_string(), 67)]
        );
        assert!(share_percentages(&[]).is_empty());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[10.0, -20.0, 40.0]), 10.0);
    }
}
