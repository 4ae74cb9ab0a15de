// Reports - plain data handed to the presentation layer
//
// Nothing in here knows about terminals, HTTP or charts. The dashboard and
// the API both render these structures as-is.

use crate::aggregator::{
    group_count, group_sum, growth_rate, mean, monthly_net_flow, monthly_totals,
    share_percentages, top_counterparties, unique_by_id, GrowthRate,
};
use crate::classifier::{classify, LifecycleStage};
use crate::config::ReportLimits;
use crate::format::CurrencyFormat;
use crate::loader::{CompanyRecord, Datasets, TransactionRecord};
use serde::Serialize;

/// Placeholder for a value the report cannot provide.
pub const MISSING: &str = "—";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

impl From<(String, f64)> for LabeledValue {
    fn from((label, value): (String, f64)) -> Self {
        LabeledValue { label, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySummary {
    pub id: String,
    pub sector: Option<String>,
    pub lifecycle: Option<LifecycleStage>,
}

impl From<&CompanyRecord> for CompanySummary {
    fn from(company: &CompanyRecord) -> Self {
        CompanySummary {
            id: company.id.clone(),
            sector: company.sector.clone(),
            lifecycle: company.lifecycle,
        }
    }
}

// ============================================================================
// OVERVIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// Distinct company identifiers
    pub total_companies: usize,
    /// Distinct companies classified as Decline
    pub at_risk: usize,
    /// First-to-last month change of total transaction volume
    pub growth: GrowthRate,
    /// `growth` as displayed, e.g. "+50%" or "—"
    pub growth_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageShare {
    pub stage: String,
    pub count: usize,
    /// Rounded share of all companies, in percent
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub kpis: Kpis,
    pub stage_distribution: Vec<StageShare>,
    pub volume_by_type: Vec<LabeledValue>,
    pub featured: Vec<CompanySummary>,
}

impl DashboardReport {
    pub fn build(
        companies: &[CompanyRecord],
        transactions: &[TransactionRecord],
        limits: &ReportLimits,
    ) -> Self {
        let classified = classify(companies);
        let unique = unique_by_id(&classified);

        let growth = growth_rate(&monthly_totals(transactions));
        let kpis = Kpis {
            total_companies: unique.len(),
            at_risk: unique
                .iter()
                .filter(|c| c.lifecycle.map_or(false, |s| s.is_at_risk()))
                .count(),
            growth,
            growth_label: growth.to_string(),
        };

        let counts = group_count(&classified, |c| c.lifecycle.map(|s| s.label()));
        let shares = share_percentages(&counts);
        let stage_distribution = counts
            .into_iter()
            .zip(shares)
            .map(|((stage, count), (_, percent))| StageShare {
                stage,
                count,
                percent,
            })
            .collect();

        let volume_by_type = group_sum(transactions, |t| t.kind.as_deref(), |t| Some(t.amount))
            .into_iter()
            .map(LabeledValue::from)
            .collect();

        let featured = unique
            .iter()
            .take(limits.featured_companies)
            .map(|c| CompanySummary::from(*c))
            .collect();

        DashboardReport {
            kpis,
            stage_distribution,
            volume_by_type,
            featured,
        }
    }

    pub fn from_datasets(data: &Datasets, limits: &ReportLimits) -> Self {
        Self::build(&data.companies, &data.transactions, limits)
    }
}

// ============================================================================
// COMPANY DETAIL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterparty {
    pub id: String,
    /// Sum of absolute amounts exchanged with the company
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetailReport {
    pub id: String,
    /// False when the identifier is not in the companies dataset
    pub found: bool,
    pub sector: Option<String>,
    pub balance: Option<f64>,
    pub lifecycle: Option<LifecycleStage>,
    /// Mean of the monthly net flow; None when it is zero or there is no data
    pub average_net_flow: Option<f64>,
    pub net_flow: Vec<LabeledValue>,
    pub counterparties: Vec<Counterparty>,
    pub similar: Vec<CompanySummary>,
}

/// Formatted card values for a detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailCards {
    pub balance: String,
    pub average_net_flow: String,
    pub lifecycle: String,
    pub sector: String,
}

impl CompanyDetailReport {
    pub fn build(
        id: &str,
        companies: &[CompanyRecord],
        transactions: &[TransactionRecord],
        limits: &ReportLimits,
    ) -> Self {
        let classified = classify(companies);
        let company = classified.iter().find(|c| c.id == id);

        let series = monthly_net_flow(id, transactions);
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let average = mean(&values);

        let counterparties = top_counterparties(id, transactions, limits.top_counterparties)
            .into_iter()
            .map(|(id, total)| Counterparty { id, total })
            .collect();

        let similar = match company {
            Some(company) => similar_companies(company, &classified, limits.similar_companies),
            None => Vec::new(),
        };

        CompanyDetailReport {
            id: id.to_string(),
            found: company.is_some(),
            sector: company.and_then(|c| c.sector.clone()),
            balance: company.and_then(|c| c.balance),
            lifecycle: company.and_then(|c| c.lifecycle),
            average_net_flow: if average != 0.0 { Some(average) } else { None },
            net_flow: series.into_iter().map(LabeledValue::from).collect(),
            counterparties,
            similar,
        }
    }

    pub fn from_datasets(id: &str, data: &Datasets, limits: &ReportLimits) -> Self {
        Self::build(id, &data.companies, &data.transactions, limits)
    }

    pub fn cards(&self, currency: &CurrencyFormat) -> DetailCards {
        DetailCards {
            balance: self
                .balance
                .map(|b| currency.format(Some(b)))
                .unwrap_or_else(|| MISSING.to_string()),
            average_net_flow: self
                .average_net_flow
                .map(|v| currency.format(Some(v)))
                .unwrap_or_else(|| MISSING.to_string()),
            lifecycle: self
                .lifecycle
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            sector: self.sector.clone().unwrap_or_else(|| MISSING.to_string()),
        }
    }
}

/// Other companies in the same sector (both absent counts as the same),
/// closest revenue first. Missing revenue counts as 0.
pub fn similar_companies(
    company: &CompanyRecord,
    companies: &[CompanyRecord],
    limit: usize,
) -> Vec<CompanySummary> {
    let target = company.revenue.unwrap_or(0.0);
    let distance = |c: &CompanyRecord| (c.revenue.unwrap_or(0.0) - target).abs();

    let mut peers: Vec<&CompanyRecord> = companies
        .iter()
        .filter(|c| c.id != company.id && c.sector == company.sector)
        .collect();
    peers.sort_by(|a, b| distance(*a).total_cmp(&distance(*b)));

    peers
        .into_iter()
        .take(limit)
        .map(CompanySummary::from)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::DateValue;
    use chrono::NaiveDate;

    fn tx(payer: &str, payee: &str, amount: f64, kind: Option<&str>, date: &str) -> TransactionRecord {
        TransactionRecord {
            payer: payer.to_string(),
            payee: payee.to_string(),
            amount,
            kind: kind.map(str::to_string),
            date: DateValue::Valid(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        }
    }

    fn fixture() -> (Vec<CompanyRecord>, Vec<TransactionRecord>) {
        let companies = vec![
            CompanyRecord::new("A").with_revenue(10.0).with_balance(5.0).with_sector("Retail"),
            CompanyRecord::new("B").with_revenue(20.0).with_balance(-1.0).with_sector("Retail"),
            CompanyRecord::new("C").with_revenue(30.0).with_balance(0.0).with_sector("Retail"),
            CompanyRecord::new("D").with_revenue(40.0).with_balance(0.0).with_sector("Energy"),
            CompanyRecord::new("E").with_revenue(50.0).with_balance(0.0).with_sector("Retail"),
            CompanyRecord::new("F").with_revenue(60.0).with_balance(0.0),
            CompanyRecord::new("A").with_revenue(999.0),
        ];
        let transactions = vec![
            tx("A", "B", 100.0, Some("PIX"), "2024-01-05"),
            tx("B", "A", 40.0, Some("TED"), "2024-01-20"),
            tx("C", "A", 10.0, Some("PIX"), "2024-02-02"),
            tx("D", "E", 50.0, None, "2024-02-10"),
        ];
        (companies, transactions)
    }

    #[test]
    fn test_dashboard_kpis() {
        let (companies, transactions) = fixture();
        let report = DashboardReport::build(&companies, &transactions, &ReportLimits::default());

        assert_eq!(report.kpis.total_companies, 6);
        assert_eq!(report.kpis.at_risk, 1);
        // January 140, February 60
        assert_eq!(report.kpis.growth_label, "-57%");
    }

    #[test]
    fn test_dashboard_stage_distribution_counts_every_row() {
        let (companies, transactions) = fixture();
        let report = DashboardReport::build(&companies, &transactions, &ReportLimits::default());

        let total: usize = report.stage_distribution.iter().map(|s| s.count).sum();
        assert_eq!(total, companies.len());
        assert_eq!(report.stage_distribution[0].stage, "Startup");
        assert!(report
            .stage_distribution
            .iter()
            .any(|s| s.stage == "Decline" && s.count == 1));
    }

    #[test]
    fn test_dashboard_volume_by_type() {
        let (companies, transactions) = fixture();
        let report = DashboardReport::build(&companies, &transactions, &ReportLimits::default());

        let volume: Vec<(&str, f64)> = report
            .volume_by_type
            .iter()
            .map(|v| (v.label.as_str(), v.value))
            .collect();
        assert_eq!(volume, vec![("PIX", 110.0), ("TED", 40.0), ("N/A", 50.0)]);
    }

    #[test]
    fn test_dashboard_featured_respects_limit() {
        let (companies, transactions) = fixture();
        let limits = ReportLimits {
            featured_companies: 3,
            ..ReportLimits::default()
        };
        let report = DashboardReport::build(&companies, &transactions, &limits);

        let ids: Vec<&str> = report.featured.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(report.featured.iter().all(|c| c.lifecycle.is_some()));
    }

    #[test]
    fn test_detail_report_for_known_company() {
        let (companies, transactions) = fixture();
        let report = CompanyDetailReport::build("A", &companies, &transactions, &ReportLimits::default());

        assert!(report.found);
        assert_eq!(report.sector.as_deref(), Some("Retail"));
        assert_eq!(report.balance, Some(5.0));
        assert_eq!(report.lifecycle, Some(LifecycleStage::Startup));

        let flow: Vec<(&str, f64)> = report.net_flow.iter().map(|p| (p.label.as_str(), p.value)).collect();
        assert_eq!(flow, vec![("2024-01", -60.0), ("2024-02", 10.0)]);
        assert_eq!(report.average_net_flow, Some(-25.0));

        let parties: Vec<(&str, f64)> = report
            .counterparties
            .iter()
            .map(|c| (c.id.as_str(), c.total))
            .collect();
        assert_eq!(parties, vec![("B", 140.0), ("C", 10.0)]);
    }

    #[test]
    fn test_similar_companies_same_sector_closest_revenue() {
        let (companies, transactions) = fixture();
        let report = CompanyDetailReport::build("C", &companies, &transactions, &ReportLimits::default());

        let ids: Vec<&str> = report.similar.iter().map(|c| c.id.as_str()).collect();
        // Retail peers of C (30): B (20), A (10), E (50) in distance order, ties stable
        assert_eq!(ids, vec!["B", "A", "E"]);
    }

    #[test]
    fn test_detail_report_for_unknown_company() {
        let (companies, transactions) = fixture();
        let report = CompanyDetailReport::build("ZZZ", &companies, &transactions, &ReportLimits::default());

        assert!(!report.found);
        assert!(report.similar.is_empty());
        assert!(report.counterparties.is_empty());
        assert_eq!(report.average_net_flow, None, "all-zero months average to zero");

        let cards = report.cards(&CurrencyFormat::default());
        assert_eq!(cards.balance, MISSING);
        assert_eq!(cards.lifecycle, MISSING);
        assert_eq!(cards.sector, MISSING);
    }

    #[test]
    fn test_detail_cards_formatting() {
        let (companies, transactions) = fixture();
        let report = CompanyDetailReport::build("B", &companies, &transactions, &ReportLimits::default());
        let cards = report.cards(&CurrencyFormat::default());

        assert_eq!(cards.balance, "-R$\u{a0}1,00");
        assert_eq!(cards.lifecycle, "Decline");
        assert_eq!(cards.sector, "Retail");
    }
}
