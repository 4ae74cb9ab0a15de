// 🏷️ Lifecycle Classifier - revenue quantiles + balance sign → stage label

use crate::loader::CompanyRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LIFECYCLE STAGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    Decline,
    Startup,
    Expansion,
    Mature,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 4] = [
        LifecycleStage::Decline,
        LifecycleStage::Startup,
        LifecycleStage::Expansion,
        LifecycleStage::Mature,
    ];

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleStage::Decline => "Decline",
            LifecycleStage::Startup => "Startup",
            LifecycleStage::Expansion => "Expansion",
            LifecycleStage::Mature => "Mature",
        }
    }

    pub fn is_at_risk(&self) -> bool {
        *self == LifecycleStage::Decline
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// QUANTILES
// ============================================================================

/// Interpolated quantile: position `(n-1)*q` over the sorted values, linear
/// interpolation between the two bracketing order statistics.
///
/// NaN values are ignored. Returns None for an empty input; a single value
/// is its own quantile for every `q`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    let lower = sorted[base];
    let upper = sorted.get(base + 1).copied().unwrap_or(lower);
    Some(lower + (upper - lower) * rest)
}

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Revenue cut points at the 1/3 and 2/3 quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueThresholds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl RevenueThresholds {
    pub fn from_revenues(revenues: &[f64]) -> Self {
        RevenueThresholds {
            lower: quantile(revenues, 1.0 / 3.0),
            upper: quantile(revenues, 2.0 / 3.0),
        }
    }

    pub fn from_companies(companies: &[CompanyRecord]) -> Self {
        let revenues: Vec<f64> = companies.iter().filter_map(|c| c.revenue).collect();
        Self::from_revenues(&revenues)
    }

    /// Stage for one company, first matching rule wins:
    /// negative balance → Decline, no revenue → Startup,
    /// revenue ≤ lower → Startup, revenue ≤ upper → Expansion, else Mature.
    ///
    /// A missing threshold never matches, so such companies end up Mature.
    pub fn stage_for(&self, company: &CompanyRecord) -> LifecycleStage {
        if company.balance.map_or(false, |b| b < 0.0) {
            return LifecycleStage::Decline;
        }

        let revenue = match company.revenue {
            Some(r) => r,
            None => return LifecycleStage::Startup,
        };

        if self.lower.map_or(false, |q| revenue <= q) {
            LifecycleStage::Startup
        } else if self.upper.map_or(false, |q| revenue <= q) {
            LifecycleStage::Expansion
        } else {
            LifecycleStage::Mature
        }
    }
}

/// Label every company. Returns new records; the input is left untouched.
pub fn classify(companies: &[CompanyRecord]) -> Vec<CompanyRecord> {
    let thresholds = RevenueThresholds::from_companies(companies);
    log::debug!(
        "Revenue thresholds: lower={:?} upper={:?}",
        thresholds.lower,
        thresholds.upper
    );

    companies
        .iter()
        .map(|company| {
            let mut labelled = company.clone();
            labelled.lifecycle = Some(thresholds.stage_for(company));
            labelled
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
