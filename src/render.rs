// Render context - owned chart slots for the presentation adapters
//
// Each chart lives in a slot. Re-rendering a slot always disposes the chart
// it currently holds before mounting the new one. The context is passed
// explicitly to whatever draws; there is no global chart state.

use crate::format::CurrencyFormat;
use crate::report::{CompanyDetailReport, DashboardReport, LabeledValue};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Donut,
    Bar,
    Line,
}

/// A chart ready to draw: a kind, a title and one labelled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub series: Vec<LabeledValue>,
}

impl Chart {
    pub fn new(kind: ChartKind, title: impl Into<String>, series: Vec<LabeledValue>) -> Self {
        Chart {
            kind,
            title: title.into(),
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.series.iter().map(|p| p.value).fold(0.0, f64::max)
    }

    pub fn min_value(&self) -> f64 {
        self.series.iter().map(|p| p.value).fold(0.0, f64::min)
    }
}

/// Owned handle for one chart position on screen.
#[derive(Debug)]
pub struct ChartSlot {
    name: &'static str,
    current: Option<Chart>,
    generation: u64,
}

impl ChartSlot {
    pub fn new(name: &'static str) -> Self {
        ChartSlot {
            name,
            current: None,
            generation: 0,
        }
    }

    /// Dispose the mounted chart (if any), then mount `chart`.
    pub fn mount(&mut self, chart: Chart) -> &Chart {
        self.dispose();
        self.generation += 1;
        log::debug!(
            "Mounted {} chart '{}' in slot {} (generation {})",
            match chart.kind {
                ChartKind::Donut => "donut",
                ChartKind::Bar => "bar",
                ChartKind::Line => "line",
            },
            chart.title,
            self.name,
            self.generation
        );
        self.current.insert(chart)
    }

    /// Drop the mounted chart and hand it back.
    pub fn dispose(&mut self) -> Option<Chart> {
        let old = self.current.take();
        if old.is_some() {
            log::debug!("Disposed chart in slot {}", self.name);
        }
        old
    }

    pub fn current(&self) -> Option<&Chart> {
        self.current.as_ref()
    }

    /// Number of mounts so far; changes every time the slot is re-rendered.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Everything a presentation adapter needs besides the reports themselves.
#[derive(Debug)]
pub struct RenderContext {
    pub stages: ChartSlot,
    pub volume: ChartSlot,
    pub net_flow: ChartSlot,
    pub currency: CurrencyFormat,
}

impl RenderContext {
    pub fn new(currency: CurrencyFormat) -> Self {
        RenderContext {
            stages: ChartSlot::new("stages"),
            volume: ChartSlot::new("volume"),
            net_flow: ChartSlot::new("net_flow"),
            currency,
        }
    }

    /// Re-mount the overview charts from a dashboard report.
    pub fn render_dashboard(&mut self, report: &DashboardReport) {
        let stages = report
            .stage_distribution
            .iter()
            .map(|s| LabeledValue {
                label: s.stage.clone(),
                value: s.count as f64,
            })
            .collect();
        self.stages
            .mount(Chart::new(ChartKind::Donut, "Lifecycle stages", stages));

        self.volume.mount(Chart::new(
            ChartKind::Bar,
            "Total amount by transaction type",
            report.volume_by_type.clone(),
        ));
    }

    /// Re-mount the detail chart from a company report.
    pub fn render_detail(&mut self, report: &CompanyDetailReport) {
        self.net_flow.mount(Chart::new(
            ChartKind::Line,
            format!("Monthly net flow - {}", report.id),
            report.net_flow.clone(),
        ));
    }
}

/// Legend entries for the stage donut, e.g. "Startup (33%)".
pub fn stage_legend(report: &DashboardReport) -> Vec<String> {
    report
        .stage_distribution
        .iter()
        .map(|s| format!("{} ({}%)", s.stage, s.percent))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportLimits;
    use crate::loader::CompanyRecord;

    fn point(label: &str, value: f64) -> LabeledValue {
        LabeledValue {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn test_mount_disposes_previous_chart() {
        let mut slot = ChartSlot::new("test");
        assert!(slot.current().is_none());

        slot.mount(Chart::new(ChartKind::Bar, "first", vec![point("a", 1.0)]));
        slot.mount(Chart::new(ChartKind::Bar, "second", vec![point("b", 2.0)]));

        assert_eq!(slot.generation(), 2);
        assert_eq!(slot.current().unwrap().title, "second");

        let disposed = slot.dispose().unwrap();
        assert_eq!(disposed.title, "second");
        assert!(slot.current().is_none());
        assert!(slot.dispose().is_none());
    }

    #[test]
    fn test_render_dashboard_fills_overview_slots() {
        let companies = vec![
            CompanyRecord::new("A").with_revenue(1.0),
            CompanyRecord::new("B").with_revenue(2.0).with_balance(-3.0),
        ];
        let report = DashboardReport::build(&companies, &[], &ReportLimits::default());

        let mut ctx = RenderContext::new(CurrencyFormat::default());
        ctx.render_dashboard(&report);
        ctx.render_dashboard(&report);

        let stages = ctx.stages.current().unwrap();
        assert_eq!(stages.kind, ChartKind::Donut);
        assert_eq!(stages.series.len(), 2);
        assert_eq!(ctx.stages.generation(), 2);
        assert!(ctx.volume.current().unwrap().is_empty());
        assert!(ctx.net_flow.current().is_none());
        assert_eq!(stage_legend(&report), vec!["Startup (50%)", "Decline (50%)"]);
    }

    #[test]
    fn test_chart_bounds() {
        let chart = Chart::new(
            ChartKind::Line,
            "flow",
            vec![point("2024-01", -60.0), point("2024-02", 10.0)],
        );
        assert_eq!(chart.max_value(), 10.0);
        assert_eq!(chart.min_value(), -60.0);
    }
}
