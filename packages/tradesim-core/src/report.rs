//! Reporting sinks for user-facing messages and profit plots.
//!
//! Nothing in the pipeline prints or draws directly. Stages hand messages and
//! plot data to a [`ReportSink`], which the caller chooses.

use serde::{Deserialize, Serialize};

/// One point of the cumulative profit/loss series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProfitPoint {
    pub day: usize,
    pub cumulative: f64,
}

/// Everything needed to draw the cumulative profit/loss chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitPlot {
    /// Strategy label shown in the title
    pub label: String,
    /// Total profit/loss rounded to cents
    pub total_profit_loss: f64,
    /// Horizontal reference line
    pub reference_line: f64,
    /// Dense day-by-day series
    pub points: Vec<ProfitPoint>,
}

impl ProfitPlot {
    /// Chart title in the form `Cash Profit/Loss using <label>`.
    pub fn title(&self) -> String {
        format!(
            "Cash Profit/Loss using {} (total {:.2})",
            self.label, self.total_profit_loss
        )
    }
}

/// One labelled line of an indicator chart. NaN marks days without a value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// The indicator a strategy traded on, for one stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorPlot {
    pub title: String,
    pub stock: usize,
    pub series: Vec<NamedSeries>,
    /// Horizontal threshold lines, if the strategy uses any
    pub thresholds: Vec<f64>,
}

/// Destination for messages and plots produced by the pipeline.
pub trait ReportSink {
    /// A human-readable notice (matched data, ignored arguments, use errors).
    fn message(&mut self, text: &str);

    /// A cumulative profit/loss chart.
    fn profit_plot(&mut self, plot: &ProfitPlot);

    /// Indicator series a strategy decided on.
    fn indicator_plot(&mut self, plot: &IndicatorPlot);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn message(&mut self, text: &str) {
        tracing::info!("{}", text);
    }

    fn profit_plot(&mut self, plot: &ProfitPlot) {
        let last_day = plot.points.last().map(|p| p.day).unwrap_or(0);
        tracing::info!(
            label = %plot.label,
            total = plot.total_profit_loss,
            days = last_day + 1,
            "{}",
            plot.title()
        );
    }

    fn indicator_plot(&mut self, plot: &IndicatorPlot) {
        let days = plot.series.first().map_or(0, |s| s.values.len());
        tracing::info!(
            stock = plot.stock,
            series = plot.series.len(),
            days,
            thresholds = ?plot.thresholds,
            "{}",
            plot.title
        );
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn message(&mut self, _text: &str) {}

    fn profit_plot(&mut self, _plot: &ProfitPlot) {}

    fn indicator_plot(&mut self, _plot: &IndicatorPlot) {}
}

/// Keeps everything in memory, for tests and for callers that render later.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub messages: Vec<String>,
    pub plots: Vec<ProfitPlot>,
    pub indicator_plots: Vec<IndicatorPlot>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any recorded message contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }
}

impl ReportSink for RecordingSink {
    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn profit_plot(&mut self, plot: &ProfitPlot) {
        self.plots.push(plot.clone());
    }

    fn indicator_plot(&mut self, plot: &IndicatorPlot) {
        self.indicator_plots.push(plot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.message("Found data with initial prices [200]");
        sink.profit_plot(&ProfitPlot {
            label: "Random Strategy".to_string(),
            total_profit_loss: 12.5,
            reference_line: 0.0,
            points: vec![ProfitPoint {
                day: 0,
                cumulative: 12.5,
            }],
        });

        assert!(sink.saw("initial prices"));
        assert!(!sink.saw("volatility"));
        assert_eq!(sink.plots.len(), 1);
        assert!(sink.plots[0].title().contains("Random Strategy"));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.message("ignored");
        sink.indicator_plot(&IndicatorPlot {
            title: "RSI".to_string(),
            stock: 0,
            series: Vec::new(),
            thresholds: vec![0.8, 0.2],
        });
    }
}
