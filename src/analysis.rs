// 🧭 Analysis routing
// Maps the dashboard's analysis choice to the ordered list of charts it shows.

use crate::charts::{self, Chart};
use crate::classifier::predict_necessities;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::forecast::{flagged_categories, forecast_categories, ForecastSettings};
use crate::geo::ZipLookup;
use crate::ledger::TransactionTable;
use crate::necessity::NecessityList;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_RANKED: usize = 1;
pub const MAX_RANKED: usize = 10;
pub const DEFAULT_RANKED: usize = 5;

const NO_FLAGS_MESSAGE: &str = "No categories are projected to surpass their average.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisType {
    All,
    Recommendations,
    Classifier,
    TimeSeries,
    BarChart,
    HeatMap,
    PieChart,
    BoxPlot,
    GeoLocation,
    SpendingByLocation,
    Scatter3d,
}

impl AnalysisType {
    /// Dropdown order
    pub fn all() -> [AnalysisType; 11] {
        [
            AnalysisType::All,
            AnalysisType::Recommendations,
            AnalysisType::Classifier,
            AnalysisType::TimeSeries,
            AnalysisType::BarChart,
            AnalysisType::HeatMap,
            AnalysisType::PieChart,
            AnalysisType::BoxPlot,
            AnalysisType::GeoLocation,
            AnalysisType::SpendingByLocation,
            AnalysisType::Scatter3d,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisType::All => "All",
            AnalysisType::Recommendations => "Recommendations",
            AnalysisType::Classifier => "Naive Bayes Text Classifier - Necessities",
            AnalysisType::TimeSeries => "Time Series",
            AnalysisType::BarChart => "Bar Chart",
            AnalysisType::HeatMap => "Heat Map",
            AnalysisType::PieChart => "Pie Chart",
            AnalysisType::BoxPlot => "Box Plot",
            AnalysisType::GeoLocation => "Geo-Location",
            AnalysisType::SpendingByLocation => "Spending by Location",
            AnalysisType::Scatter3d => "3-D Scatter",
        }
    }

    /// Short form for command lines and query strings.
    pub fn slug(&self) -> &'static str {
        match self {
            AnalysisType::All => "all",
            AnalysisType::Recommendations => "recommendations",
            AnalysisType::Classifier => "classifier",
            AnalysisType::TimeSeries => "time-series",
            AnalysisType::BarChart => "bar-chart",
            AnalysisType::HeatMap => "heat-map",
            AnalysisType::PieChart => "pie-chart",
            AnalysisType::BoxPlot => "box-plot",
            AnalysisType::GeoLocation => "geo-location",
            AnalysisType::SpendingByLocation => "spending-by-location",
            AnalysisType::Scatter3d => "3d-scatter",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisType {
    type Err = AnalysisError;

    /// Accepts the display name or the slug, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AnalysisType::all()
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted) || t.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalysisError::UnknownAnalysis(wanted.to_string()))
    }
}

/// Entry for the analysis picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInfo {
    pub name: String,
    pub slug: String,
}

pub fn analysis_catalog() -> Vec<AnalysisInfo> {
    AnalysisType::all()
        .iter()
        .map(|t| AnalysisInfo {
            name: t.name().to_string(),
            slug: t.slug().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub analysis: AnalysisType,
    pub ranked: usize,
    pub zipcode: Option<String>,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        AnalysisRequest {
            analysis: AnalysisType::All,
            ranked: DEFAULT_RANKED,
            zipcode: None,
        }
    }
}

impl AnalysisRequest {
    pub fn new(analysis: AnalysisType) -> Self {
        AnalysisRequest {
            analysis,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(MIN_RANKED..=MAX_RANKED).contains(&self.ranked) {
            return Err(AnalysisError::InvalidRanking(self.ranked));
        }
        Ok(())
    }
}

/// Everything an analysis needs besides the upload itself.
pub struct AnalysisContext<'a> {
    pub necessities: NecessityList,
    pub forecast: ForecastSettings,
    pub zips: &'a ZipLookup,
    /// Labelled table for the classifier; None trains on the upload.
    pub training: Option<&'a TransactionTable>,
    pub holdout: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(config: &Config, zips: &'a ZipLookup, training: Option<&'a TransactionTable>) -> Self {
        AnalysisContext {
            necessities: NecessityList::new(config.analysis.necessities.iter().cloned()),
            forecast: ForecastSettings {
                window: config.analysis.sma_window,
                alpha: config.analysis.alpha,
            },
            zips,
            training,
            holdout: config.classifier.holdout,
        }
    }
}

fn recommendations(table: &TransactionTable, ctx: &AnalysisContext) -> Chart {
    let flagged = flagged_categories(table, &ctx.forecast);
    if flagged.is_empty() {
        Chart::message(NO_FLAGS_MESSAGE)
    } else {
        charts::flagged_forecast_table(&flagged)
    }
}

/// Charts for one dashboard request, in display order.
pub fn run_analysis(
    table: &TransactionTable,
    request: &AnalysisRequest,
    ctx: &AnalysisContext,
) -> Result<Vec<Chart>, AnalysisError> {
    request.validate()?;
    let ranked = request.ranked;
    let zipcode = request.zipcode.as_deref().unwrap_or("");

    tracing::info!(
        file = %table.filename,
        rows = table.len(),
        analysis = request.analysis.name(),
        ranked,
        "running analysis"
    );

    let charts = match request.analysis {
        AnalysisType::All => vec![
            recommendations(table, ctx),
            charts::time_series(table),
            charts::category_line_plot(table, ranked),
            charts::top_rankings_bar(table, ranked),
            charts::bottom_rankings_bar(table, ranked),
            charts::monthly_heatmap(table),
            charts::day_of_week_bar(table),
            charts::necessity_pie(table, &ctx.necessities),
            charts::category_box_plot(table),
            charts::geo_location(table, ctx.zips),
        ],
        AnalysisType::Recommendations => vec![
            recommendations(table, ctx),
            charts::forecast_table(&forecast_categories(table, &ctx.forecast)),
        ],
        AnalysisType::Classifier => {
            let training = ctx.training.unwrap_or(table);
            let report = predict_necessities(training, table, &ctx.necessities, ctx.holdout)?;
            vec![charts::classifier_table(&report)]
        }
        AnalysisType::TimeSeries => vec![
            charts::time_series(table),
            charts::category_line_plot(table, ranked),
        ],
        AnalysisType::BarChart => vec![
            charts::top_rankings_bar(table, ranked),
            charts::bottom_rankings_bar(table, ranked),
            charts::day_of_week_bar(table),
        ],
        AnalysisType::HeatMap => vec![charts::monthly_heatmap(table)],
        AnalysisType::PieChart => vec![charts::necessity_pie(table, &ctx.necessities)],
        AnalysisType::BoxPlot => vec![charts::category_box_plot(table)],
        AnalysisType::GeoLocation => vec![charts::geo_location(table, ctx.zips)],
        AnalysisType::SpendingByLocation => vec![charts::spending_by_location(table, zipcode)],
        AnalysisType::Scatter3d => vec![charts::scatter_3d(table)],
    };

    tracing::debug!(charts = charts.len(), "analysis complete");
    Ok(charts)
}
