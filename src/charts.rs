// 📊 Chart descriptions
// Every builder takes a cleaned table and returns a serializable Chart.
// The web page and the TUI decide how to draw it.

use crate::aggregate::{
    bottom_categories, category_date_zip_sums, day_of_week_counts, group_amounts, monthly_pivot,
    necessity_breakdown, top_categories, top_category_series, CategoryTotal, ScatterPoint,
};
use crate::classifier::ClassifierReport;
use crate::forecast::CategoryForecast;
use crate::geo::{geo_points, GeoPoint, ZipLookup};
use crate::ledger::TransactionTable;
use crate::necessity::NecessityList;
use crate::stats::{box_stats, BoxStats};
use serde::{Deserialize, Serialize};

// ============================================================================
// PALETTES
// ============================================================================

pub const PRIMARY_COLOR: &str = "#004c6d";
pub const TABLE_HEADER_COLOR: &str = "#004c6d";
pub const TABLE_CELL_COLOR: &str = "#a7b8c6";
pub const MARKER_LINE_COLOR: &str = "#B31942";

pub const CATEGORICAL_PALETTE: [&str; 10] = [
    "#004c6d", "#9f1853", "#198038", "#b28600", "#8a3800", "#1192e8", "#ff7c43", "#005d5d",
    "#009d9a", "#012749",
];

pub const BLUE_RAMP: [&str; 10] = [
    "#004c6d", "#155b79", "#2b6a85", "#407992", "#55889e", "#6a97aa", "#80a6b6", "#95b4c2",
    "#aac3ce", "#bfd2db",
];

pub const DAY_RAMP: [&str; 7] = [
    "#004c6d", "#29617d", "#46778d", "#618d9e", "#7da3af", "#9abac1", "#b8d1d5",
];

fn cycle(palette: &[&str], i: usize) -> String {
    palette[i % palette.len()].to_string()
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    #[serde(flatten)]
    pub body: ChartBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartBody {
    Line {
        x_label: String,
        y_label: String,
        series: Vec<Series>,
    },
    Bar {
        x_label: String,
        y_label: String,
        bars: Vec<Bar>,
    },
    Pie {
        slices: Vec<Bar>,
    },
    Box {
        boxes: Vec<BoxStats>,
        colors: Vec<String>,
    },
    Heatmap {
        x: Vec<String>,
        y: Vec<String>,
        z: Vec<Vec<Option<f64>>>,
        color_scale: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        header_color: String,
        cell_color: String,
        notes: Vec<String>,
    },
    GeoScatter {
        points: Vec<GeoPoint>,
        scope: String,
        lon_range: [f64; 2],
        lat_range: [f64; 2],
        marker_line_color: String,
        missing: usize,
    },
    Scatter3d {
        points: Vec<ScatterPoint>,
        colors: Vec<String>,
    },
    Message {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A labelled value; bars and pie slices share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: String,
}

impl Chart {
    pub fn new(title: impl Into<String>, body: ChartBody) -> Self {
        Chart {
            title: title.into(),
            body,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Chart::new("", ChartBody::Message { text: text.into() })
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            ChartBody::Line { .. } => "line",
            ChartBody::Bar { .. } => "bar",
            ChartBody::Pie { .. } => "pie",
            ChartBody::Box { .. } => "box",
            ChartBody::Heatmap { .. } => "heatmap",
            ChartBody::Table { .. } => "table",
            ChartBody::GeoScatter { .. } => "geo_scatter",
            ChartBody::Scatter3d { .. } => "scatter3d",
            ChartBody::Message { .. } => "message",
        }
    }

    /// Plain-text rendering for the CLI.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.title.is_empty() {
            lines.push(format!("== {} ==", self.title));
        }
        match &self.body {
            ChartBody::Line { series, .. } => {
                for s in series {
                    let total: f64 = s.points.iter().map(|p| p.y).sum();
                    lines.push(format!("  {:<30} {:>5} points  total {:>12.2}", s.name, s.points.len(), total));
                }
            }
            ChartBody::Bar { bars, .. } | ChartBody::Pie { slices: bars } => {
                for b in bars {
                    lines.push(format!("  {:<30} {:>12.2}", b.label, b.value));
                }
            }
            ChartBody::Box { boxes, .. } => {
                for b in boxes {
                    lines.push(format!(
                        "  {:<30} n={:<4} q1 {:>10.2}  median {:>10.2}  q3 {:>10.2}  outliers {} (suspected {})",
                        b.label,
                        b.count,
                        b.q1,
                        b.median,
                        b.q3,
                        b.outliers.len(),
                        b.suspected_outliers.len()
                    ));
                }
            }
            ChartBody::Heatmap { x, y, z, .. } => {
                lines.push(format!("  {:<24} {}", "", x.join("  ")));
                for (row, cells) in y.iter().zip(z) {
                    let cells: Vec<String> = cells
                        .iter()
                        .map(|c| c.map(|v| format!("{:>7.0}", v)).unwrap_or_else(|| format!("{:>7}", "-")))
                        .collect();
                    lines.push(format!("  {:<24} {}", row, cells.join(" ")));
                }
            }
            ChartBody::Table { header, rows, notes, .. } => {
                lines.push(format!("  {}", header.join(" | ")));
                for row in rows {
                    lines.push(format!("  {}", row.join(" | ")));
                }
                for note in notes {
                    lines.push(String::new());
                    lines.extend(note.lines().map(|l| format!("  {}", l)));
                }
            }
            ChartBody::GeoScatter { points, missing, .. } => {
                lines.push(format!("  {} located purchases, {} without coordinates", points.len(), missing));
                for p in points.iter().take(10) {
                    lines.push(format!("  ({:>8.4}, {:>9.4})  {:<24} {:>10.2}", p.latitude, p.longitude, p.label, p.amount));
                }
            }
            ChartBody::Scatter3d { points, .. } => {
                for p in points {
                    lines.push(format!("  {}  {:<8} {:>10.2}  {}", p.date, p.zip_code, p.amount, p.category));
                }
            }
            ChartBody::Message { text } => lines.push(text.clone()),
        }
        lines
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn time_series(table: &TransactionTable) -> Chart {
    let points = table
        .iter()
        .map(|tx| Point {
            x: tx.date.format("%Y-%m-%d").to_string(),
            y: tx.amount,
            label: Some(tx.category.clone()),
        })
        .collect();

    Chart::new(
        "What does a time series of my expenses look like?",
        ChartBody::Line {
            x_label: "Date".to_string(),
            y_label: "Amount".to_string(),
            series: vec![Series {
                name: "Amount".to_string(),
                color: PRIMARY_COLOR.to_string(),
                points,
            }],
        },
    )
}

pub fn category_line_plot(table: &TransactionTable, ranked: usize) -> Chart {
    let series = top_category_series(table, ranked)
        .into_iter()
        .enumerate()
        .map(|(i, s)| Series {
            name: s.category,
            color: cycle(&CATEGORICAL_PALETTE, i),
            points: s
                .points
                .into_iter()
                .map(|p| Point {
                    x: p.date.format("%Y-%m-%d").to_string(),
                    y: p.amount,
                    label: None,
                })
                .collect(),
        })
        .collect();

    Chart::new(
        format!("What does a plot of my transactions by category look like? (Top {} rankings)", ranked),
        ChartBody::Line {
            x_label: "Date".to_string(),
            y_label: "Amount".to_string(),
            series,
        },
    )
}

fn ranking_bars(totals: Vec<CategoryTotal>) -> Vec<Bar> {
    totals
        .into_iter()
        .enumerate()
        .map(|(i, t)| Bar {
            label: t.category,
            value: t.amount,
            color: cycle(&BLUE_RAMP, i),
        })
        .collect()
}

pub fn top_rankings_bar(table: &TransactionTable, ranked: usize) -> Chart {
    Chart::new(
        format!("What are your top {} rankings?", ranked),
        ChartBody::Bar {
            x_label: "Category".to_string(),
            y_label: "Amount".to_string(),
            bars: ranking_bars(top_categories(table, ranked)),
        },
    )
}

pub fn bottom_rankings_bar(table: &TransactionTable, ranked: usize) -> Chart {
    Chart::new(
        format!("What are your bottom {} rankings?", ranked),
        ChartBody::Bar {
            x_label: "Category".to_string(),
            y_label: "Amount".to_string(),
            bars: ranking_bars(bottom_categories(table, ranked)),
        },
    )
}

pub fn day_of_week_bar(table: &TransactionTable) -> Chart {
    let bars = day_of_week_counts(table)
        .into_iter()
        .enumerate()
        .map(|(i, d)| Bar {
            label: d.day,
            value: d.count as f64,
            color: cycle(&DAY_RAMP, i),
        })
        .collect();

    Chart::new(
        "What are your total transactions by day?",
        ChartBody::Bar {
            x_label: "Day_of_Week".to_string(),
            y_label: "Transactions".to_string(),
            bars,
        },
    )
}

pub fn monthly_heatmap(table: &TransactionTable) -> Chart {
    let pivot = monthly_pivot(table);
    Chart::new(
        "Transactions by Category and Month",
        ChartBody::Heatmap {
            x: pivot.months,
            y: pivot.categories,
            z: pivot.values,
            color_scale: "Blues".to_string(),
        },
    )
}

pub fn necessity_pie(table: &TransactionTable, necessities: &NecessityList) -> Chart {
    let slices = necessity_breakdown(table, necessities)
        .into_iter()
        .map(|part| Bar {
            label: part.expense_type.label().to_string(),
            value: part.amount,
            color: part.expense_type.color().to_string(),
        })
        .collect();

    Chart::new(
        "What does my expense breakdown by necessities and non-essentials look like?",
        ChartBody::Pie { slices },
    )
}

fn box_chart(title: &str, groups: Vec<(String, Vec<f64>)>, palette: &[&str]) -> Chart {
    let boxes: Vec<BoxStats> = groups
        .into_iter()
        .filter_map(|(label, values)| box_stats(label, &values))
        .collect();
    let colors = (0..boxes.len()).map(|i| cycle(palette, i)).collect();
    Chart::new(title, ChartBody::Box { boxes, colors })
}

pub fn category_box_plot(table: &TransactionTable) -> Chart {
    box_chart(
        "What outlier transactions can we detect?",
        group_amounts(table.iter(), |tx| tx.category.clone()),
        &BLUE_RAMP,
    )
}

pub const PRIMARY_ZIP_LABEL: &str = "Primary Zip Code";
pub const OTHER_ZIP_LABEL: &str = "Not Primary Zip Code";
pub const SHORT_ZIP_MESSAGE: &str = "Zipcode must be at least 5 characters long";

/// Home zip vs. everywhere else. Short zip codes get a message instead of a chart.
pub fn spending_by_location(table: &TransactionTable, zipcode: &str) -> Chart {
    let zipcode = zipcode.trim();
    if zipcode.chars().count() < 5 {
        return Chart::message(SHORT_ZIP_MESSAGE);
    }

    let groups = group_amounts(table.iter(), |tx| {
        if tx.zip_code == zipcode {
            PRIMARY_ZIP_LABEL.to_string()
        } else {
            OTHER_ZIP_LABEL.to_string()
        }
    });
    box_chart(
        "What does spending look like outside our home address?",
        groups,
        &[PRIMARY_COLOR],
    )
}

pub const NO_POSTAL_TABLE_MESSAGE: &str =
    "No postal code table is loaded. Point [geo].postal_codes at a GeoNames US.txt file to map purchases.";

pub fn geo_location(table: &TransactionTable, lookup: &ZipLookup) -> Chart {
    if lookup.is_empty() {
        tracing::warn!("geo-location requested without a postal code table");
        return Chart::message(NO_POSTAL_TABLE_MESSAGE);
    }

    let (points, missing) = geo_points(table, lookup);
    Chart::new(
        "Where are your purchases?",
        ChartBody::GeoScatter {
            points,
            scope: "usa".to_string(),
            lon_range: [-140.0, -55.0],
            lat_range: [20.0, 60.0],
            marker_line_color: MARKER_LINE_COLOR.to_string(),
            missing,
        },
    )
}

pub fn scatter_3d(table: &TransactionTable) -> Chart {
    Chart::new(
        "What does a plot of my transactions by category look like?",
        ChartBody::Scatter3d {
            points: category_date_zip_sums(table),
            colors: CATEGORICAL_PALETTE.iter().map(|c| c.to_string()).collect(),
        },
    )
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "NaN".to_string())
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn forecast_rows(forecasts: &[CategoryForecast]) -> Vec<Vec<String>> {
    forecasts
        .iter()
        .map(|f| {
            vec![
                f.category.clone(),
                format!("{:.2}", f.average),
                fmt_opt(f.sma),
                format!("{:.2}", f.es),
                yes_no(f.flagged_sma),
                yes_no(f.flagged_es),
                fmt_opt(f.pct_change_sma),
                fmt_opt(f.pct_change_es),
            ]
        })
        .collect()
}

fn forecast_header() -> Vec<String> {
    [
        "Category",
        "Average",
        "SMA",
        "ES",
        "Flagged_SMA",
        "Flagged_ES",
        "pct_change_SMA",
        "pct_change_ES",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

/// Forecast table for every category.
pub fn forecast_table(forecasts: &[CategoryForecast]) -> Chart {
    Chart::new(
        "SMA and ES Forecasts: All Categories",
        ChartBody::Table {
            header: forecast_header(),
            rows: forecast_rows(forecasts),
            header_color: TABLE_HEADER_COLOR.to_string(),
            cell_color: TABLE_CELL_COLOR.to_string(),
            notes: Vec::new(),
        },
    )
}

/// Flagged categories only, each with its explanation.
pub fn flagged_forecast_table(flagged: &[CategoryForecast]) -> Chart {
    Chart::new(
        "SMA and ES Forecasts",
        ChartBody::Table {
            header: forecast_header(),
            rows: forecast_rows(flagged),
            header_color: TABLE_HEADER_COLOR.to_string(),
            cell_color: TABLE_CELL_COLOR.to_string(),
            notes: flagged.iter().map(CategoryForecast::message).collect(),
        },
    )
}

pub fn classifier_table(report: &ClassifierReport) -> Chart {
    let rows = report
        .predictions
        .iter()
        .map(|p| vec![p.description.clone(), if p.predicted_necessity { "True" } else { "False" }.to_string()])
        .collect();
    let notes = match report.accuracy {
        Some(acc) => vec![format!("Accuracy: {:.4}", acc)],
        None => Vec::new(),
    };

    Chart::new(
        "Naive Bayes Text Classifier - Necessities",
        ChartBody::Table {
            header: vec!["Description".to_string(), "Predicted_Necessity".to_string()],
            rows,
            header_color: TABLE_HEADER_COLOR.to_string(),
            cell_color: TABLE_CELL_COLOR.to_string(),
            notes,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;
    use crate::ledger::Transaction;
    use chrono::NaiveDate;

    fn tx(day: u32, category: &str, zip: &str, amount: f64) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2023, 3, day).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            description: format!("{category} store"),
            amount,
            address: String::new(),
            city_state: "Austin, TX".to_string(),
            zip_code: zip.to_string(),
            country: "United States".to_string(),
            category: category.to_string(),
        }
    }

    fn sample() -> TransactionTable {
        TransactionTable::new(
            "march.csv",
            vec![
                tx(1, "Groceries", "78701", 80.0),
                tx(2, "Dining", "78701", 25.0),
                tx(3, "Groceries", "10001", 60.0),
                tx(4, "Housing", "78701", 1500.0),
                tx(5, "Dining", "94105", 40.0),
            ],
        )
    }

    #[test]
    fn test_chart_serializes_with_kind_tag() {
        let chart = top_rankings_bar(&sample(), 2);
        let json = serde_json::to_value(&chart).unwrap();

        assert_eq!(json["kind"], "bar");
        assert_eq!(json["title"], "What are your top 2 rankings?");
        assert_eq!(json["bars"][0]["label"], "Housing");
        assert_eq!(json["bars"][0]["color"], "#004c6d");

        let back: Chart = serde_json::from_value(json).unwrap();
        assert_eq!(back, chart);
    }

    #[test]
    fn test_time_series_one_point_per_row() {
        match time_series(&sample()).body {
            ChartBody::Line { series, .. } => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].points.len(), 5);
                assert_eq!(series[0].points[0].label.as_deref(), Some("Groceries"));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_spending_by_location_short_zip() {
        let chart = spending_by_location(&sample(), "787");
        assert_eq!(chart.body, ChartBody::Message { text: SHORT_ZIP_MESSAGE.to_string() });
    }

    #[test]
    fn test_spending_by_location_groups() {
        match spending_by_location(&sample(), "78701").body {
            ChartBody::Box { boxes, .. } => {
                assert_eq!(boxes.len(), 2);
                assert_eq!(boxes[0].label, PRIMARY_ZIP_LABEL);
                assert_eq!(boxes[0].count, 3);
                assert_eq!(boxes[1].label, OTHER_ZIP_LABEL);
                assert_eq!(boxes[1].count, 2);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_geo_location_without_postal_table() {
        let chart = geo_location(&sample(), &ZipLookup::new());
        assert_eq!(chart.body, ChartBody::Message { text: NO_POSTAL_TABLE_MESSAGE.to_string() });
    }

    #[test]
    fn test_geo_location_counts_missing() {
        let mut lookup = ZipLookup::new();
        lookup.insert("78701", Coordinates { latitude: 30.27, longitude: -97.74 });

        match geo_location(&sample(), &lookup).body {
            ChartBody::GeoScatter { points, missing, scope, .. } => {
                assert_eq!(points.len(), 3);
                assert_eq!(missing, 2);
                assert_eq!(scope, "usa");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_necessity_pie_colors() {
        match necessity_pie(&sample(), &NecessityList::default()).body {
            ChartBody::Pie { slices } => {
                assert_eq!(slices[0].label, "Necessities");
                assert_eq!(slices[0].value, 1640.0);
                assert_eq!(slices[1].color, "#8a3800");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_forecast_table_formats_missing_sma() {
        let forecasts = crate::forecast::forecast_categories(&sample(), &Default::default());
        match forecast_table(&forecasts).body {
            ChartBody::Table { header, rows, .. } => {
                assert_eq!(header.len(), 8);
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[0][0], "Dining");
                assert_eq!(rows[0][2], "NaN");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_summary_lines() {
        let lines = day_of_week_bar(&sample()).summary();
        assert_eq!(lines[0], "== What are your total transactions by day? ==");
        assert_eq!(lines.len(), 8);
        assert_eq!(spending_by_location(&sample(), "1").summary(), vec![SHORT_ZIP_MESSAGE.to_string()]);
    }

    #[test]
    fn test_box_summary_counts_suspected_outliers() {
        let amounts = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 14.0, 40.0];
        let rows = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| tx(i as u32 + 1, "Dining", "78701", *a))
            .collect();
        let chart = category_box_plot(&TransactionTable::new("march.csv", rows));

        let lines = chart.summary();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("outliers 1 (suspected 1)"), "{}", lines[1]);
    }
}
