// 📈 Forecast & flag - per-category SMA and exponential smoothing vs. the historical mean
//
// For each category (ascending by name, transactions in table order):
//   Average = mean of every amount
//   SMA     = mean of the trailing `window` amounts (None with fewer rows)
//   ES      = bias-adjusted exponentially weighted mean, last value
// A category is flagged when both SMA and ES sit above its Average.

use crate::ledger::TransactionTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relative slack so that float noise on a constant series never flags.
const EXCEEDS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSettings {
    pub window: usize,
    pub alpha: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        ForecastSettings {
            window: 4,
            alpha: 0.2,
        }
    }
}

/// One row of the forecast table. Numbers are rounded to cents/2dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub category: String,
    pub average: f64,
    pub sma: Option<f64>,
    pub es: f64,
    pub flagged_sma: bool,
    pub flagged_es: bool,
    pub pct_change_sma: Option<f64>,
    pub pct_change_es: Option<f64>,
}

impl CategoryForecast {
    pub fn is_flagged(&self) -> bool {
        self.flagged_sma && self.flagged_es
    }

    pub fn message(&self) -> String {
        format!(
            "Flagged Category: {}\nSMA and the ES forecasts are projected to surpass the average of ${:.2}. \
             SMA and ES Forecasts indicate an increase of {}% and {}%, respectively.",
            self.category,
            self.average,
            format_pct(self.pct_change_sma),
            format_pct(self.pct_change_es),
        )
    }
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

// ============================================================================
// ESTIMATORS
// ============================================================================

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of the last `window` values; None until `window` values exist.
pub fn simple_moving_average(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    mean(&values[values.len() - window..])
}

/// Most recent value of the bias-adjusted exponentially weighted mean:
/// Σ (1-α)^i · x[t-i] / Σ (1-α)^i
pub fn exponential_average(values: &[f64], alpha: f64) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    let decay = 1.0 - alpha;

    let mut weighted = *first;
    let mut weights = 1.0;
    for x in rest {
        weighted = weighted * decay + x;
        weights = weights * decay + 1.0;
    }

    Some(weighted / weights)
}

fn exceeds(value: f64, baseline: f64) -> bool {
    value - baseline > EXCEEDS_EPSILON * baseline.abs().max(1.0)
}

fn pct_change(value: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    let pct = (value - baseline) / baseline * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TABLE
// ============================================================================

/// Amounts per category, categories ascending, rows in table order.
pub fn amounts_by_category(table: &TransactionTable) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for tx in table.iter() {
        groups.entry(tx.category.clone()).or_default().push(tx.amount);
    }
    groups
}

pub fn forecast_category(category: &str, amounts: &[f64], settings: &ForecastSettings) -> Option<CategoryForecast> {
    let average = mean(amounts)?;
    let es = exponential_average(amounts, settings.alpha)?;
    let sma = simple_moving_average(amounts, settings.window);

    let flagged_sma = sma.map(|s| exceeds(s, average)).unwrap_or(false);
    let flagged_es = exceeds(es, average);

    Some(CategoryForecast {
        category: category.to_string(),
        average: round2(average),
        sma: sma.map(round2),
        es: round2(es),
        flagged_sma,
        flagged_es,
        pct_change_sma: sma.and_then(|s| pct_change(s, average)).map(round2),
        pct_change_es: pct_change(es, average).map(round2),
    })
}

/// The "all categories" forecast table.
pub fn forecast_categories(table: &TransactionTable, settings: &ForecastSettings) -> Vec<CategoryForecast> {
    let forecasts: Vec<CategoryForecast> = amounts_by_category(table)
        .iter()
        .filter_map(|(category, amounts)| forecast_category(category, amounts, settings))
        .collect();

    tracing::debug!(
        categories = forecasts.len(),
        flagged = forecasts.iter().filter(|f| f.is_flagged()).count(),
        "computed forecasts"
    );
    forecasts
}

/// Only the categories where both estimators exceed the mean.
pub fn flagged_categories(table: &TransactionTable, settings: &ForecastSettings) -> Vec<CategoryForecast> {
    forecast_categories(table, settings)
        .into_iter()
        .filter(CategoryForecast::is_flagged)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Transaction;
    use chrono::NaiveDate;

    fn table(rows: &[(&str, f64)]) -> TransactionTable {
        let transactions = rows
            .iter()
            .enumerate()
            .map(|(i, (category, amount))| Transaction {
                date: NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64),
                description: format!("TX {i}"),
                amount: *amount,
                address: String::new(),
                city_state: String::new(),
                zip_code: "10001".to_string(),
                country: "United States".to_string(),
                category: category.to_string(),
            })
            .collect();
        TransactionTable::new("test.csv", transactions)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma_needs_full_window() {
        assert_eq!(simple_moving_average(&[1.0, 2.0, 3.0], 4), None);
        assert_eq!(simple_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 4), Some(3.5));
        assert_eq!(simple_moving_average(&[1.0], 0), None);
    }

    #[test]
    fn test_exponential_average_is_bias_adjusted() {
        // weights for [10, 20] with alpha 0.2: 0.8 and 1
        let es = exponential_average(&[10.0, 20.0], 0.2).unwrap();
        assert!(approx(es, (10.0 * 0.8 + 20.0) / 1.8));
        assert_eq!(exponential_average(&[], 0.2), None);
        assert_eq!(exponential_average(&[7.0], 0.2), Some(7.0));
    }

    #[test]
    fn test_constant_category_never_flagged() {
        let rows: Vec<(&str, f64)> = (0..6).map(|_| ("Groceries", 0.1)).collect();
        let forecasts = forecast_categories(&table(&rows), &ForecastSettings::default());

        assert_eq!(forecasts.len(), 1);
        let f = &forecasts[0];
        assert_eq!(f.sma, Some(f.average));
        assert_eq!(f.es, f.average);
        assert!(!f.flagged_sma);
        assert!(!f.flagged_es);
        assert!(!f.is_flagged());
    }

    #[test]
    fn test_increasing_category_is_flagged() {
        let rows: Vec<(&str, f64)> = (1..=8).map(|i| ("Dining", i as f64 * 10.0)).collect();
        let forecasts = forecast_categories(&table(&rows), &ForecastSettings::default());

        let f = &forecasts[0];
        assert_eq!(f.average, 45.0);
        assert_eq!(f.sma, Some(65.0));
        assert!(f.es >= f.average);
        assert!(f.is_flagged());
        assert_eq!(f.pct_change_sma, Some(44.44));
    }

    #[test]
    fn test_short_category_has_no_sma() {
        let rows = [("Travel", 100.0), ("Travel", 300.0)];
        let f = &forecast_categories(&table(&rows), &ForecastSettings::default())[0];

        assert_eq!(f.sma, None);
        assert_eq!(f.pct_change_sma, None);
        assert!(f.flagged_es);
        assert!(!f.is_flagged());
    }

    #[test]
    fn test_categories_sorted_and_grouped_in_row_order() {
        let rows = [
            ("Zoo", 1.0),
            ("Apparel", 50.0),
            ("Zoo", 2.0),
            ("Apparel", 10.0),
        ];
        let groups = amounts_by_category(&table(&rows));
        let keys: Vec<&String> = groups.keys().collect();

        assert_eq!(keys, vec!["Apparel", "Zoo"]);
        assert_eq!(groups["Apparel"], vec![50.0, 10.0]);
    }

    #[test]
    fn test_zero_mean_has_no_pct_change() {
        let rows = [("Refunds", -5.0), ("Refunds", 5.0)];
        let f = &forecast_categories(&table(&rows), &ForecastSettings::default())[0];
        assert_eq!(f.pct_change_es, None);
    }

    #[test]
    fn test_flagged_categories_filters() {
        let mut rows: Vec<(&str, f64)> = (1..=6).map(|i| ("Rising", i as f64)).collect();
        rows.extend((0..6).map(|_| ("Flat", 20.0)));

        let flagged = flagged_categories(&table(&rows), &ForecastSettings::default());
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].category, "Rising");
        assert!(flagged[0].message().starts_with("Flagged Category: Rising"));
        assert!(flagged[0].message().contains("average of $3.50"));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(44.444444), 44.44);
        assert_eq!(round2(-1.005001), -1.01);
    }
}
