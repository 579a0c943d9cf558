// 🧮 Aggregations - the derived, throwaway views behind each chart

use crate::ledger::{Transaction, TransactionTable};
use crate::necessity::{ExpenseType, NecessityList};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Sum of amounts per category, categories ascending.
pub fn category_totals(table: &TransactionTable) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in table.iter() {
        *totals.entry(tx.category.as_str()).or_insert(0.0) += tx.amount;
    }
    totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
        })
        .collect()
}

/// The `n` categories with the largest totals, largest first.
pub fn top_categories(table: &TransactionTable, n: usize) -> Vec<CategoryTotal> {
    let mut totals = category_totals(table);
    totals.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));
    totals.truncate(n);
    totals
}

/// The `n` categories with the smallest totals, smallest first.
pub fn bottom_categories(table: &TransactionTable, n: usize) -> Vec<CategoryTotal> {
    let mut totals = category_totals(table);
    totals.sort_by(|a, b| a.amount.total_cmp(&b.amount).then_with(|| a.category.cmp(&b.category)));
    totals.truncate(n);
    totals
}

// ============================================================================
// DAY OF WEEK
// ============================================================================

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub day: String,
    pub count: usize,
}

/// Transactions per weekday. All seven days, busiest first; ties keep Monday→Sunday order.
pub fn day_of_week_counts(table: &TransactionTable) -> Vec<DayCount> {
    let mut counts = [0usize; 7];
    for tx in table.iter() {
        counts[tx.date.weekday().num_days_from_monday() as usize] += 1;
    }

    let mut days: Vec<DayCount> = WEEKDAYS
        .iter()
        .map(|d| DayCount {
            day: weekday_name(*d).to_string(),
            count: counts[d.num_days_from_monday() as usize],
        })
        .collect();
    // stable sort keeps weekday order for ties
    days.sort_by(|a, b| b.count.cmp(&a.count));
    days
}

// ============================================================================
// NECESSITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseBreakdown {
    pub expense_type: ExpenseType,
    pub amount: f64,
}

/// Necessities vs. non-essentials. Only groups that occur are returned.
pub fn necessity_breakdown(table: &TransactionTable, necessities: &NecessityList) -> Vec<ExpenseBreakdown> {
    let mut necessity = None;
    let mut other = None;
    for tx in table.iter() {
        let slot = match necessities.classify(&tx.category) {
            ExpenseType::Necessity => &mut necessity,
            ExpenseType::NonEssential => &mut other,
        };
        *slot.get_or_insert(0.0) += tx.amount;
    }

    [(ExpenseType::Necessity, necessity), (ExpenseType::NonEssential, other)]
        .into_iter()
        .filter_map(|(expense_type, amount)| amount.map(|amount| ExpenseBreakdown { expense_type, amount }))
        .collect()
}

// ============================================================================
// PIVOT
// ============================================================================

/// Category × month grid of summed amounts. Empty cells are None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPivot {
    pub categories: Vec<String>,
    pub months: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn monthly_pivot(table: &TransactionTable) -> MonthlyPivot {
    let mut cells: HashMap<(String, String), f64> = HashMap::new();
    let mut categories = BTreeSet::new();
    let mut months = BTreeSet::new();

    for tx in table.iter() {
        let month = tx.month_key();
        categories.insert(tx.category.clone());
        months.insert(month.clone());
        *cells.entry((tx.category.clone(), month)).or_insert(0.0) += tx.amount;
    }

    let categories: Vec<String> = categories.into_iter().collect();
    let months: Vec<String> = months.into_iter().collect();
    let values = categories
        .iter()
        .map(|c| {
            months
                .iter()
                .map(|m| cells.get(&(c.clone(), m.clone())).copied())
                .collect()
        })
        .collect();

    MonthlyPivot {
        categories,
        months,
        values,
    }
}

// ============================================================================
// SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedAmount {
    pub date: NaiveDateTime,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub category: String,
    pub points: Vec<DatedAmount>,
}

/// Daily sums per category for the top `n` categories, ordered like [`top_categories`].
pub fn top_category_series(table: &TransactionTable, n: usize) -> Vec<CategorySeries> {
    let mut by_category: HashMap<&str, BTreeMap<NaiveDateTime, f64>> = HashMap::new();
    for tx in table.iter() {
        *by_category
            .entry(tx.category.as_str())
            .or_default()
            .entry(tx.date)
            .or_insert(0.0) += tx.amount;
    }

    top_categories(table, n)
        .into_iter()
        .map(|total| {
            let points = by_category
                .remove(total.category.as_str())
                .unwrap_or_default()
                .into_iter()
                .map(|(date, amount)| DatedAmount { date, amount })
                .collect();
            CategorySeries {
                category: total.category,
                points,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub date: NaiveDate,
    pub zip_code: String,
    pub amount: f64,
    pub category: String,
}

/// Sum by (category, day, zip code), sorted by those keys.
pub fn category_date_zip_sums(table: &TransactionTable) -> Vec<ScatterPoint> {
    let mut sums: BTreeMap<(String, NaiveDate, String), f64> = BTreeMap::new();
    for tx in table.iter() {
        *sums
            .entry((tx.category.clone(), tx.day(), tx.zip_code.clone()))
            .or_insert(0.0) += tx.amount;
    }
    sums.into_iter()
        .map(|((category, date, zip_code), amount)| ScatterPoint {
            date,
            zip_code,
            amount,
            category,
        })
        .collect()
}

/// Amounts grouped by a key, groups in first-seen order.
pub fn group_amounts<'a, F>(transactions: impl IntoIterator<Item = &'a Transaction>, key: F) -> Vec<(String, Vec<f64>)>
where
    F: Fn(&Transaction) -> String,
{
    let mut order: Vec<(String, Vec<f64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for tx in transactions {
        let k = key(tx);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            order.push((k, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(tx.amount);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: (i32, u32, u32), category: &str, amount: f64) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: format!("{category} purchase"),
            amount,
            address: String::new(),
            city_state: String::new(),
            zip_code: "78701".to_string(),
            country: "United States".to_string(),
            category: category.to_string(),
        }
    }

    fn sample() -> TransactionTable {
        TransactionTable::new(
            "sample.csv",
            vec![
                tx((2023, 1, 2), "Groceries", 50.0),  // Monday
                tx((2023, 1, 3), "Dining", 20.0),     // Tuesday
                tx((2023, 1, 9), "Groceries", 70.0),  // Monday
                tx((2023, 2, 1), "Housing", 1200.0),  // Wednesday
                tx((2023, 2, 4), "Dining", 35.0),     // Saturday
                tx((2023, 2, 6), "Streaming", 15.0),  // Monday
            ],
        )
    }

    #[test]
    fn test_category_totals_match_raw_sums() {
        let totals = category_totals(&sample());
        let groceries = totals.iter().find(|t| t.category == "Groceries").unwrap();
        assert_eq!(groceries.amount, 120.0);
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn test_category_totals_ignore_row_order() {
        let mut reversed = sample();
        reversed.transactions.reverse();
        assert_eq!(category_totals(&sample()), category_totals(&reversed));
    }

    #[test]
    fn test_top_and_bottom_rankings() {
        let top = top_categories(&sample(), 2);
        assert_eq!(top[0].category, "Housing");
        assert_eq!(top[1].category, "Groceries");

        let bottom = bottom_categories(&sample(), 2);
        assert_eq!(bottom[0].category, "Streaming");
        assert_eq!(bottom[1].category, "Dining");
    }

    #[test]
    fn test_rankings_cover_all_categories() {
        let table = sample();
        let n = category_totals(&table).len() + 3;
        let mut union: BTreeSet<String> = top_categories(&table, n).into_iter().map(|t| t.category).collect();
        union.extend(bottom_categories(&table, n).into_iter().map(|t| t.category));

        let all: BTreeSet<String> = category_totals(&table).into_iter().map(|t| t.category).collect();
        assert_eq!(union, all);
    }

    #[test]
    fn test_day_of_week_counts() {
        let days = day_of_week_counts(&sample());
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], DayCount { day: "Monday".to_string(), count: 3 });
        assert_eq!(days.iter().map(|d| d.count).sum::<usize>(), 6);
        // ties keep weekday order
        assert_eq!(days[1].day, "Tuesday");
        assert_eq!(days[2].day, "Wednesday");
        assert_eq!(days[3].day, "Saturday");
        assert_eq!(days[4].day, "Thursday");
    }

    #[test]
    fn test_necessity_breakdown() {
        let parts = necessity_breakdown(&sample(), &NecessityList::default());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].expense_type, ExpenseType::Necessity);
        assert_eq!(parts[0].amount, 1320.0);
        assert_eq!(parts[1].amount, 70.0);
    }

    #[test]
    fn test_monthly_pivot() {
        let pivot = monthly_pivot(&sample());
        assert_eq!(pivot.months, vec!["2023-01", "2023-02"]);
        assert_eq!(pivot.categories, vec!["Dining", "Groceries", "Housing", "Streaming"]);
        assert_eq!(pivot.values[1], vec![Some(120.0), None]);
        assert_eq!(pivot.values[0], vec![Some(20.0), Some(35.0)]);
    }

    #[test]
    fn test_top_category_series() {
        let series = top_category_series(&sample(), 2);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].category, "Groceries");
        assert_eq!(series[1].points.len(), 2);
        assert!(series[1].points[0].date < series[1].points[1].date);
    }

    #[test]
    fn test_category_date_zip_sums_merge_same_day() {
        let mut table = sample();
        table.transactions.push(tx((2023, 1, 2), "Groceries", 5.0));
        let points = category_date_zip_sums(&table);
        let merged = points
            .iter()
            .find(|p| p.category == "Groceries" && p.date == NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
            .unwrap();
        assert_eq!(merged.amount, 55.0);
        assert_eq!(points.len(), 6);
    }

    #[test]
    fn test_group_amounts_first_seen_order() {
        let table = sample();
        let groups = group_amounts(table.iter(), |tx| tx.category.clone());
        assert_eq!(groups[0].0, "Groceries");
        assert_eq!(groups[0].1, vec![50.0, 70.0]);
        assert_eq!(groups[1].0, "Dining");
    }
}
