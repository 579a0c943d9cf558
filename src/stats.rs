// 📦 Box-plot statistics (exclusive quartile method)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    /// Points outside the 1.5·IQR fences
    pub outliers: Vec<f64>,
    /// Points beyond 4·Q1−3·Q3 or 4·Q3−3·Q1
    pub suspected_outliers: Vec<f64>,
}

impl BoxStats {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

fn median_sorted(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    })
}

/// Q1, median, Q3 where the median is left out of both halves for odd counts.
pub fn exclusive_quartiles(values: &[f64]) -> Option<(f64, f64, f64)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let median = median_sorted(&sorted)?;
    if n == 1 {
        return Some((median, median, median));
    }

    let lower = &sorted[..n / 2];
    let upper = &sorted[(n + 1) / 2..];
    Some((median_sorted(lower)?, median, median_sorted(upper)?))
}

pub fn box_stats(label: impl Into<String>, values: &[f64]) -> Option<BoxStats> {
    let (q1, median, q3) = exclusive_quartiles(values)?;
    let iqr = q3 - q1;
    let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let (low_suspect, high_suspect) = (4.0 * q1 - 3.0 * q3, 4.0 * q3 - 3.0 * q1);

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= low_fence && *v <= high_fence)
        .collect();
    let outliers: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();
    let suspected_outliers = outliers
        .iter()
        .copied()
        .filter(|v| *v < low_suspect || *v > high_suspect)
        .collect();

    Some(BoxStats {
        label: label.into(),
        count: sorted.len(),
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[sorted.len() - 1],
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers,
        suspected_outliers,
    })
}
