// 🏷️ Necessity classification - allowlist of essential spending categories

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_NECESSITIES: [&str; 10] = [
    "Car Insurance",
    "Car Loan",
    "Car Maintenance",
    "Electric Bill",
    "Gas",
    "Gas Bill",
    "Groceries",
    "Health Care",
    "Housing",
    "Internet Bill",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseType {
    Necessity,
    NonEssential,
}

impl ExpenseType {
    /// Label used on charts
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseType::Necessity => "Necessities",
            ExpenseType::NonEssential => "Non-essentials",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ExpenseType::Necessity => "#003f5c",
            ExpenseType::NonEssential => "#8a3800",
        }
    }
}

/// Exact-match allowlist. Category names are compared case-sensitively,
/// the same way the exports spell them.
#[derive(Debug, Clone)]
pub struct NecessityList {
    categories: HashSet<String>,
}

impl NecessityList {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NecessityList {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_necessity(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn classify(&self, category: &str) -> ExpenseType {
        if self.is_necessity(category) {
            ExpenseType::Necessity
        } else {
            ExpenseType::NonEssential
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for NecessityList {
    fn default() -> Self {
        Self::new(DEFAULT_NECESSITIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist() {
        let list = NecessityList::default();
        assert_eq!(list.len(), 10);
        assert!(list.is_necessity("Groceries"));
        assert!(list.is_necessity("Internet Bill"));
        assert!(!list.is_necessity("Restaurants"));
    }

    #[test]
    fn test_match_is_exact() {
        let list = NecessityList::default();
        assert_eq!(list.classify("groceries"), ExpenseType::NonEssential);
        assert_eq!(list.classify("Gas"), ExpenseType::Necessity);
    }

    #[test]
    fn test_custom_allowlist() {
        let list = NecessityList::new(vec!["Rent"]);
        assert_eq!(list.classify("Rent").label(), "Necessities");
        assert_eq!(list.classify("Housing").label(), "Non-essentials");
    }
}
