// 🤖 Naive Bayes necessity classifier
//
// Bag-of-words over transaction descriptions. Every vocabulary word becomes a
// boolean `contains(word)` feature; the label is "category is a necessity".
// Label priors and feature likelihoods use expected-likelihood (add 0.5)
// smoothing.

use crate::error::AnalysisError;
use crate::ledger::TransactionTable;
use crate::necessity::NecessityList;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// English stop words, lowercase.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Alphabetic, lowercased, stop-word-free tokens of a description.
///
/// Interior `.`, `-` and `*` stay inside the token, so "NETFLIX.COM" and
/// "WAL-MART" are one non-alphabetic token and get dropped whole.
pub fn tokenize(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.split(|c: char| {
        c.is_whitespace() || (c.is_ascii_punctuation() && !matches!(c, '\'' | '*' | '.' | '-'))
    })
    .map(|token| token.trim_matches(|c: char| c == '.' || c == '-'))
    .flat_map(|token| token.split('\''))
    .filter(|token| !token.is_empty() && token.chars().all(char::is_alphabetic))
    .map(str::to_lowercase)
    .filter(|token| !stop.contains(token.as_str()))
    .collect()
}

/// Add-0.5 smoothed probability of an outcome seen `count` times in `total`
/// trials with `bins` possible outcomes.
fn ele_prob(count: usize, total: usize, bins: usize) -> f64 {
    (count as f64 + 0.5) / (total as f64 + bins as f64 * 0.5)
}

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    vocabulary: BTreeSet<String>,
    label_counts: [usize; 2],
    /// Per word: documents containing it, per label
    present_counts: HashMap<String, [usize; 2]>,
}

impl NaiveBayes {
    /// Train on (tokens, label) documents.
    pub fn train(documents: &[(Vec<String>, bool)]) -> Result<Self, AnalysisError> {
        if documents.is_empty() {
            return Err(AnalysisError::Classifier("no training documents".to_string()));
        }

        let mut vocabulary = BTreeSet::new();
        let mut label_counts = [0usize; 2];
        let mut present_counts: HashMap<String, [usize; 2]> = HashMap::new();

        for (tokens, label) in documents {
            let idx = *label as usize;
            label_counts[idx] += 1;
            let unique: HashSet<&String> = tokens.iter().collect();
            for word in unique {
                vocabulary.insert(word.clone());
                present_counts.entry(word.clone()).or_insert([0, 0])[idx] += 1;
            }
        }

        Ok(NaiveBayes {
            vocabulary,
            label_counts,
            present_counts,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Distinct values a feature took in training: 1 when the word is in every
    /// document (or none), else 2.
    fn feature_bins(&self, present: [usize; 2]) -> usize {
        let total_docs = self.label_counts[0] + self.label_counts[1];
        let seen = present[0] + present[1];
        if seen == 0 || seen == total_docs {
            1
        } else {
            2
        }
    }

    fn log_probability(&self, words: &HashSet<&str>, label: bool) -> f64 {
        let idx = label as usize;
        let labels_seen = self.label_counts.iter().filter(|c| **c > 0).count();
        let total_docs = self.label_counts[0] + self.label_counts[1];

        let mut logp = ele_prob(self.label_counts[idx], total_docs, labels_seen).ln();
        for word in &self.vocabulary {
            let present = self.present_counts.get(word).copied().unwrap_or([0, 0]);
            let bins = self.feature_bins(present);
            let in_label = self.label_counts[idx];
            let count = if words.contains(word.as_str()) {
                present[idx]
            } else {
                in_label - present[idx]
            };
            logp += ele_prob(count, in_label, bins).ln();
        }
        logp
    }

    /// Most probable label; ties go to `false`.
    pub fn classify(&self, tokens: &[String]) -> bool {
        let words: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        self.log_probability(&words, true) > self.log_probability(&words, false)
    }

    /// Fraction of documents classified correctly.
    pub fn accuracy(&self, documents: &[(Vec<String>, bool)]) -> Option<f64> {
        if documents.is_empty() {
            return None;
        }
        let correct = documents
            .iter()
            .filter(|(tokens, label)| self.classify(tokens) == *label)
            .count();
        Some(correct as f64 / documents.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub description: String,
    pub predicted_necessity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierReport {
    pub predictions: Vec<Prediction>,
    pub accuracy: Option<f64>,
    pub training_rows: usize,
}

/// Labelled documents from a table.
pub fn documents(table: &TransactionTable, necessities: &NecessityList) -> Vec<(Vec<String>, bool)> {
    table
        .iter()
        .map(|tx| (tokenize(&tx.description), necessities.is_necessity(&tx.category)))
        .collect()
}

/// Train on `training` (first `holdout` rows held out when there are more
/// than that) and predict every row of `target`.
pub fn predict_necessities(
    training: &TransactionTable,
    target: &TransactionTable,
    necessities: &NecessityList,
    holdout: usize,
) -> Result<ClassifierReport, AnalysisError> {
    let docs = documents(training, necessities);
    let (test_set, train_set) = if holdout > 0 && docs.len() > holdout {
        docs.split_at(holdout)
    } else {
        docs.split_at(0)
    };

    let model = NaiveBayes::train(train_set)?;
    let accuracy = model.accuracy(test_set);
    tracing::info!(
        training_rows = train_set.len(),
        vocabulary = model.vocabulary_size(),
        accuracy = ?accuracy,
        "trained necessity classifier"
    );

    let predictions = target
        .iter()
        .map(|tx| Prediction {
            description: tx.description.clone(),
            predicted_necessity: model.classify(&tokenize(&tx.description)),
        })
        .collect();

    Ok(ClassifierReport {
        predictions,
        accuracy,
        training_rows: train_set.len(),
    })
}
