// Spendalyzer - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod error;
pub mod logging;
pub mod config;
pub mod necessity;
pub mod parser;
pub mod ledger;     // Cleaned transaction table
pub mod forecast;   // SMA / ES forecast-and-flag
pub mod aggregate;
pub mod stats;      // Box-plot quartiles
pub mod geo;
pub mod classifier; // Naive Bayes necessity classifier
pub mod charts;
pub mod analysis;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::{AnalysisError, IngestError, UPLOAD_ERROR_MESSAGE};
pub use config::{load_config, Config};
pub use necessity::{ExpenseType, NecessityList};
pub use parser::{detect_format, get_parser, RawTransaction, StatementParser, UploadFormat};
pub use ledger::{clean_currency, load_statement, parse_upload, Preview, Transaction, TransactionTable};
pub use forecast::{flagged_categories, forecast_categories, CategoryForecast, ForecastSettings};
pub use stats::{box_stats, BoxStats};
pub use geo::{Coordinates, ZipLookup};
pub use classifier::{predict_necessities, ClassifierReport, NaiveBayes};
pub use charts::{Chart, ChartBody};
pub use analysis::{run_analysis, AnalysisContext, AnalysisRequest, AnalysisType};
