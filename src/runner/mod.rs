pub mod executor;
pub mod reporter;
pub mod types;

pub use executor::{CollectionRunner, RunState, dispatch};
pub use reporter::{ReportFormat, TestReporter};
pub use types::{
    CollectionReport, LatencyStats, Outcome, RequestReport, RequestSummary, Verdict, aggregate,
};
