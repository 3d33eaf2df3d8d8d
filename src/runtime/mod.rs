pub mod app;
pub mod topology;

pub use app::{doctor_report, fetch_artifact, render_result, run_entry, status_report, EntryRequest};
