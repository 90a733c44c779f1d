pub mod reports;

pub use reports::{parse_report, ReportRequest, ReportService};
