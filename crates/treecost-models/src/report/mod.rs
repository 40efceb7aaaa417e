pub mod plots;
pub mod report;

pub use report::{build_report, write_report, Report, ReportSection};
