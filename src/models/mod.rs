pub mod report;

pub use report::{NewImage, Report, ReportImage};
