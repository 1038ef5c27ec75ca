pub mod format;
pub mod messages;

pub use format::{MonthlyCounts, PublicUrls, StatusCounts};
