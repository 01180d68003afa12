pub mod scan;
pub mod score_record;

pub use scan::ScanRecord;
pub use score_record::{NewScoreRecord, ScoreRecord, VendorAverage};
