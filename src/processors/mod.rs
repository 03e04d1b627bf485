pub mod calendar;
pub mod feature_pipeline;
pub mod formulas;
pub mod integrity_checker;
pub mod rolling;

pub use calendar::{count_missing_days, fill_calendar_gaps};
pub use feature_pipeline::FeaturePipeline;
pub use integrity_checker::{DomainViolation, IntegrityChecker, IntegrityReport, ViolationType};
pub use rolling::{rolling_mean, rolling_percentage, BandSeries, ImmersionSeries};
