pub mod daily;
pub mod derived;

pub use daily::{date_from_day_of_year, DailyRecord};
pub use derived::{BandImmersion, DerivedRecord, ImmersionFlags};
