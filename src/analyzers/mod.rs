pub mod series_analyzer;

pub use series_analyzer::{BandFrequency, SeriesAnalyzer, SeriesStatistics};
