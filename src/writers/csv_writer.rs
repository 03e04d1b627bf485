use crate::error::Result;
use crate::models::DerivedRecord;
use crate::processors::ImmersionSeries;
use csv::WriterBuilder;
use std::path::Path;
use tracing::info;

/// Column names shared by every derived-record output
pub const DERIVED_COLUMNS: [&str; 13] = [
    "date",
    "year",
    "day_of_year",
    "mean_temp_c",
    "max_temp_c",
    "min_temp_c",
    "relative_humidity_pct",
    "dew_point_c",
    "cloud_base_height_m",
    "extraterrestrial_radiation",
    "surface_radiation",
    "cloudiness_index",
    "is_cloudy_day",
];

pub const IMMERSION_COLUMN_PREFIX: &str = "immersed_";

pub fn immersion_column(elevation_m: u32) -> String {
    format!("{}{}", IMMERSION_COLUMN_PREFIX, elevation_m)
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn format_flag(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "true".to_string(),
        Some(false) => "false".to_string(),
        None => String::new(),
    }
}

/// Writes derived tables as delimited text; missing values are empty cells
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// One row per record; band columns follow the first record's bands
    pub fn write_records(&self, records: &[DerivedRecord], path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        let elevations: Vec<u32> = records
            .first()
            .map(|r| r.immersion.iter().map(|b| b.elevation_m).collect())
            .unwrap_or_default();

        let mut header: Vec<String> = DERIVED_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(elevations.iter().map(|&e| immersion_column(e)));
        writer.write_record(&header)?;

        for record in records {
            let obs = &record.observation;
            let mut row = vec![
                obs.date.to_string(),
                obs.year.to_string(),
                obs.day_of_year.to_string(),
                format_float(obs.mean_temp_c),
                format_float(obs.max_temp_c),
                format_float(obs.min_temp_c),
                format_float(obs.relative_humidity_pct),
                format_float(record.dew_point_c),
                format_float(record.cloud_base_height_m),
                format_float(record.extraterrestrial_radiation),
                format_float(record.surface_radiation),
                format_float(record.cloudiness_index),
                format_flag(record.is_cloudy_day),
            ];
            row.extend(
                elevations
                    .iter()
                    .map(|&e| format_flag(record.immersion.get(e).flatten())),
            );
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("Wrote {} derived records to {}", records.len(), path.display());
        Ok(())
    }

    /// Rolling cloudy-day and per-band immersion percentages
    pub fn write_immersion_series(&self, series: &ImmersionSeries, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        let mut header = vec!["date".to_string(), "cloudy_pct".to_string()];
        header.extend(
            series
                .bands
                .iter()
                .map(|b| format!("{}_pct", immersion_column(b.elevation_m))),
        );
        writer.write_record(&header)?;

        for (i, date) in series.dates.iter().enumerate() {
            let mut row = vec![date.to_string(), format_float(series.cloudy_pct[i])];
            row.extend(series.bands.iter().map(|b| format_float(b.immersed_pct[i])));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!(
            "Wrote {} rolling rows (window {}) to {}",
            series.len(),
            series.window,
            path.display()
        );
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ElevationBands, PipelineConfig};
    use crate::models::DailyRecord;
    use crate::processors::FeaturePipeline;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn pipeline() -> FeaturePipeline {
        let config = PipelineConfig::default()
            .with_elevation_bands(ElevationBands::new(200, 300, 100).unwrap());
        FeaturePipeline::new(config).unwrap()
    }

    #[test]
    fn test_write_derived_csv() -> Result<()> {
        let derived = pipeline().derive(&[
            DailyRecord::new(2017, 32, 22.0, 22.5, 21.5, 90.0)?,
            DailyRecord::new(2017, 33, 22.0, 20.0, 23.0, 90.0)?,
        ]);
        let temp_file = NamedTempFile::new()?;

        CsvWriter::new().write_records(&derived, temp_file.path())?;

        let content = std::fs::read_to_string(temp_file.path())?;
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("is_cloudy_day,immersed_200,immersed_300"));
        assert!(lines[1].starts_with("2017-02-01,2017,32,22,22.5,21.5,90,"));
        assert!(lines[1].ends_with(",true,false,true"));
        // Undefined cloudiness leaves empty cells
        assert!(lines[2].ends_with(",,,false,"));

        Ok(())
    }

    #[test]
    fn test_write_immersion_series() -> Result<()> {
        let pipeline = pipeline();
        let records: Vec<DailyRecord> = (1..=4)
            .map(|doy| DailyRecord::new(2017, doy, 22.0, 22.5, 21.5, 90.0))
            .collect::<Result<_>>()?;
        let derived = pipeline.derive(&records);
        let series = ImmersionSeries::from_derived(&derived, pipeline.elevations(), 2)?;
        let temp_file = NamedTempFile::new()?;

        CsvWriter::new().write_immersion_series(&series, temp_file.path())?;

        let content = std::fs::read_to_string(temp_file.path())?;
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "date,cloudy_pct,immersed_200_pct,immersed_300_pct");
        assert_eq!(lines[1], "2017-01-01,,,");
        assert_eq!(lines[2], "2017-01-02,100,0,100");
        assert_eq!(lines.len(), 5);

        Ok(())
    }
}
