use crate::error::{ProcessingError, Result};
use crate::models::DerivedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct SeriesStatistics {
    pub total_records: usize,
    pub date_range: (NaiveDate, NaiveDate),
    pub data_quality: DataQuality,
    pub cloud_base: CloudBaseStats,
    pub cloudiness: CloudinessStats,
    pub band_frequencies: Vec<BandFrequency>,
}

#[derive(Debug, Serialize)]
pub struct DataQuality {
    pub total_records: usize,
    pub complete_records: usize,
    pub missing_records: usize,
    pub undefined_cloudiness_records: usize,
}

impl DataQuality {
    pub fn complete_percentage(&self) -> f64 {
        percentage(self.complete_records, self.total_records)
    }

    pub fn missing_percentage(&self) -> f64 {
        percentage(self.missing_records, self.total_records)
    }
}

#[derive(Debug, Serialize)]
pub struct CloudBaseStats {
    pub mean_m: f64,
    pub min_m: f64,
    pub max_m: f64,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CloudinessStats {
    pub mean_index: f64,
    pub cloudy_days: usize,
    pub defined_days: usize,
}

impl CloudinessStats {
    pub fn cloudy_percentage(&self) -> f64 {
        percentage(self.cloudy_days, self.defined_days)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BandFrequency {
    pub elevation_m: u32,
    pub immersed_days: usize,
    pub defined_days: usize,
}

impl BandFrequency {
    pub fn frequency_percentage(&self) -> f64 {
        percentage(self.immersed_days, self.defined_days)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        f64::NAN
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn format_value(value: f64, unit: &str) -> String {
    if value.is_nan() {
        "No valid values".to_string()
    } else {
        format!("{:.1}{}", value, unit)
    }
}

pub struct SeriesAnalyzer;

impl SeriesAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, records: &[DerivedRecord]) -> Result<SeriesStatistics> {
        let first = records
            .first()
            .ok_or_else(|| ProcessingError::MissingData("No records to analyze".to_string()))?;

        let mut min_date = first.date();
        let mut max_date = first.date();
        let mut complete = 0;
        let mut undefined_cloudiness = 0;

        let mut cbh_sum = 0.0;
        let mut cbh_count = 0usize;
        let mut cbh_min = f64::INFINITY;
        let mut cbh_max = f64::NEG_INFINITY;
        let mut cbh_min_date = None;
        let mut cbh_max_date = None;

        let mut kt_sum = 0.0;
        let mut kt_count = 0usize;
        let mut cloudy_days = 0;
        let mut defined_days = 0;

        let mut bands: BTreeMap<u32, BandFrequency> = BTreeMap::new();

        for record in records {
            let date = record.date();
            min_date = min_date.min(date);
            max_date = max_date.max(date);

            if record.observation.is_complete() {
                complete += 1;
            }

            let cbh = record.cloud_base_height_m;
            if cbh.is_finite() {
                cbh_sum += cbh;
                cbh_count += 1;
                if cbh < cbh_min {
                    cbh_min = cbh;
                    cbh_min_date = Some(date);
                }
                if cbh > cbh_max {
                    cbh_max = cbh;
                    cbh_max_date = Some(date);
                }
            }

            if record.cloudiness_index.is_finite() {
                kt_sum += record.cloudiness_index;
                kt_count += 1;
            }

            match record.is_cloudy_day {
                Some(cloudy) => {
                    defined_days += 1;
                    if cloudy {
                        cloudy_days += 1;
                    }
                }
                None => undefined_cloudiness += 1,
            }

            for band in record.immersion.iter() {
                let entry = bands.entry(band.elevation_m).or_insert(BandFrequency {
                    elevation_m: band.elevation_m,
                    immersed_days: 0,
                    defined_days: 0,
                });
                if let Some(immersed) = band.immersed {
                    entry.defined_days += 1;
                    if immersed {
                        entry.immersed_days += 1;
                    }
                }
            }
        }

        let (cbh_mean, cbh_min, cbh_max) = if cbh_count > 0 {
            (cbh_sum / cbh_count as f64, cbh_min, cbh_max)
        } else {
            (f64::NAN, f64::NAN, f64::NAN)
        };

        Ok(SeriesStatistics {
            total_records: records.len(),
            date_range: (min_date, max_date),
            data_quality: DataQuality {
                total_records: records.len(),
                complete_records: complete,
                missing_records: records.len() - complete,
                undefined_cloudiness_records: undefined_cloudiness,
            },
            cloud_base: CloudBaseStats {
                mean_m: cbh_mean,
                min_m: cbh_min,
                max_m: cbh_max,
                min_date: cbh_min_date,
                max_date: cbh_max_date,
            },
            cloudiness: CloudinessStats {
                mean_index: if kt_count > 0 {
                    kt_sum / kt_count as f64
                } else {
                    f64::NAN
                },
                cloudy_days,
                defined_days,
            },
            band_frequencies: bands.into_values().collect(),
        })
    }
}

impl SeriesStatistics {
    pub fn summary(&self) -> String {
        format!(
            "Records: {} days\n\
            Date Range: {} to {} ({} years)\n\
            Data Quality: {:.1}% complete, {:.1}% missing\n\
            Mean Cloud Base: {}\n\
            Mean Cloudiness Index: {}\n\
            Cloudy Days: {} of {} ({})",
            self.total_records,
            self.date_range.0,
            self.date_range.1,
            self.date_range
                .1
                .signed_duration_since(self.date_range.0)
                .num_days()
                / 365,
            self.data_quality.complete_percentage(),
            self.data_quality.missing_percentage(),
            format_value(self.cloud_base.mean_m, " m"),
            format_value(self.cloudiness.mean_index, ""),
            self.cloudiness.cloudy_days,
            self.cloudiness.defined_days,
            format_value(self.cloudiness.cloudy_percentage(), "%"),
        )
    }

    pub fn detailed_summary(&self) -> String {
        let extreme = |value: f64, date: Option<NaiveDate>| match date {
            Some(date) if !value.is_nan() => format!("{:.0} m on {}", value, date),
            _ => "No valid values".to_string(),
        };

        let mut text = format!(
            "{}\n\n\
            Cloud Base Extremes:\n\
            - Lowest: {}\n\
            - Highest: {}\n\n\
            Immersion Frequency by Elevation:",
            self.summary(),
            extreme(self.cloud_base.min_m, self.cloud_base.min_date),
            extreme(self.cloud_base.max_m, self.cloud_base.max_date),
        );

        for band in &self.band_frequencies {
            text.push_str(&format!(
                "\n- {:>5} m: {} ({}/{} days)",
                band.elevation_m,
                format_value(band.frequency_percentage(), "%"),
                band.immersed_days,
                band.defined_days
            ));
        }

        text
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for SeriesAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
