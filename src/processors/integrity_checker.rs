use crate::models::{DailyRecord, DerivedRecord};
use crate::utils::constants::LOW_CONFIDENCE_RH_PCT;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub complete_records: usize,
    pub missing_data_records: usize,
    pub low_confidence_records: usize,
    pub missing_days: usize,
    pub violations: Vec<DomainViolation>,
}

impl IntegrityReport {
    pub fn count_by_type(&self) -> BTreeMap<ViolationType, usize> {
        let mut counts = BTreeMap::new();
        for violation in &self.violations {
            *counts.entry(violation.violation_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainViolation {
    pub date: NaiveDate,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ViolationType {
    HumidityOutOfRange,
    MaxBelowMin,
    MeanOutsideRange,
    NegativeCloudBase,
    LowConfidenceDewPoint,
    MissingObservation,
    CalendarGap,
    OutOfOrder,
}

impl ViolationType {
    pub fn label(&self) -> &'static str {
        match self {
            ViolationType::HumidityOutOfRange => "humidity outside 0-100%",
            ViolationType::MaxBelowMin => "max temperature below min",
            ViolationType::MeanOutsideRange => "mean temperature outside min/max",
            ViolationType::NegativeCloudBase => "negative cloud base height",
            ViolationType::LowConfidenceDewPoint => "dew point below 50% RH",
            ViolationType::MissingObservation => "missing observation",
            ViolationType::CalendarGap => "calendar gap",
            ViolationType::OutOfOrder => "out of order or duplicate date",
        }
    }
}

/// Reports domain problems without rejecting or altering any record
pub struct IntegrityChecker {
    low_confidence_rh_pct: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            low_confidence_rh_pct: LOW_CONFIDENCE_RH_PCT,
        }
    }

    /// Check observations only
    pub fn check_observations(&self, records: &[DailyRecord]) -> IntegrityReport {
        let mut report = IntegrityReport {
            total_records: records.len(),
            complete_records: 0,
            missing_data_records: 0,
            low_confidence_records: 0,
            missing_days: 0,
            violations: Vec::new(),
        };

        for record in records {
            self.check_record(record, &mut report);
        }

        self.check_time_series(records, &mut report);

        if report.has_violations() {
            warn!(
                "Found {} domain violations in {} records",
                report.violations.len(),
                report.total_records
            );
        } else {
            info!("All {} records passed integrity checks", report.total_records);
        }

        report
    }

    /// Check observations plus the derived cloud base height
    pub fn check_derived(&self, records: &[DerivedRecord]) -> IntegrityReport {
        let observations: Vec<DailyRecord> = records.iter().map(|r| r.observation).collect();
        let mut report = self.check_observations(&observations);

        for record in records {
            if record.cloud_base_height_m < 0.0 {
                report.violations.push(DomainViolation {
                    date: record.date(),
                    violation_type: ViolationType::NegativeCloudBase,
                    details: format!(
                        "cloud base height {:.0} m (RH {:.1}%)",
                        record.cloud_base_height_m, record.observation.relative_humidity_pct
                    ),
                });
            }
        }

        report
    }

    fn check_record(&self, record: &DailyRecord, report: &mut IntegrityReport) {
        if record.has_missing_data() {
            report.missing_data_records += 1;
            report.violations.push(DomainViolation {
                date: record.date,
                violation_type: ViolationType::MissingObservation,
                details: "one or more observed values missing".to_string(),
            });
        } else {
            report.complete_records += 1;
        }

        let rh = record.relative_humidity_pct;
        if !rh.is_nan() {
            if !(0.0..=100.0).contains(&rh) {
                report.violations.push(DomainViolation {
                    date: record.date,
                    violation_type: ViolationType::HumidityOutOfRange,
                    details: format!("relative humidity {:.1}%", rh),
                });
            }

            if rh < self.low_confidence_rh_pct {
                report.low_confidence_records += 1;
                report.violations.push(DomainViolation {
                    date: record.date,
                    violation_type: ViolationType::LowConfidenceDewPoint,
                    details: format!(
                        "relative humidity {:.1}% below {:.0}%",
                        rh, self.low_confidence_rh_pct
                    ),
                });
            }
        }

        let (min, mean, max) = (record.min_temp_c, record.mean_temp_c, record.max_temp_c);
        if max < min {
            report.violations.push(DomainViolation {
                date: record.date,
                violation_type: ViolationType::MaxBelowMin,
                details: format!("max {:.1}°C < min {:.1}°C", max, min),
            });
        } else if mean < min || mean > max {
            report.violations.push(DomainViolation {
                date: record.date,
                violation_type: ViolationType::MeanOutsideRange,
                details: format!("mean {:.1}°C outside [{:.1}, {:.1}]°C", mean, min, max),
            });
        }
    }

    fn check_time_series(&self, records: &[DailyRecord], report: &mut IntegrityReport) {
        for window in records.windows(2) {
            let prev = &window[0];
            let curr = &window[1];
            let step = (curr.date - prev.date).num_days();

            if step <= 0 {
                report.violations.push(DomainViolation {
                    date: curr.date,
                    violation_type: ViolationType::OutOfOrder,
                    details: format!("{} follows {}", curr.date, prev.date),
                });
            } else if step > 1 {
                report.missing_days += (step - 1) as usize;
                report.violations.push(DomainViolation {
                    date: curr.date,
                    violation_type: ViolationType::CalendarGap,
                    details: format!("{} days missing after {}", step - 1, prev.date),
                });
            }
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();
        let pct = |n: usize| {
            if report.total_records == 0 {
                0.0
            } else {
                100.0 * n as f64 / report.total_records as f64
            }
        };

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        summary.push_str(&format!(
            "Complete Records: {} ({:.1}%)\n",
            report.complete_records,
            pct(report.complete_records)
        ));
        summary.push_str(&format!(
            "Missing Data Records: {} ({:.1}%)\n",
            report.missing_data_records,
            pct(report.missing_data_records)
        ));
        summary.push_str(&format!(
            "Low-Confidence Dew Point: {} ({:.1}%)\n",
            report.low_confidence_records,
            pct(report.low_confidence_records)
        ));
        summary.push_str(&format!("Missing Calendar Days: {}\n", report.missing_days));
        summary.push_str(&format!("\nDomain Violations: {}\n", report.violations.len()));

        for (violation_type, count) in report.count_by_type() {
            summary.push_str(&format!("  {}: {}\n", violation_type.label(), count));
        }

        if report.has_violations() {
            summary.push_str("\nFirst 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {}: {}\n",
                    i + 1,
                    violation.date,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::processors::FeaturePipeline;

    fn record(doy: u32, mean: f64, max: f64, min: f64, rh: f64) -> DailyRecord {
        DailyRecord::new(2018, doy, mean, max, min, rh).unwrap()
    }

    #[test]
    fn test_clean_series() {
        let records = vec![
            record(1, 22.0, 26.0, 19.0, 85.0),
            record(2, 23.0, 27.0, 20.0, 82.0),
        ];
        let report = IntegrityChecker::new().check_observations(&records);

        assert_eq!(report.total_records, 2);
        assert_eq!(report.complete_records, 2);
        assert!(!report.has_violations());
    }

    #[test]
    fn test_domain_violations_reported_not_rejected() {
        let records = vec![
            record(1, 22.0, 20.0, 23.0, 85.0),
            record(2, 30.0, 27.0, 20.0, 104.0),
            record(3, 23.0, 27.0, 20.0, 40.0),
            record(4, 23.0, 27.0, 20.0, f64::NAN),
        ];
        let report = IntegrityChecker::new().check_observations(&records);
        let counts = report.count_by_type();

        assert_eq!(report.total_records, 4);
        assert_eq!(counts.get(&ViolationType::MaxBelowMin), Some(&1));
        assert_eq!(counts.get(&ViolationType::MeanOutsideRange), Some(&1));
        assert_eq!(counts.get(&ViolationType::HumidityOutOfRange), Some(&1));
        assert_eq!(counts.get(&ViolationType::LowConfidenceDewPoint), Some(&1));
        assert_eq!(counts.get(&ViolationType::MissingObservation), Some(&1));
        assert_eq!(report.low_confidence_records, 1);
        assert_eq!(report.missing_data_records, 1);
    }

    #[test]
    fn test_calendar_checks() {
        let records = vec![
            record(10, 22.0, 26.0, 19.0, 85.0),
            record(14, 22.0, 26.0, 19.0, 85.0),
            record(14, 22.0, 26.0, 19.0, 85.0),
        ];
        let report = IntegrityChecker::new().check_observations(&records);
        let counts = report.count_by_type();

        assert_eq!(report.missing_days, 3);
        assert_eq!(counts.get(&ViolationType::CalendarGap), Some(&1));
        assert_eq!(counts.get(&ViolationType::OutOfOrder), Some(&1));
    }

    #[test]
    fn test_negative_cloud_base_from_derived() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
        let derived = pipeline.derive(&[record(1, 22.0, 26.0, 19.0, 104.0)]);
        let report = IntegrityChecker::new().check_derived(&derived);

        assert_eq!(
            report.count_by_type().get(&ViolationType::NegativeCloudBase),
            Some(&1)
        );
    }

    #[test]
    fn test_summary_mentions_counts() {
        let records = vec![record(1, 22.0, 20.0, 23.0, 85.0)];
        let checker = IntegrityChecker::new();
        let summary = checker.generate_summary(&checker.check_observations(&records));

        assert!(summary.contains("Total Records: 1"));
        assert!(summary.contains("max temperature below min: 1"));
    }

    #[test]
    fn test_empty_summary_has_no_nan() {
        let checker = IntegrityChecker::new();
        let summary = checker.generate_summary(&checker.check_observations(&[]));
        assert!(!summary.contains("NaN"));
    }
}
