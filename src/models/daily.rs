use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// One day of observations at the site. Missing values are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub year: i32,
    pub day_of_year: u32,
    pub date: NaiveDate,
    pub mean_temp_c: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub relative_humidity_pct: f64,
}

/// Jan 1 of `year` plus `day_of_year - 1` days.
///
/// Day 366 of a common year rolls over to Jan 1 of the next year.
pub fn date_from_day_of_year(year: i32, day_of_year: u32) -> Result<NaiveDate> {
    if !(1..=366).contains(&day_of_year) {
        return Err(ProcessingError::InvalidDayOfYear { year, day_of_year });
    }

    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|jan1| jan1.checked_add_signed(Duration::days(i64::from(day_of_year) - 1)))
        .ok_or(ProcessingError::InvalidDayOfYear { year, day_of_year })
}

impl DailyRecord {
    pub fn new(
        year: i32,
        day_of_year: u32,
        mean_temp_c: f64,
        max_temp_c: f64,
        min_temp_c: f64,
        relative_humidity_pct: f64,
    ) -> Result<Self> {
        let date = date_from_day_of_year(year, day_of_year)?;

        Ok(Self {
            year,
            day_of_year,
            date,
            mean_temp_c,
            max_temp_c,
            min_temp_c,
            relative_humidity_pct,
        })
    }

    /// Build from a calendar date; year and day of year follow from it
    pub fn from_date(
        date: NaiveDate,
        mean_temp_c: f64,
        max_temp_c: f64,
        min_temp_c: f64,
        relative_humidity_pct: f64,
    ) -> Self {
        Self {
            year: date.year(),
            day_of_year: date.ordinal(),
            date,
            mean_temp_c,
            max_temp_c,
            min_temp_c,
            relative_humidity_pct,
        }
    }

    pub fn temperature_range(&self) -> f64 {
        self.max_temp_c - self.min_temp_c
    }

    pub fn has_missing_data(&self) -> bool {
        self.mean_temp_c.is_nan()
            || self.max_temp_c.is_nan()
            || self.min_temp_c.is_nan()
            || self.relative_humidity_pct.is_nan()
    }

    pub fn is_complete(&self) -> bool {
        !self.has_missing_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_reconstruction() {
        let date = date_from_day_of_year(2021, 1).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());

        let date = date_from_day_of_year(2020, 60).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());

        let date = date_from_day_of_year(2020, 366).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
    }

    #[test]
    fn test_day_366_of_common_year_rolls_over() {
        let date = date_from_day_of_year(2021, 366).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    }

    #[test]
    fn test_invalid_day_of_year() {
        assert!(date_from_day_of_year(2021, 0).is_err());
        assert!(date_from_day_of_year(2021, 367).is_err());
    }

    #[test]
    fn test_record_from_date() {
        let date = NaiveDate::from_ymd_opt(2019, 3, 1).unwrap();
        let record = DailyRecord::from_date(date, 24.0, 29.0, 20.0, 85.0);

        assert_eq!(record.year, 2019);
        assert_eq!(record.day_of_year, 60);
        assert_eq!(record.temperature_range(), 9.0);
        assert!(record.is_complete());
    }

    #[test]
    fn test_missing_data_detection() {
        let record = DailyRecord::new(2019, 10, 24.0, f64::NAN, 20.0, 85.0).unwrap();
        assert!(record.has_missing_data());
        assert!(record.temperature_range().is_nan());
    }
}
