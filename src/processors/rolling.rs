use crate::error::{ProcessingError, Result};
use crate::models::DerivedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Trailing, right-aligned rolling mean.
///
/// Position `i` holds the mean of `values[i + 1 - window..=i]` only when the
/// window is full and holds no NaN; every other position is NaN. No partial
/// averages are produced.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(ProcessingError::Config(
            "Rolling window length must be at least 1".to_string(),
        ));
    }

    let mut output = Vec::with_capacity(values.len());
    let mut missing = 0usize;

    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            missing += 1;
        }
        if i >= window && values[i - window].is_nan() {
            missing -= 1;
        }

        // Summed per window; a running total keeps the error of values that have left
        if i + 1 >= window && missing == 0 {
            let sum: f64 = values[i + 1 - window..=i].iter().sum();
            output.push(sum / window as f64);
        } else {
            output.push(f64::NAN);
        }
    }

    Ok(output)
}

/// 1.0 for true, 0.0 for false, NaN when undefined
pub fn flag_values<I>(flags: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<bool>>,
{
    flags
        .into_iter()
        .map(|flag| match flag {
            Some(true) => 1.0,
            Some(false) => 0.0,
            None => f64::NAN,
        })
        .collect()
}

/// Rolling share of `Some(true)` days as a percentage
pub fn rolling_percentage<I>(flags: I, window: usize) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = Option<bool>>,
{
    let means = rolling_mean(&flag_values(flags), window)?;
    Ok(means.into_iter().map(|m| m * 100.0).collect())
}

/// Rolling percentage of one elevation band
#[derive(Debug, Clone, Serialize)]
pub struct BandSeries {
    pub elevation_m: u32,
    pub immersed_pct: Vec<f64>,
}

/// Rolling cloudy-day and per-band immersion percentages aligned with dates
#[derive(Debug, Clone, Serialize)]
pub struct ImmersionSeries {
    pub window: usize,
    pub dates: Vec<NaiveDate>,
    pub cloudy_pct: Vec<f64>,
    pub bands: Vec<BandSeries>,
}

impl ImmersionSeries {
    pub fn from_derived(
        records: &[DerivedRecord],
        elevations: &[u32],
        window: usize,
    ) -> Result<Self> {
        let dates = records.iter().map(|r| r.date()).collect();
        let cloudy_pct = rolling_percentage(records.iter().map(|r| r.is_cloudy_day), window)?;

        let bands = elevations
            .iter()
            .map(|&elevation_m| {
                let flags = records
                    .iter()
                    .map(|r| r.immersion.get(elevation_m).flatten());
                Ok(BandSeries {
                    elevation_m,
                    immersed_pct: rolling_percentage(flags, window)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Built rolling series over {} days for {} bands (window {})",
            records.len(),
            elevations.len(),
            window
        );

        Ok(Self {
            window,
            dates,
            cloudy_pct,
            bands,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn band(&self, elevation_m: u32) -> Option<&[f64]> {
        self.bands
            .iter()
            .find(|b| b.elevation_m == elevation_m)
            .map(|b| b.immersed_pct.as_slice())
    }

    /// Index of the first position with a full window, if the series is long enough
    pub fn first_full_window(&self) -> Option<usize> {
        if self.len() >= self.window {
            Some(self.window - 1)
        } else {
            None
        }
    }
}
