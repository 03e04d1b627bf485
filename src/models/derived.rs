use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DailyRecord;

/// Immersion state of one elevation band on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandImmersion {
    pub elevation_m: u32,
    /// `None` when the cloudy flag or the cloud base height is undefined
    pub immersed: Option<bool>,
}

/// Per-band immersion flags in ascending elevation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmersionFlags {
    bands: Vec<BandImmersion>,
}

impl ImmersionFlags {
    pub fn new(bands: Vec<BandImmersion>) -> Self {
        Self { bands }
    }

    pub fn get(&self, elevation_m: u32) -> Option<Option<bool>> {
        self.bands
            .iter()
            .find(|b| b.elevation_m == elevation_m)
            .map(|b| b.immersed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandImmersion> {
        self.bands.iter()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Lowest band whose flag is `Some(true)`
    pub fn lowest_immersed(&self) -> Option<u32> {
        self.bands
            .iter()
            .find(|b| b.immersed == Some(true))
            .map(|b| b.elevation_m)
    }
}

/// Observation plus every quantity derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub observation: DailyRecord,
    pub dew_point_c: f64,
    pub cloud_base_height_m: f64,
    /// Ra, MJ m-2 day-1
    pub extraterrestrial_radiation: f64,
    /// Rs, MJ m-2 day-1
    pub surface_radiation: f64,
    /// Kt = Rs / Ra
    pub cloudiness_index: f64,
    pub is_cloudy_day: Option<bool>,
    pub immersion: ImmersionFlags,
}

impl DerivedRecord {
    pub fn date(&self) -> NaiveDate {
        self.observation.date
    }

    pub fn has_undefined_values(&self) -> bool {
        self.dew_point_c.is_nan()
            || self.cloud_base_height_m.is_nan()
            || self.surface_radiation.is_nan()
            || self.cloudiness_index.is_nan()
            || self.is_cloudy_day.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> ImmersionFlags {
        ImmersionFlags::new(vec![
            BandImmersion {
                elevation_m: 150,
                immersed: Some(false),
            },
            BandImmersion {
                elevation_m: 175,
                immersed: Some(true),
            },
            BandImmersion {
                elevation_m: 200,
                immersed: Some(true),
            },
        ])
    }

    #[test]
    fn test_flag_lookup() {
        let flags = flags();

        assert_eq!(flags.len(), 3);
        assert_eq!(flags.get(150), Some(Some(false)));
        assert_eq!(flags.get(200), Some(Some(true)));
        assert_eq!(flags.get(160), None);
        assert_eq!(flags.lowest_immersed(), Some(175));
    }

    #[test]
    fn test_empty_flags() {
        let flags = ImmersionFlags::default();
        assert!(flags.is_empty());
        assert_eq!(flags.lowest_immersed(), None);
    }
}
