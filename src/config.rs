use crate::error::{ProcessingError, Result};
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Evenly spaced elevation bands, inclusive at both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ElevationBands {
    pub min_m: u32,
    pub max_m: u32,

    #[validate(range(min = 1))]
    pub step_m: u32,
}

impl Default for ElevationBands {
    fn default() -> Self {
        Self {
            min_m: DEFAULT_BAND_MIN_M,
            max_m: DEFAULT_BAND_MAX_M,
            step_m: DEFAULT_BAND_STEP_M,
        }
    }
}

impl ElevationBands {
    pub fn new(min_m: u32, max_m: u32, step_m: u32) -> Result<Self> {
        let bands = Self {
            min_m,
            max_m,
            step_m,
        };
        bands.validate_range()?;
        Ok(bands)
    }

    pub fn validate_range(&self) -> Result<()> {
        self.validate()?;

        if self.min_m > self.max_m {
            return Err(ProcessingError::Config(format!(
                "Elevation band minimum {} m exceeds maximum {} m",
                self.min_m, self.max_m
            )));
        }

        if (self.max_m - self.min_m) % self.step_m != 0 {
            return Err(ProcessingError::Config(format!(
                "Elevation range {}..={} m is not a whole number of {} m steps",
                self.min_m, self.max_m, self.step_m
            )));
        }

        Ok(())
    }

    /// Band elevations in ascending order
    pub fn elevations(&self) -> Vec<u32> {
        if self.step_m == 0 || self.min_m > self.max_m {
            return Vec::new();
        }
        (self.min_m..=self.max_m)
            .step_by(self.step_m as usize)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elevations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Site and threshold settings for feature derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude_deg: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub k_rs: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub cloudy_threshold: f64,

    #[validate(nested)]
    pub elevation_bands: ElevationBands,

    #[validate(range(min = 1))]
    pub rolling_window_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            latitude_deg: DEFAULT_LATITUDE_DEG,
            k_rs: DEFAULT_K_RS,
            cloudy_threshold: DEFAULT_CLOUDY_THRESHOLD,
            elevation_bands: ElevationBands::default(),
            rolling_window_length: DEFAULT_ROLLING_WINDOW,
        }
    }
}

impl PipelineConfig {
    pub fn with_latitude(mut self, latitude_deg: f64) -> Self {
        self.latitude_deg = latitude_deg;
        self
    }

    pub fn with_k_rs(mut self, k_rs: f64) -> Self {
        self.k_rs = k_rs;
        self
    }

    pub fn with_cloudy_threshold(mut self, threshold: f64) -> Self {
        self.cloudy_threshold = threshold;
        self
    }

    pub fn with_elevation_bands(mut self, bands: ElevationBands) -> Self {
        self.elevation_bands = bands;
        self
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window_length = window;
        self
    }

    /// Field ranges, band layout and the sunset hour angle domain.
    ///
    /// A latitude inside the polar circles gives `|-tan(lat) tan(decl)| > 1`
    /// on some days, which leaves the extraterrestrial radiation undefined for
    /// the whole year. That is rejected here rather than per row.
    pub fn validate_settings(&self) -> Result<()> {
        self.validate()?;
        self.elevation_bands.validate_range()?;

        if self.k_rs <= 0.0 {
            return Err(ProcessingError::Config(format!(
                "k_rs must be positive, got {}",
                self.k_rs
            )));
        }

        let lat_rad = self.latitude_deg.to_radians();
        for doy in 1..=366 {
            let decl = crate::processors::formulas::solar_declination(doy);
            let arg = -lat_rad.tan() * decl.tan();
            if !(-1.0..=1.0).contains(&arg) {
                return Err(ProcessingError::Config(format!(
                    "Latitude {} has no sunset on day {} (arccos argument {:.3})",
                    self.latitude_deg, doy, arg
                )));
            }
        }

        Ok(())
    }
}

/// Column names expected in the observation file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub year: String,
    pub day_of_year: String,
    pub mean_temp: String,
    pub max_temp: String,
    pub min_temp: String,
    pub humidity: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            year: COLUMN_YEAR.to_string(),
            day_of_year: COLUMN_DOY.to_string(),
            mean_temp: COLUMN_MEAN_TEMP.to_string(),
            max_temp: COLUMN_MAX_TEMP.to_string(),
            min_temp: COLUMN_MIN_TEMP.to_string(),
            humidity: COLUMN_HUMIDITY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Lines dropped unconditionally before anything else
    pub skip_lines: usize,
    /// Preamble terminator; lines up to and including it are dropped when present
    pub header_end_marker: Option<String>,
    pub delimiter: String,
    pub fill_value: f64,
    pub columns: ColumnNames,
    pub use_mmap: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            skip_lines: 0,
            header_end_marker: Some(DEFAULT_HEADER_END_MARKER.to_string()),
            delimiter: ",".to_string(),
            fill_value: DEFAULT_FILL_VALUE,
            columns: ColumnNames::default(),
            use_mmap: false,
        }
    }
}

impl ReaderConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(ProcessingError::Config(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub reader: ReaderConfig,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then `CLOUD_IMMERSION__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.pipeline.validate_settings()?;
        app_config.reader.delimiter_byte()?;

        Ok(app_config)
    }
}
