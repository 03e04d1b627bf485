/// Default site latitude (degrees north)
pub const DEFAULT_LATITUDE_DEG: f64 = 18.3;

/// Hargreaves radiation adjustment coefficient for coastal sites
pub const DEFAULT_K_RS: f64 = 0.19;

/// Clearness index below which a day counts as densely overcast
pub const DEFAULT_CLOUDY_THRESHOLD: f64 = 0.25;

/// Elevation band range in metres (inclusive at both ends)
pub const DEFAULT_BAND_MIN_M: u32 = 150;
pub const DEFAULT_BAND_MAX_M: u32 = 1000;
pub const DEFAULT_BAND_STEP_M: u32 = 25;

/// Trailing rolling window length in observations
pub const DEFAULT_ROLLING_WINDOW: usize = 1000;

/// Dew point approximation constants
pub const DEW_POINT_RH_DIVISOR: f64 = 5.0;
pub const LOW_CONFIDENCE_RH_PCT: f64 = 50.0;

/// Metres of cloud base per degree of dew point depression
pub const CLOUD_BASE_LAPSE_M_PER_C: f64 = 125.0;

/// Solar constant expressed in MJ m-2 min-1
pub const SOLAR_CONSTANT_MJ_M2_MIN: f64 = 0.0820;
pub const MINUTES_PER_DAY: f64 = 1440.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Input file defaults (NASA POWER daily point export)
pub const DEFAULT_HEADER_END_MARKER: &str = "-END HEADER-";
pub const DEFAULT_FILL_VALUE: f64 = -999.0;
pub const COLUMN_YEAR: &str = "YEAR";
pub const COLUMN_DOY: &str = "DOY";
pub const COLUMN_MEAN_TEMP: &str = "T2M";
pub const COLUMN_MAX_TEMP: &str = "T2M_MAX";
pub const COLUMN_MIN_TEMP: &str = "T2M_MIN";
pub const COLUMN_HUMIDITY: &str = "RH2M";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CLOUD_IMMERSION";

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
