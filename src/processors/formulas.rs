//! Per-row physical estimates.
//!
//! Every function is total over `f64`: domain violations (square root of a
//! negative range, division by zero, arccos outside [-1, 1]) come back as NaN
//! rather than an error, so a single bad day never stops a run.

use crate::utils::constants::{
    CLOUD_BASE_LAPSE_M_PER_C, DAYS_PER_YEAR, DEW_POINT_RH_DIVISOR, MINUTES_PER_DAY,
    SOLAR_CONSTANT_MJ_M2_MIN,
};
use std::f64::consts::PI;

/// Lawrence approximation, `T - (100 - RH) / 5`.
///
/// Accuracy degrades below 50% relative humidity.
pub fn dew_point(temp_c: f64, rh_pct: f64) -> f64 {
    temp_c - (100.0 - rh_pct) / DEW_POINT_RH_DIVISOR
}

/// Cloud base height in metres from the dew point depression. Not clamped.
pub fn cloud_base_height(temp_c: f64, dew_point_c: f64) -> f64 {
    (temp_c - dew_point_c) * CLOUD_BASE_LAPSE_M_PER_C
}

fn year_angle(day_of_year: u32) -> f64 {
    2.0 * PI * f64::from(day_of_year) / DAYS_PER_YEAR
}

/// Inverse relative sun-earth distance, dr
pub fn inverse_relative_distance(day_of_year: u32) -> f64 {
    1.0 + 0.033 * year_angle(day_of_year).cos()
}

/// Solar declination in radians
pub fn solar_declination(day_of_year: u32) -> f64 {
    0.409 * (year_angle(day_of_year) - 1.39).sin()
}

/// Sunset hour angle in radians; NaN inside the polar circles
pub fn sunset_hour_angle(latitude_rad: f64, declination_rad: f64) -> f64 {
    (-latitude_rad.tan() * declination_rad.tan()).acos()
}

/// Daily extraterrestrial radiation Ra in MJ m-2 day-1.
///
/// Depends only on day of year and latitude, so the same day of year gives
/// the same value in every year.
pub fn extraterrestrial_radiation(day_of_year: u32, latitude_deg: f64) -> f64 {
    let lat = latitude_deg.to_radians();
    let dr = inverse_relative_distance(day_of_year);
    let decl = solar_declination(day_of_year);
    let ws = sunset_hour_angle(lat, decl);

    (MINUTES_PER_DAY / PI)
        * SOLAR_CONSTANT_MJ_M2_MIN
        * dr
        * (ws * lat.sin() * decl.sin() + lat.cos() * decl.cos() * ws.sin())
}

/// Hargreaves surface radiation, `k_rs * sqrt(Tmax - Tmin) * Ra`.
///
/// NaN when `max_temp_c < min_temp_c`.
pub fn surface_radiation(max_temp_c: f64, min_temp_c: f64, ra: f64, k_rs: f64) -> f64 {
    k_rs * (max_temp_c - min_temp_c).sqrt() * ra
}

/// Clearness index Kt = Rs / Ra; NaN where Ra is zero
pub fn cloudiness_index(surface_radiation: f64, ra: f64) -> f64 {
    if ra == 0.0 {
        return f64::NAN;
    }
    surface_radiation / ra
}

/// `Some(kt < threshold)`, or `None` when Kt is undefined
pub fn is_cloudy(cloudiness_index: f64, threshold: f64) -> Option<bool> {
    if cloudiness_index.is_nan() {
        None
    } else {
        Some(cloudiness_index < threshold)
    }
}

/// Three-valued `cloudy AND elevation >= cloud base`.
///
/// A known clear day is never immersed, whatever the cloud base.
pub fn is_immersed(
    is_cloudy: Option<bool>,
    elevation_m: f64,
    cloud_base_height_m: f64,
) -> Option<bool> {
    let above_base = if cloud_base_height_m.is_nan() {
        None
    } else {
        Some(elevation_m >= cloud_base_height_m)
    };

    match (is_cloudy, above_base) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}
