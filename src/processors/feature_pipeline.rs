use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{BandImmersion, DailyRecord, DerivedRecord, ImmersionFlags};
use crate::processors::formulas;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use tracing::{debug, info};

/// Turns daily observations into derived records, one for one and in order
pub struct FeaturePipeline {
    config: PipelineConfig,
    elevations: Vec<u32>,
    /// Ra for day of year 1..=366, indexed by `doy - 1`
    radiation_table: Vec<f64>,
    max_workers: usize,
    chunk_size: usize,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate_settings()?;

        let elevations = config.elevation_bands.elevations();
        let radiation_table = (1..=366)
            .map(|doy| formulas::extraterrestrial_radiation(doy, config.latitude_deg))
            .collect();

        debug!(
            "Pipeline at latitude {} with {} elevation bands",
            config.latitude_deg,
            elevations.len()
        );

        Ok(Self {
            config,
            elevations,
            radiation_table,
            max_workers: 1,
            chunk_size: crate::utils::constants::DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn elevations(&self) -> &[u32] {
        &self.elevations
    }

    fn radiation_for(&self, day_of_year: u32) -> f64 {
        day_of_year
            .checked_sub(1)
            .and_then(|i| self.radiation_table.get(i as usize))
            .copied()
            .unwrap_or_else(|| {
                formulas::extraterrestrial_radiation(day_of_year, self.config.latitude_deg)
            })
    }

    /// Derive every quantity for a single day
    pub fn derive_record(&self, record: &DailyRecord) -> DerivedRecord {
        let dew_point_c = formulas::dew_point(record.mean_temp_c, record.relative_humidity_pct);
        let cloud_base_height_m = formulas::cloud_base_height(record.mean_temp_c, dew_point_c);
        let ra = self.radiation_for(record.day_of_year);
        let rs = formulas::surface_radiation(
            record.max_temp_c,
            record.min_temp_c,
            ra,
            self.config.k_rs,
        );
        let kt = formulas::cloudiness_index(rs, ra);
        let is_cloudy_day = formulas::is_cloudy(kt, self.config.cloudy_threshold);

        let immersion = ImmersionFlags::new(
            self.elevations
                .iter()
                .map(|&elevation_m| BandImmersion {
                    elevation_m,
                    immersed: formulas::is_immersed(
                        is_cloudy_day,
                        f64::from(elevation_m),
                        cloud_base_height_m,
                    ),
                })
                .collect(),
        );

        DerivedRecord {
            observation: *record,
            dew_point_c,
            cloud_base_height_m,
            extraterrestrial_radiation: ra,
            surface_radiation: rs,
            cloudiness_index: kt,
            is_cloudy_day,
            immersion,
        }
    }

    /// Sequential single pass; the reference behaviour
    pub fn derive(&self, records: &[DailyRecord]) -> Vec<DerivedRecord> {
        let derived: Vec<DerivedRecord> = records.iter().map(|r| self.derive_record(r)).collect();
        info!("Derived {} records", derived.len());
        derived
    }

    /// Row-parallel derivation on a dedicated pool; output order matches input
    pub fn derive_parallel(
        &self,
        records: &[DailyRecord],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<DerivedRecord>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        if let Some(p) = progress {
            p.set_message(&format!(
                "Deriving {} records on {} workers...",
                records.len(),
                self.max_workers
            ));
        }

        let chunks: Vec<Vec<DerivedRecord>> = pool.install(|| {
            records
                .par_chunks(self.chunk_size)
                .map(|chunk| {
                    let derived: Vec<DerivedRecord> =
                        chunk.iter().map(|r| self.derive_record(r)).collect();

                    if let Some(p) = progress {
                        p.increment(chunk.len() as u64);
                    }

                    derived
                })
                .collect()
        });

        let derived: Vec<DerivedRecord> = chunks.into_iter().flatten().collect();
        info!(
            "Derived {} records in parallel on {} workers",
            derived.len(),
            self.max_workers
        );

        Ok(derived)
    }

    /// Sequential unless more than one worker was requested
    pub fn run(
        &self,
        records: &[DailyRecord],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<DerivedRecord>> {
        if self.max_workers > 1 {
            self.derive_parallel(records, progress)
        } else {
            Ok(self.derive(records))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElevationBands;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn pipeline() -> FeaturePipeline {
        FeaturePipeline::new(PipelineConfig::default()).unwrap()
    }

    fn series(days: usize, mean: f64, max: f64, min: f64, rh: f64) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        (0..days)
            .map(|i| DailyRecord::from_date(start + Duration::days(i as i64), mean, max, min, rh))
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let pipeline = pipeline();
        let record = DailyRecord::new(2015, 100, 25.0, 30.0, 22.0, 80.0).unwrap();
        let derived = pipeline.derive_record(&record);

        assert!((derived.dew_point_c - 21.0).abs() < 1e-9);
        assert!((derived.cloud_base_height_m - 500.0).abs() < 1e-9);

        let expected_rs = 0.19 * 8f64.sqrt() * derived.extraterrestrial_radiation;
        assert!((derived.surface_radiation - expected_rs).abs() < 1e-9);
        assert!((derived.cloudiness_index - 0.19 * 8f64.sqrt()).abs() < 1e-9);
        assert_eq!(derived.is_cloudy_day, Some(false));
        assert_eq!(derived.immersion.lowest_immersed(), None);
    }

    #[test]
    fn test_output_matches_input_order_and_length() {
        let pipeline = pipeline();
        let records = series(400, 22.0, 24.0, 21.0, 95.0);
        let derived = pipeline.derive(&records);

        assert_eq!(derived.len(), records.len());
        for (input, output) in records.iter().zip(&derived) {
            assert_eq!(&output.observation, input);
        }
    }

    #[test]
    fn test_radiation_invariant_across_years() {
        let pipeline = pipeline();
        let a = DailyRecord::new(2001, 45, 20.0, 25.0, 18.0, 90.0).unwrap();
        let b = DailyRecord::new(2019, 45, 26.0, 27.0, 24.0, 60.0).unwrap();
        let a = pipeline.derive_record(&a);
        let b = pipeline.derive_record(&b);

        assert_eq!(a.extraterrestrial_radiation, b.extraterrestrial_radiation);
    }

    #[test]
    fn test_low_cloud_base_immerses_every_band() {
        // Range of 1 degree keeps Kt well under 0.25
        let pipeline = pipeline();
        let record = DailyRecord::new(2015, 200, 22.0, 22.5, 21.5, 96.0).unwrap();
        let derived = pipeline.derive_record(&record);

        assert_eq!(derived.is_cloudy_day, Some(true));
        assert!((derived.cloud_base_height_m - 100.0).abs() < 1e-9);
        assert_eq!(derived.immersion.len(), 35);
        assert!(derived.immersion.iter().all(|b| b.immersed == Some(true)));
    }

    #[test]
    fn test_cloudy_day_immersion_is_monotonic() {
        let pipeline = pipeline();

        // Cloud bases from 850 m down to 150 m, all inside the band range
        for rh in [66.0, 72.0, 80.0, 84.0, 88.0, 92.0, 94.0] {
            let record = DailyRecord::new(2015, 200, 22.0, 22.5, 21.5, rh).unwrap();
            let derived = pipeline.derive_record(&record);
            assert_eq!(derived.is_cloudy_day, Some(true));

            let flags: Vec<bool> = derived
                .immersion
                .iter()
                .map(|b| b.immersed.unwrap())
                .collect();
            let first_immersed = flags.iter().position(|&f| f).unwrap();

            assert_eq!(flags.len(), 35);
            assert!(flags[..first_immersed].iter().all(|&f| !f), "rh {}", rh);
            assert!(flags[first_immersed..].iter().all(|&f| f), "rh {}", rh);
        }

        // RH 84 -> base 400 m: 10 clear bands (150..=375), then 25 immersed
        let record = DailyRecord::new(2015, 200, 22.0, 22.5, 21.5, 84.0).unwrap();
        let derived = pipeline.derive_record(&record);
        let flags: Vec<Option<bool>> = derived.immersion.iter().map(|b| b.immersed).collect();

        let mut expected = vec![Some(false); 10];
        expected.extend(vec![Some(true); 25]);
        assert_eq!(flags, expected);
    }

    #[test]
    fn test_partial_immersion() {
        let pipeline = pipeline();
        // RH 84 -> depression 3.2 C -> base 400 m
        let record = DailyRecord::new(2015, 200, 22.0, 22.5, 21.5, 84.0).unwrap();
        let derived = pipeline.derive_record(&record);

        assert_eq!(derived.immersion.get(375), Some(Some(false)));
        assert_eq!(derived.immersion.get(400), Some(Some(true)));
        assert_eq!(derived.immersion.get(1000), Some(Some(true)));
        assert_eq!(derived.immersion.lowest_immersed(), Some(400));
    }

    #[test]
    fn test_inverted_temperature_range_propagates_as_missing() {
        let pipeline = pipeline();
        let record = DailyRecord::new(2015, 10, 22.0, 20.0, 23.0, 90.0).unwrap();
        let derived = pipeline.derive_record(&record);

        assert!(derived.surface_radiation.is_nan());
        assert!(derived.cloudiness_index.is_nan());
        assert_eq!(derived.is_cloudy_day, None);

        // Base at 250 m: lower bands are known to be clear of it
        assert_eq!(derived.immersion.get(150), Some(Some(false)));
        assert_eq!(derived.immersion.get(250), Some(None));
        assert_eq!(derived.immersion.get(1000), Some(None));
    }

    #[test]
    fn test_constant_series_gives_constant_features() {
        let pipeline = pipeline();
        let derived = pipeline.derive(&series(730, 22.0, 22.5, 21.5, 90.0));

        let first = &derived[0];
        for d in &derived {
            assert_eq!(d.cloud_base_height_m, first.cloud_base_height_m);
            assert!((d.cloudiness_index - first.cloudiness_index).abs() < 1e-12);
            assert_eq!(d.is_cloudy_day, first.is_cloudy_day);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let records: Vec<DailyRecord> = (0..2500)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + Duration::days(i);
                let wobble = (i % 17) as f64 * 0.3;
                DailyRecord::from_date(date, 20.0 + wobble, 22.0 + wobble, 19.0, 70.0 + wobble)
            })
            .collect();

        let sequential = pipeline().derive(&records);
        let parallel = pipeline()
            .with_max_workers(4)
            .with_chunk_size(128)
            .run(&records, None)
            .unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.date(), p.date());
            assert_eq!(s.immersion, p.immersion);
            assert_eq!(s.cloud_base_height_m.to_bits(), p.cloud_base_height_m.to_bits());
        }
    }

    #[test]
    fn test_parallel_progress_counts_every_day() {
        let records = series(1000, 22.0, 24.0, 21.0, 90.0);
        let progress = ProgressReporter::new(records.len() as u64, "Deriving", false);

        let derived = pipeline()
            .with_max_workers(2)
            .with_chunk_size(64)
            .run(&records, Some(&progress))
            .unwrap();

        assert_eq!(derived.len(), 1000);
        assert_eq!(progress.position(), 1000);
    }

    #[test]
    fn test_custom_bands() {
        let config = PipelineConfig::default()
            .with_elevation_bands(ElevationBands::new(100, 300, 100).unwrap());
        let pipeline = FeaturePipeline::new(config).unwrap();

        assert_eq!(pipeline.elevations(), &[100, 200, 300]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::default().with_latitude(75.0);
        assert!(FeaturePipeline::new(config).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(pipeline().derive(&[]).is_empty());
    }
}
