use crate::error::{ProcessingError, Result};
use crate::models::{BandImmersion, DailyRecord, DerivedRecord, ImmersionFlags};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::csv_writer::{immersion_column, IMMERSION_COLUMN_PREFIX};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write derived records in batches of `batch_size` rows
    pub fn write_records(
        &self,
        records: &[DerivedRecord],
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let elevations: Vec<u32> = records[0].immersion.iter().map(|b| b.elevation_m).collect();
        let schema = self.create_schema(&elevations);

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in records.chunks(batch_size.max(1)) {
            let batch = self.records_to_batch(chunk, &elevations, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        info!("Wrote {} derived records to {}", records.len(), path.display());
        Ok(())
    }

    fn create_schema(&self, elevations: &[u32]) -> Arc<Schema> {
        let mut fields = vec![
            Field::new("date", DataType::Date32, false),
            Field::new("year", DataType::Int32, false),
            Field::new("day_of_year", DataType::UInt32, false),
            Field::new("mean_temp_c", DataType::Float64, true),
            Field::new("max_temp_c", DataType::Float64, true),
            Field::new("min_temp_c", DataType::Float64, true),
            Field::new("relative_humidity_pct", DataType::Float64, true),
            Field::new("dew_point_c", DataType::Float64, true),
            Field::new("cloud_base_height_m", DataType::Float64, true),
            Field::new("extraterrestrial_radiation", DataType::Float64, true),
            Field::new("surface_radiation", DataType::Float64, true),
            Field::new("cloudiness_index", DataType::Float64, true),
            Field::new("is_cloudy_day", DataType::Boolean, true),
        ];
        fields.extend(
            elevations
                .iter()
                .map(|&e| Field::new(immersion_column(e), DataType::Boolean, true)),
        );

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(
        &self,
        records: &[DerivedRecord],
        elevations: &[u32],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        // NaN is stored as null so downstream readers see a missing value
        let floats = |f: fn(&DerivedRecord) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from(
                records
                    .iter()
                    .map(|r| {
                        let v = f(r);
                        if v.is_nan() {
                            None
                        } else {
                            Some(v)
                        }
                    })
                    .collect::<Vec<Option<f64>>>(),
            ))
        };

        let dates: Vec<i32> = records
            .iter()
            .map(|r| r.date().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Date32Array::from(dates)),
            Arc::new(Int32Array::from(
                records.iter().map(|r| r.observation.year).collect::<Vec<i32>>(),
            )),
            Arc::new(UInt32Array::from(
                records
                    .iter()
                    .map(|r| r.observation.day_of_year)
                    .collect::<Vec<u32>>(),
            )),
            floats(|r| r.observation.mean_temp_c),
            floats(|r| r.observation.max_temp_c),
            floats(|r| r.observation.min_temp_c),
            floats(|r| r.observation.relative_humidity_pct),
            floats(|r| r.dew_point_c),
            floats(|r| r.cloud_base_height_m),
            floats(|r| r.extraterrestrial_radiation),
            floats(|r| r.surface_radiation),
            floats(|r| r.cloudiness_index),
            Arc::new(BooleanArray::from(
                records
                    .iter()
                    .map(|r| r.is_cloudy_day)
                    .collect::<Vec<Option<bool>>>(),
            )),
        ];

        for &elevation in elevations {
            columns.push(Arc::new(BooleanArray::from(
                records
                    .iter()
                    .map(|r| r.immersion.get(elevation).flatten())
                    .collect::<Vec<Option<bool>>>(),
            )));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read derived records back, restoring NaN for nulls
    pub fn read_records(&self, path: &Path) -> Result<Vec<DerivedRecord>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(8192)
            .build()?;

        let mut records = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let dates = column::<Date32Array>(&batch, "date")?;
            let years = column::<Int32Array>(&batch, "year")?;
            let days = column::<UInt32Array>(&batch, "day_of_year")?;
            let mean = column::<Float64Array>(&batch, "mean_temp_c")?;
            let max = column::<Float64Array>(&batch, "max_temp_c")?;
            let min = column::<Float64Array>(&batch, "min_temp_c")?;
            let rh = column::<Float64Array>(&batch, "relative_humidity_pct")?;
            let dew = column::<Float64Array>(&batch, "dew_point_c")?;
            let cbh = column::<Float64Array>(&batch, "cloud_base_height_m")?;
            let ra = column::<Float64Array>(&batch, "extraterrestrial_radiation")?;
            let rs = column::<Float64Array>(&batch, "surface_radiation")?;
            let kt = column::<Float64Array>(&batch, "cloudiness_index")?;
            let cloudy = column::<BooleanArray>(&batch, "is_cloudy_day")?;

            let schema = batch.schema();
            let mut bands = Vec::new();
            for field in schema.fields() {
                if let Some(elevation) = field
                    .name()
                    .strip_prefix(IMMERSION_COLUMN_PREFIX)
                    .and_then(|e| e.parse::<u32>().ok())
                {
                    bands.push((elevation, column::<BooleanArray>(&batch, field.name())?));
                }
            }

            for i in 0..batch.num_rows() {
                let date = dates.value_as_date(i).ok_or_else(|| {
                    ProcessingError::MissingData(format!("date in row {}", records.len()))
                })?;

                records.push(DerivedRecord {
                    observation: DailyRecord {
                        year: years.value(i),
                        day_of_year: days.value(i),
                        date,
                        mean_temp_c: float_at(mean, i),
                        max_temp_c: float_at(max, i),
                        min_temp_c: float_at(min, i),
                        relative_humidity_pct: float_at(rh, i),
                    },
                    dew_point_c: float_at(dew, i),
                    cloud_base_height_m: float_at(cbh, i),
                    extraterrestrial_radiation: float_at(ra, i),
                    surface_radiation: float_at(rs, i),
                    cloudiness_index: float_at(kt, i),
                    is_cloudy_day: flag_at(cloudy, i),
                    immersion: ImmersionFlags::new(
                        bands
                            .iter()
                            .map(|(elevation_m, array)| BandImmersion {
                                elevation_m: *elevation_m,
                                immersed: flag_at(array, i),
                            })
                            .collect(),
                    ),
                });
            }
        }

        debug!("Read {} derived records from {}", records.len(), path.display());
        Ok(records)
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            file_size,
            compression,
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::MissingData(format!("column '{}'", name)))
}

fn float_at(array: &Float64Array, i: usize) -> f64 {
    if array.is_null(i) {
        f64::NAN
    } else {
        array.value(i)
    }
}

fn flag_at(array: &BooleanArray, i: usize) -> Option<bool> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}
