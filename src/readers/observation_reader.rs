use crate::config::ReaderConfig;
use crate::error::{ProcessingError, Result};
use crate::models::DailyRecord;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use csv::{ReaderBuilder, StringRecord, Trim};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Column positions resolved from the header row
struct ColumnIndex {
    year: usize,
    day_of_year: usize,
    mean_temp: usize,
    max_temp: usize,
    min_temp: usize,
    humidity: usize,
}

/// Reads daily point observations from a delimited text export
pub struct ObservationReader {
    config: ReaderConfig,
}

impl ObservationReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.config.use_mmap = use_mmap;
        self
    }

    /// Read all observations from a file, in file order
    pub fn read_observations(&self, path: &Path) -> Result<Vec<DailyRecord>> {
        debug!("Reading observations from {}", path.display());

        let records = if self.config.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            let content = std::str::from_utf8(&mmap).map_err(|e| ProcessingError::InvalidFormat {
                line: 0,
                message: format!("Invalid UTF-8: {}", e),
            })?;
            self.parse_str(content)?
        } else {
            let file = File::open(path)?;
            let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
            let mut content = String::new();
            reader.read_to_string(&mut content)?;
            self.parse_str(&content)?
        };

        info!("Read {} observations from {}", records.len(), path.display());
        Ok(records)
    }

    /// Parse file content already held in memory
    pub fn parse_str(&self, content: &str) -> Result<Vec<DailyRecord>> {
        let (skipped, data) = self.data_section(content);
        debug!("Skipped {} preamble lines", skipped);

        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter_byte()?)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(data.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = self.resolve_columns(&headers)?;

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let line = skipped + row.position().map_or(0, |p| p.line() as usize);
            records.push(self.parse_row(&row, &columns, line)?);
        }

        Ok(records)
    }

    /// Drop `skip_lines`, then everything through the end-of-header marker if it occurs
    fn data_section<'a>(&self, content: &'a str) -> (usize, &'a str) {
        let mut offset = 0;
        let mut skipped = 0;

        for line in content.split_inclusive('\n').take(self.config.skip_lines) {
            offset += line.len();
            skipped += 1;
        }

        let rest = &content[offset..];
        if let Some(marker) = self.config.header_end_marker.as_deref() {
            let mut marker_offset = 0;
            for (i, line) in rest.split_inclusive('\n').enumerate() {
                marker_offset += line.len();
                if line.trim() == marker {
                    return (skipped + i + 1, &rest[marker_offset..]);
                }
            }
        }

        (skipped, rest)
    }

    fn resolve_columns(&self, headers: &StringRecord) -> Result<ColumnIndex> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| ProcessingError::MissingData(format!("column '{}'", name)))
        };
        let names = &self.config.columns;

        Ok(ColumnIndex {
            year: find(&names.year)?,
            day_of_year: find(&names.day_of_year)?,
            mean_temp: find(&names.mean_temp)?,
            max_temp: find(&names.max_temp)?,
            min_temp: find(&names.min_temp)?,
            humidity: find(&names.humidity)?,
        })
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        columns: &ColumnIndex,
        line: usize,
    ) -> Result<DailyRecord> {
        let field = |index: usize| row.get(index).unwrap_or("");

        let year = field(columns.year)
            .parse::<i32>()
            .map_err(|_| ProcessingError::InvalidFormat {
                line,
                message: format!("Invalid year: '{}'", field(columns.year)),
            })?;

        let day_of_year = field(columns.day_of_year)
            .parse::<u32>()
            .map_err(|_| ProcessingError::InvalidFormat {
                line,
                message: format!("Invalid day of year: '{}'", field(columns.day_of_year)),
            })?;

        DailyRecord::new(
            year,
            day_of_year,
            self.parse_value(field(columns.mean_temp), line)?,
            self.parse_value(field(columns.max_temp), line)?,
            self.parse_value(field(columns.min_temp), line)?,
            self.parse_value(field(columns.humidity), line)?,
        )
        .map_err(|e| ProcessingError::InvalidFormat {
            line,
            message: e.to_string(),
        })
    }

    /// Empty cells and the fill value become NaN
    fn parse_value(&self, raw: &str, line: usize) -> Result<f64> {
        if raw.is_empty() {
            return Ok(f64::NAN);
        }

        let value = raw.parse::<f64>().map_err(|_| ProcessingError::InvalidFormat {
            line,
            message: format!("Invalid number: '{}'", raw),
        })?;

        if value == self.config.fill_value {
            Ok(f64::NAN)
        } else {
            Ok(value)
        }
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}
