use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Output formats chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    /// Anything that is not `.parquet` is written as CSV
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("parquet") | Some("pq") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

/// `output/{stem}-{YYMMDD}.{extension}` for today's local date
fn dated_output_path(stem: &str, extension: &str) -> PathBuf {
    let now = Local::now();
    let filename = format!(
        "{}-{:02}{:02}{:02}.{}",
        stem,
        now.year() % 100,
        now.month(),
        now.day(),
        extension
    );
    PathBuf::from("output").join(filename)
}

pub fn generate_default_output_filename() -> PathBuf {
    dated_output_path("cloud-immersion", "parquet")
}

pub fn generate_default_rolling_filename() -> PathBuf {
    dated_output_path("cloud-immersion-rolling", "csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_output_filename() {
        let filename = generate_default_output_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/"));
        assert!(filename_str.contains("cloud-immersion-"));
        assert!(filename_str.ends_with(".parquet"));
        assert_eq!(OutputFormat::from_path(&filename), OutputFormat::Parquet);
    }

    #[test]
    fn test_generate_default_rolling_filename() {
        let filename = generate_default_rolling_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.contains("cloud-immersion-rolling-"));
        assert_eq!(OutputFormat::from_path(&filename), OutputFormat::Csv);
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("derived.PARQUET")),
            OutputFormat::Parquet
        );
        assert_eq!(OutputFormat::from_path(Path::new("derived.csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("derived")), OutputFormat::Csv);
    }
}
