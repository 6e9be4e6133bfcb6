//! Pipeline configuration.
//!
//! `PipelineConfig` can be built in code (`Default`) or loaded from a TOML
//! file. Every loader validates the result before handing it out.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

/// Formats listed in the upload hint ("PDF, PNG, JPG, ZIP").
pub const DEFAULT_ACCEPTED_FORMATS: &[&str] = &["pdf", "png", "jpg", "jpeg", "zip"];

/// Tunables for stage timing and the entry failure checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Divides every stage hold and bulk stagger (1 = real prototype timing)
    pub time_scale: u32,

    /// Bulk start offset applied per submission position
    pub bulk_stagger_ms: u64,

    /// Lowercase extensions without the dot
    pub accepted_formats: Vec<String>,

    /// Fail files (and folders with no usable file) outside `accepted_formats`
    pub reject_unsupported_formats: bool,

    /// Fail zero-byte files during upload
    pub reject_empty_files: bool,

    /// Field count reported by the extraction stage
    pub extracted_field_count: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            time_scale: 1,
            bulk_stagger_ms: 1000,
            accepted_formats: DEFAULT_ACCEPTED_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reject_unsupported_formats: true,
            reject_empty_files: true,
            extracted_field_count: 8,
        }
    }
}

impl PipelineConfig {
    /// Read and validate a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| IntakeError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, IntakeError> {
        let mut config: PipelineConfig = toml::from_str(text)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.time_scale == 0 {
            return Err(IntakeError::InvalidConfig(
                "time_scale must be at least 1".to_string(),
            ));
        }
        if self.reject_unsupported_formats && self.accepted_formats.is_empty() {
            return Err(IntakeError::InvalidConfig(
                "accepted_formats cannot be empty while reject_unsupported_formats is on"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Scale a prototype delay by `time_scale`.
    pub fn scaled(&self, delay: Duration) -> Duration {
        delay / self.time_scale.max(1)
    }

    /// Start offset for the bulk entry at `position` in submission order.
    pub fn stagger_for(&self, position: usize) -> Duration {
        let offset = self.bulk_stagger_ms.saturating_mul(position as u64);
        self.scaled(Duration::from_millis(offset))
    }

    /// Whether `file_name` has one of the accepted extensions.
    pub fn accepts(&self, file_name: &str) -> bool {
        match extension_of(file_name) {
            Some(ext) => self.accepted_formats.iter().any(|f| f == &ext),
            None => false,
        }
    }

    fn normalize(&mut self) {
        for format in &mut self.accepted_formats {
            *format = format.trim().trim_start_matches('.').to_lowercase();
        }
        self.accepted_formats.retain(|f| !f.is_empty());
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.time_scale, 1);
        assert_eq!(config.bulk_stagger_ms, 1000);
        assert_eq!(config.extracted_field_count, 8);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str("time_scale = 10\n").expect("parse");
        assert_eq!(config.time_scale, 10);
        assert_eq!(config.bulk_stagger_ms, 1000);
        assert!(config.reject_unsupported_formats);
    }

    #[test]
    fn test_formats_are_normalized() {
        let config =
            PipelineConfig::from_toml_str("accepted_formats = [\".PDF\", \" Tiff \"]\n").expect("parse");
        assert_eq!(config.accepted_formats, vec!["pdf".to_string(), "tiff".to_string()]);
        assert!(config.accepts("scan.TIFF"));
        assert!(!config.accepts("scan.png"));
    }

    #[test]
    fn test_rejects_zero_time_scale() {
        let result = PipelineConfig::from_toml_str("time_scale = 0\n");
        assert!(matches!(result, Err(IntakeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = PipelineConfig::from_toml_str("speed = 3\n");
        assert!(matches!(result, Err(IntakeError::ConfigParse(_))));
    }

    #[test]
    fn test_rejects_empty_formats_when_checking() {
        let result = PipelineConfig::from_toml_str("accepted_formats = []\n");
        assert!(result.is_err());

        let config = PipelineConfig::from_toml_str(
            "accepted_formats = []\nreject_unsupported_formats = false\n",
        )
        .expect("parse");
        assert!(!config.accepts("title.pdf"));
    }

    #[test]
    fn test_accepts_checks_extension() {
        let config = PipelineConfig::default();
        assert!(config.accepts("title.pdf"));
        assert!(config.accepts("PHOTO.JPEG"));
        assert!(!config.accepts("notes.txt"));
        assert!(!config.accepts("pdf"));
        assert!(!config.accepts(".pdf"));
    }

    #[test]
    fn test_scaling() {
        let config = PipelineConfig {
            time_scale: 4,
            ..PipelineConfig::default()
        };
        assert_eq!(config.scaled(Duration::from_millis(2000)), Duration::from_millis(500));
        assert_eq!(config.stagger_for(0), Duration::ZERO);
        assert_eq!(config.stagger_for(3), Duration::from_millis(750));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("intake.toml");
        let mut file = fs::File::create(&path).expect("Failed to create config");
        file.write_all(b"bulk_stagger_ms = 250\nreject_empty_files = false\n")
            .expect("Failed to write config");
        drop(file);

        let config = PipelineConfig::load(&path).expect("load");
        assert_eq!(config.bulk_stagger_ms, 250);
        assert!(!config.reject_empty_files);

        let missing = PipelineConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(IntakeError::ConfigRead { .. })));
    }
}
