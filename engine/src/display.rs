//! Human-readable text for entries, as shown next to each progress bar.

use crate::model::{EntrySource, EntryStatus, UploadEntry};

/// Describe an entry's current stage.
pub fn status_text(entry: &UploadEntry) -> String {
    match entry.status {
        EntryStatus::Waiting => "Waiting to process".to_string(),
        EntryStatus::Uploading => "Uploading...".to_string(),
        EntryStatus::Classifying => match &entry.classification {
            Some(class) => format!("Classifying document type: {}", class),
            None => "Classifying document type".to_string(),
        },
        EntryStatus::Extracting => match entry.extracted_field_count {
            Some(count) => format!("Extracting data ({} fields found)", count),
            None => "Extracting data".to_string(),
        },
        EntryStatus::Validating => "Validating against checklist".to_string(),
        EntryStatus::Processing => "Processing documents...".to_string(),
        EntryStatus::Completed => match (&entry.source, &entry.classification) {
            (EntrySource::Folder { file_count, .. }, _) => {
                format!("Completed - {} documents processed", file_count)
            }
            (EntrySource::File { .. }, Some(class)) => format!("Completed - {}", class),
            (EntrySource::File { .. }, None) => "Completed".to_string(),
        },
        EntryStatus::Error => match &entry.error_message {
            Some(reason) => format!("Processing failed: {}", reason),
            None => "Processing failed".to_string(),
        },
    }
}

/// Format a byte count with binary units, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    let rounded = format!("{:.2}", size);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryId;

    fn entry(source: EntrySource) -> UploadEntry {
        UploadEntry::new(EntryId::from_u128(1), "title.pdf", source)
    }

    #[test]
    fn test_file_status_texts() {
        let mut e = entry(EntrySource::File { size_bytes: 1 });
        assert_eq!(status_text(&e), "Waiting to process");

        e.advance(EntryStatus::Classifying, 40).expect("advance");
        assert_eq!(status_text(&e), "Classifying document type");
        e.classification = Some("Title Document".to_string());
        assert_eq!(status_text(&e), "Classifying document type: Title Document");

        e.advance(EntryStatus::Extracting, 70).expect("advance");
        e.extracted_field_count = Some(8);
        assert_eq!(status_text(&e), "Extracting data (8 fields found)");

        e.advance(EntryStatus::Completed, 100).expect("advance");
        assert_eq!(status_text(&e), "Completed - Title Document");
    }

    #[test]
    fn test_folder_and_error_texts() {
        let mut folder = entry(EntrySource::Folder {
            file_count: 5,
            supported_count: 5,
        });
        folder.advance(EntryStatus::Completed, 100).expect("advance");
        assert_eq!(status_text(&folder), "Completed - 5 documents processed");

        let mut failed = entry(EntrySource::File { size_bytes: 0 });
        failed.fail("file is empty").expect("fail");
        assert_eq!(status_text(&failed), "Processing failed: file is empty");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
