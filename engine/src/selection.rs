//! Grouping of a raw file selection into pipeline entries.

use indexmap::IndexMap;

use crate::config::PipelineConfig;
use crate::ids::IdSource;
use crate::model::{EntrySource, Mode, SelectedFile, UploadEntry};

/// Build waiting entries for `files`.
///
/// Single mode yields one entry per file. Bulk mode groups files by the
/// first component of their relative path; files without a folder each get
/// their own synthetic folder. Groups keep first-seen order.
pub fn group_selection(
    mode: Mode,
    files: Vec<SelectedFile>,
    config: &PipelineConfig,
    ids: &dyn IdSource,
) -> Vec<UploadEntry> {
    match mode {
        Mode::Single => files
            .into_iter()
            .map(|file| {
                UploadEntry::new(
                    ids.entry_id(),
                    file.name,
                    EntrySource::File {
                        size_bytes: file.size_bytes,
                    },
                )
            })
            .collect(),
        Mode::Bulk => {
            let mut groups: IndexMap<String, Vec<SelectedFile>> = IndexMap::new();
            for file in files {
                let folder = top_level_folder(&file).unwrap_or_else(|| ids.folder_name());
                groups.entry(folder).or_default().push(file);
            }
            groups
                .into_iter()
                .map(|(folder, members)| {
                    let supported_count =
                        members.iter().filter(|f| config.accepts(&f.name)).count();
                    UploadEntry::new(
                        ids.entry_id(),
                        folder,
                        EntrySource::Folder {
                            file_count: members.len(),
                            supported_count,
                        },
                    )
                })
                .collect()
        }
    }
}

/// First path component when the file sits inside at least one folder.
fn top_level_folder(file: &SelectedFile) -> Option<String> {
    let path = file.relative_path.as_deref()?;
    let mut parts = path.split(['/', '\\']).filter(|p| !p.is_empty());
    let first = parts.next()?;
    parts.next()?;
    Some(first.to_string())
}
