pub mod evaluation;
pub mod mer;
pub mod pipeline;
pub mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MerqaError, Result};
use crate::media;

const MER_SUFFIX: &str = "_mer.pdf";

/// One recording belonging to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSource {
    /// 1-based, in file name order
    pub index: u32,
    pub path: PathBuf,
    pub name: String,
}

impl CallSource {
    pub fn is_video(&self) -> bool {
        media::is_video(&self.path)
    }
}

/// A MER document and the calls made to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub mer_pdf: PathBuf,
    pub calls: Vec<CallSource>,
}

/// Record id of a `<id>_MER.pdf` file name. The suffix is matched ignoring case.
pub fn record_id_from_mer(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(MER_SUFFIX.len())?;
    if split == 0 || !file_name.is_char_boundary(split) {
        return None;
    }
    let (id, suffix) = file_name.split_at(split);
    suffix.eq_ignore_ascii_case(MER_SUFFIX).then_some(id)
}

/// Whether `file_name` names a file of record `id`: it must start with the
/// id followed by the end of the name or a non-alphanumeric character, so
/// `R1_call.mp3` belongs to `R1` but not `R10`.
fn belongs_to(file_name: &str, id: &str) -> bool {
    match file_name.strip_prefix(id) {
        Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
        None => false,
    }
}

/// Discover records under `root`.
///
/// Every `<id>_MER.pdf` defines a record. Media files are attached to the
/// record with the longest matching id.
pub fn scan_records(root: &Path) -> Result<BTreeMap<String, Record>> {
    let mut records = BTreeMap::new();
    if !root.exists() {
        return Ok(records);
    }

    let mut files: Vec<(String, PathBuf)> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect();
    files.sort();

    for (name, path) in &files {
        if let Some(id) = record_id_from_mer(name) {
            records.entry(id.to_string()).or_insert_with(|| Record {
                id: id.to_string(),
                mer_pdf: path.clone(),
                calls: Vec::new(),
            });
        }
    }

    for (name, path) in &files {
        if !media::is_media(path) {
            continue;
        }
        let owner = records
            .keys()
            .filter(|id| belongs_to(name, id))
            .max_by_key(|id| id.len())
            .cloned();
        if let Some(id) = owner {
            if let Some(record) = records.get_mut(&id) {
                record.calls.push(CallSource {
                    index: 0,
                    path: path.clone(),
                    name: name.clone(),
                });
            }
        }
    }

    for record in records.values_mut() {
        record.calls.sort_by(|a, b| a.name.cmp(&b.name));
        for (i, call) in record.calls.iter_mut().enumerate() {
            call.index = i as u32 + 1;
        }
    }

    tracing::debug!("Found {} record(s) in {}", records.len(), root.display());
    Ok(records)
}

pub fn find_record(root: &Path, id: &str) -> Result<Record> {
    scan_records(root)?
        .remove(id)
        .ok_or_else(|| MerqaError::RecordNotFound(id.to_string()))
}
