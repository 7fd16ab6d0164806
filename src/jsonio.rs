//! Reading and writing the flat JSON array files every tool works on.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::error::{kind_of, DataError};

/// Read a file whose top level must be a JSON array.
pub fn read_array(path: &Path) -> Result<Vec<Value>, DataError> {
    let raw = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&raw).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match json {
        Value::Array(arr) => Ok(arr),
        other => Err(DataError::NotArray {
            path: path.to_path_buf(),
            found: kind_of(&other),
        }),
    }
}

/// Like [`read_array`], but a missing file is an empty list.
pub fn read_array_or_empty(path: &Path) -> Result<Vec<Value>, DataError> {
    if path.exists() {
        read_array(path)
    } else {
        Ok(Vec::new())
    }
}

/// One input that loaded successfully.
#[derive(Debug)]
pub struct Source {
    pub path: PathBuf,
    pub records: Vec<Value>,
}

/// Load every path in order, skipping (with a warning) any that is missing,
/// unreadable, malformed or not an array. Returns the loaded sources and the
/// skipped paths.
pub fn load_sources(paths: &[PathBuf]) -> (Vec<Source>, Vec<PathBuf>) {
    let mut loaded = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();

    for path in paths {
        if !path.exists() {
            warn!("source {} not found, skipping", path.display());
            skipped.push(path.clone());
            continue;
        }
        match read_array(path) {
            Ok(records) => {
                info!("loaded {} records from {}", records.len(), path.display());
                loaded.push(Source {
                    path: path.clone(),
                    records,
                });
            }
            Err(e) => {
                warn!("skipping {e}");
                skipped.push(path.clone());
            }
        }
    }

    (loaded, skipped)
}

/// Output layout: app bundles are compact, working files are indented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Compact,
    Pretty,
}

/// Serialize `data` to `path`, replacing any previous content.
///
/// The bytes go to a sibling `.tmp` file first and are renamed into place, so
/// an interrupted write leaves the old file intact.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
    layout: Layout,
) -> Result<(), DataError> {
    let write_err = |source| DataError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let tmp = tmp_path(path);
    {
        let file = fs::File::create(&tmp).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        let res = match layout {
            Layout::Compact => serde_json::to_writer(&mut writer, data),
            Layout::Pretty => serde_json::to_writer_pretty(&mut writer, data),
        };
        res.map_err(|e| write_err(e.into()))?;
        writer.flush().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
