//! Raw status dump files.
//!
//! With `--dump-dir`, every sampled `SHOW ENGINE INNODB STATUS` text is kept
//! as `pair-NNN.txt` so that a report can be re-parsed later with
//! `lockprobe parse`. Files are written to a temporary name in the same
//! directory and renamed into place, so a reader never sees a partial dump.

use crate::error::{LockProbeError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the dump for the pair at `index`.
pub fn dump_file_name(index: usize) -> String {
    format!("pair-{:03}.txt", index)
}

/// Write the dump for the pair at `index` into `dir`, creating `dir` if needed.
pub fn write_dump(dir: &Path, index: usize, dump: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| {
        LockProbeError::OutputError(format!(
            "failed to create dump directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let target = dir.join(dump_file_name(index));
    let temp = dir.join(format!(".{}.tmp", dump_file_name(index)));

    write_and_sync(&temp, dump.as_bytes())?;

    fs::rename(&temp, &target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        LockProbeError::OutputError(format!(
            "failed to move dump into '{}': {}",
            target.display(),
            e
        ))
    })?;

    Ok(target)
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        LockProbeError::OutputError(format!(
            "failed to create dump file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            LockProbeError::OutputError(format!(
                "failed to write dump file '{}': {}",
                path.display(),
                e
            ))
        })
}
