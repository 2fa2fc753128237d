//! Flat-file store: one fullname per line in an append-only file.
//!
//! # Recovery
//!
//! Opening the file loads every complete line. If the final line has no
//! trailing newline (crash mid-write), the file is truncated at the start of
//! that line so the next append starts on a clean line.
//!
//! # fsync Strategy
//!
//! `add` hands the line to the OS before returning, so a claim survives the
//! process dying while its handlers run. `flush` fsyncs; the poll loop calls
//! it once per cycle, so only an OS crash or power loss can drop the claims
//! of the current cycle.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::fsync::{fsync_dir, fsync_file};
use super::{DedupStore, Result, StoreError};
use crate::types::Fullname;

/// A [`DedupStore`] persisted to a text file.
#[derive(Debug)]
pub struct FlatFileStore {
    seen: HashSet<Fullname>,
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FlatFileStore {
    /// Opens the store at `path`, creating the file if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();

        let seen = if existed {
            load_and_repair(&path)?
        } else {
            HashSet::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if !existed
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fsync_dir(parent)?;
        }

        debug!(path = %path.display(), entries = seen.len(), "opened dedup store");
        Ok(FlatFileStore {
            seen,
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads every complete line, truncating a trailing partial line.
fn load_and_repair(path: &Path) -> Result<HashSet<Fullname>> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut seen = HashSet::new();
    let mut valid_len: u64 = 0;
    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        if !line.ends_with('\n') {
            break;
        }
        valid_len += bytes_read as u64;

        let entry = line.trim();
        if !entry.is_empty() {
            seen.insert(Fullname::new(entry));
        }
    }

    if valid_len < file_len {
        warn!(
            path = %path.display(),
            dropped_bytes = file_len - valid_len,
            "truncating partial line"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(valid_len)?;
        fsync_file(&file)?;
    }

    Ok(seen)
}

impl DedupStore for FlatFileStore {
    fn contains(&self, fullname: &Fullname) -> bool {
        self.seen.contains(fullname)
    }

    fn add(&mut self, fullname: &Fullname) -> Result<bool> {
        if self.seen.contains(fullname) {
            return Ok(false);
        }
        let entry = fullname.as_str();
        if entry.contains(['\n', '\r']) {
            return Err(StoreError::InvalidFullname(entry.to_string()));
        }
        writeln!(self.writer, "{}", entry)?;
        self.writer.flush()?;
        self.seen.insert(fullname.clone());
        Ok(true)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        fsync_file(self.writer.get_ref())?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}
