//! JSONL (JSON Lines) storage.
//!
//! One JSON object per line. Readers skip lines that do not parse and
//! report how many were skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::StorageError;

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append items to the file.
    pub fn append_batch(&self, items: &[T]) -> Result<usize, StorageError> {
        if items.is_empty() {
            return Ok(0);
        }
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let count = write_lines(BufWriter::new(file), items)?;

        info!("Appended {} rows to {:?}", count, self.path);
        Ok(count)
    }

    /// Write items, replacing the entire file.
    pub fn write_all(&self, items: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let count = write_lines(BufWriter::new(file), items)?;

        info!("Wrote {} rows to {:?}", count, self.path);
        Ok(count)
    }
}

fn write_lines<T: Serialize, W: Write>(mut writer: W, items: &[T]) -> Result<usize, StorageError> {
    for item in items {
        let json = serde_json::to_string(item)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;
    Ok(items.len())
}

/// Items read from a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlRead<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all items, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.read_counted()?.items)
    }

    /// Read all items and count the lines that failed to parse.
    ///
    /// A missing file reads as empty.
    pub fn read_counted(&self) -> Result<JsonlRead<T>, StorageError> {
        let mut read = JsonlRead {
            items: Vec::new(),
            skipped: 0,
        };
        if !self.path.exists() {
            return Ok(read);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(item) => read.items.push(item),
                Err(e) => {
                    read.skipped += 1;
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        index + 1,
                        self.path,
                        e
                    );
                }
            }
        }

        debug!(
            "Read {} rows from {:?} ({} skipped)",
            read.items.len(),
            self.path,
            read.skipped
        );
        Ok(read)
    }
}
