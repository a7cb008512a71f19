//! "Game Music Files" container
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! 0x00  "Game Music Files"         16-byte signature
//! 0x10  u32 count                  number of embedded files
//! 0x14  u32 offset[count]          absolute byte offset of each file
//! ....  file data                  concatenated, in table order
//! ```
//!
//! Each embedded file is independently openable media holding one track. A
//! file extends to the next larger offset in the table, or to the end of the
//! container.

use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Leading bytes of every container
pub const SIGNATURE: &[u8; 16] = b"Game Music Files";

const COUNT_OFFSET: usize = 0x10;
const TABLE_OFFSET: usize = 0x14;

/// Errors reading or writing a container
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Missing \"Game Music Files\" signature")]
    BadSignature,

    #[error("Container truncated: table needs {needed} bytes, file has {found}")]
    Truncated { needed: usize, found: usize },

    #[error("Entry {index} offset {offset:#x} lies outside the container ({len} bytes)")]
    OffsetOutOfBounds { index: usize, offset: u32, len: usize },

    #[error("Container would exceed 4 GiB")]
    TooLarge,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether `data` starts with the container signature
pub fn is_container(data: &[u8]) -> bool {
    data.len() >= SIGNATURE.len() && &data[..SIGNATURE.len()] == SIGNATURE
}

fn read_u32_be(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Parsed offset table of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    entries: Vec<Range<usize>>,
}

impl Container {
    /// Parse and validate the table at the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self, ContainerError> {
        if !is_container(data) {
            return Err(ContainerError::BadSignature);
        }
        if data.len() < TABLE_OFFSET {
            return Err(ContainerError::Truncated {
                needed: TABLE_OFFSET,
                found: data.len(),
            });
        }

        let count = read_u32_be(data, COUNT_OFFSET) as usize;
        let table_end = count
            .checked_mul(4)
            .and_then(|bytes| bytes.checked_add(TABLE_OFFSET))
            .ok_or(ContainerError::TooLarge)?;
        if data.len() < table_end {
            return Err(ContainerError::Truncated {
                needed: table_end,
                found: data.len(),
            });
        }

        let offsets: Vec<u32> = (0..count)
            .map(|i| read_u32_be(data, TABLE_OFFSET + i * 4))
            .collect();

        let mut sorted = offsets.clone();
        sorted.sort_unstable();

        let mut entries = Vec::with_capacity(count);
        for (index, &offset) in offsets.iter().enumerate() {
            let start = offset as usize;
            if start < table_end || start > data.len() {
                return Err(ContainerError::OffsetOutOfBounds {
                    index,
                    offset,
                    len: data.len(),
                });
            }
            let end = sorted
                .iter()
                .find(|&&o| o > offset)
                .map(|&o| o as usize)
                .unwrap_or(data.len());
            entries.push(start..end);
        }

        log::debug!("Container with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte range of entry `index` within the container data
    pub fn entry(&self, index: usize) -> Option<Range<usize>> {
        self.entries.get(index).cloned()
    }
}

/// Write a container holding `blobs` in the given order
///
/// Returns the total number of bytes written.
pub fn write_container<W: Write>(out: &mut W, blobs: &[Vec<u8>]) -> Result<usize, ContainerError> {
    let header_len = TABLE_OFFSET + 4 * blobs.len();
    let total = blobs
        .iter()
        .try_fold(header_len, |acc, blob| acc.checked_add(blob.len()))
        .ok_or(ContainerError::TooLarge)?;
    if total > u32::MAX as usize {
        return Err(ContainerError::TooLarge);
    }

    out.write_all(SIGNATURE)?;
    out.write_all(&(blobs.len() as u32).to_be_bytes())?;
    let mut offset = header_len;
    for blob in blobs {
        out.write_all(&(offset as u32).to_be_bytes())?;
        offset += blob.len();
    }
    for blob in blobs {
        out.write_all(blob)?;
    }
    Ok(total)
}

/// Pack `inputs` into a container at `output`, in alphabetical order
///
/// Returns the packed paths in the order they were stored.
pub fn pack_files(output: &Path, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, ContainerError> {
    let mut ordered = inputs.to_vec();
    ordered.sort();

    let mut blobs = Vec::with_capacity(ordered.len());
    for path in &ordered {
        let blob = std::fs::read(path).map_err(|source| ContainerError::Read {
            path: path.clone(),
            source,
        })?;
        log::info!("Packing {:?} ({} bytes)", path, blob.len());
        blobs.push(blob);
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(output)?);
    let written = write_container(&mut file, &blobs)?;
    file.flush()?;
    log::info!("Wrote {:?}: {} entries, {} bytes", output, blobs.len(), written);
    Ok(ordered)
}
