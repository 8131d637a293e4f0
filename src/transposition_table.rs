use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::bitboard::Side;
use crate::WIDTH;

/// Exact encoding of a grid's contents, see [`BitBoard::key`](crate::bitboard::BitBoard::key)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CacheKey(pub u64);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#014x}", self.0)
    }
}

/// How a cached score relates to the true minimax value
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Bound {
    Exact,
    /// the true value is at least the score
    Lower,
    /// the true value is at most the score
    Upper,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct CacheEntry {
    pub score: i64,
    /// the search depth the score was computed at
    pub depth: u32,
    pub column: Option<usize>,
    pub bound: Bound,
    /// the side that was to move when the entry was stored
    pub to_move: Side,
}

/// A shared, unbounded map from grid contents to search results
///
/// Clones share the same storage, so the search and the watchdog can hold
/// handles to one cache. All access goes through a single lock.
#[derive(Clone, Default)]
pub struct TranspositionCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    path: Option<PathBuf>,
}

impl TranspositionCache {
    /// Creates an empty cache that is never persisted
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache persisted at `path`
    ///
    /// A missing or unreadable file gives an empty cache, which is saved to `path` later.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match File::open(&path) {
            Ok(file) => match read_entries(BufReader::new(file)) {
                Ok(entries) => {
                    debug!("loaded {} cache entries from {}", entries.len(), path.display());
                    entries
                }
                Err(err) => {
                    warn!("ignoring unreadable cache file {}: {:#}", path.display(), err);
                    HashMap::new()
                }
            },
            Err(err) => {
                debug!("no cache file at {}: {}", path.display(), err);
                HashMap::new()
            }
        };
        Self {
            entries: Arc::new(RwLock::new(entries)),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the whole cache to the path it was loaded from, if any
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Overwrites `path` with the whole cache
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create cache file {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        write_entries(&mut writer, &entries)
            .with_context(|| format!("failed to write cache file {}", path.display()))?;
        writer.flush()?;
        debug!("saved {} cache entries to {}", entries.len(), path.display());
        Ok(())
    }

    /// Fetches the entry for `key` if it was searched at least `min_depth` deep,
    /// or at any depth when `lazy` is set
    pub fn lookup(&self, key: CacheKey, min_depth: u32, lazy: bool) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key)
            .copied()
            .filter(|entry| lazy || entry.depth >= min_depth)
    }

    /// Stores an entry, replacing whatever was cached for `key`
    pub fn store(&self, key: CacheKey, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn write_entries<W: Write>(writer: &mut W, entries: &HashMap<CacheKey, CacheEntry>) -> Result<()> {
    writer.write_u64::<LittleEndian>(entries.len() as u64)?;
    for (key, entry) in entries.iter() {
        writer.write_u64::<LittleEndian>(key.0)?;
        writer.write_i64::<LittleEndian>(entry.score)?;
        writer.write_u32::<LittleEndian>(entry.depth)?;
        // WIDTH is always an invalid column
        writer.write_u8(entry.column.unwrap_or(WIDTH) as u8)?;
        writer.write_u8(match entry.bound {
            Bound::Exact => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
        })?;
        writer.write_u8(match entry.to_move {
            Side::Bot => 0,
            Side::Opponent => 1,
        })?;
    }
    Ok(())
}

fn read_entries<R: Read>(mut reader: R) -> Result<HashMap<CacheKey, CacheEntry>> {
    let len = reader.read_u64::<LittleEndian>()?;
    let mut entries = HashMap::new();
    for _ in 0..len {
        let key = CacheKey(reader.read_u64::<LittleEndian>()?);
        let score = reader.read_i64::<LittleEndian>()?;
        let depth = reader.read_u32::<LittleEndian>()?;
        let column = match reader.read_u8()? as usize {
            WIDTH => None,
            column if column < WIDTH => Some(column),
            column => return Err(anyhow!("invalid column {} for key {}", column, key)),
        };
        let bound = match reader.read_u8()? {
            0 => Bound::Exact,
            1 => Bound::Lower,
            2 => Bound::Upper,
            other => return Err(anyhow!("invalid bound {} for key {}", other, key)),
        };
        let to_move = match reader.read_u8()? {
            0 => Side::Bot,
            1 => Side::Opponent,
            other => return Err(anyhow!("invalid side {} for key {}", other, key)),
        };
        entries.insert(
            key,
            CacheEntry {
                score,
                depth,
                column,
                bound,
                to_move,
            },
        );
    }

    // trailing bytes mean the file was not written by us
    let mut rest = [0u8; 1];
    if reader.read(&mut rest)? != 0 {
        return Err(anyhow!("trailing data after {} entries", len));
    }
    Ok(entries)
}
