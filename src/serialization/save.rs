use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::{Coord, MAX_EXPONENT, SIZE};

const MAGIC: &[u8; 4] = b"TMS1"; // ASCII magic
const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1;
const CHECKSUM_LEN: usize = 4;

/// One tile in its persisted shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    pub x: i8,
    pub y: i8,
    pub num: u8,
}

/// Persisted game state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveData {
    pub score: u64,
    pub best_score: u64,
    pub tiles: Vec<TileRecord>,
}

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("checksum mismatch")]
    Checksum,
    #[error("file too short or malformed")]
    Malformed,
    #[error("invalid tile {0:?}")]
    InvalidTile(TileRecord),
    #[error("two tiles at ({x}, {y})")]
    DuplicateTile { x: i8, y: i8 },
}

impl SaveData {
    /// Check that every tile is in bounds, has a usable exponent, and sits on its own cell.
    pub fn validate(&self) -> Result<(), SaveError> {
        let mut seen = [false; SIZE * SIZE];
        for &rec in &self.tiles {
            let coord = Coord::new(rec.x, rec.y);
            if !coord.is_inside() || rec.num == 0 || rec.num > MAX_EXPONENT {
                return Err(SaveError::InvalidTile(rec));
            }
            let idx = rec.y as usize * SIZE + rec.x as usize;
            if seen[idx] {
                return Err(SaveError::DuplicateTile { x: rec.x, y: rec.y });
            }
            seen[idx] = true;
        }
        Ok(())
    }
}

/// Storage for a single saved game.
///
/// The engine treats every call as best-effort: errors are logged by the
/// caller and never interrupt play.
pub trait SaveStore {
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError>;
    /// `Ok(None)` when nothing has been saved.
    fn load(&mut self) -> Result<Option<SaveData>, SaveError>;
    fn delete(&mut self) -> Result<(), SaveError>;
}

/// Encode a save as magic + version + postcard payload + CRC32C trailer.
pub fn encode_save(data: &SaveData) -> Result<Vec<u8>, SaveError> {
    let payload = postcard::to_allocvec(data)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&payload);
    // Trailer: CRC32C of all preceding bytes
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn decode_save(bytes: &[u8]) -> Result<SaveData, SaveError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(SaveError::Malformed);
    }
    // Validate checksum first to avoid decoding garbage
    let (content, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let file_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if file_crc != crc32c::crc32c(content) {
        return Err(SaveError::Checksum);
    }
    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(SaveError::MagicOrVersion);
    }
    Ok(postcard::from_bytes(&content[HEADER_LEN..])?)
}

/// Saves to a single file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for FileStore {
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        let bytes = encode_save(data)?;
        fs::write(&self.path, bytes)?;
        debug!("game saved to {}", self.path.display());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<SaveData>, SaveError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let data = decode_save(&bytes)?;
        debug!("game loaded from {}", self.path.display());
        Ok(Some(data))
    }

    fn delete(&mut self) -> Result<(), SaveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("save deleted: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the save in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<SaveData>>>,
}

impl MemoryStore {
    pub fn contents(&self) -> Option<SaveData> {
        self.slot.borrow().clone()
    }

    pub fn put(&self, data: SaveData) {
        *self.slot.borrow_mut() = Some(data);
    }
}

impl SaveStore for MemoryStore {
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.put(data.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<SaveData>, SaveError> {
        Ok(self.contents())
    }

    fn delete(&mut self) -> Result<(), SaveError> {
        self.slot.borrow_mut().take();
        Ok(())
    }
}

/// Persists nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SaveStore for NullStore {
    fn save(&mut self, _: &SaveData) -> Result<(), SaveError> { Ok(()) }

    fn load(&mut self) -> Result<Option<SaveData>, SaveError> { Ok(None) }

    fn delete(&mut self) -> Result<(), SaveError> { Ok(()) }
}
