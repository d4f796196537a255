//! Persistence surfaces for saved games.
//!
//! A saved game is a plain [`SaveData`] record (score, best score, tiles).
//! The engine talks to storage only through [`SaveStore`]; this module
//! provides a checksummed postcard file format ([`FileStore`]), an in-memory
//! store for tests and embedding ([`MemoryStore`]), and a store that keeps
//! nothing ([`NullStore`]).

mod save;

pub use save::{
    SaveData,
    TileRecord,
    SaveError,
    SaveStore,
    FileStore,
    MemoryStore,
    NullStore,
    encode_save,
    decode_save,
};
