//! Dungeon Canon: decoder and reconciliation pipeline for the dungeon
//! engine's encrypted data file.
//!
//! Decrypts and parses the binary data file into typed raw records,
//! reassembles its chunked message text, converts rooms and objects into
//! canonical entities with stable ids, and merges new entities into a
//! hand-curated live dataset in reviewed batches.

pub mod config;
pub mod core;
pub mod schema;
