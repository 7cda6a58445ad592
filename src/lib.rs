//! Evtarc - codec for legacy EEG event archives
//!
//! Layers, bottom-up:
//!
//! - [`varint`]: unsigned and signed LEB128 integers
//! - [`archive`]: little-endian primitives, archive strings, GUIDs,
//!   timestamps, class markers and the archive header
//! - [`variant`]: self-describing typed values
//! - [`events`]: version-gated event records and the [`EventLibrary`]
//! - [`file`]: reading and writing library files

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::field_reassign_with_default,
    clippy::multiple_crate_versions
)]

pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod file;
pub mod variant;
pub mod varint;

pub use archive::{ArchiveReader, ArchiveWriter, FormatVersion};
pub use config::{Config, DecodeLimits};
pub use error::{ErrorKind, EvtarcError, Result};
pub use events::{read_archive, write_archive, EventLibrary, EventRecord};
pub use variant::{Variant, VariantType};
pub use varint::{read_varint, write_varint, VarInt};
