//! Chunked binary save format.
//!
//! A save is one contiguous buffer: a fixed header table followed by named,
//! versioned sections, one per subsystem. Sections are written in any order
//! and the table is finalized last. Readers look sections up by id and skip
//! whatever they do not know about.

pub mod section;
pub mod writer;
pub mod reader;
pub mod store;

use thiserror::Error;

pub use section::{section_name, SectionId, SOLID_DENSITY, LIQUID_DENSITY, WORLD_INFO};
pub use writer::SaveWriter;
pub use reader::{SaveReader, SectionReader};
pub use store::SaveStore;

/// Major format version. Readers reject any other major.
pub const FORMAT_MAJOR: u32 = 1;
/// Minor format version. Informational.
pub const FORMAT_MINOR: u32 = 0;

/// Bytes before the section records: major, minor, count.
pub const HEADER_PREFIX_SIZE: usize = 12;
/// Bytes per `(id, offset, version)` record.
pub const SECTION_RECORD_SIZE: usize = 12;

/// Persistence failures.
///
/// Writer-side variants indicate a usage or configuration bug and are never
/// retried. Reader-side variants mean the buffer is not a valid save.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("write of {requested} bytes overflows buffer capacity {capacity}")]
    Overflow { requested: usize, capacity: usize },

    #[error("section table is full ({max} sections)")]
    TooManySections { max: usize },

    #[error("section {opening:?} opened while {open:?} is still open")]
    NestedSection { open: SectionId, opening: SectionId },

    #[error("section {0:?} written twice")]
    DuplicateSection(SectionId),

    #[error("no section is open")]
    NoOpenSection,

    #[error("section {0:?} still open at finish")]
    UnclosedSection(SectionId),

    #[error("read past end of section")]
    Truncated,

    #[error("bad header: {0}")]
    BadHeader(String),

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),
}
