//! Save buffer writer.

use super::section::SectionId;
use super::{PersistError, FORMAT_MAJOR, FORMAT_MINOR, HEADER_PREFIX_SIZE, SECTION_RECORD_SIZE};

#[derive(Clone, Copy, Debug)]
struct SectionRecord {
    id: SectionId,
    offset: u32,
    version: u32,
}

/// Writes named sections into a fixed-capacity buffer.
///
/// The header table is reserved up front with zeroed records so sections can
/// be written in any order; [`finish`](SaveWriter::finish) overwrites it in
/// place. Sections do not nest.
pub struct SaveWriter {
    buf: Vec<u8>,
    capacity: usize,
    max_sections: usize,
    sections: Vec<SectionRecord>,
    open: Option<SectionRecord>,
}

impl SaveWriter {
    /// Start a buffer holding at most `capacity` bytes and `max_sections` sections.
    pub fn new(capacity: usize, max_sections: usize) -> Result<Self, PersistError> {
        let header = Self::header_size(max_sections);
        if header > capacity {
            return Err(PersistError::Overflow { requested: header, capacity });
        }
        if capacity > i32::MAX as usize {
            return Err(PersistError::Overflow { requested: capacity, capacity: i32::MAX as usize });
        }

        let mut buf = Vec::with_capacity(capacity);
        buf.resize(header, 0);
        Ok(Self {
            buf,
            capacity,
            max_sections,
            sections: Vec::with_capacity(max_sections),
            open: None,
        })
    }

    /// Bytes taken by the header table for `max_sections` records.
    pub fn header_size(max_sections: usize) -> usize {
        HEADER_PREFIX_SIZE + max_sections * SECTION_RECORD_SIZE
    }

    /// Open a section. Fails if one is already open, the id was already
    /// written, or the table is full.
    pub fn begin_section(&mut self, id: SectionId, version: u32) -> Result<(), PersistError> {
        if let Some(open) = self.open {
            return Err(PersistError::NestedSection { open: open.id, opening: id });
        }
        if self.sections.iter().any(|s| s.id == id) {
            return Err(PersistError::DuplicateSection(id));
        }
        if self.sections.len() >= self.max_sections {
            return Err(PersistError::TooManySections { max: self.max_sections });
        }

        self.open = Some(SectionRecord {
            id,
            offset: self.buf.len() as u32,
            version,
        });
        Ok(())
    }

    /// Close the open section.
    pub fn end_section(&mut self) -> Result<(), PersistError> {
        let record = self.open.take().ok_or(PersistError::NoOpenSection)?;
        log::trace!(
            "Section {:?} v{}: {} bytes",
            record.id,
            record.version,
            self.buf.len() - record.offset as usize
        );
        self.sections.push(record);
        Ok(())
    }

    /// Append raw bytes to the open section.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        if self.open.is_none() {
            return Err(PersistError::NoOpenSection);
        }
        let requested = self.buf.len() + bytes.len();
        if requested > self.capacity {
            return Err(PersistError::Overflow { requested, capacity: self.capacity });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), PersistError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), PersistError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), PersistError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Length-prefixed float array.
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<(), PersistError> {
        let requested = self.buf.len() + 4 + values.len() * 4;
        if requested > self.capacity {
            return Err(PersistError::Overflow { requested, capacity: self.capacity });
        }
        self.write_u32(values.len() as u32)?;
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    /// Bytes written so far, header included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.open.is_none()
    }

    /// Number of closed sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Write the header table and return the finished buffer.
    pub fn finish(mut self) -> Result<Vec<u8>, PersistError> {
        if let Some(open) = self.open {
            return Err(PersistError::UnclosedSection(open.id));
        }

        let mut header = Vec::with_capacity(Self::header_size(self.sections.len()));
        header.extend_from_slice(&FORMAT_MAJOR.to_le_bytes());
        header.extend_from_slice(&FORMAT_MINOR.to_le_bytes());
        header.extend_from_slice(&(self.sections.len() as u32).to_le_bytes());
        for record in &self.sections {
            header.extend_from_slice(&(record.id.raw() as i32).to_le_bytes());
            header.extend_from_slice(&(record.offset as i32).to_le_bytes());
            header.extend_from_slice(&(record.version as i32).to_le_bytes());
        }
        self.buf[..header.len()].copy_from_slice(&header);
        Ok(self.buf)
    }
}
