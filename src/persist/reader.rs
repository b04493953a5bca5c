//! Save buffer reader.

use super::section::SectionId;
use super::{PersistError, FORMAT_MAJOR, HEADER_PREFIX_SIZE, SECTION_RECORD_SIZE};

#[derive(Clone, Copy, Debug)]
struct SectionEntry {
    id: SectionId,
    start: usize,
    end: usize,
    version: u32,
}

/// Parsed view over a save buffer.
pub struct SaveReader<'a> {
    data: &'a [u8],
    major: u32,
    minor: u32,
    sections: Vec<SectionEntry>,
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl<'a> SaveReader<'a> {
    /// Parse the header table. Section bodies are not touched.
    pub fn parse(data: &'a [u8]) -> Result<Self, PersistError> {
        if data.len() < HEADER_PREFIX_SIZE {
            return Err(PersistError::BadHeader(format!("{} bytes is shorter than the header", data.len())));
        }
        let major = le_u32(data, 0);
        let minor = le_u32(data, 4);
        if major != FORMAT_MAJOR {
            return Err(PersistError::UnsupportedVersion { major, minor });
        }

        let count = le_u32(data, 8) as usize;
        let table_end = count
            .checked_mul(SECTION_RECORD_SIZE)
            .and_then(|n| n.checked_add(HEADER_PREFIX_SIZE))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| PersistError::BadHeader(format!("table of {} sections exceeds buffer", count)))?;

        let mut sections = Vec::with_capacity(count);
        for i in 0..count {
            let at = HEADER_PREFIX_SIZE + i * SECTION_RECORD_SIZE;
            let id = SectionId(le_u32(data, at));
            let offset = le_u32(data, at + 4) as i32;
            let version = le_u32(data, at + 8);
            if offset < table_end as i32 || offset as usize > data.len() {
                return Err(PersistError::BadHeader(format!("section {:?} offset {} out of range", id, offset)));
            }
            if sections.iter().any(|s: &SectionEntry| s.id == id) {
                return Err(PersistError::DuplicateSection(id));
            }
            sections.push(SectionEntry { id, start: offset as usize, end: data.len(), version });
        }

        // A section runs until the nearest later-written section's start, or
        // the end of the buffer. Empty sections share their successor's start.
        for i in 0..sections.len() {
            let start = sections[i].start;
            if let Some(next) = sections[i + 1..]
                .iter()
                .map(|s| s.start)
                .filter(|&s| s >= start)
                .min()
            {
                sections[i].end = next;
            }
        }

        Ok(Self { data, major, minor, sections })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Number of sections in the table.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Ids in table order.
    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.iter().map(|s| s.id)
    }

    /// Reader positioned at the start of a section, `None` if absent.
    pub fn try_get_section(&self, id: SectionId) -> Option<SectionReader<'a>> {
        self.sections.iter().find(|s| s.id == id).map(|entry| SectionReader {
            id: entry.id,
            version: entry.version,
            data: &self.data[entry.start..entry.end],
            pos: 0,
        })
    }
}

/// Sequential typed reads within one section.
pub struct SectionReader<'a> {
    id: SectionId,
    version: u32,
    data: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Version the section was written with.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whole section body.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PersistError> {
        if len > self.remaining() {
            return Err(PersistError::Truncated);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_word(&mut self) -> Result<[u8; 4], PersistError> {
        let bytes = self.read_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn read_i32(&mut self) -> Result<i32, PersistError> {
        Ok(i32::from_le_bytes(self.read_word()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, PersistError> {
        Ok(u32::from_le_bytes(self.read_word()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, PersistError> {
        Ok(f32::from_le_bytes(self.read_word()?))
    }

    /// Length-prefixed float array.
    pub fn read_f32_vec(&mut self) -> Result<Vec<f32>, PersistError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len.checked_mul(4).ok_or(PersistError::Truncated)?)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
