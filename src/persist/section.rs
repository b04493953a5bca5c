//! Stable section identifiers.

/// 32-bit id of a named save section.
///
/// Ids are FNV-1a hashes of the section name, computed at compile time, so
/// they are identical across builds and independent of registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u32);

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

impl SectionId {
    /// Hash a section name.
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Raw value as stored in the header table.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Solid material density field.
pub const SOLID_DENSITY: SectionId = SectionId::from_name("solid_density");
/// Liquid mass field.
pub const LIQUID_DENSITY: SectionId = SectionId::from_name("liquid_density");
/// Grid extents and cell sizes of the saved world.
pub const WORLD_INFO: SectionId = SectionId::from_name("world_info");

/// Names of the sections this crate writes, for diagnostics.
pub const KNOWN_SECTIONS: [(&str, SectionId); 3] = [
    ("solid_density", SOLID_DENSITY),
    ("liquid_density", LIQUID_DENSITY),
    ("world_info", WORLD_INFO),
];

/// Name of a known section id.
pub fn section_name(id: SectionId) -> Option<&'static str> {
    KNOWN_SECTIONS
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(name, _)| *name)
}
