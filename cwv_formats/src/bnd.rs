use serde::Serialize;

use crate::error::Result;
use crate::reader::{read_u32, slice};
use crate::tim::TimImage;
use crate::tmd::Mesh;

const SECTIONS_START: usize = 8;
const SECTION_HEADER_SIZE: usize = 8;

/// Section tags understood by the model decoder.
pub const TAG_MESH: [u8; 4] = *b"TMDS";
pub const TAG_TEXTURE: [u8; 4] = *b"TIMS";

/// Header of one tagged section within a `.BND` container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub tag: [u8; 4],
    /// Absolute offset of the payload.
    pub offset: usize,
    pub length: u32,
}

impl Section {
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// Lists the section headers of a container without decoding payloads.
pub fn scan_sections(bytes: &[u8]) -> Result<Vec<Section>> {
    let declared_size = read_u32(bytes, 4, "BND header")? as usize;

    let mut sections = Vec::new();
    let mut cursor = SECTIONS_START;
    while cursor < declared_size {
        let header = slice(bytes, cursor, SECTION_HEADER_SIZE, "BND section header")?;
        let tag = [header[0], header[1], header[2], header[3]];
        let length = read_u32(header, 4, "BND section header")?;
        let offset = cursor + SECTION_HEADER_SIZE;
        slice(bytes, offset, length as usize, "BND section payload")?;

        sections.push(Section {
            tag,
            offset,
            length,
        });
        cursor = offset + length as usize;
    }
    Ok(sections)
}

/// A decoded `.BND` model container.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    #[serde(rename = "file_size")]
    pub declared_size: u32,
    #[serde(rename = "tmds")]
    pub meshes: Vec<Mesh>,
    #[serde(skip)]
    pub textures: Vec<TimImage>,
}

impl Model {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let declared_size = read_u32(bytes, 4, "BND header")?;

        let mut meshes = Vec::new();
        let mut textures = Vec::new();
        for section in scan_sections(bytes)? {
            let payload = slice(
                bytes,
                section.offset,
                section.length as usize,
                "BND section payload",
            )?;
            match section.tag {
                TAG_MESH => meshes.push(Mesh::decode(payload, section.offset)?),
                TAG_TEXTURE => textures.push(TimImage::decode(payload)?),
                _ => log::debug!(
                    "skipping {} section at {:#x} ({} bytes)",
                    section.tag_str(),
                    section.offset,
                    section.length
                ),
            }
        }

        Ok(Model {
            declared_size,
            meshes,
            textures,
        })
    }
}
