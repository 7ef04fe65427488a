use serde::Serialize;

use crate::error::{FormatError, Result};
use crate::reader::{read_i16, read_u8, read_u32, serialize_pointer, slice};

const VERTEX_TABLE_OFFSET: usize = 0x00;
const VERTEX_COUNT: usize = 0x04;
const FACE_COUNTS: usize = 0x1C;
const FACE_OFFSETS: usize = 0x44;
const VERTEX_SIZE: usize = 8;
const SECTION_COUNT: usize = 4;

/// Record shape of one face section. Each section index has a fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLayout {
    pub vertex_amount: usize,
    pub uv_start: usize,
    pub texture_ptr: usize,
    pub size: usize,
}

pub const FACE_LAYOUTS: [FaceLayout; SECTION_COUNT] = [
    FaceLayout {
        vertex_amount: 3,
        uv_start: 0x0C,
        texture_ptr: 0x0A,
        size: 0x14,
    },
    FaceLayout {
        vertex_amount: 4,
        uv_start: 0x10,
        texture_ptr: 0x0E,
        size: 0x18,
    },
    FaceLayout {
        vertex_amount: 3,
        uv_start: 0x10,
        texture_ptr: 0x0E,
        size: 0x18,
    },
    FaceLayout {
        vertex_amount: 4,
        uv_start: 0x14,
        texture_ptr: 0x12,
        size: 0x20,
    },
];

impl FaceLayout {
    pub fn for_section(index: usize) -> Result<&'static FaceLayout> {
        FACE_LAYOUTS
            .get(index)
            .ok_or(FormatError::UnknownFaceSection(index))
    }

    /// Decodes the face record starting at `offset` within `bytes`.
    fn read_face(
        &self,
        bytes: &[u8],
        offset: usize,
        section: usize,
        file_ptr: u64,
        vertex_amount: u32,
    ) -> Result<Face> {
        let record = slice(bytes, offset, self.size, "face record")?;

        let mut vertexes = Vec::with_capacity(self.vertex_amount);
        let mut uv = Vec::with_capacity(self.vertex_amount);
        for corner in 0..self.vertex_amount {
            let index = read_i16(record, corner * 2, "face vertex index")?;
            if index < 0 || index as u32 >= vertex_amount {
                return Err(FormatError::FaceVertexOutOfRange {
                    file_ptr,
                    index,
                    vertex_amount,
                });
            }
            vertexes.push(index as u16);

            let uv_offset = self.uv_start + corner * 2;
            uv.push(Uv {
                x: read_u8(record, uv_offset, "face UV")?,
                y: read_u8(record, uv_offset + 1, "face UV")?,
            });
        }

        Ok(Face {
            file_ptr,
            section,
            vertexes,
            uv,
            texture_index: read_u8(record, self.texture_ptr, "face texture index")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Uv {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub index: usize,
    #[serde(serialize_with = "serialize_pointer")]
    pub file_ptr: u64,
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Face {
    #[serde(serialize_with = "serialize_pointer")]
    pub file_ptr: u64,
    #[serde(skip)]
    pub section: usize,
    /// Indices into the owning mesh's vertex table.
    pub vertexes: Vec<u16>,
    pub uv: Vec<Uv>,
    pub texture_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaceSection {
    pub index: usize,
    pub amount: u32,
    pub offset: u32,
    #[serde(serialize_with = "serialize_pointer")]
    pub file_ptr: u64,
}

/// One decoded `TMDS` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mesh {
    #[serde(serialize_with = "serialize_pointer")]
    pub vertexes_file_ptr: u64,
    pub vertex_amount: u32,
    pub face_sections: Vec<FaceSection>,
    pub vertexes: Vec<Vertex>,
    pub faces: Vec<Face>,
}

impl Mesh {
    /// Decodes a mesh payload. `file_offset` is the payload's position in the
    /// enclosing file and only feeds the diagnostic `file_ptr` fields.
    pub fn decode(bytes: &[u8], file_offset: usize) -> Result<Self> {
        let base = file_offset as u64;
        let vertex_offset = read_u32(bytes, VERTEX_TABLE_OFFSET, "mesh header")? as usize;
        let vertex_amount = read_u32(bytes, VERTEX_COUNT, "mesh header")?;

        let table_len = (vertex_amount as usize)
            .checked_mul(VERTEX_SIZE)
            .ok_or(FormatError::Truncated {
                what: "vertex table",
                offset: vertex_offset,
                needed: usize::MAX,
                available: bytes.len(),
            })?;
        let table = slice(bytes, vertex_offset, table_len, "vertex table")?;
        let vertexes = table
            .chunks_exact(VERTEX_SIZE)
            .enumerate()
            .map(|(index, record)| -> Result<Vertex> {
                Ok(Vertex {
                    index,
                    file_ptr: base + (vertex_offset + index * VERTEX_SIZE) as u64,
                    x: read_i16(record, 0, "vertex")?,
                    y: read_i16(record, 2, "vertex")?,
                    z: read_i16(record, 4, "vertex")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut face_sections = Vec::new();
        for index in 0..SECTION_COUNT {
            let amount = read_u32(bytes, FACE_COUNTS + index * 4, "mesh header")?;
            let offset = read_u32(bytes, FACE_OFFSETS + index * 4, "mesh header")?;
            if amount == 0 {
                continue;
            }
            face_sections.push(FaceSection {
                index,
                amount,
                offset,
                file_ptr: base + offset as u64,
            });
        }

        let mut faces = Vec::new();
        for section in &face_sections {
            let layout = FaceLayout::for_section(section.index)?;
            for face_index in 0..section.amount as usize {
                let face_offset = section.offset as usize + face_index * layout.size;
                faces.push(layout.read_face(
                    bytes,
                    face_offset,
                    section.index,
                    base + face_offset as u64,
                    vertex_amount,
                )?);
            }
        }

        Ok(Mesh {
            vertexes_file_ptr: base + vertex_offset as u64,
            vertex_amount,
            face_sections,
            vertexes,
            faces,
        })
    }
}
