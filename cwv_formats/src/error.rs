use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

/// Error conditions raised while decoding or assembling game assets.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{what} truncated: need {needed} bytes at {offset:#x}, buffer holds {available}")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("directory slot {slot} has no usable file name: {raw:?}")]
    MalformedName { slot: usize, raw: String },
    #[error("entry {name} at {offset:#x} precedes the previous entry at {previous:#x}")]
    EntryOutOfOrder {
        name: String,
        offset: u32,
        previous: u32,
    },
    #[error("entry {name} starts at {offset:#x}, past the end of a {archive_len} byte archive")]
    EntryOutOfBounds {
        name: String,
        offset: u32,
        archive_len: usize,
    },
    #[error("unknown face section {0}")]
    UnknownFaceSection(usize),
    #[error("face at {file_ptr:#010x} references vertex {index} of a {vertex_amount} vertex mesh")]
    FaceVertexOutOfRange {
        file_ptr: u64,
        index: i16,
        vertex_amount: u32,
    },
    #[error("face uses texture {index} but the model carries {available}")]
    MissingTexture { index: u8, available: usize },
    #[error("LOD group {group} names mesh {mesh} but the model carries {available}")]
    LodMeshOutOfRange {
        group: usize,
        mesh: usize,
        available: usize,
    },
    #[error("invalid LOD group list {0:?}")]
    InvalidLodSpec(String),
    #[error("LOD table is not valid JSON: {0}")]
    LodTableJson(#[from] serde_json::Error),
    #[error("not a TIM texture (id {0:#x})")]
    BadTimMagic(u32),
    #[error("TIM texture has zero width or height")]
    EmptyTexture,
    #[error("formatting scene text failed")]
    Fmt(#[from] std::fmt::Error),
    #[error("PNG encode failed: {0}")]
    ImageEncode(#[from] image::ImageError),
}
