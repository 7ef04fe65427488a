pub mod bnd;
pub mod error;
pub mod lod;
pub mod obj_export;
mod reader;
pub mod rsc;
pub mod tim;
pub mod tmd;

pub use bnd::{Model, Section, scan_sections};
pub use error::FormatError;
pub use lod::{LodGroup, LodTable, default_groups, parse_groups, resolve_groups};
pub use obj_export::{ExportOptions, ExportedModel, ObjScene, OutputNames, export_model};
pub use rsc::{RscArchive, RscEntry, decode_directory};
pub use tim::{PixelMode, TimImage};
pub use tmd::{FACE_LAYOUTS, Face, FaceLayout, FaceSection, Mesh, Uv, Vertex};
