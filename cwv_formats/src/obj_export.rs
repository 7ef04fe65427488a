//! Assemble Wavefront OBJ/MTL text from a decoded model.

use std::fmt::Write;

use crate::bnd::Model;
use crate::error::{FormatError, Result};
use crate::lod::LodGroup;
use crate::tim::TimImage;
use crate::tmd::{Face, Mesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Negate X and Y of every vertex.
    pub invert_axis: bool,
    /// Emit UVs, material switches and the material library.
    pub emit_textures: bool,
    /// Share one material file between all scenes instead of one per scene.
    pub single_material_file: bool,
    /// Export only the first LOD group.
    pub only_first_lod: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            invert_axis: true,
            emit_textures: true,
            single_material_file: false,
            only_first_lod: false,
        }
    }
}

/// File names of every artifact produced for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    file_name: String,
    single_material_file: bool,
}

impl OutputNames {
    pub fn new(file_name: impl Into<String>, options: &ExportOptions) -> Self {
        OutputNames {
            file_name: file_name.into(),
            single_material_file: options.single_material_file,
        }
    }

    pub fn scene(&self, group: usize) -> String {
        format!("{}_{group}.obj", self.file_name)
    }

    pub fn material(&self, group: usize) -> String {
        if self.single_material_file {
            format!("{}.mtl", self.file_name)
        } else {
            format!("{}_{group}.mtl", self.file_name)
        }
    }

    /// Material files to write for `scene_count` scenes, each holding the
    /// same material text.
    pub fn material_files(&self, scene_count: usize) -> Vec<String> {
        if self.single_material_file {
            vec![self.material(0)]
        } else {
            (0..scene_count).map(|group| self.material(group)).collect()
        }
    }

    pub fn texture(&self, index: usize) -> String {
        format!("{}_tex_{index}.png", self.file_name)
    }

    pub fn model_info(&self) -> String {
        format!("{}.json", self.file_name)
    }
}

/// OBJ text for one LOD group.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjScene {
    pub text: String,
    /// Vertex lines emitted, the final vertex offset of the group.
    pub vertex_total: usize,
    /// UV lines emitted, the final UV offset of the group.
    pub uv_total: usize,
}

#[derive(Debug)]
pub struct ExportedModel<'a> {
    pub names: OutputNames,
    pub material: String,
    pub scenes: Vec<ObjScene>,
    pub textures: &'a [TimImage],
}

/// Running 1-based index bases shared by every mesh of one group.
#[derive(Debug, Default)]
struct GroupCursor {
    vertex_offset: usize,
    uv_offset: usize,
}

pub fn export_model<'a>(
    model: &'a Model,
    file_name: &str,
    lod_groups: &[LodGroup],
    options: &ExportOptions,
) -> Result<ExportedModel<'a>> {
    let names = OutputNames::new(file_name, options);

    let material = if options.emit_textures {
        material_text(&names, model.textures.len())?
    } else {
        String::new()
    };

    let groups = if options.only_first_lod {
        &lod_groups[..lod_groups.len().min(1)]
    } else {
        lod_groups
    };

    let scenes = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let meshes = group
                .iter()
                .map(|&mesh| {
                    model
                        .meshes
                        .get(mesh)
                        .ok_or(FormatError::LodMeshOutOfRange {
                            group: index,
                            mesh,
                            available: model.meshes.len(),
                        })
                })
                .collect::<Result<Vec<&Mesh>>>()?;
            build_scene(&meshes, &model.textures, &names, index, options)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExportedModel {
        names,
        material,
        scenes,
        textures: &model.textures,
    })
}

fn material_text(names: &OutputNames, texture_count: usize) -> Result<String> {
    let mut mtl = String::new();
    for index in 0..texture_count {
        writeln!(mtl, "newmtl tex_{index}")?;
        writeln!(mtl, "map_Kd {}", names.texture(index))?;
        writeln!(mtl)?;
    }
    Ok(mtl)
}

fn build_scene(
    meshes: &[&Mesh],
    textures: &[TimImage],
    names: &OutputNames,
    group: usize,
    options: &ExportOptions,
) -> Result<ObjScene> {
    let mut obj = String::new();
    if options.emit_textures {
        writeln!(obj, "mtllib {}", names.material(group))?;
    }

    let mut cursor = GroupCursor::default();
    for (position, mesh) in meshes.iter().enumerate() {
        writeln!(obj, "o {}_{position}", names.file_name)?;
        write_mesh(&mut obj, mesh, textures, &mut cursor, options)?;
    }

    Ok(ObjScene {
        text: obj,
        vertex_total: cursor.vertex_offset,
        uv_total: cursor.uv_offset,
    })
}

fn write_mesh(
    obj: &mut String,
    mesh: &Mesh,
    textures: &[TimImage],
    cursor: &mut GroupCursor,
    options: &ExportOptions,
) -> Result<()> {
    for vertex in &mesh.vertexes {
        let (mut x, mut y) = (i32::from(vertex.x), i32::from(vertex.y));
        if options.invert_axis {
            x = -x;
            y = -y;
        }
        writeln!(obj, "v {x} {y} {}", vertex.z)?;
    }

    let mut uv_lines = String::new();
    let mut face_lines = String::new();
    let mut last_texture = None;

    for face in &mesh.faces {
        let vertexes = winding_corrected(&face.vertexes);

        if !options.emit_textures {
            face_lines.push('f');
            for vertex in &vertexes {
                write!(face_lines, " {}", cursor.vertex_offset + 1 + *vertex as usize)?;
            }
            face_lines.push('\n');
            continue;
        }

        let texture = face_texture(face, textures)?;
        for uv in winding_corrected(&face.uv) {
            let u = f64::from(uv.x) / f64::from(texture.width_actual);
            let v = 1.0 - f64::from(uv.y) / f64::from(texture.height);
            writeln!(uv_lines, "vt {u} {v}")?;
        }

        if last_texture != Some(face.texture_index) {
            writeln!(face_lines, "usemtl tex_{}", face.texture_index)?;
            last_texture = Some(face.texture_index);
        }

        face_lines.push('f');
        for (corner, vertex) in vertexes.iter().enumerate() {
            write!(
                face_lines,
                " {}/{}",
                cursor.vertex_offset + 1 + *vertex as usize,
                cursor.uv_offset + 1 + corner
            )?;
        }
        face_lines.push('\n');
        cursor.uv_offset += vertexes.len();
    }

    cursor.vertex_offset += mesh.vertexes.len();
    obj.push_str(&uv_lines);
    obj.push_str(&face_lines);
    Ok(())
}

fn face_texture<'t>(face: &Face, textures: &'t [TimImage]) -> Result<&'t TimImage> {
    textures
        .get(face.texture_index as usize)
        .ok_or(FormatError::MissingTexture {
            index: face.texture_index,
            available: textures.len(),
        })
}

/// Source faces list their first two corners swapped relative to the
/// winding OBJ consumers expect.
fn winding_corrected<T: Copy>(items: &[T]) -> Vec<T> {
    let mut reordered = items.to_vec();
    if reordered.len() >= 2 {
        reordered.swap(0, 1);
    }
    reordered
}
