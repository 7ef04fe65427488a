//! Convert Colony Wars Vengeance `.BND` models into OBJ scenes, MTL materials
//! and PNG textures. Keep the original file names intact: LOD groupings are
//! looked up by file stem.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use cwv_formats::{ExportOptions, LodTable, Model, export_model, resolve_groups};
use walkdir::WalkDir;

const LOD_TABLE_ENV: &str = "CWV_LOD_TABLE";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the original BND files
    #[arg(value_name = "BND_DIR")]
    input: PathBuf,

    /// Directory receiving the converted models
    #[arg(value_name = "OUTPUT_DIR")]
    output: PathBuf,

    /// Place a JSON dump of the decoded model alongside the output
    #[arg(long)]
    model_info: bool,

    /// Do not negate the X and Y axes
    #[arg(long)]
    no_inverse_axis: bool,

    /// Do not separate output by model directories
    #[arg(long)]
    no_subdirectories: bool,

    /// Do not output texture data, UVs or materials
    #[arg(long)]
    no_textures: bool,

    /// Write a single MTL file instead of one per LOD scene
    #[arg(long)]
    no_duplicate_mtl: bool,

    /// Export only the first LOD group of each model
    #[arg(long)]
    no_lods: bool,

    /// JSON table of LOD groupings keyed by file stem (defaults to $CWV_LOD_TABLE)
    #[arg(long, value_name = "FILE")]
    lods: Option<PathBuf>,
}

impl Args {
    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            invert_axis: !self.no_inverse_axis,
            emit_textures: !self.no_textures,
            single_material_file: self.no_duplicate_mtl,
            only_first_lod: self.no_lods,
        }
    }

    fn lod_table(&self) -> Result<Option<LodTable>> {
        let path = match &self.lods {
            Some(path) => Some(path.clone()),
            None => std::env::var_os(LOD_TABLE_ENV).map(PathBuf::from),
        };
        path.map(LodTable::load).transpose()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = args.export_options();
    let lods = args.lod_table()?;

    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        bail!("no model files found in {}", args.input.display());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut failures = 0usize;
    for path in &inputs {
        let Some(file_name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            log::error!("skipping {}: file name is not valid UTF-8", path.display());
            failures += 1;
            continue;
        };

        match convert_model(path, file_name, &args, &options, lods.as_ref()) {
            Ok(()) => log::info!("Converted {file_name}"),
            Err(err) => {
                log::error!("failed to convert {}: {err:#}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} models failed to convert", inputs.len());
    }
    Ok(())
}

fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.file_type().is_file() {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn convert_model(
    path: &Path,
    file_name: &str,
    args: &Args,
    options: &ExportOptions,
    lods: Option<&LodTable>,
) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let model =
        Model::from_bytes(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    log::info!(
        "Parsed {file_name}: {} meshes, {} textures",
        model.meshes.len(),
        model.textures.len()
    );

    let groups = resolve_groups(lods, file_name, model.meshes.len());
    let export = export_model(&model, file_name, &groups, options)
        .with_context(|| format!("assembling {file_name}"))?;

    let out_dir = if args.no_subdirectories {
        args.output.clone()
    } else {
        args.output.join(file_name)
    };
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    if options.emit_textures {
        for material_file in export.names.material_files(export.scenes.len()) {
            write_file(&out_dir.join(material_file), export.material.as_bytes())?;
        }
    }

    for (index, scene) in export.scenes.iter().enumerate() {
        write_file(&out_dir.join(export.names.scene(index)), scene.text.as_bytes())?;
    }

    if options.emit_textures {
        for (index, texture) in export.textures.iter().enumerate() {
            let png = texture
                .to_png()
                .with_context(|| format!("encoding texture {index} of {file_name}"))?;
            write_file(&out_dir.join(export.names.texture(index)), &png)?;
        }
    }

    if args.model_info {
        let info_path = out_dir.join(export.names.model_info());
        let file = File::create(&info_path)
            .with_context(|| format!("creating {}", info_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &model)?;
        writer.flush()?;
    }

    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
