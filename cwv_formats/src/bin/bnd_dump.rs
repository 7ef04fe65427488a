use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cwv_formats::{Model, scan_sections};

/// Inspect a BND model container and summarise its sections and meshes.
#[derive(Parser)]
struct Args {
    /// Path to the `.BND` file to inspect
    path: PathBuf,

    /// Print the decoded model (without textures) as JSON instead
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let bytes =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let model =
        Model::from_bytes(&bytes).with_context(|| format!("parsing {}", args.path.display()))?;

    if args.json {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &model)?;
        writeln!(out)?;
        return Ok(());
    }

    println!("declared size {}", model.declared_size);
    for section in scan_sections(&bytes)? {
        println!(
            "{tag}  {offset:>#10x}  {length:>8}",
            tag = section.tag_str(),
            offset = section.offset,
            length = section.length
        );
    }

    for (index, mesh) in model.meshes.iter().enumerate() {
        let sections: Vec<String> = mesh
            .face_sections
            .iter()
            .map(|section| format!("{}x{}", section.index, section.amount))
            .collect();
        println!(
            "mesh {index:>3}  vertices {:>5}  faces {:>5}  sections [{}]",
            mesh.vertex_amount,
            mesh.faces.len(),
            sections.join(", ")
        );
    }

    for (index, texture) in model.textures.iter().enumerate() {
        println!(
            "texture {index:>3}  {:?}  {}x{}",
            texture.mode, texture.width_actual, texture.height
        );
    }

    Ok(())
}
