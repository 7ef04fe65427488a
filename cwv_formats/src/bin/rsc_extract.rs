use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cwv_formats::RscArchive;

#[derive(Parser, Debug)]
#[command(about = "Extract Colony Wars Vengeance GAME.RSC archives", version)]
struct Args {
    /// RSC archive to extract
    #[arg(value_name = "RSC")]
    archive: PathBuf,

    /// Destination directory to materialise files
    #[arg(value_name = "DIR")]
    dest: PathBuf,

    /// Individual file names to extract (case-insensitive, may repeat)
    #[arg(long = "asset", value_name = "NAME")]
    assets: Vec<String>,

    /// Overwrite existing files instead of skipping them
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    fs::create_dir_all(&args.dest)
        .with_context(|| format!("creating destination {}", args.dest.display()))?;

    let archive = RscArchive::open(&args.archive)?;
    extract_archive(&archive, &args.dest, &args.assets, args.overwrite)
}

/// Keeps only the normal components of an entry name so nothing escapes `dest`.
fn relative_entry_path(name: &str) -> PathBuf {
    let raw = PathBuf::from(name.replace('\\', "/"));
    let mut relative = PathBuf::new();
    for component in raw.components() {
        if let Component::Normal(part) = component {
            relative.push(part);
        }
    }
    relative
}

fn extract_archive(
    archive: &RscArchive,
    dest: &Path,
    assets: &[String],
    overwrite: bool,
) -> Result<()> {
    let selected: Vec<_> = archive
        .entries()
        .iter()
        .filter(|entry| {
            assets.is_empty()
                || assets
                    .iter()
                    .any(|asset| entry.name.eq_ignore_ascii_case(asset.trim()))
        })
        .collect();
    for asset in assets {
        if archive.find_entry(asset.trim()).is_none() {
            log::warn!("{asset} is not in {}", archive.path().display());
        }
    }

    let mut extracted = 0usize;
    for entry in selected {
        let dest_path = dest.join(relative_entry_path(&entry.name));
        if dest_path.exists() && !overwrite {
            log::info!("skip {} (already exists)", dest_path.display());
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }

        archive
            .extract_entry(entry, &dest_path)
            .with_context(|| format!("extracting {}", entry.name))?;
        log::info!("Extracted {}", entry.name);
        extracted += 1;
    }

    log::info!(
        "Extracted {} of {} entries from {} into {}",
        extracted,
        archive.entries().len(),
        archive.path().display(),
        dest.display()
    );

    Ok(())
}
