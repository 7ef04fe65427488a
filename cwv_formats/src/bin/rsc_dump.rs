use std::env;

use anyhow::{Context, Result};
use cwv_formats::RscArchive;

fn main() -> Result<()> {
    let path = env::args().nth(1).context("usage: rsc_dump <RSC file>")?;
    let archive = RscArchive::open(&path)?;
    println!(
        "{} entries in {} ({} bytes)",
        archive.entries().len(),
        archive.path().display(),
        archive.len()
    );
    for entry in archive.entries() {
        println!(
            "{name:<16} {offset:>#10x} {size:>10}",
            name = entry.name,
            offset = entry.offset,
            size = entry.size
        );
    }
    Ok(())
}
