use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use draco_import::prelude::*;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "draco-import")]
#[command(about = "Inspects Draco-compressed primitives of glTF documents")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolves the compressed region and validates the attribute ids of
    /// every compressed primitive, without decoding
    Inspect {
        /// Input file path (.glb or .gltf)
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Inspect { input } => inspect(&input),
    }
}

fn load(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_glb = path.extension().and_then(|s| s.to_str()) == Some("glb");
    let mut document = if is_glb {
        Document::from_glb(&bytes)?
    } else {
        Document::from_json_slice(&bytes)?
    };

    // buffers referenced by relative uri live next to the document
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let external: Vec<(usize, String)> = document.get_json()
        .get("buffers")
        .and_then(Value::as_array)
        .map(|buffers| {
            buffers.iter()
                .enumerate()
                .filter_map(|(i, b)| b.get("uri").and_then(Value::as_str).map(|uri| (i, uri.to_owned())))
                .filter(|(_, uri)| !uri.starts_with("data:"))
                .collect()
        })
        .unwrap_or_default();
    for (index, uri) in external {
        let buffer_path = base.join(&uri);
        let data = std::fs::read(&buffer_path)
            .with_context(|| format!("Failed to read buffer {} from {}", index, buffer_path.display()))?;
        document.set_buffer(index, data)?;
    }

    Ok(document)
}

fn inspect(path: &Path) -> Result<()> {
    let document = load(path)?;

    if !document.uses_compression() {
        println!("{}: {} is not declared in extensionsUsed", path.display(), gltf::EXTENSION_NAME);
    }

    let resolver = BufferRegionResolver::new(&document);
    let mut checked = 0;
    let mut invalid = 0;

    for mesh_index in 0..document.mesh_count() {
        if !document.has_compressed_primitive(mesh_index) {
            continue;
        }
        let mesh = document.mesh_descriptor(mesh_index)?;
        println!("mesh {} '{}' ({} primitives)", mesh_index, mesh.name, mesh.primitives.len());

        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            checked += 1;
            let result = primitive.clone()
                .map_err(anyhow::Error::from)
                .and_then(|desc| {
                    let region = resolver.resolve(desc.buffer_view)?;
                    let ids = AttributeIdSet::validate(&desc.attribute_ids()?)?;
                    Ok((desc, region.len(), ids.len()))
                });
            match result {
                Ok((desc, bytes, attributes)) => println!(
                    "  primitive {}: bufferView {} ({} bytes), {} attribute ids, material {:?}",
                    primitive_index, desc.buffer_view, bytes, attributes, desc.material,
                ),
                Err(err) => {
                    invalid += 1;
                    println!("  primitive {}: {}", primitive_index, err);
                }
            }
        }
    }

    println!("{} primitives checked, {} invalid", checked, invalid);
    Ok(())
}
