//! `elix` -- decode a wizard document, print its entities, optionally
//! re-encode it.
//!
//! ```text
//! elix wizards.json --encode
//! elix entities.json --shape sequence --strict
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG=elix_core=debug` for codec traces.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use elix_core::prelude::*;

// ---------------------------------------------------------------------------
// Demo components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Spell {
    name: String,
    damage: i32,
    position: Position,
}

elix_core::component! { Position => "position" { x: f64, y: f64 } }
elix_core::component! {
    Spell => "spell" { name: String, damage: i32, position: Position }
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "elix", version, about = "Decode and re-encode entity documents")]
struct Cli {
    /// JSON document to read
    file: PathBuf,

    /// Root layout of the document
    #[arg(long, value_enum, default_value_t = Shape::Map)]
    shape: Shape,

    /// Fail on component keys that match no known component
    #[arg(long)]
    strict: bool,

    /// Maximum nested component depth
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Print the re-encoded document after the entities
    #[arg(long)]
    encode: bool,

    /// Print the re-encoded document on one line
    #[arg(long)]
    compact: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Shape {
    Map,
    Sequence,
}

impl Cli {
    fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            shape: match self.shape {
                Shape::Map => DocumentShape::Map,
                Shape::Sequence => DocumentShape::sequence(),
            },
            unknown_components: if self.strict {
                UnknownComponentPolicy::Reject
            } else {
                UnknownComponentPolicy::Ignore
            },
            max_depth: self.max_depth,
        }
    }
}

/// Render an entity as the lines the driver prints for it.
fn format_entity(entity: &Entity) -> String {
    let mut lines = vec![entity.name().to_owned()];

    if let Some(pos) = entity.get::<Position>() {
        lines.push(format!("Position: {} {}", pos.x, pos.y));
    }

    match entity.get::<Spell>() {
        Some(spell) => {
            lines.push(format!("Spell: {} {}", spell.name, spell.damage));
            lines.push(format!(
                "Spell position: {} {}",
                spell.position.x, spell.position.y
            ));
        }
        None => lines.push(format!("{} is not a wizard", entity.name())),
    }

    lines.join("\n")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to open {}", cli.file.display()))?;

    let components = ComponentSet::of::<(Position, Spell)>()?;
    let codec = Codec::new(components, cli.codec_config())?;
    tracing::debug!(config = ?codec.config(), file = %cli.file.display(), "decoding");

    let entities = codec
        .decode_str(&text)
        .with_context(|| format!("failed to decode {}", cli.file.display()))?;

    println!("Deserialized:");
    for entity in &entities {
        println!("{}", format_entity(entity));
    }

    if cli.encode {
        println!("Serialized:");
        println!("{}", codec.encode_string(&entities, !cli.compact));
    }

    Ok(())
}
