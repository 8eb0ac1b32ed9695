//! Print the OpenAPI document as JSON, or YAML with `--yaml`.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;

use cinema::doc::ApiDoc;
use clap::Parser;
use utoipa::OpenApi;

/// `openapi-dump` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "openapi-dump", about = "Print the cinema OpenAPI document", version)]
struct CliArgs {
    /// Emit YAML instead of pretty-printed JSON.
    #[arg(long)]
    yaml: bool,
}

fn main() -> io::Result<()> {
    let args = CliArgs::parse();
    let doc = ApiDoc::openapi();
    let rendered = if args.yaml {
        doc.to_yaml().map_err(io::Error::other)?
    } else {
        doc.to_pretty_json().map_err(io::Error::other)?
    };
    println!("{rendered}");
    Ok(())
}
