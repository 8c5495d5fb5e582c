use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_markdown::help_markdown;
use std::path::PathBuf;

/// POSIX-style file operations over a host filesystem, with host-call record and replay
#[derive(Parser, Debug)]
#[command(name = "fdshim", author, version, about, propagate_version = true)]
#[allow(dead_code)]
struct Cli {
    /// Record every host call to this trace file (extension determines format: .json or .cbor)
    #[arg(long, global = true, value_name = "TRACE", conflicts_with = "replay")]
    record: Option<PathBuf>,
    /// Answer host calls from a previously recorded trace instead of the real filesystem
    #[arg(long, global = true, value_name = "TRACE")]
    replay: Option<PathBuf>,
    /// Trace format (json or cbor). If not specified, inferred from file extension
    #[arg(
        short = 'f',
        long = "format",
        global = true,
        value_name = "FORMAT",
        value_parser = ["json", "cbor"]
    )]
    format: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[allow(dead_code)]
enum Command {
    /// List a directory through descriptor-based enumeration
    Ls {
        dir: String,
        /// Size of the buffer handed to each enumeration call
        #[arg(long, default_value_t = 4096)]
        buffer: usize,
    },
    /// Print a file to stdout
    Cat {
        file: String,
        /// Start reading at this byte offset
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Copy a file, preserving its permission bits
    Cp { src: String, dst: String },
    /// Print file metadata as JSON
    Stat {
        path: String,
        /// Do not follow a trailing symbolic link
        #[arg(long)]
        no_follow: bool,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Permission bits, in octal
        #[arg(long, default_value = "755", value_parser = parse_octal)]
        mode: u32,
    },
    /// Remove a file, or an empty directory with -d
    Rm {
        path: String,
        #[arg(short = 'd', long)]
        dir: bool,
    },
    /// Rename a file or directory
    Mv { from: String, to: String },
    /// Create a hard link, or a symbolic link with -s
    Ln {
        target: String,
        link: String,
        #[arg(short = 's', long)]
        symbolic: bool,
    },
    /// Print the target of a symbolic link
    Readlink { path: String },
    /// Print the current directory
    Pwd,
    /// Convert a trace file between JSON and CBOR formats
    Convert {
        /// Input trace file
        input: PathBuf,
        /// Output trace file (extension determines format: .json or .cbor)
        output: PathBuf,
        /// Input format (json or cbor). If not specified, inferred from file extension
        #[arg(
            long = "input-format",
            value_name = "FORMAT",
            value_parser = ["json", "cbor"]
        )]
        input_format: Option<String>,
        /// Output format (json or cbor). If not specified, inferred from file extension
        #[arg(
            long = "output-format",
            value_name = "FORMAT",
            value_parser = ["json", "cbor"]
        )]
        output_format: Option<String>,
    },
}

fn parse_octal(s: &str) -> Result<u32> {
    u32::from_str_radix(s, 8).with_context(|| format!("invalid octal mode: {s}"))
}

fn main() {
    // Print header
    println!("# fdshim CLI Reference");
    println!();
    println!("This page contains the auto-generated reference documentation for the `fdshim` command-line interface.");
    println!();

    // Generate and print the markdown using the type parameter
    println!("{}", help_markdown::<Cli>());
}
