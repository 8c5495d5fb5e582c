use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use fdshim::sys::{dirent, SEEK_SET};
use fdshim::trace::{convert, TraceFormat};
use fdshim::{FileSystem, HostFs, NativeHost, OpenMode, PlaybackHost, RecordingHost};

/// POSIX-style file operations over a host filesystem, with host-call record and replay
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
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

const COPY_CHUNK: usize = 64 * 1024;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Command::Convert {
        input,
        output,
        input_format,
        output_format,
    } = &cli.command
    {
        let input_format = TraceFormat::from_path_and_option(input, input_format.as_deref())?;
        let output_format = TraceFormat::from_path_and_option(output, output_format.as_deref())?;
        return convert(input, output, input_format, output_format);
    }

    if let Some(trace) = &cli.record {
        let format = TraceFormat::from_path_and_option(trace, cli.format.as_deref())?;
        let fs = FileSystem::new(RecordingHost::new(NativeHost::new()));
        let result = run(&fs, &cli.command);
        // Keep the trace even when the command failed, so the failure replays.
        fs.into_host().save(trace, format)?;
        return result;
    }

    if let Some(trace) = &cli.replay {
        let format = TraceFormat::from_path_and_option(trace, cli.format.as_deref())?;
        info!("replaying host calls from {}", trace.display());
        let fs = FileSystem::new(PlaybackHost::from_file(trace, format)?);
        run(&fs, &cli.command)?;
        return fs.into_host().finish();
    }

    run(&FileSystem::new(NativeHost::new()), &cli.command)
}

fn run<H: HostFs>(fs: &FileSystem<H>, command: &Command) -> Result<()> {
    match command {
        Command::Ls { dir, buffer } => list(fs, dir, *buffer),
        Command::Cat { file, offset } => cat(fs, file, *offset),
        Command::Cp { src, dst } => copy(fs, src, dst),
        Command::Stat { path, no_follow } => {
            let st = if *no_follow {
                fs.lstat(path)
            } else {
                fs.stat(path)
            };
            let st = st.with_context(|| format!("failed to stat {path}"))?;
            let mut json = serde_json::to_string_pretty(&st)?;
            json.push('\n');
            write_all(fs, 1, json.as_bytes())
        }
        Command::Mkdir { path, mode } => fs
            .mkdir(path, *mode)
            .with_context(|| format!("failed to create directory {path}")),
        Command::Rm { path, dir } => {
            let removed = if *dir { fs.rmdir(path) } else { fs.unlink(path) };
            removed.with_context(|| format!("failed to remove {path}"))
        }
        Command::Mv { from, to } => fs
            .rename(from, to)
            .with_context(|| format!("failed to rename {from} to {to}")),
        Command::Ln {
            target,
            link,
            symbolic,
        } => {
            let linked = if *symbolic {
                fs.symlink(target, link)
            } else {
                fs.link(target, link)
            };
            linked.with_context(|| format!("failed to link {link} to {target}"))
        }
        Command::Readlink { path } => {
            let mut buf = vec![0u8; 4096];
            let n = fs
                .readlink(path, &mut buf)
                .with_context(|| format!("failed to read link {path}"))?;
            buf.truncate(n);
            buf.push(b'\n');
            write_all(fs, 1, &buf)
        }
        Command::Pwd => {
            let mut cwd = fs.current_dir().context("failed to get current directory")?;
            cwd.push('\n');
            write_all(fs, 1, cwd.as_bytes())
        }
        Command::Convert { .. } => Err(anyhow!("convert does not run against a filesystem")),
    }
}

fn list<H: HostFs>(fs: &FileSystem<H>, dir: &str, buffer: usize) -> Result<()> {
    if buffer <= dirent::HEADER_LEN {
        bail!("enumeration buffer of {buffer} bytes cannot hold any entry");
    }

    let fd = fs
        .open(dir, OpenMode::RDONLY, 0)
        .with_context(|| format!("failed to open {dir}"))?;
    let mut buf = vec![0u8; buffer];
    let listed = (|| -> Result<()> {
        loop {
            let n = fs
                .read_dirent(fd, &mut buf)
                .with_context(|| format!("failed to list {dir}"))?;
            if n == 0 {
                return Ok(());
            }
            let names =
                dirent::parse(&buf[..n]).ok_or_else(|| anyhow!("malformed directory records"))?;
            for name in names {
                write_all(fs, 1, format!("{name}\n").as_bytes())?;
            }
        }
    })();
    fs.close(fd)?;
    listed
}

fn cat<H: HostFs>(fs: &FileSystem<H>, file: &str, offset: Option<i64>) -> Result<()> {
    let fd = fs
        .open(file, OpenMode::RDONLY, 0)
        .with_context(|| format!("failed to open {file}"))?;
    let copied = (|| -> Result<()> {
        if let Some(offset) = offset {
            fs.seek(fd, offset, SEEK_SET)
                .with_context(|| format!("failed to seek {file} to {offset}"))?;
        }
        pump(fs, fd, 1)
    })();
    fs.close(fd)?;
    copied
}

fn copy<H: HostFs>(fs: &FileSystem<H>, src: &str, dst: &str) -> Result<()> {
    let mode = fs
        .stat(src)
        .with_context(|| format!("failed to stat {src}"))?
        .mode
        & 0o7777;
    let from = fs
        .open(src, OpenMode::RDONLY, 0)
        .with_context(|| format!("failed to open {src}"))?;
    let to = match fs.open(dst, OpenMode::WRONLY | OpenMode::CREATE | OpenMode::TRUNC, mode) {
        Ok(fd) => fd,
        Err(err) => {
            fs.close(from)?;
            return Err(err).with_context(|| format!("failed to create {dst}"));
        }
    };

    let copied = (|| -> Result<()> {
        pump(fs, from, to)?;
        fs.fchmod(to, mode)?;
        fs.fsync(to)?;
        Ok(())
    })();
    fs.close(from)?;
    fs.close(to)?;
    copied.with_context(|| format!("failed to copy {src} to {dst}"))
}

/// Copy everything readable from `from` to `to`.
fn pump<H: HostFs>(fs: &FileSystem<H>, from: i32, to: i32) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let n = fs.read(from, &mut buf)?;
        if n == 0 {
            return Ok(());
        }
        write_all(fs, to, &buf[..n])?;
    }
}

fn write_all<H: HostFs>(fs: &FileSystem<H>, fd: i32, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        let n = fs.write(fd, buf)?;
        if n == 0 {
            bail!("write to descriptor {fd} made no progress");
        }
        buf = &buf[n..];
    }
    Ok(())
}
