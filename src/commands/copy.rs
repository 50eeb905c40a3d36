//! # Copy Command Implementation
//!
//! `filedest copy <SOURCE> [DEST]` reads a source tree into descriptors and
//! pipes them through a sink writing under `DEST`.
//!
//! Settings come from three layers, later ones winning: sink defaults, an
//! optional YAML file given with `--config`, and command-line flags. The
//! destination may come from the YAML file when `DEST` is omitted.
//!
//! Every failed descriptor is printed as it happens. The command exits with
//! an error when any descriptor failed, after the summary is printed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use filedest::options::{self, Destination, SinkOptions};
use filedest::output::{error_line, summary_text, OutputConfig};
use filedest::sink::{Sink, SinkEvent, Summary};
use filedest::source::{read_tree, ReadMode, SourceOptions};

/// Copy a source tree into a destination folder
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Directory whose contents are copied.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination folder. Relative paths resolve against `--cwd`.
    #[arg(value_name = "DEST")]
    pub dest: Option<PathBuf>,

    /// YAML file with sink settings.
    #[arg(short, long, value_name = "FILE", env = "FILEDEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Working directory for resolving the destination.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Permission bits for written files, in octal (e.g. 644).
    #[arg(long, value_name = "OCTAL")]
    pub mode: Option<String>,

    /// Permission bits for created directories, in octal (e.g. 755).
    #[arg(long, value_name = "OCTAL")]
    pub dir_mode: Option<String>,

    /// Leave existing destination files untouched.
    #[arg(long)]
    pub no_overwrite: bool,

    /// Number of descriptors written in parallel.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Only copy files whose path relative to SOURCE matches this glob.
    #[arg(short, long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Relay file contents incrementally instead of buffering them.
    #[arg(long, conflicts_with = "no_read")]
    pub stream: bool,

    /// Do not read file contents; only the directory structure is created.
    #[arg(long)]
    pub no_read: bool,

    /// Copy what symlinks point to instead of recreating the links.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Suppress everything except errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl CopyArgs {
    fn read_mode(&self) -> ReadMode {
        if self.no_read {
            ReadMode::None
        } else if self.stream {
            ReadMode::Stream
        } else {
            ReadMode::Buffer
        }
    }

    /// Merge the config file and flags into a destination and options.
    fn sink_settings(&self) -> Result<(Destination, SinkOptions)> {
        let (destination, mut sink_options) = match (&self.config, &self.dest) {
            (Some(path), dest) => {
                let file = options::from_file(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                match dest {
                    Some(dest) => (Destination::from(dest.clone()), file.options()?),
                    None => file.into_parts()?,
                }
            }
            (None, Some(dest)) => (Destination::from(dest.clone()), SinkOptions::new()),
            (None, None) => anyhow::bail!("No destination given: pass DEST or use --config"),
        };

        if let Some(cwd) = &self.cwd {
            sink_options.cwd = Some(cwd.clone());
        }
        if let Some(mode) = &self.mode {
            sink_options.mode = Some(options::parse_mode(mode)?);
        }
        if let Some(mode) = &self.dir_mode {
            sink_options.dir_mode = Some(options::parse_mode(mode)?);
        }
        if self.no_overwrite {
            sink_options.overwrite = false;
        }
        if let Some(jobs) = self.jobs {
            sink_options.concurrency = jobs;
        }
        Ok((destination, sink_options))
    }
}

/// Execute the `copy` command.
pub fn execute(args: CopyArgs, color: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color);

    if !args.source.is_dir() {
        anyhow::bail!("Source directory not found: {}", args.source.display());
    }
    let source = if args.source.is_absolute() {
        args.source.clone()
    } else {
        std::env::current_dir()?.join(&args.source)
    };

    let (destination, sink_options) = args.sink_settings()?;
    let sink = Sink::new(destination, sink_options)?;

    let source_options = SourceOptions {
        read: args.read_mode(),
        pattern: args.pattern.clone(),
        follow_symlinks: args.follow_symlinks,
    };
    let files = read_tree(&source, &source_options)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    debug!("read {} descriptor(s) from '{}'", files.len(), source.display());

    let mut summary = Summary::default();
    for event in sink.pipe(files) {
        match event {
            SinkEvent::Data(_) => {}
            SinkEvent::Error(err) => eprintln!("{}", error_line(&out, &err)),
            SinkEvent::Finished(finished) => summary = finished,
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !args.quiet {
        println!("{}", summary_text(&out, &summary));
    }

    if summary.failed > 0 {
        anyhow::bail!("{} item(s) failed to write", summary.failed);
    }
    Ok(())
}
