//! # The Sink Stage
//!
//! A [`Sink`] takes file descriptors, writes each one under its destination
//! folder, and hands the relocated descriptor back.
//!
//! ## Per-descriptor sequence
//!
//! 1.  **Resolve**: compute the new `cwd`, `base` and `path`
//!     ([`crate::path::resolve_paths`]) and relocate the descriptor.
//! 2.  **Overwrite check**: with `overwrite` off, an existing destination
//!     ends the sequence here; the descriptor is still emitted.
//! 3.  **Ensure directories**: the parent chain is created with the
//!     directory mode ([`crate::dirs`]).
//! 4.  **Materialize**: write contents ([`crate::write`]), create the
//!     directory, or create the symlink ([`crate::symlink`]).
//! 5.  **Sync mode**: chmod only if the on-disk bits differ
//!     ([`crate::permissions`]).
//! 6.  **Emit** the descriptor, now carrying its resolved mode.
//!
//! A failure at any step ends that descriptor's sequence with a typed
//! [`Error`]. The descriptor is not emitted, and the stage moves on to the
//! next one unless the error is fatal.
//!
//! ## Running a stage
//!
//! [`Sink::write`] runs one descriptor on the calling thread. [`Sink::pipe`]
//! runs a whole input on a worker thread and returns a [`SinkStream`] of
//! [`SinkEvent`]s: `Data` per written descriptor, `Error` per failure, and a
//! final `Finished` with the [`Summary`].

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::Serialize;

use crate::descriptor::{FileDescriptor, Kind};
use crate::dirs::ensure_dir;
use crate::error::{Error, Result};
use crate::fs::{Filesystem, OsFilesystem};
use crate::mode;
use crate::options::{Destination, SinkConfig, SinkOptions};
use crate::path::resolve_paths;
use crate::permissions::sync_mode;
use crate::symlink::create_symlink;
use crate::write::{write_contents, Written};

/// How a descriptor's sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Buffered contents were written.
    Written,
    /// Streamed contents were relayed.
    Streamed,
    /// Contents were absent; only the parent directory was ensured.
    Empty,
    /// A directory was ensured.
    Directory,
    /// A symlink was created.
    Symlinked,
    /// The destination existed and `overwrite` is off.
    Skipped,
}

/// Counts of what a stage did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub written: usize,
    pub streamed: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written => self.written += 1,
            Outcome::Streamed => self.streamed += 1,
            Outcome::Empty => self.empty += 1,
            Outcome::Directory => self.directories += 1,
            Outcome::Symlinked => self.symlinks += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// Descriptors emitted downstream.
    pub fn emitted(&self) -> usize {
        self.written + self.streamed + self.directories + self.symlinks + self.skipped + self.empty
    }
}

/// One signal from a running stage
#[derive(Debug)]
pub enum SinkEvent {
    /// A descriptor finished its write sequence.
    Data(FileDescriptor),
    /// A descriptor failed, or the stage hit a fatal error.
    Error(Error),
    /// Every accepted descriptor is done. Always the last event.
    Finished(Summary),
}

/// Everything a drained stage produced
#[derive(Debug, Default)]
pub struct SinkReport {
    pub written: Vec<FileDescriptor>,
    pub errors: Vec<Error>,
    pub summary: Summary,
}

/// A destination stage that materializes descriptors on a filesystem.
#[derive(Clone)]
pub struct Sink {
    config: Arc<SinkConfig>,
    fs: Arc<dyn Filesystem>,
}

impl Sink {
    /// Create a sink writing under `destination`.
    ///
    /// Fails with [`Error::Configuration`] before any I/O when the destination
    /// is an empty literal or the options are invalid.
    pub fn new(destination: impl Into<Destination>, options: SinkOptions) -> Result<Self> {
        let config = SinkConfig::new(destination.into(), options)?;
        debug!(
            "sink ready: destination={:?} cwd='{}' overwrite={} umask={:03o}",
            config.destination,
            config.cwd.display(),
            config.overwrite,
            config.umask
        );
        Ok(Self {
            config: Arc::new(config),
            fs: Arc::new(OsFilesystem),
        })
    }

    /// Replace the filesystem the sink issues calls against.
    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Run one descriptor's full write sequence on the calling thread.
    pub fn write(&self, file: FileDescriptor) -> Result<FileDescriptor> {
        self.process(file).map(|(file, _)| file)
    }

    /// Run the stage over `input` on a worker thread.
    ///
    /// At most `concurrency` events wait unread; past that the stage stops
    /// pulling input until the consumer catches up.
    pub fn pipe<I>(&self, input: I) -> SinkStream
    where
        I: IntoIterator<Item = FileDescriptor>,
        I::IntoIter: Send + 'static,
    {
        let (sender, events) = mpsc::sync_channel(self.config.concurrency.max(1));
        let sink = self.clone();
        let input = input.into_iter();
        let handle = thread::spawn(move || sink.drive(input, sender));
        SinkStream {
            events,
            handle: Some(handle),
        }
    }

    /// Run the stage over `input` and wait for it to finish.
    pub fn run<I>(&self, input: I) -> SinkReport
    where
        I: IntoIterator<Item = FileDescriptor>,
        I::IntoIter: Send + 'static,
    {
        self.pipe(input).wait()
    }

    fn drive<I>(&self, input: I, sender: SyncSender<SinkEvent>)
    where
        I: Iterator<Item = FileDescriptor> + Send,
    {
        let summary = Mutex::new(Summary::default());

        if self.config.concurrency <= 1 {
            for file in input {
                if self.emit(self.process(file), &sender, &summary).is_break() {
                    break;
                }
            }
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.concurrency)
                .build()
            {
                Ok(pool) => {
                    let _ = pool.install(|| {
                        input
                            .par_bridge()
                            .try_for_each_with(sender.clone(), |sender, file| {
                                match self.emit(self.process(file), sender, &summary) {
                                    ControlFlow::Continue(()) => Ok(()),
                                    ControlFlow::Break(()) => Err(()),
                                }
                            })
                    });
                }
                Err(e) => {
                    let _ = self.emit(
                        Err(Error::ThreadPool {
                            message: e.to_string(),
                        }),
                        &sender,
                        &summary,
                    );
                }
            }
        }

        let summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        info!(
            "sink finished: {} emitted, {} failed",
            summary.emitted(),
            summary.failed
        );
        let _ = sender.send(SinkEvent::Finished(summary));
    }

    fn emit(
        &self,
        result: Result<(FileDescriptor, Outcome)>,
        sender: &SyncSender<SinkEvent>,
        summary: &Mutex<Summary>,
    ) -> ControlFlow<()> {
        let mut tally = summary.lock().unwrap_or_else(PoisonError::into_inner);
        let (event, fatal) = match result {
            Ok((file, outcome)) => {
                tally.record(outcome);
                (SinkEvent::Data(file), false)
            }
            Err(err) => {
                tally.failed += 1;
                let fatal = err.is_fatal();
                if fatal {
                    warn!("sink stopping: {}", err);
                }
                (SinkEvent::Error(err), fatal)
            }
        };
        drop(tally);

        if sender.send(event).is_err() {
            debug!("sink consumer went away; no longer accepting input");
            return ControlFlow::Break(());
        }
        if fatal {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn process(&self, file: FileDescriptor) -> Result<(FileDescriptor, Outcome)> {
        let config = &*self.config;
        let fs = &*self.fs;

        let resolved = resolve_paths(config, &file)?;
        let mut file = file.relocate(resolved.cwd, resolved.base, resolved.path);

        if !config.overwrite && exists(fs, &file.path)? {
            debug!("skipping existing '{}'", file.path.display());
            let target = match file.kind {
                Kind::Directory => mode::directory_mode(config, &file),
                _ => mode::file_mode(config, &file),
            };
            file.mode = Some(target);
            return Ok((file, Outcome::Skipped));
        }

        if let Some(parent) = file.path.parent() {
            ensure_dir(fs, parent, mode::parent_dir_mode(config))?;
        }

        let outcome = match &file.kind {
            Kind::Directory => {
                let target = mode::directory_mode(config, &file);
                ensure_dir(fs, &file.path, target)?;
                sync_mode(fs, &file.path, target)?;
                file.mode = Some(target);
                Outcome::Directory
            }
            Kind::Symlink(target) => {
                create_symlink(fs, target, &file.path, config.overwrite)?;
                file.mode = Some(mode::file_mode(config, &file));
                Outcome::Symlinked
            }
            Kind::File => {
                let target = mode::file_mode(config, &file);
                let written = write_contents(fs, &file.path, &mut file.contents, target)?;
                if written != Written::Nothing {
                    sync_mode(fs, &file.path, target)?;
                }
                file.mode = Some(target);
                match written {
                    Written::Nothing => Outcome::Empty,
                    Written::Buffered(_) => Outcome::Written,
                    Written::Streamed(_) => Outcome::Streamed,
                }
            }
        };

        debug!("{:?} '{}'", outcome, file.path.display());
        Ok((file, outcome))
    }
}

fn exists(fs: &dyn Filesystem, path: &Path) -> Result<bool> {
    match fs.symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::stat(path, e)),
    }
}

/// The event stream of a running stage.
///
/// Dropping it before `Finished` stops the stage from pulling more input;
/// descriptors already being written still complete.
#[derive(Debug)]
pub struct SinkStream {
    events: Receiver<SinkEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SinkStream {
    /// Only the written descriptors, for chaining into another stage.
    ///
    /// Errors are logged and dropped.
    pub fn descriptors(self) -> Descriptors {
        Descriptors { stream: self }
    }

    /// Drain every event into a report.
    pub fn wait(self) -> SinkReport {
        let mut report = SinkReport::default();
        for event in self {
            match event {
                SinkEvent::Data(file) => report.written.push(file),
                SinkEvent::Error(err) => report.errors.push(err),
                SinkEvent::Finished(summary) => report.summary = summary,
            }
        }
        report
    }
}

impl Iterator for SinkStream {
    type Item = SinkEvent;

    fn next(&mut self) -> Option<SinkEvent> {
        match self.events.recv() {
            Ok(event) => Some(event),
            Err(_) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        error!("sink worker panicked");
                    }
                }
                None
            }
        }
    }
}

/// Iterator over the descriptors a stage emitted. See [`SinkStream::descriptors`].
#[derive(Debug)]
pub struct Descriptors {
    stream: SinkStream,
}

impl Iterator for Descriptors {
    type Item = FileDescriptor;

    fn next(&mut self) -> Option<FileDescriptor> {
        loop {
            match self.stream.next()? {
                SinkEvent::Data(file) => return Some(file),
                SinkEvent::Error(err) => error!("{}", err),
                SinkEvent::Finished(_) => {}
            }
        }
    }
}
