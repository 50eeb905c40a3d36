//! Incrementally-available file contents.
//!
//! A [`ContentStream`] yields chunks of bytes as they become available. The
//! sink relays each chunk to the destination in the order received and never
//! holds more than one chunk of a stream at a time.
//!
//! Streams built with [`ContentStream::channel`] are a bounded producer/consumer
//! handoff: the producer's [`ChunkSender::send`] blocks once `capacity` chunks
//! are queued and resumes when the sink has written one out. That is the
//! suspension point through which a slow destination pushes back on a fast
//! producer without dropping bytes.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, SyncSender};

/// Chunk size used when relaying from a reader.
pub const CHUNK_SIZE: usize = 64 * 1024;

enum Source {
    Channel(Receiver<io::Result<Vec<u8>>>),
    Reader(Box<dyn Read + Send>),
    Path(PathBuf),
    Done,
}

/// A source of file contents that arrives in chunks.
pub struct ContentStream {
    source: Source,
}

impl ContentStream {
    /// Create a bounded channel stream.
    ///
    /// At most `capacity` chunks (minimum 1) wait between the producer and the
    /// sink. Dropping the returned [`ChunkSender`] ends the stream.
    pub fn channel(capacity: usize) -> (ChunkSender, ContentStream) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        (
            ChunkSender { sender },
            ContentStream {
                source: Source::Channel(receiver),
            },
        )
    }

    /// Relay any reader in [`CHUNK_SIZE`] chunks.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            source: Source::Reader(Box::new(reader)),
        }
    }

    /// Stream a file from disk. The file is opened on the first pull.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Path(path.into()),
        }
    }

    fn read_chunk(reader: &mut dyn Read) -> Option<io::Result<Vec<u8>>> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => return None,
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Iterator for ContentStream {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Source::Path(path) = &self.source {
            match File::open(path) {
                Ok(file) => self.source = Source::Reader(Box::new(file)),
                Err(e) => {
                    self.source = Source::Done;
                    return Some(Err(e));
                }
            }
        }

        let item = match &mut self.source {
            Source::Channel(receiver) => receiver.recv().ok(),
            Source::Reader(reader) => Self::read_chunk(reader.as_mut()),
            Source::Path(_) | Source::Done => None,
        };

        match item {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(e)) => {
                self.source = Source::Done;
                Some(Err(e))
            }
            None => {
                self.source = Source::Done;
                None
            }
        }
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Channel(_) => "channel".to_string(),
            Source::Reader(_) => "reader".to_string(),
            Source::Path(path) => format!("path({})", path.display()),
            Source::Done => "done".to_string(),
        };
        f.debug_struct("ContentStream")
            .field("source", &source)
            .finish()
    }
}

/// Producer half of [`ContentStream::channel`].
#[derive(Debug, Clone)]
pub struct ChunkSender {
    sender: SyncSender<io::Result<Vec<u8>>>,
}

impl ChunkSender {
    /// Queue a chunk, blocking while the channel is full.
    ///
    /// Fails with `BrokenPipe` once the consuming stream has been dropped.
    pub fn send(&self, chunk: impl Into<Vec<u8>>) -> io::Result<()> {
        self.sender.send(Ok(chunk.into())).map_err(|_| closed())
    }

    /// Deliver a failure to the consumer and end the stream.
    pub fn abort(self, error: io::Error) -> io::Result<()> {
        self.sender.send(Err(error)).map_err(|_| closed())
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "content stream consumer has gone away")
}
