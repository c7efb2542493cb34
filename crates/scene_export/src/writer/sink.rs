//! Output destinations for the scene writer

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Opens a fresh output stream for each scene session
pub trait SinkFactory {
    /// Stream type written to
    type Sink: Write;

    /// Open (and truncate) the destination
    fn open(&mut self) -> io::Result<Self::Sink>;

    /// Destination description for log messages
    fn describe(&self) -> String;
}

/// Buffered file output
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Write to `path`, creating or truncating it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SinkFactory for FileSink {
    type Sink = BufWriter<File>;

    fn open(&mut self) -> io::Result<Self::Sink> {
        Ok(BufWriter::with_capacity(256 * 1024, File::create(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory output shared with the caller
///
/// Each session replaces the previous contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl MemorySink {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.borrow().clone()
    }

    /// Written text, with invalid UTF-8 replaced
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl SinkFactory for MemorySink {
    type Sink = SharedBuffer;

    fn open(&mut self) -> io::Result<Self::Sink> {
        self.buffer.borrow_mut().clear();
        Ok(SharedBuffer(Rc::clone(&self.buffer)))
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

/// Writer handle into a [`MemorySink`]
#[derive(Debug)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
