//! Destinations for rendered event lines.
//!
//! A sink is owned by exactly one writer task, so implementations take
//! `&mut self` and need no internal locking.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Line-oriented destination for the event log.
pub trait LogSink: Send + 'static {
    /// Persist one rendered line (without trailing newline).
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush and release the underlying resource.
    fn close(&mut self) -> io::Result<()>;
}

impl LogSink for Box<dyn LogSink> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Append-only (or truncating) text file.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Open `path`, creating it and its parent directory if needed.
    ///
    /// With `truncate` the previous content is discarded, otherwise lines are appended.
    pub fn open(path: impl AsRef<Path>, truncate: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(&path)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "log file already closed"))?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Flush per line so a crash loses at most the event in flight
        writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush()?;
                writer.get_ref().sync_all()
            }
            None => Ok(()),
        }
    }
}

/// In-memory sink sharing its buffer with any number of readers.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryBuffer>>,
}

#[derive(Default)]
struct MemoryBuffer {
    lines: Vec<String>,
    close_count: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|buf| buf.lines.clone())
            .unwrap_or_default()
    }

    /// Message column of every line written so far.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .iter()
            .map(|line| line.splitn(3, '\t').nth(2).unwrap_or_default().to_string())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().map(|buf| buf.close_count).unwrap_or(0)
    }
}

impl LogSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        buf.lines.push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut buf = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        buf.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_append_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.log");

        let mut sink = FileSink::open(&path, false).unwrap();
        sink.write_line("first").unwrap();
        sink.close().unwrap();

        let mut sink = FileSink::open(&path, false).unwrap();
        sink.write_line("second").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_file_sink_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.log");
        fs::write(&path, "stale\n").unwrap();

        let mut sink = FileSink::open(&path, true).unwrap();
        sink.write_line("fresh").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_file_sink_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log").join("service.log");

        let sink = FileSink::open(&path, false).unwrap();
        assert_eq!(sink.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_file_sink_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::open(dir.path().join("a.log"), false).unwrap();
        sink.close().unwrap();

        assert!(sink.write_line("late").is_err());
        // Closing twice is harmless
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_file_sink_open_fails_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSink::open(dir.path(), false).is_err());
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        writer.write_line("2024-01-01T00:00:00.000Z\tINFO\thello").unwrap();
        writer.close().unwrap();

        assert_eq!(sink.lines().len(), 1);
        assert_eq!(sink.messages(), vec!["hello".to_string()]);
        assert_eq!(sink.close_count(), 1);
    }
}
