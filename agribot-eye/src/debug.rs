//! Persistence of the per-cycle debug overlay

use crate::error::VisionError;
use parking_lot::Mutex;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Stores the most recent debug image and hands it back on request.
///
/// Called from blocking worker threads, so implementations may do
/// synchronous I/O.
pub trait DebugSink: Send + Sync {
    fn persist(&self, jpeg: &[u8]) -> Result<(), VisionError>;

    /// `None` until the first image has been persisted.
    fn latest(&self) -> Result<Option<Vec<u8>>, VisionError>;
}

/// Writes the overlay to a fixed path, replacing the previous one.
pub struct FileDebugSink {
    path: PathBuf,
}

impl FileDebugSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_dir(&self) -> Result<PathBuf, VisionError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                Ok(parent.to_path_buf())
            }
            _ => Ok(PathBuf::from(".")),
        }
    }
}

impl DebugSink for FileDebugSink {
    fn persist(&self, jpeg: &[u8]) -> Result<(), VisionError> {
        // Unique staging file per write; readers only see complete images
        let mut staging = tempfile::Builder::new()
            .prefix(".overlay-")
            .suffix(".tmp")
            .tempfile_in(self.staging_dir()?)?;
        staging.write_all(jpeg)?;
        staging.flush()?;
        staging.persist(&self.path).map_err(|e| VisionError::Io(e.error))?;
        Ok(())
    }

    fn latest(&self) -> Result<Option<Vec<u8>>, VisionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the latest overlay in memory.
#[derive(Default)]
pub struct MemoryDebugSink {
    latest: Mutex<Option<Vec<u8>>>,
}

impl MemoryDebugSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DebugSink for MemoryDebugSink {
    fn persist(&self, jpeg: &[u8]) -> Result<(), VisionError> {
        *self.latest.lock() = Some(jpeg.to_vec());
        Ok(())
    }

    fn latest(&self) -> Result<Option<Vec<u8>>, VisionError> {
        Ok(self.latest.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDebugSink::new(dir.path().join("output.jpg"));
        assert!(sink.latest().unwrap().is_none());
    }

    #[test]
    fn test_file_sink_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDebugSink::new(dir.path().join("debug").join("output.jpg"));

        sink.persist(b"first").unwrap();
        sink.persist(b"second").unwrap();

        assert_eq!(sink.latest().unwrap().as_deref(), Some(&b"second"[..]));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("debug"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "output.jpg")
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_file_sink_concurrent_writers_and_reader() {
        const SIZE: usize = 1 << 20;
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDebugSink::new(dir.path().join("output.jpg"));
        sink.persist(&vec![b'a'; SIZE]).unwrap();

        std::thread::scope(|scope| {
            let writers: Vec<_> = (0..4)
                .map(|i| {
                    let sink = &sink;
                    scope.spawn(move || {
                        let fill = if i % 2 == 0 { b'a' } else { b'b' };
                        let buffer = vec![fill; SIZE];
                        for _ in 0..10 {
                            sink.persist(&buffer).unwrap();
                        }
                    })
                })
                .collect();

            let sink = &sink;
            let reader = scope.spawn(move || {
                for _ in 0..50 {
                    let image = sink.latest().unwrap().unwrap();
                    assert_eq!(image.len(), SIZE);
                    assert!(image.iter().all(|b| *b == image[0]), "mixed contents read");
                }
            });

            for writer in writers {
                writer.join().unwrap();
            }
            reader.join().unwrap();
        });

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryDebugSink::new();
        assert!(sink.latest().unwrap().is_none());
        sink.persist(&[0xFF, 0xD8]).unwrap();
        assert_eq!(sink.latest().unwrap(), Some(vec![0xFF, 0xD8]));
    }
}
