//! Transport tasks and progress listeners.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Signal from a listener that the transfer must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Observes a single transfer. Callbacks run on the transferring task, in
/// order, and never after the task's terminal return. Returning
/// `Err(Cancelled)` aborts the transfer with a cancellation failure.
pub trait TransferListener: Send + Sync {
    fn transfer_started(&self, data_offset: u64, data_length: Option<u64>) -> Result<(), Cancelled> {
        let _ = (data_offset, data_length);
        Ok(())
    }

    fn transfer_progressed(&self, data: &[u8]) -> Result<(), Cancelled> {
        let _ = data;
        Ok(())
    }
}

/// Existence check for a remote resource.
#[derive(Debug, Clone)]
pub struct PeekTask {
    pub location: String,
}

impl PeekTask {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Download task. Without a destination the payload accumulates in memory;
/// with one it is staged in a collocated temp file and moved into place on
/// success.
pub struct GetTask {
    pub location: String,
    pub destination: Option<PathBuf>,
    /// Byte offset to resume from; only honored together with a destination.
    pub resume_offset: u64,
    pub listener: Option<Arc<dyn TransferListener>>,
    data: Vec<u8>,
    checksums: HashMap<String, String>,
}

impl GetTask {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            destination: None,
            resume_offset: 0,
            listener: None,
            data: Vec::new(),
            checksums: HashMap::new(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn resuming_at(mut self, offset: u64) -> Self {
        self.resume_offset = offset;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The payload, for tasks without a destination file.
    pub fn data_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn data_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    /// Checksums the transporter extracted from response metadata, keyed by
    /// algorithm name (`SHA-1`, `MD5`, ...).
    pub fn checksums(&self) -> &HashMap<String, String> {
        &self.checksums
    }

    pub(crate) fn clear_data(&mut self) {
        self.data.clear();
    }

    pub(crate) fn push_data(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub(crate) fn set_checksums(&mut self, checksums: HashMap<String, String>) {
        self.checksums = checksums;
    }
}

/// A repeatable upload source: the body can be produced again for a retry.
#[derive(Debug, Clone)]
pub enum PutSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Upload task.
pub struct PutTask {
    pub location: String,
    pub source: PutSource,
    pub listener: Option<Arc<dyn TransferListener>>,
}

impl PutTask {
    pub fn from_bytes(location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            location: location.into(),
            source: PutSource::Bytes(data.into()),
            listener: None,
        }
    }

    pub fn from_file(location: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            source: PutSource::File(path.into()),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn data_length(&self) -> std::io::Result<u64> {
        match self.source {
            PutSource::Bytes(ref data) => Ok(data.len() as u64),
            PutSource::File(ref path) => Ok(std::fs::metadata(path)?.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_task_accumulates_data() {
        let mut task = GetTask::new("dir/file.bin");
        task.push_data(b"hel");
        task.push_data(b"lo");
        assert_eq!(task.data_bytes(), b"hello");
        assert_eq!(task.data_string(), "hello");
    }

    #[test]
    fn put_task_length_from_bytes() {
        let task = PutTask::from_bytes("file", b"upload".to_vec());
        assert_eq!(task.data_length().unwrap(), 6);
    }

    #[test]
    fn default_listener_never_cancels() {
        struct Silent;
        impl TransferListener for Silent {}
        let listener = Silent;
        assert!(listener.transfer_started(0, None).is_ok());
        assert!(listener.transfer_progressed(b"chunk").is_ok());
    }
}
