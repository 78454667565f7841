//! Transfer progress rendered through an indicatif bar.

use std::sync::Mutex;

use indicatif::ProgressBar;

use quarry_transport::task::{Cancelled, TransferListener};

/// Only transfers above this size get a bar; small descriptor fetches stay
/// silent.
const BAR_THRESHOLD: u64 = 100_000;

/// A [`TransferListener`] that drives a progress bar for large payloads.
pub struct ProgressListener {
    label: String,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bar: Mutex::new(None),
        }
    }
}

impl TransferListener for ProgressListener {
    fn transfer_started(&self, data_offset: u64, data_length: Option<u64>) -> Result<(), Cancelled> {
        if let Some(total) = data_length {
            if total >= BAR_THRESHOLD {
                let bar = quarry_util::progress::transfer_bar(total, &self.label);
                bar.set_position(data_offset);
                if let Ok(mut slot) = self.bar.lock() {
                    *slot = Some(bar);
                }
            }
        }
        Ok(())
    }

    fn transfer_progressed(&self, data: &[u8]) -> Result<(), Cancelled> {
        if let Ok(slot) = self.bar.lock() {
            if let Some(ref bar) = *slot {
                bar.inc(data.len() as u64);
            }
        }
        Ok(())
    }
}

impl Drop for ProgressListener {
    fn drop(&mut self) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(ref bar) = *slot {
                bar.finish_and_clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_transfers_stay_silent() {
        let listener = ProgressListener::new("lib-1.0.jar");
        listener.transfer_started(0, Some(10)).unwrap();
        assert!(listener.bar.lock().unwrap().is_none());
        listener.transfer_progressed(b"0123456789").unwrap();
    }

    #[test]
    fn large_transfers_get_a_bar() {
        let listener = ProgressListener::new("lib-1.0.jar");
        listener.transfer_started(0, Some(500_000)).unwrap();
        assert!(listener.bar.lock().unwrap().is_some());
        listener.transfer_progressed(&[0u8; 1024]).unwrap();
    }
}
