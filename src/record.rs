//! Recording of outbound node messages to a generator file.
//!
//! When a recording directory is configured, every node message pushed to
//! the peer paths is appended to `messages.dat` in wire form until the
//! configured cap is reached. The counter and the writer live on the node
//! task; nothing else touches the file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::message::{wire, NodeMessage};

/// File name of the recording inside the configured directory.
pub const RECORD_FILE_NAME: &str = "messages.dat";

/// Errors raised when opening a recording target.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("recording path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("cannot open recording file {path}: {source}")]
    Open {
        path: PathBuf,
        source: io::Error,
    },
}

/// Append-only writer for outbound node messages.
pub struct Recorder {
    writer: BufWriter<File>,
    path: PathBuf,
    remaining: u64,
    scratch: Vec<u8>,
}

impl Recorder {
    /// Open `messages.dat` inside `dir`, recording at most `cap` messages.
    pub fn open(dir: &Path, cap: u64) -> Result<Self, RecordError> {
        if !dir.is_dir() {
            return Err(RecordError::NotADirectory(dir.to_path_buf()));
        }
        let path = dir.join(RECORD_FILE_NAME);
        let file = File::create(&path).map_err(|source| RecordError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), cap, "opened recording file");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            remaining: cap,
            scratch: Vec::new(),
        })
    }

    /// Append one message in wire form, length-prefixed.
    ///
    /// Once the cap is exhausted this becomes a no-op. A write failure logs
    /// a warning and disables further recording.
    pub fn record(&mut self, msg: &NodeMessage) {
        if self.remaining == 0 {
            return;
        }
        self.scratch.clear();
        wire::encode_node_message(msg, &mut self.scratch);
        let len = (self.scratch.len() as u32).to_le_bytes();
        let result = self
            .writer
            .write_all(&len)
            .and_then(|_| self.writer.write_all(&self.scratch));
        match result {
            Ok(()) => self.remaining -= 1,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "recording failed, disabling");
                self.remaining = 0;
            }
        }
    }

    /// Messages still allowed before the cap kicks in.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
