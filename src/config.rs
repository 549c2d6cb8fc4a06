//! Archive handle options
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! stream_buffer_size = 131072
//! sync_on_close = true
//! create = false
//! ```

use crate::error::{CabinError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default buffer capacity for streaming readers and writers (64 KiB)
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Options applied when opening an archive handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CabinOptions {
    /// Buffer capacity for `EntryReader` / `EntryWriter`
    pub stream_buffer_size: usize,

    /// Call `sync_all` after writing the directory on close
    pub sync_on_close: bool,

    /// Create the archive file if it does not exist
    pub create: bool,
}

impl Default for CabinOptions {
    fn default() -> Self {
        Self {
            stream_buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            sync_on_close: false,
            create: true,
        }
    }
}

impl CabinOptions {
    /// Parse options from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CabinError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_buffer_size == 0 {
            return Err(CabinError::Config(
                "stream_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_stream_buffer_size(mut self, size: usize) -> Self {
        self.stream_buffer_size = size;
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }
}
