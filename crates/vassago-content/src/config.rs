//! Content loading configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vassago_core::{Error, Result, WindowBits};

/// Settings for a [`ContentManager`](crate::ContentManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory asset names are resolved against.
    #[serde(default = "default_root_directory")]
    pub root_directory: PathBuf,

    /// File extension appended to asset names.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Log2 of the LZX window used for compressed payloads.
    #[serde(default = "default_window_bits")]
    pub window_bits: u8,

    /// Accepted container platform tag.
    #[serde(default = "default_platform")]
    pub platform: char,

    /// Largest decompressed payload accepted (bytes)
    #[serde(default = "default_max_decompressed_size")]
    pub max_decompressed_size: u64,

    /// Keep loaded assets for later `load` calls
    #[serde(default = "default_cache_assets")]
    pub cache_assets: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root_directory: default_root_directory(),
            extension: default_extension(),
            window_bits: default_window_bits(),
            platform: default_platform(),
            max_decompressed_size: default_max_decompressed_size(),
            cache_assets: default_cache_assets(),
        }
    }
}

impl ContentConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::CorruptedData {
            message: "invalid content configuration".to_string(),
            source: Some(Box::new(e)),
        })
    }

    /// Header parsing options derived from this configuration.
    pub fn header_options(&self) -> Result<HeaderOptions> {
        if !self.platform.is_ascii() {
            return Err(Error::malformed_header(format!(
                "platform tag {:?} is not a single byte",
                self.platform
            )));
        }
        Ok(HeaderOptions {
            window_bits: WindowBits::new(self.window_bits)?,
            platform: self.platform as u8,
            max_decompressed_size: self.max_decompressed_size,
        })
    }
}

/// What [`AssetHeader`](crate::AssetHeader) accepts and how it decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOptions {
    pub window_bits: WindowBits,
    pub platform: u8,
    pub max_decompressed_size: u64,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            window_bits: WindowBits::CONTAINER,
            platform: default_platform() as u8,
            max_decompressed_size: default_max_decompressed_size(),
        }
    }
}

fn default_root_directory() -> PathBuf {
    PathBuf::from("Content")
}

fn default_extension() -> String {
    ".xnb".to_string()
}

fn default_window_bits() -> u8 {
    WindowBits::CONTAINER.bits()
}

fn default_platform() -> char {
    'w'
}

fn default_max_decompressed_size() -> u64 {
    256 * 1024 * 1024 // 256MB
}

fn default_cache_assets() -> bool {
    true
}
