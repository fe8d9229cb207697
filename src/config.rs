//! Sort configuration.

use std::error::Error;
use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::delay::Delays;
use crate::tape::{Tape, TapeError, MEMORY_DIVIDER};

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file reading error.
    IO(io::Error),
    /// Configuration file format error.
    Parse(serde_yaml::Error),
    /// Configuration value is out of range.
    Invalid(String),
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            ConfigError::IO(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ConfigError::IO(err) => write!(f, "configuration not read: {}", err),
            ConfigError::Parse(err) => write!(f, "configuration format error: {}", err),
            ConfigError::Invalid(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

/// Sort configuration.
///
/// Read from a flat `key: value` file, delays are in milliseconds:
///
/// ```yaml
/// N: 9
/// M: 160
/// delay_for_read: 0
/// delay_for_put: 0
/// delay_for_shift: 0
/// path_in: ./input.txt
/// path_out: ./output.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Declared number of input elements.
    #[serde(rename = "N")]
    pub size: usize,
    /// Memory budget, in the units of the chunk size.
    #[serde(rename = "M")]
    pub memory: u64,
    /// Read delay, milliseconds.
    #[serde(default)]
    pub delay_for_read: u64,
    /// Put delay, milliseconds.
    #[serde(default)]
    pub delay_for_put: u64,
    /// Shift delay, milliseconds.
    #[serde(default)]
    pub delay_for_shift: u64,
    pub path_in: PathBuf,
    pub path_out: PathBuf,
}

impl Config {
    /// Loads a configuration from a `key: value` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::IO(err))?;
        content.parse()
    }

    /// Checks that the configuration describes a sortable tape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::Invalid("N must be positive".to_string()));
        }
        if self.memory < MEMORY_DIVIDER {
            return Err(ConfigError::Invalid(format!(
                "M = {} leaves no room for a chunk, at least {} is required",
                self.memory, MEMORY_DIVIDER
            )));
        }

        return Ok(());
    }

    pub fn chunk_size(&self) -> usize {
        Tape::chunk_size_from_budget(self.memory, self.size)
    }

    pub fn delays(&self) -> Delays {
        Delays::from_millis(self.delay_for_read, self.delay_for_put, self.delay_for_shift)
    }

    /// Opens the input tape described by the configuration.
    pub fn open_input(&self) -> Result<Tape, TapeError> {
        Tape::open(&self.path_in, self.size, self.chunk_size(), self.delays())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s).map_err(|err| ConfigError::Parse(err))
    }
}
