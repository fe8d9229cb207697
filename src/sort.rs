//! Tape sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::buffer::LimitedBuffer;
use crate::merger::{self, WriteMode};
use crate::tape::{Tape, TapeError, TapeWriter};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Common I/O error.
    IO(io::Error),
    /// Tape access error.
    Tape(TapeError),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::TempDir(err) => err,
            SortError::IO(err) => err,
            SortError::Tape(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::Tape(err) => write!(f, "tape operation failed: {}", err),
        }
    }
}

impl From<TapeError> for SortError {
    fn from(err: TapeError) -> Self {
        SortError::Tape(err)
    }
}

/// Tape sorter builder. Provides methods for [`TapeSorter`] initialization.
#[derive(Clone, Default)]
pub struct TapeSorterBuilder {
    /// Directory to be used to store temporary tapes.
    tmp_dir: Option<Box<Path>>,
    /// Merge result write mode.
    write_mode: WriteMode,
}

impl TapeSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        TapeSorterBuilder::default()
    }

    /// Builds a [`TapeSorter`] instance using provided configuration.
    pub fn build(self) -> TapeSorter {
        TapeSorter::new(self.tmp_dir.as_deref(), self.write_mode)
    }

    /// Sets directory to be used to store temporary tapes.
    pub fn with_tmp_dir(mut self, path: &Path) -> TapeSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets the way merge results are written onto their tapes.
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> TapeSorterBuilder {
        self.write_mode = write_mode;
        return self;
    }
}

/// External two-way merge sorter of tapes.
///
/// Sorting runs in three phases:
/// * **split**: every chunk of the input tape is sorted in memory and saved as a single-chunk run tape,
/// * **assembly**: run tapes are merged pairwise, round by round, until two of them are left,
/// * **final merge**: the last two run tapes are merged onto the output tape.
///
/// Every sort uses its own temporary working directory that is removed once the sort is over.
pub struct TapeSorter {
    /// Directory to be used to store temporary tapes.
    tmp_dir: Option<Box<Path>>,
    /// Merge result write mode.
    write_mode: WriteMode,
}

impl TapeSorter {
    /// Creates a new tape sorter instance.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory to be used to store temporary tapes. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    /// * `write_mode` - The way merge results are written onto their tapes.
    pub fn new(tmp_path: Option<&Path>, write_mode: WriteMode) -> Self {
        TapeSorter {
            tmp_dir: tmp_path.map(Into::into),
            write_mode,
        }
    }

    fn init_tmp_directory(&self) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = &self.tmp_dir {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    fn round_dir(work_dir: &Path, round: usize) -> PathBuf {
        work_dir.join(round.to_string())
    }

    fn run_path(round_dir: &Path, number: usize) -> PathBuf {
        round_dir.join(format!("{}.txt", number))
    }

    /// Sorts the input tape onto a tape stored at `output`.
    /// Returns the sorted output tape.
    ///
    /// # Arguments
    /// * `input` - Tape to be sorted
    /// * `output` - Output tape file, created or truncated
    pub fn sort(&self, input: &mut Tape, output: &Path) -> Result<Tape, SortError> {
        log::info!(
            "sorting {} (elements: {}, chunks: {}, chunk size: {})",
            input.path().display(),
            input.size(),
            input.count_of_chunks(),
            input.max_chunk_size()
        );

        if input.size() == 0 {
            log::debug!("input tape is empty");
            return Ok(input.copy_to(output)?);
        }

        let work_dir = self.init_tmp_directory()?;
        let mut runs = self.split(input, work_dir.path())?;

        let result = if runs.len() == 1 {
            log::debug!("input tape fits a single chunk");
            runs[0].copy_to(output)?
        } else {
            let mut runs = self.assemble_rounds(work_dir.path(), runs)?;

            log::debug!("final merge onto {}", output.display());
            let (first, second) = runs.split_at_mut(1);
            merger::merge(&mut first[0], &mut second[0], output, self.write_mode)?
        };

        work_dir.close().map_err(|err| SortError::TempDir(err))?;
        log::info!("sorted tape saved to {}", result.path().display());

        return Ok(result);
    }

    /// Saves every chunk of the input tape as a sorted single-chunk run tape.
    fn split(&self, input: &mut Tape, work_dir: &Path) -> Result<Vec<Tape>, SortError> {
        let dir = Self::round_dir(work_dir, 0);
        fs::create_dir_all(&dir).map_err(|err| SortError::TempDir(err))?;

        let count = input.count_of_chunks();
        log::debug!("splitting input into {} runs", count);

        // reading starts over from the first element wherever the head was left
        input.release_chunk();

        let mut runs = Vec::with_capacity(count);
        for number in 0..count {
            let size = if number + 1 == count {
                input.min_chunk_size()
            } else {
                input.max_chunk_size()
            };

            let mut buffer = LimitedBuffer::with_capacity(size);
            loop {
                buffer.push(input.current_value()?);
                if buffer.is_full() {
                    break;
                }
                input.move_right()?;
            }
            // step onto the next chunk, no-op on the last one
            input.move_right()?;

            log::trace!("sorting run {} ({} values)", number, buffer.len());
            buffer.sort();

            let mut writer = TapeWriter::create(Self::run_path(&dir, number), size, size, input.delays())?;
            for value in buffer {
                writer.append(value)?;
            }
            runs.push(writer.finish()?);
        }
        input.release_chunk();

        return Ok(runs);
    }

    /// Merges run tapes round by round until two of them are left.
    /// Once a round is built the directory of the round it was built from is removed.
    fn assemble_rounds(&self, work_dir: &Path, mut runs: Vec<Tape>) -> Result<Vec<Tape>, SortError> {
        let mut round = 0;
        while runs.len() > 2 {
            round += 1;
            runs = self.assemble(work_dir, round, runs)?;
            fs::remove_dir_all(Self::round_dir(work_dir, round - 1)).map_err(|err| SortError::IO(err))?;
        }

        return Ok(runs);
    }

    /// Merges run tapes pairwise into the given round directory.
    /// An unpaired last tape is copied into the round unchanged.
    fn assemble(&self, work_dir: &Path, round: usize, runs: Vec<Tape>) -> Result<Vec<Tape>, SortError> {
        let dir = Self::round_dir(work_dir, round);
        fs::create_dir_all(&dir).map_err(|err| SortError::TempDir(err))?;
        log::debug!("assembly round {}: merging {} runs", round, runs.len());

        let mut merged = Vec::with_capacity((runs.len() + 1) / 2);
        let mut runs = runs.into_iter();
        loop {
            let path = Self::run_path(&dir, merged.len());
            match (runs.next(), runs.next()) {
                (Some(mut first), Some(mut second)) => {
                    merged.push(merger::merge(&mut first, &mut second, &path, self.write_mode)?);
                }
                (Some(mut odd), None) => merged.push(odd.copy_to(&path)?),
                _ => break,
            }
        }

        return Ok(merged);
    }
}
