//! File backed tape.
//!
//! A [`Tape`] exposes a sequence of `N` values stored in a file through a single head that only reads the value
//! under it, steps one position left or right and overwrites the value under it. At most one [`Chunk`] of the tape
//! is held in memory at any time, the rest of the sequence stays in the file.

use std::error::Error;
use std::fmt::{self, Display};
use std::fs;
use std::io::{self, prelude::*};
use std::mem;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use log;
use tempfile;

use crate::chunk::{Chunk, ChunkLayout};
use crate::delay::Delays;
use crate::format::{self, ValueReader};

/// Memory budget share given to one chunk. Leaves room for the two input chunks and the output chunk of a 2-way
/// merge to be resident at once.
pub const MEMORY_DIVIDER: u64 = 16;

/// Tape error.
#[derive(Debug)]
pub enum TapeError {
    /// Common I/O error.
    IO(io::Error),
    /// Tape file holds something that is not a 32-bit integer.
    Parse { token: String, source: ParseIntError },
    /// Tape file ended before the expected number of values was read.
    UnexpectedEnd { expected: usize, found: usize },
    /// Zero chunk size for a non-empty tape.
    InvalidChunkSize { size: usize },
    /// Head access on a tape without elements.
    Empty,
    /// More values appended than the tape was declared with.
    Overflow { size: usize },
    /// Both merged tapes ran out while the output chunk still had free slots.
    Exhausted { missing: usize },
}

impl Error for TapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            TapeError::IO(err) => Some(err),
            TapeError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            TapeError::IO(err) => write!(f, "I/O operation failed: {}", err),
            TapeError::Parse { token, source } => write!(f, "malformed tape value '{}': {}", token, source),
            TapeError::UnexpectedEnd { expected, found } => {
                write!(f, "tape file ended early (expected {} values, found {})", expected, found)
            }
            TapeError::InvalidChunkSize { size } => write!(f, "zero chunk size for a tape of {} elements", size),
            TapeError::Empty => write!(f, "tape has no elements"),
            TapeError::Overflow { size } => write!(f, "tape is full ({} elements)", size),
            TapeError::Exhausted { missing } => {
                write!(f, "merged tapes exhausted with {} output slots left", missing)
            }
        }
    }
}

impl From<io::Error> for TapeError {
    fn from(err: io::Error) -> Self {
        TapeError::IO(err)
    }
}

/// Materialized part of an opened tape: the chunk under the head and the file stream positioned right after it.
struct Cursor {
    chunk: Chunk,
    reader: ValueReader<io::BufReader<fs::File>>,
}

impl Cursor {
    fn open(path: &Path, layout: &ChunkLayout) -> Result<Self, TapeError> {
        if layout.count() == 0 {
            return Err(TapeError::Empty);
        }

        let mut reader = ValueReader::open(path)?;
        let mut chunk = Chunk::new(layout.max_chunk_size());
        chunk.load_from(&mut reader, 0, layout.chunk_len(0))?;

        return Ok(Cursor { chunk, reader });
    }

    fn value(&self) -> Result<i32, TapeError> {
        self.chunk.current().ok_or(TapeError::Empty)
    }

    fn step_right(&mut self, layout: &ChunkLayout) -> Result<bool, TapeError> {
        if self.chunk.is_at_tape_right_edge(layout.count()) {
            return Ok(false);
        }
        if !self.chunk.move_head_right() {
            let next = self.chunk.index() + 1;
            log::trace!("loading chunk {} (forward)", next);
            self.chunk.load_from(&mut self.reader, next, layout.chunk_len(next))?;
        }

        return Ok(true);
    }

    fn step_left(&mut self, layout: &ChunkLayout) -> Result<bool, TapeError> {
        if self.chunk.is_at_tape_left_edge() {
            return Ok(false);
        }
        if !self.chunk.move_head_left() {
            let prev = self.chunk.index() - 1;
            log::trace!("loading chunk {} (backward)", prev);
            self.seek_chunk(layout, prev)?;
        }

        return Ok(true);
    }

    /// Loads chunk `index` by rewinding the stream and skipping every chunk before it.
    fn seek_chunk(&mut self, layout: &ChunkLayout, index: usize) -> Result<(), TapeError> {
        self.reader.rewind()?;
        self.reader.skip(index * layout.max_chunk_size())?;
        self.chunk.load_from(&mut self.reader, index, layout.chunk_len(index))
    }

    /// Rewrites the whole tape file with the value under the head replaced, then walks the head from the tape end
    /// back to where it was.
    fn rewrite(&mut self, path: &Path, layout: &ChunkLayout, value: i32) -> Result<(), TapeError> {
        let (index, pos) = (self.chunk.index(), self.chunk.head());

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let scratch = tempfile::NamedTempFile::new_in(dir)?;

        {
            let mut writer = io::BufWriter::new(scratch.as_file());
            self.reader.rewind()?;
            for current in 0..layout.count() {
                self.chunk.load_from(&mut self.reader, current, layout.chunk_len(current))?;
                if current == index {
                    self.chunk.overwrite_at(pos, value);
                }
                self.chunk.serialize_to(&mut writer)?;
            }
            writer.flush()?;
        }

        scratch.persist(path).map_err(|err| TapeError::IO(err.error))?;
        self.reader = ValueReader::open(path)?;

        let last = layout.count() - 1;
        self.seek_chunk(layout, last)?;
        self.chunk.move_head_to_right_edge();
        while !self.chunk.matches(pos, index) {
            if !self.step_left(layout)? {
                break;
            }
        }

        return Ok(());
    }
}

/// Tape lifecycle. A tape materializes its first chunk lazily, on the first head access.
enum TapeState {
    Unopened,
    Active(Cursor),
}

/// Sequential-access tape of `i32` values backed by a file.
pub struct Tape {
    path: PathBuf,
    layout: ChunkLayout,
    delays: Delays,
    state: TapeState,
}

impl Tape {
    /// Opens a tape over an existing file.
    ///
    /// If the file holds fewer than `size` values the missing ones are appended to the file as zeros, so the tape
    /// always has exactly `size` elements. Values past `size` are not addressable.
    ///
    /// # Arguments
    /// * `path` - Tape file
    /// * `size` - Declared number of elements
    /// * `chunk_size` - Maximum number of elements materialized at once
    /// * `delays` - Simulated device latencies
    pub fn open(path: impl AsRef<Path>, size: usize, chunk_size: usize, delays: Delays) -> Result<Self, TapeError> {
        let path = path.as_ref().to_path_buf();
        let layout = ChunkLayout::new(size, chunk_size)?;

        let present = ValueReader::open(&path)?.count_remaining()?;
        if present < size {
            log::warn!(
                "tape {} holds {} of {} values, padding with zeros",
                path.display(),
                present,
                size
            );
            pad_with_zeros(&path, size - present)?;
        }

        return Ok(Tape::with_layout(path, layout, delays));
    }

    fn with_layout(path: PathBuf, layout: ChunkLayout, delays: Delays) -> Self {
        Tape {
            path,
            layout,
            delays,
            state: TapeState::Unopened,
        }
    }

    /// Chunk size that keeps three chunks within the memory budget: `min(memory / 16, size)`.
    pub fn chunk_size_from_budget(memory: u64, size: usize) -> usize {
        let chunk_size = memory / MEMORY_DIVIDER;
        if chunk_size >= size as u64 {
            size
        } else {
            chunk_size as usize
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn delays(&self) -> Delays {
        self.delays
    }

    pub fn count_of_chunks(&self) -> usize {
        self.layout.count()
    }

    pub fn max_chunk_size(&self) -> usize {
        self.layout.max_chunk_size()
    }

    /// Size of the last, possibly undersized, chunk.
    pub fn min_chunk_size(&self) -> usize {
        self.layout.last_chunk_size()
    }

    /// Whether a chunk of the tape is materialized.
    pub fn is_active(&self) -> bool {
        matches!(self.state, TapeState::Active(_))
    }

    fn cursor(&mut self) -> Result<&mut Cursor, TapeError> {
        match self.state {
            TapeState::Active(ref mut cursor) => Ok(cursor),
            TapeState::Unopened => {
                log::trace!("opening tape {}", self.path.display());
                self.state = TapeState::Active(Cursor::open(&self.path, &self.layout)?);
                self.cursor()
            }
        }
    }

    /// Returns the value under the head.
    pub fn current_value(&mut self) -> Result<i32, TapeError> {
        self.delays.pause_read();
        self.cursor()?.value()
    }

    /// Moves the head one position right. Returns `false` if the head is on the last element.
    pub fn move_right(&mut self) -> Result<bool, TapeError> {
        self.delays.pause_shift();
        let layout = self.layout;
        self.cursor()?.step_right(&layout)
    }

    /// Moves the head one position left. Returns `false` if the head is on the first element.
    pub fn move_left(&mut self) -> Result<bool, TapeError> {
        self.delays.pause_shift();
        let layout = self.layout;
        self.cursor()?.step_left(&layout)
    }

    /// Overwrites the value under the head in the tape file.
    ///
    /// The file is rewritten sequentially as a whole, so each call costs O(N). The head keeps its position.
    pub fn overwrite(&mut self, value: i32) -> Result<(), TapeError> {
        self.delays.pause_put();
        let layout = self.layout;
        let path = self.path.clone();
        log::trace!("overwriting value in {}", path.display());
        self.cursor()?.rewrite(&path, &layout, value)
    }

    /// Drops the materialized chunk. The next head access reopens the tape from its first element.
    pub fn release_chunk(&mut self) {
        if let TapeState::Active(mut cursor) = mem::replace(&mut self.state, TapeState::Unopened) {
            cursor.chunk.clear();
        }
    }

    /// Copies the tape content onto `path`, returning a new unopened tape with the same layout and delays.
    pub fn copy_to(&mut self, path: impl AsRef<Path>) -> Result<Tape, TapeError> {
        self.release_chunk();

        let mut writer = TapeWriter::create(path, self.size(), self.max_chunk_size(), self.delays)?;
        if self.layout.count() > 0 {
            let mut reader = ValueReader::open(&self.path)?;
            let mut chunk = Chunk::new(self.layout.max_chunk_size());
            for index in 0..self.layout.count() {
                chunk.load_from(&mut reader, index, self.layout.chunk_len(index))?;
                for &value in chunk.values() {
                    writer.append(value)?;
                }
            }
        }

        writer.finish()
    }
}

fn pad_with_zeros(path: &Path, missing: usize) -> Result<(), TapeError> {
    let mut file = fs::OpenOptions::new().read(true).append(true).open(path)?;

    let needs_separator = if file.metadata()?.len() > 0 {
        file.seek(io::SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        !last[0].is_ascii_whitespace()
    } else {
        false
    };

    let mut writer = io::BufWriter::new(file);
    if needs_separator {
        writer.write_all(b" ")?;
    }
    for _ in 0..missing {
        format::write_value(&mut writer, 0)?;
    }
    writer.flush()?;

    return Ok(());
}

/// Append-only writer building a brand-new tape left to right.
///
/// Unlike [`Tape::overwrite`] each appended value costs O(1).
pub struct TapeWriter {
    path: PathBuf,
    layout: ChunkLayout,
    delays: Delays,
    writer: io::BufWriter<fs::File>,
    written: usize,
}

impl TapeWriter {
    /// Creates (or truncates) the tape file at `path` for a tape of `size` elements.
    pub fn create(path: impl AsRef<Path>, size: usize, chunk_size: usize, delays: Delays) -> Result<Self, TapeError> {
        let path = path.as_ref().to_path_buf();
        let layout = ChunkLayout::new(size, chunk_size)?;
        let writer = io::BufWriter::new(fs::File::create(&path)?);

        return Ok(TapeWriter {
            path,
            layout,
            delays,
            writer,
            written: 0,
        });
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    /// Writes a value under the head and shifts the tape by one position.
    pub fn append(&mut self, value: i32) -> Result<(), TapeError> {
        if self.written == self.layout.size() {
            return Err(TapeError::Overflow {
                size: self.layout.size(),
            });
        }

        self.delays.pause_put();
        format::write_value(&mut self.writer, value)?;
        self.written += 1;
        self.delays.pause_shift();

        return Ok(());
    }

    /// Flushes the file and returns the written tape.
    pub fn finish(mut self) -> Result<Tape, TapeError> {
        if self.written < self.layout.size() {
            return Err(TapeError::UnexpectedEnd {
                expected: self.layout.size(),
                found: self.written,
            });
        }
        self.writer.flush()?;

        return Ok(Tape::with_layout(self.path, self.layout, self.delays));
    }
}
