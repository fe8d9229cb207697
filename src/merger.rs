//! Two-way tape merger.

use std::fs;
use std::path::Path;

use log;

use crate::buffer::LimitedBuffer;
use crate::chunk::ChunkLayout;
use crate::tape::{Tape, TapeError, TapeWriter};

/// How merge results are written onto their tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The result tape is built left to right by an append-only writer.
    Append,
    /// The result tape is created zero-filled and every value is put with [`Tape::overwrite`] followed by a
    /// head shift, rewriting the whole file each time.
    InPlace,
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Append
    }
}

/// Destination of merged values.
pub trait RunSink {
    /// Writes a value under the head and moves the head to the next position.
    fn record(&mut self, value: i32) -> Result<(), TapeError>;
}

impl RunSink for TapeWriter {
    fn record(&mut self, value: i32) -> Result<(), TapeError> {
        self.append(value)
    }
}

/// Sink overwriting the values of an existing tape starting from its head position.
pub struct InPlaceSink<'a> {
    tape: &'a mut Tape,
}

impl<'a> InPlaceSink<'a> {
    pub fn new(tape: &'a mut Tape) -> Self {
        InPlaceSink { tape }
    }
}

impl<'a> RunSink for InPlaceSink<'a> {
    fn record(&mut self, value: i32) -> Result<(), TapeError> {
        self.tape.overwrite(value)?;
        // the head stays on the last element once the tape is filled
        self.tape.move_right()?;

        return Ok(());
    }
}

/// Merges two sorted tapes into a new sorted tape stored at `path`.
///
/// The result holds `first.size() + second.size()` elements and is chunked by the first tape's chunk size.
/// It is filled one chunk at a time. Both input tapes release their chunks once merged.
pub fn merge(first: &mut Tape, second: &mut Tape, path: &Path, mode: WriteMode) -> Result<Tape, TapeError> {
    let size = first.size() + second.size();
    let chunk_size = first.max_chunk_size();
    let delays = first.delays();
    log::trace!(
        "merging {} and {} into {} (elements: {})",
        first.path().display(),
        second.path().display(),
        path.display(),
        size
    );

    let result = match mode {
        WriteMode::Append => {
            let mut writer = TapeWriter::create(path, size, chunk_size, delays)?;
            let layout = *writer.layout();
            merge_chunks(&mut writer, &layout, first, second)?;
            writer.finish()?
        }
        WriteMode::InPlace => {
            fs::File::create(path)?;
            let mut tape = Tape::open(path, size, chunk_size, delays)?;
            let layout = ChunkLayout::new(size, chunk_size)?;
            merge_chunks(&mut InPlaceSink::new(&mut tape), &layout, first, second)?;
            tape.release_chunk();
            tape
        }
    };

    first.release_chunk();
    second.release_chunk();

    return Ok(result);
}

fn merge_chunks<S: RunSink>(
    target: &mut S,
    layout: &ChunkLayout,
    first: &mut Tape,
    second: &mut Tape,
) -> Result<(), TapeError> {
    let mut exhausted = (first.size() == 0, second.size() == 0);
    for index in 0..layout.count() {
        exhausted = merge_one_chunk(
            target,
            first,
            second,
            exhausted.0,
            exhausted.1,
            layout.chunk_len(index),
        )?;
    }

    return Ok(());
}

/// Merges the next `size` values of two sorted tapes into `target`.
///
/// Values are compared under both heads and the smaller one is taken. On equal values the second tape's value
/// is taken first. Once a tape is exhausted the other one is drained without comparisons.
///
/// Returns the updated exhaustion flags to pass into the next call.
pub fn merge_one_chunk<S: RunSink>(
    target: &mut S,
    first: &mut Tape,
    second: &mut Tape,
    mut first_exhausted: bool,
    mut second_exhausted: bool,
    size: usize,
) -> Result<(bool, bool), TapeError> {
    let mut buffer = LimitedBuffer::with_capacity(size);

    while !buffer.is_full() {
        match (first_exhausted, second_exhausted) {
            (false, false) => {
                if first.current_value()? < second.current_value()? {
                    first_exhausted = take(first, &mut buffer)?;
                } else {
                    second_exhausted = take(second, &mut buffer)?;
                }
            }
            (false, true) => first_exhausted = take(first, &mut buffer)?,
            (true, false) => second_exhausted = take(second, &mut buffer)?,
            (true, true) => {
                return Err(TapeError::Exhausted {
                    missing: buffer.remaining(),
                })
            }
        }
    }

    for value in buffer {
        target.record(value)?;
    }

    return Ok((first_exhausted, second_exhausted));
}

/// Moves the value under the head into the buffer and advances the tape.
/// Returns `true` if the tape has no values left.
fn take(tape: &mut Tape, buffer: &mut LimitedBuffer) -> Result<bool, TapeError> {
    buffer.push(tape.current_value()?);
    Ok(!tape.move_right()?)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rstest::*;

    use super::{merge, merge_one_chunk, RunSink, WriteMode};
    use crate::delay::Delays;
    use crate::tape::{Tape, TapeError};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    struct VecSink(Vec<i32>);

    impl RunSink for VecSink {
        fn record(&mut self, value: i32) -> Result<(), TapeError> {
            self.0.push(value);
            Ok(())
        }
    }

    fn tape(dir: &Path, name: &str, values: &[i32], chunk_size: usize) -> Tape {
        let path = dir.join(name);
        let content: String = values.iter().map(|value| format!("{} ", value)).collect();
        fs::write(&path, content).unwrap();
        Tape::open(&path, values.len(), chunk_size, Delays::default()).unwrap()
    }

    #[rstest]
    fn test_tie_goes_to_second_tape(tmp_dir: tempfile::TempDir) {
        let mut first = tape(tmp_dir.path(), "a.txt", &[2, 2], 2);
        let mut second = tape(tmp_dir.path(), "b.txt", &[2], 1);
        let mut sink = VecSink(Vec::new());

        let exhausted = merge_one_chunk(&mut sink, &mut first, &mut second, false, false, 1).unwrap();
        // the only value taken so far came from the second tape
        assert_eq!(exhausted, (false, true));

        let exhausted = merge_one_chunk(&mut sink, &mut first, &mut second, exhausted.0, exhausted.1, 2).unwrap();
        assert_eq!(exhausted, (true, true));
        assert_eq!(sink.0, vec![2, 2, 2]);
    }

    #[rstest]
    fn test_drain_after_exhaustion(tmp_dir: tempfile::TempDir) {
        let mut first = tape(tmp_dir.path(), "a.txt", &[1, 2, 3, 10, 11], 2);
        let mut second = tape(tmp_dir.path(), "b.txt", &[4, 5], 2);
        let mut sink = VecSink(Vec::new());

        let exhausted = merge_one_chunk(&mut sink, &mut first, &mut second, false, false, 3).unwrap();
        assert_eq!(exhausted, (false, false));
        let exhausted = merge_one_chunk(&mut sink, &mut first, &mut second, exhausted.0, exhausted.1, 3).unwrap();
        assert_eq!(exhausted, (false, true));
        let exhausted = merge_one_chunk(&mut sink, &mut first, &mut second, exhausted.0, exhausted.1, 1).unwrap();
        assert_eq!(exhausted, (true, true));

        assert_eq!(sink.0, vec![1, 2, 3, 4, 5, 10, 11]);
    }

    #[rstest]
    fn test_merge_past_both_tapes(tmp_dir: tempfile::TempDir) {
        let mut first = tape(tmp_dir.path(), "a.txt", &[1], 1);
        let mut second = tape(tmp_dir.path(), "b.txt", &[2], 1);
        let mut sink = VecSink(Vec::new());

        assert!(matches!(
            merge_one_chunk(&mut sink, &mut first, &mut second, false, false, 3),
            Err(TapeError::Exhausted { missing: 1 })
        ));
    }

    #[rstest]
    #[case(WriteMode::Append)]
    #[case(WriteMode::InPlace)]
    fn test_merge(tmp_dir: tempfile::TempDir, #[case] mode: WriteMode) {
        let mut first = tape(tmp_dir.path(), "a.txt", &[-7, 0, 3, 3, 9], 2);
        let mut second = tape(tmp_dir.path(), "b.txt", &[-8, 3, 12], 2);
        let path = tmp_dir.path().join("merged.txt");

        let result = merge(&mut first, &mut second, &path, mode).unwrap();

        assert_eq!(result.size(), 8);
        assert_eq!(result.max_chunk_size(), 2);
        assert_eq!(result.count_of_chunks(), 4);
        assert!(!first.is_active());
        assert!(!second.is_active());
        assert_eq!(fs::read_to_string(&path).unwrap(), "-8 -7 0 3 3 3 9 12 ");
    }
}
