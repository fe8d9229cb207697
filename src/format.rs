//! Tape file codec.
//!
//! A tape file holds whitespace-separated ASCII decimal `i32` values with no header.
//! Every written value is followed by a single space, so a trailing separator is part of the format.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use crate::tape::TapeError;

/// Sequential reader of tape values.
pub struct ValueReader<R> {
    inner: R,
    token: String,
}

impl<R: BufRead> ValueReader<R> {
    pub fn new(inner: R) -> Self {
        ValueReader {
            inner,
            token: String::new(),
        }
    }

    /// Reads the next value. Returns [`None`] at the end of the stream.
    pub fn next_value(&mut self) -> Result<Option<i32>, TapeError> {
        self.token.clear();

        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }

            let mut consumed = 0;
            let mut complete = false;
            for &byte in buf {
                consumed += 1;
                if byte.is_ascii_whitespace() {
                    if !self.token.is_empty() {
                        complete = true;
                        break;
                    }
                } else {
                    self.token.push(byte as char);
                }
            }
            self.inner.consume(consumed);

            if complete {
                break;
            }
        }

        if self.token.is_empty() {
            return Ok(None);
        }

        match self.token.parse::<i32>() {
            Ok(value) => Ok(Some(value)),
            Err(err) => Err(TapeError::Parse {
                token: self.token.clone(),
                source: err,
            }),
        }
    }

    /// Skips `count` values. Fails if the stream ends earlier.
    pub fn skip(&mut self, count: usize) -> Result<(), TapeError> {
        for found in 0..count {
            if self.next_value()?.is_none() {
                return Err(TapeError::UnexpectedEnd { expected: count, found });
            }
        }

        return Ok(());
    }

    /// Counts the values left in the stream.
    pub fn count_remaining(&mut self) -> Result<usize, TapeError> {
        let mut count = 0;
        while self.next_value()?.is_some() {
            count += 1;
        }

        return Ok(count);
    }
}

impl ValueReader<io::BufReader<fs::File>> {
    /// Opens a tape file for reading from its first value.
    pub fn open(path: &Path) -> Result<Self, TapeError> {
        Ok(ValueReader::new(io::BufReader::new(fs::File::open(path)?)))
    }

    /// Moves the stream cursor back to the first value.
    pub fn rewind(&mut self) -> Result<(), TapeError> {
        self.inner.rewind()?;
        return Ok(());
    }
}

/// Writes a single value followed by its separator.
pub fn write_value<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    write!(writer, "{} ", value)
}

#[cfg(test)]
mod test {
    use std::io;

    use rstest::*;

    use super::{write_value, ValueReader};
    use crate::tape::TapeError;

    #[rstest]
    #[case("", vec![])]
    #[case("   \n", vec![])]
    #[case("1 2 3 ", vec![1, 2, 3])]
    #[case("1 2 3", vec![1, 2, 3])]
    #[case("  -5\n\t17   0\n", vec![-5, 17, 0])]
    #[case("-2147483648 2147483647 ", vec![i32::MIN, i32::MAX])]
    fn test_read_values(#[case] input: &str, #[case] expected: Vec<i32>) {
        // tiny buffer so that tokens straddle refills
        let mut reader = ValueReader::new(io::BufReader::with_capacity(2, input.as_bytes()));

        let mut actual = Vec::new();
        while let Some(value) = reader.next_value().unwrap() {
            actual.push(value);
        }

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_read_malformed_value() {
        let mut reader = ValueReader::new("4 x5 6".as_bytes());

        assert_eq!(reader.next_value().unwrap(), Some(4));
        match reader.next_value() {
            Err(TapeError::Parse { token, .. }) => assert_eq!(token, "x5"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_skip_and_count() {
        let mut reader = ValueReader::new("1 2 3 4 5 ".as_bytes());

        reader.skip(2).unwrap();
        assert_eq!(reader.next_value().unwrap(), Some(3));
        assert_eq!(reader.count_remaining().unwrap(), 2);

        match reader.skip(1) {
            Err(TapeError::UnexpectedEnd { expected: 1, found: 0 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_write_value() {
        let mut output = Vec::new();
        write_value(&mut output, -12).unwrap();
        write_value(&mut output, 7).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "-12 7 ");
    }
}
