use std::io::{self, prelude::*};

use crate::format::{self, ValueReader};
use crate::tape::TapeError;

/// Partition of a tape of `size` elements into chunks of at most `max_chunk_size` elements.
/// Every chunk but the last holds exactly `max_chunk_size` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    size: usize,
    max_chunk_size: usize,
    last_chunk_size: usize,
    count: usize,
}

impl ChunkLayout {
    /// Creates a layout. A chunk size larger than the tape is clamped to the tape size.
    pub fn new(size: usize, chunk_size: usize) -> Result<Self, TapeError> {
        if size == 0 {
            return Ok(ChunkLayout {
                size,
                max_chunk_size: chunk_size,
                last_chunk_size: 0,
                count: 0,
            });
        }
        if chunk_size == 0 {
            return Err(TapeError::InvalidChunkSize { size });
        }

        let max_chunk_size = chunk_size.min(size);
        let last_chunk_size = match size % max_chunk_size {
            0 => max_chunk_size,
            rest => rest,
        };

        return Ok(ChunkLayout {
            size,
            max_chunk_size,
            last_chunk_size,
            count: (size - 1) / max_chunk_size + 1,
        });
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn last_chunk_size(&self) -> usize {
        self.last_chunk_size
    }

    /// Number of elements in the chunk with the given index.
    pub fn chunk_len(&self, index: usize) -> usize {
        if index + 1 == self.count {
            self.last_chunk_size
        } else {
            self.max_chunk_size
        }
    }
}

/// In-memory window over consecutive tape elements with a head position inside it.
///
/// The chunk never moves its head across its own edges; crossing into a neighbour chunk
/// is up to the tape owning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Rank of the chunk on its tape, left to right.
    index: usize,
    /// Maximum number of elements the window holds.
    capacity: usize,
    /// Position under the head.
    head: usize,
    values: Vec<i32>,
}

impl Chunk {
    pub fn new(capacity: usize) -> Self {
        Chunk {
            index: 0,
            capacity,
            head: 0,
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Value under the head, [`None`] for a cleared chunk.
    pub fn current(&self) -> Option<i32> {
        self.values.get(self.head).copied()
    }

    /// Replaces the window with `size` values read from the current reader position.
    ///
    /// Coming from a higher-numbered chunk the head lands on the rightmost position,
    /// otherwise on the leftmost one, so it stays next to the boundary just crossed.
    pub fn load_from<R: BufRead>(
        &mut self,
        reader: &mut ValueReader<R>,
        index: usize,
        size: usize,
    ) -> Result<(), TapeError> {
        self.head = if index < self.index { size.saturating_sub(1) } else { 0 };
        self.index = index;
        self.values.clear();

        for found in 0..size {
            match reader.next_value()? {
                Some(value) => self.values.push(value),
                None => return Err(TapeError::UnexpectedEnd { expected: size, found }),
            }
        }

        return Ok(());
    }

    /// Moves the head one position right within the window.
    pub fn move_head_right(&mut self) -> bool {
        if self.head + 1 >= self.values.len() {
            return false;
        }
        self.head += 1;

        return true;
    }

    /// Moves the head one position left within the window.
    pub fn move_head_left(&mut self) -> bool {
        if self.head == 0 {
            return false;
        }
        self.head -= 1;

        return true;
    }

    /// Places the head on the rightmost position of the window.
    pub fn move_head_to_right_edge(&mut self) {
        self.head = self.values.len().saturating_sub(1);
    }

    /// Head is on the very first element of the tape.
    pub fn is_at_tape_left_edge(&self) -> bool {
        self.index == 0 && self.head == 0
    }

    /// Head is on the very last element of a tape made of `chunk_count` chunks.
    pub fn is_at_tape_right_edge(&self, chunk_count: usize) -> bool {
        self.index + 1 == chunk_count && self.head + 1 == self.values.len()
    }

    /// # Panics
    /// Panics if `pos` is outside of the window.
    pub fn overwrite_at(&mut self, pos: usize, value: i32) {
        self.values[pos] = value;
    }

    pub fn serialize_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &value in &self.values {
            format::write_value(writer, value)?;
        }

        return Ok(());
    }

    /// Checks whether the head is at position `pos` of chunk `index`.
    pub fn matches(&self, pos: usize, index: usize) -> bool {
        self.head == pos && self.index == index
    }

    pub fn clear(&mut self) {
        self.index = 0;
        self.head = 0;
        self.values.clear();
        self.values.shrink_to_fit();
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{Chunk, ChunkLayout};
    use crate::format::ValueReader;
    use crate::tape::TapeError;

    #[rstest]
    #[case(9, 9, 1, 9)]
    #[case(9, 4, 3, 1)]
    #[case(8, 4, 2, 4)]
    #[case(1, 1, 1, 1)]
    #[case(3, 10, 1, 3)]
    #[case(0, 0, 0, 0)]
    fn test_layout(
        #[case] size: usize,
        #[case] chunk_size: usize,
        #[case] count: usize,
        #[case] last_chunk_size: usize,
    ) {
        let layout = ChunkLayout::new(size, chunk_size).unwrap();

        assert_eq!(layout.count(), count);
        assert_eq!(layout.last_chunk_size(), last_chunk_size);
        if count > 0 {
            let total = (count - 1) * layout.max_chunk_size() + layout.last_chunk_size();
            assert_eq!(total, size);
            assert_eq!(layout.chunk_len(count - 1), last_chunk_size);
            assert_eq!(layout.chunk_len(0), if count == 1 { last_chunk_size } else { layout.max_chunk_size() });
        }
    }

    #[test]
    fn test_layout_zero_chunk_size() {
        match ChunkLayout::new(5, 0) {
            Err(TapeError::InvalidChunkSize { size: 5 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_entry_edge() {
        let mut reader = ValueReader::new("1 2 3 4 5 6 7 ".as_bytes());
        let mut chunk = Chunk::new(3);

        chunk.load_from(&mut reader, 0, 3).unwrap();
        assert_eq!(chunk.values(), &[1, 2, 3]);
        assert_eq!(chunk.head(), 0);
        assert!(chunk.is_at_tape_left_edge());

        chunk.load_from(&mut reader, 1, 3).unwrap();
        assert_eq!(chunk.values(), &[4, 5, 6]);
        assert_eq!(chunk.head(), 0);

        let mut reader = ValueReader::new("1 2 3 ".as_bytes());
        chunk.load_from(&mut reader, 0, 3).unwrap();
        // moving to a lower-numbered chunk lands on its right edge
        assert_eq!(chunk.head(), 2);
        assert!(chunk.matches(2, 0));
    }

    #[test]
    fn test_load_truncated() {
        let mut reader = ValueReader::new("1 2 ".as_bytes());
        let mut chunk = Chunk::new(3);

        match chunk.load_from(&mut reader, 0, 3) {
            Err(TapeError::UnexpectedEnd { expected: 3, found: 2 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_head_moves_and_edges() {
        let mut reader = ValueReader::new("10 20 30 40 50 ".as_bytes());
        let mut chunk = Chunk::new(3);
        chunk.load_from(&mut reader, 1, 2).unwrap();

        assert!(!chunk.is_at_tape_left_edge());
        assert!(!chunk.move_head_left());
        assert_eq!(chunk.current(), Some(10));

        assert!(chunk.move_head_right());
        assert_eq!(chunk.current(), Some(20));
        assert!(chunk.is_at_tape_right_edge(2));
        assert!(!chunk.is_at_tape_right_edge(3));
        assert!(!chunk.move_head_right());
        assert_eq!(chunk.head(), 1);

        chunk.move_head_to_right_edge();
        assert_eq!(chunk.head(), 1);
    }

    #[test]
    fn test_overwrite_serialize_clear() {
        let mut reader = ValueReader::new("-1 2 3 ".as_bytes());
        let mut chunk = Chunk::new(3);
        chunk.load_from(&mut reader, 0, 3).unwrap();

        chunk.overwrite_at(1, -20);

        let mut output = Vec::new();
        chunk.serialize_to(&mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "-1 -20 3 ");

        chunk.clear();
        assert!(chunk.is_empty());
        assert_eq!(chunk.current(), None);
        assert_eq!(chunk.capacity(), 3);
    }
}
