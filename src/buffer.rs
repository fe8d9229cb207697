//! Limited buffer implementation.

/// Buffer of tape values limited by elements count.
pub struct LimitedBuffer {
    limit: usize,
    inner: Vec<i32>,
}

impl LimitedBuffer {
    /// Creates a buffer preallocated for `limit` values.
    pub fn with_capacity(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }

    /// Adds a new value to the buffer.
    pub fn push(&mut self, value: i32) {
        self.inner.push(value);
    }

    /// Returns buffer length
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Number of values still accepted before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.inner.len())
    }

    pub fn sort(&mut self) {
        self.inner.sort_unstable();
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.inner
    }
}

impl IntoIterator for LimitedBuffer {
    type Item = i32;
    type IntoIter = <Vec<i32> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::LimitedBuffer;

    #[test]
    fn test_limited_buffer() {
        let mut buffer = LimitedBuffer::with_capacity(2);

        buffer.push(5);
        assert_eq!(buffer.is_full(), false);
        assert_eq!(buffer.remaining(), 1);
        buffer.push(-1);
        assert_eq!(buffer.is_full(), true);
        assert_eq!(buffer.remaining(), 0);

        buffer.sort();
        assert_eq!(buffer.as_slice(), &[-1, 5]);

        let data = Vec::from_iter(buffer);
        assert_eq!(data, vec![-1, 5]);
    }

    #[test]
    fn test_zero_limit_buffer() {
        let buffer = LimitedBuffer::with_capacity(0);

        assert!(buffer.is_empty());
        assert!(buffer.is_full());
    }
}
