//! Simulated device latencies.

use std::thread;
use std::time::Duration;

/// Per-operation latencies of a tape device.
///
/// Each delay is a blocking pause taken at the point of the corresponding operation.
/// They only shape throughput and never affect the result of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delays {
    /// Reading the value under the head.
    read: Duration,
    /// Writing a value under the head.
    put: Duration,
    /// Shifting the tape by one position.
    shift: Duration,
}

impl Delays {
    pub fn new(read: Duration, put: Duration, shift: Duration) -> Self {
        Delays { read, put, shift }
    }

    /// Creates delays from millisecond values.
    pub fn from_millis(read: u64, put: u64, shift: u64) -> Self {
        Delays::new(
            Duration::from_millis(read),
            Duration::from_millis(put),
            Duration::from_millis(shift),
        )
    }

    pub fn read(&self) -> Duration {
        self.read
    }

    pub fn put(&self) -> Duration {
        self.put
    }

    pub fn shift(&self) -> Duration {
        self.shift
    }

    pub(crate) fn pause_read(&self) {
        pause(self.read);
    }

    pub(crate) fn pause_put(&self) {
        pause(self.put);
    }

    pub(crate) fn pause_shift(&self) {
        pause(self.shift);
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::Delays;

    #[test]
    fn test_from_millis() {
        let delays = Delays::from_millis(1, 2, 3);

        assert_eq!(delays.read(), Duration::from_millis(1));
        assert_eq!(delays.put(), Duration::from_millis(2));
        assert_eq!(delays.shift(), Duration::from_millis(3));
        assert_eq!(Delays::default(), Delays::from_millis(0, 0, 0));
    }

    #[test]
    fn test_pause_blocks() {
        let delays = Delays::from_millis(0, 0, 5);

        let started = Instant::now();
        delays.pause_shift();
        delays.pause_read();

        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
