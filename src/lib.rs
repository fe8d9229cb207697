//! `tape-sort` is an external merge sort of 32-bit integers stored on a simulated tape.
//!
//! A tape is a file of whitespace-separated decimal integers that can only be accessed through a single head:
//! read the value under the head, shift the tape by one position, overwrite the value under the head. Only one
//! window (chunk) of a tape is ever held in memory, so tapes far larger than RAM can be sorted. Configurable
//! read/put/shift delays emulate the throughput profile of a physical device.
//!
//! Sorting is achieved in two passes. During the first pass every chunk of the input tape is sorted in memory
//! and saved as a run tape, during the second pass run tapes are merged pairwise, round by round, until a single
//! sorted tape is left. For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tape_sort::{Delays, Tape, TapeSorterBuilder};
//!
//! fn main() {
//!     let size = 1_000_000;
//!     let chunk_size = Tape::chunk_size_from_budget(16 * 1024, size);
//!
//!     let mut input = Tape::open("input.txt", size, chunk_size, Delays::default()).unwrap();
//!
//!     let sorter = TapeSorterBuilder::new().with_tmp_dir(Path::new("./")).build();
//!     let sorted = sorter.sort(&mut input, Path::new("output.txt")).unwrap();
//!
//!     println!("sorted {} values", sorted.size());
//! }
//! ```

pub mod buffer;
pub mod chunk;
pub mod config;
pub mod delay;
pub mod format;
pub mod merger;
pub mod sort;
pub mod tape;

pub use buffer::LimitedBuffer;
pub use chunk::{Chunk, ChunkLayout};
pub use config::{Config, ConfigError};
pub use delay::Delays;
pub use merger::{merge, merge_one_chunk, RunSink, WriteMode};
pub use sort::{SortError, TapeSorter, TapeSorterBuilder};
pub use tape::{Tape, TapeError, TapeWriter};
