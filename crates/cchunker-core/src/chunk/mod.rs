mod fixed;
mod rabin;

pub use fixed::{FixedSizeChunkEngine, FixedSizeChunker};
pub use rabin::{RabinChunkEngine, RabinChunker};

use crate::error::Result;
use crate::types::Chunk;
use std::io::{self, Read};

/// A lazy, finite sequence of chunks over one input stream.
pub trait ChunkSource {
    /// Produce the next chunk into `scratch`, or `None` at end of stream.
    ///
    /// `scratch` is cleared first; the returned chunk borrows it.
    fn next_chunk<'b>(&mut self, scratch: &'b mut Vec<u8>) -> Result<Option<Chunk<'b>>>;
}

/// Trait for opening chunk sources over byte streams.
pub trait ChunkEngine: Send + Sync {
    /// Start chunking `reader` from its current position.
    fn open<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn ChunkSource + 'a>;

    /// Largest chunk this engine emits; used to size scratch buffers.
    fn max_chunk_size(&self) -> usize;
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
