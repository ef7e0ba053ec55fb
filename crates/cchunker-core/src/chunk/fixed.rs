use crate::chunk::{ChunkEngine, ChunkSource, read_full};
use crate::error::{CchunkError, Result};
use crate::types::Chunk;
use std::io::Read;

/// Fixed-size chunking engine.
///
/// Boundaries depend on position, not content, so it offers no
/// deduplication across shifted data.
pub struct FixedSizeChunkEngine {
    chunk_size: usize,
}

impl FixedSizeChunkEngine {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CchunkError::InvalidProfile(
                "fixed chunk size must be positive".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunker<R: Read>(&self, reader: R) -> FixedSizeChunker<R> {
        FixedSizeChunker {
            reader,
            chunk_size: self.chunk_size,
            offset: 0,
            done: false,
        }
    }
}

impl ChunkEngine for FixedSizeChunkEngine {
    fn open<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn ChunkSource + 'a> {
        Box::new(self.chunker(reader))
    }

    fn max_chunk_size(&self) -> usize {
        self.chunk_size
    }
}

pub struct FixedSizeChunker<R> {
    reader: R,
    chunk_size: usize,
    offset: u64,
    done: bool,
}

impl<R: Read> ChunkSource for FixedSizeChunker<R> {
    fn next_chunk<'b>(&mut self, scratch: &'b mut Vec<u8>) -> Result<Option<Chunk<'b>>> {
        scratch.clear();
        if self.done {
            return Ok(None);
        }

        scratch.resize(self.chunk_size, 0);
        let total_read =
            read_full(&mut self.reader, &mut scratch[..]).map_err(CchunkError::Read)?;
        scratch.truncate(total_read);

        if total_read < self.chunk_size {
            self.done = true;
        }
        if total_read == 0 {
            return Ok(None);
        }

        let offset = self.offset;
        self.offset += total_read as u64;
        Ok(Some(Chunk {
            data: scratch.as_slice(),
            offset,
            cut: 0,
        }))
    }
}
