use std::io::{Read, Write};

use crate::chunk::ChunkEngine;
use crate::dispatch::Processor;
use crate::error::{CchunkError, Result};
use crate::types::SplitStats;

/// Chunk `input` once and hand every chunk to `processor`, in order,
/// forwarding its output to `out`. Stops at the first failing chunk.
pub fn split<'a, E, P>(
    engine: &E,
    input: impl Read + 'a,
    processor: &P,
    out: &mut dyn Write,
) -> Result<SplitStats>
where
    E: ChunkEngine + ?Sized,
    P: Processor + ?Sized,
{
    let mut source = engine.open(Box::new(input));
    let mut scratch = Vec::with_capacity(engine.max_chunk_size());
    let mut stats = SplitStats::default();

    while let Some(chunk) = source.next_chunk(&mut scratch)? {
        tracing::debug!(
            chunk = stats.chunks,
            offset = chunk.offset,
            len = chunk.len(),
            cut = chunk.cut,
            "dispatching chunk"
        );
        processor.pass_through(stats.chunks, chunk.data, out)?;
        stats.chunks += 1;
        stats.bytes += chunk.len() as u64;
    }
    out.flush().map_err(CchunkError::Write)?;

    tracing::info!(chunks = stats.chunks, bytes = stats.bytes, "split complete");
    Ok(stats)
}
