use std::io::{self, Read, Write};

use crate::chunk::ChunkEngine;
use crate::dispatch::{Processor, check_line};
use crate::error::{CchunkError, Result};
use crate::summary::SummarySink;
use crate::types::{LineCheck, ReduceStats};

/// Repeatedly chunk `input`, collapsing it one level at a time until a
/// level produces at most one chunk, then write that level's summary to `out`.
///
/// Every level's summary starts with the iteration number on its own line,
/// followed by the captured output of each chunk in chunk order. Nothing is
/// written to `out` unless the whole reduction succeeds.
pub fn reduce<'a, E, P, S, F>(
    engine: &E,
    input: impl Read + 'a,
    processor: &P,
    check: LineCheck,
    mut new_sink: F,
    out: &mut dyn Write,
) -> Result<ReduceStats>
where
    E: ChunkEngine + ?Sized,
    P: Processor + ?Sized,
    S: SummarySink,
    F: FnMut() -> Result<S>,
{
    let mut scratch = Vec::with_capacity(engine.max_chunk_size());
    let mut input: Box<dyn Read + 'a> = Box::new(input);
    let mut iteration = 0u64;

    loop {
        let mut summary = new_sink()?;
        writeln!(summary, "{iteration}").map_err(CchunkError::Write)?;

        let mut source = engine.open(input);
        let mut chunks = 0u64;
        let mut input_bytes = 0u64;
        while let Some(chunk) = source.next_chunk(&mut scratch)? {
            tracing::debug!(
                iteration,
                chunk = chunks,
                offset = chunk.offset,
                len = chunk.len(),
                cut = chunk.cut,
                "dispatching chunk"
            );
            let line = processor.capture(chunks, chunk.data)?;
            check_line(chunks, &line, check)?;
            summary.write_all(&line).map_err(CchunkError::Write)?;
            chunks += 1;
            input_bytes += chunk.len() as u64;
        }
        drop(source);

        let summary_bytes = summary.written();
        tracing::info!(
            iteration,
            chunks,
            input_bytes,
            summary_bytes,
            "reduction level complete"
        );

        if chunks <= 1 {
            let mut reader = summary.into_reader()?;
            io::copy(&mut reader, out).map_err(CchunkError::Write)?;
            out.flush().map_err(CchunkError::Write)?;
            return Ok(ReduceStats {
                levels: iteration + 1,
                final_chunks: chunks,
                summary_bytes,
            });
        }

        // A level that does not shrink its input would recurse forever.
        if summary_bytes >= input_bytes {
            return Err(CchunkError::NotConverging {
                iteration,
                chunks,
                input_bytes,
                summary_bytes,
            });
        }

        input = Box::new(summary.into_reader()?);
        iteration += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::FixedSizeChunkEngine;
    use crate::driver::testing::LengthLines;
    use crate::summary::MemorySink;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn memory() -> Result<MemorySink> {
        Ok(MemorySink::new())
    }

    /// Keeps a copy of every finished summary.
    struct RecordingSink {
        inner: MemorySink,
        log: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl Write for RecordingSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.inner.write(data)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SummarySink for RecordingSink {
        type Reader = Cursor<Vec<u8>>;

        fn written(&self) -> u64 {
            self.inner.written()
        }

        fn into_reader(self) -> Result<Self::Reader> {
            let reader = self.inner.into_reader()?;
            self.log.borrow_mut().push(reader.get_ref().clone());
            Ok(reader)
        }
    }

    fn line_count(bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| b == b'\n').count()
    }

    #[test]
    fn three_chunks_then_one() {
        let engine = FixedSizeChunkEngine::new(100).unwrap();
        let processor = LengthLines::default();
        let input = vec![0x11u8; 250];
        let mut out = Vec::new();

        let stats = reduce(
            &engine,
            &input[..],
            &processor,
            LineCheck::Strict,
            memory,
            &mut out,
        )
        .unwrap();

        assert_eq!(out, b"1\n0000026\n");
        assert_eq!(stats.levels, 2);
        assert_eq!(stats.final_chunks, 1);
        assert_eq!(stats.summary_bytes, 10);

        // Level 1 saw exactly the level 0 summary.
        let seen = processor.seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], b"0\n0000100\n0000100\n0000050\n");
    }

    #[test]
    fn empty_input_is_iteration_zero_only() {
        let engine = FixedSizeChunkEngine::new(100).unwrap();
        let processor = LengthLines::default();
        let mut out = Vec::new();

        let stats = reduce(
            &engine,
            &b""[..],
            &processor,
            LineCheck::Strict,
            memory,
            &mut out,
        )
        .unwrap();

        assert_eq!(out, b"0\n");
        assert_eq!(stats.levels, 1);
        assert_eq!(stats.final_chunks, 0);
        assert!(processor.seen.borrow().is_empty());
    }

    #[test]
    fn single_chunk_input_stops_at_level_zero() {
        let engine = FixedSizeChunkEngine::new(100).unwrap();
        let processor = LengthLines::default();
        let mut out = Vec::new();

        reduce(
            &engine,
            &[1u8; 40][..],
            &processor,
            LineCheck::Strict,
            memory,
            &mut out,
        )
        .unwrap();

        assert_eq!(out, b"0\n0000040\n");
    }

    #[test]
    fn every_summary_has_one_line_per_chunk() {
        let engine = FixedSizeChunkEngine::new(32).unwrap();
        let processor = LengthLines::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut out = Vec::new();

        let stats = reduce(
            &engine,
            &vec![9u8; 1000][..],
            &processor,
            LineCheck::Strict,
            || {
                Ok(RecordingSink {
                    inner: MemorySink::new(),
                    log: Rc::clone(&log),
                })
            },
            &mut out,
        )
        .unwrap();

        let summaries = log.borrow();
        assert_eq!(stats.levels, 4);
        assert_eq!(summaries.len(), 4);

        let mut input_len = 1000usize;
        for (iteration, summary) in summaries.iter().enumerate() {
            assert!(summary.starts_with(format!("{iteration}\n").as_bytes()));
            let chunks = input_len.div_ceil(32);
            assert_eq!(line_count(summary), 1 + chunks);
            input_len = summary.len();
        }
        assert_eq!(out, *summaries.last().unwrap());
        assert_eq!(out, b"3\n0000026\n");
    }

    #[test]
    fn failing_chunk_aborts_without_output() {
        let engine = FixedSizeChunkEngine::new(100).unwrap();
        let processor = LengthLines::failing_on(1);
        let mut out = Vec::new();

        let result = reduce(
            &engine,
            &[0u8; 250][..],
            &processor,
            LineCheck::Strict,
            memory,
            &mut out,
        );

        assert!(result.is_err());
        assert_eq!(processor.seen.borrow().len(), 2);
        assert!(out.is_empty());
    }

    #[test]
    fn growing_summaries_are_rejected() {
        let engine = FixedSizeChunkEngine::new(16).unwrap();
        let processor = LengthLines::default();
        let mut out = Vec::new();

        let err = reduce(
            &engine,
            &[0u8; 1000][..],
            &processor,
            LineCheck::Strict,
            memory,
            &mut out,
        )
        .unwrap_err();

        match err {
            CchunkError::NotConverging {
                iteration,
                chunks,
                input_bytes,
                summary_bytes,
            } => {
                assert_eq!(iteration, 7);
                assert_eq!(chunks, 2);
                assert_eq!(input_bytes, 18);
                assert_eq!(summary_bytes, 18);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(out.is_empty());
    }

    struct TwoLines;

    impl Processor for TwoLines {
        fn pass_through(&self, _index: u64, _chunk: &[u8], out: &mut dyn Write) -> Result<()> {
            out.write_all(b"a\nb\n").map_err(CchunkError::Write)
        }
    }

    #[test]
    fn multi_line_output_breaks_the_contract() {
        let engine = FixedSizeChunkEngine::new(100).unwrap();
        let mut out = Vec::new();

        let err = reduce(
            &engine,
            &[0u8; 10][..],
            &TwoLines,
            LineCheck::Strict,
            memory,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CchunkError::LineContract { chunk: 0, lines: 2 }));

        let mut out = Vec::new();
        reduce(
            &engine,
            &[0u8; 10][..],
            &TwoLines,
            LineCheck::Off,
            memory,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"0\na\nb\n");
    }
}
