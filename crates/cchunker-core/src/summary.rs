use std::io::{self, Cursor, Read, Write};

use crate::error::Result;

/// Appendable byte sink holding one reduction level's summary.
///
/// Once the level is finished the sink is turned into a reader, which
/// becomes the next level's input or the final output.
pub trait SummarySink: Write {
    type Reader: Read + 'static;

    /// Bytes appended so far.
    fn written(&self) -> u64;

    fn into_reader(self) -> Result<Self::Reader>;
}

/// Summary kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SummarySink for MemorySink {
    type Reader = Cursor<Vec<u8>>;

    fn written(&self) -> u64 {
        self.buf.len() as u64
    }

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(Cursor::new(self.buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_appends_in_order() {
        let mut sink = MemorySink::new();
        writeln!(sink, "{}", 0).unwrap();
        sink.write_all(b"aaaa\n").unwrap();
        sink.write_all(b"bbbb\n").unwrap();
        assert_eq!(sink.written(), 12);

        let mut reread = Vec::new();
        sink.into_reader().unwrap().read_to_end(&mut reread).unwrap();
        assert_eq!(reread, b"0\naaaa\nbbbb\n");
    }
}
