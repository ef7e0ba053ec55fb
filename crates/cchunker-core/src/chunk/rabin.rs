use crate::chunk::{ChunkEngine, ChunkSource, read_full};
use crate::error::{CchunkError, Result};
use crate::polynomial::Polynomial;
use crate::types::{Chunk, KIB, SizeProfile, WINDOW_SIZE};
use std::io::Read;
use std::sync::Arc;

const READ_BUF_SIZE: usize = 512 * KIB;

/// Precomputed lookup tables for one polynomial.
struct Tables {
    /// `out[b]` is the hash of `b` followed by `WINDOW_SIZE - 1` zero bytes.
    /// XORing it removes `b` as it leaves the window.
    out: [u64; 256],
    /// `reduce[b]` is `b * x^k mod p` combined with `b * x^k`, so one XOR both
    /// clears the 8 bits above degree `k` and reduces by the polynomial.
    reduce: [u64; 256],
}

impl Tables {
    fn new(pol: Polynomial) -> Self {
        let k = pol.degree();
        let mut out = [0u64; 256];
        let mut reduce = [0u64; 256];
        for b in 0..256u64 {
            let mut h = append_byte(Polynomial(0), b as u8, pol);
            for _ in 0..WINDOW_SIZE - 1 {
                h = append_byte(h, 0, pol);
            }
            out[b as usize] = h.0;
            reduce[b as usize] = Polynomial(b << k).modulo(pol).0 | (b << k);
        }
        Self { out, reduce }
    }
}

fn append_byte(hash: Polynomial, b: u8, pol: Polynomial) -> Polynomial {
    Polynomial((hash.0 << 8) | b as u64).modulo(pol)
}

#[inline]
fn update_digest(digest: u64, b: u8, pol_shift: u32, tables: &Tables) -> u64 {
    let index = (digest >> pol_shift) as u8;
    ((digest << 8) | b as u64) ^ tables.reduce[index as usize]
}

/// Content-defined chunking with a Rabin fingerprint over a 64 byte window.
///
/// Tables are computed once and shared by every chunker the engine opens.
pub struct RabinChunkEngine {
    profile: SizeProfile,
    pol_shift: u32,
    tables: Arc<Tables>,
}

impl RabinChunkEngine {
    pub fn new(polynomial: Polynomial, profile: SizeProfile) -> Result<Self> {
        polynomial.check_chunkable()?;
        profile.validate()?;
        Ok(Self {
            profile,
            pol_shift: (polynomial.degree() - 8) as u32,
            tables: Arc::new(Tables::new(polynomial)),
        })
    }

    pub fn chunker<R: Read>(&self, reader: R) -> RabinChunker<R> {
        let mut chunker = RabinChunker {
            reader,
            tables: Arc::clone(&self.tables),
            pol_shift: self.pol_shift,
            min_size: self.profile.min_size,
            max_size: self.profile.max_size,
            split_mask: self.profile.split_mask(),
            buf: vec![0u8; READ_BUF_SIZE].into_boxed_slice(),
            bpos: 0,
            bmax: 0,
            window: [0; WINDOW_SIZE],
            wpos: 0,
            digest: 0,
            start: 0,
            count: 0,
            pos: 0,
            pre: 0,
            eof: false,
        };
        chunker.reset();
        chunker
    }
}

impl ChunkEngine for RabinChunkEngine {
    fn open<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn ChunkSource + 'a> {
        Box::new(self.chunker(reader))
    }

    fn max_chunk_size(&self) -> usize {
        self.profile.max_size
    }
}

pub struct RabinChunker<R> {
    reader: R,
    tables: Arc<Tables>,
    pol_shift: u32,
    min_size: usize,
    max_size: usize,
    split_mask: u64,

    buf: Box<[u8]>,
    bpos: usize,
    bmax: usize,

    window: [u8; WINDOW_SIZE],
    wpos: usize,
    digest: u64,

    /// Stream offset of the current chunk.
    start: u64,
    /// Bytes in the current chunk so far.
    count: usize,
    /// Stream offset of the next unread byte.
    pos: u64,
    /// Bytes still to take before hashing starts.
    pre: usize,
    eof: bool,
}

impl<R> RabinChunker<R> {
    fn reset(&mut self) {
        self.window = [0; WINDOW_SIZE];
        self.wpos = 0;
        self.count = 0;
        self.digest = self.slide(0, 1);
        self.start = self.pos;
        // Only the last window before min_size matters for the first cut.
        self.pre = self.min_size - WINDOW_SIZE;
    }

    fn slide(&mut self, digest: u64, b: u8) -> u64 {
        let out = self.window[self.wpos];
        self.window[self.wpos] = b;
        self.wpos = (self.wpos + 1) % WINDOW_SIZE;
        update_digest(
            digest ^ self.tables.out[out as usize],
            b,
            self.pol_shift,
            &self.tables,
        )
    }
}

impl<R: Read> ChunkSource for RabinChunker<R> {
    fn next_chunk<'b>(&mut self, scratch: &'b mut Vec<u8>) -> Result<Option<Chunk<'b>>> {
        scratch.clear();
        let tables = Arc::clone(&self.tables);

        loop {
            if self.bpos >= self.bmax {
                if self.eof {
                    return Ok(None);
                }
                let n = read_full(&mut self.reader, &mut self.buf).map_err(CchunkError::Read)?;
                if n == 0 {
                    self.eof = true;
                    if self.count == 0 {
                        return Ok(None);
                    }
                    self.count = 0;
                    return Ok(Some(Chunk {
                        data: scratch.as_slice(),
                        offset: self.start,
                        cut: self.digest,
                    }));
                }
                self.bpos = 0;
                self.bmax = n;
            }

            if self.pre > 0 {
                let take = self.pre.min(self.bmax - self.bpos);
                scratch.extend_from_slice(&self.buf[self.bpos..self.bpos + take]);
                self.bpos += take;
                self.count += take;
                self.pos += take as u64;
                self.pre -= take;
                if self.pre > 0 {
                    continue;
                }
            }

            let mut add = self.count;
            let mut digest = self.digest;
            let mut window = self.window;
            let mut wpos = self.wpos;
            let mut cut_at = None;

            for (i, &b) in self.buf[self.bpos..self.bmax].iter().enumerate() {
                let out = window[wpos];
                window[wpos] = b;
                wpos = (wpos + 1) % WINDOW_SIZE;
                digest = update_digest(
                    digest ^ tables.out[out as usize],
                    b,
                    self.pol_shift,
                    &tables,
                );

                add += 1;
                if add < self.min_size {
                    continue;
                }
                if digest & self.split_mask == 0 || add >= self.max_size {
                    cut_at = Some(i + 1);
                    break;
                }
            }

            let steps = cut_at.unwrap_or(self.bmax - self.bpos);
            scratch.extend_from_slice(&self.buf[self.bpos..self.bpos + steps]);
            self.bpos += steps;
            self.pos += steps as u64;

            if cut_at.is_some() {
                let offset = self.start;
                self.reset();
                return Ok(Some(Chunk {
                    data: scratch.as_slice(),
                    offset,
                    cut: digest,
                }));
            }

            self.count += steps;
            self.digest = digest;
            self.window = window;
            self.wpos = wpos;
        }
    }
}
