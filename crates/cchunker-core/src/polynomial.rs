use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::error::{CchunkError, Result};

/// Polynomial used when none is configured.
pub const DEFAULT_POLYNOMIAL: Polynomial = Polynomial(0x3DA3358B4DC173);

const RANDOM_MAX_TRIES: usize = 1_000_000;

/// Degrees the rolling hash tables can represent without overflowing 64 bits.
const CHUNKABLE_DEGREES: std::ops::RangeInclusive<i32> = 8..=56;

/// A polynomial over GF(2), one coefficient per bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polynomial(pub u64);

impl Polynomial {
    /// Degree of the polynomial, -1 for the zero polynomial.
    pub fn degree(self) -> i32 {
        63 - self.0.leading_zeros() as i32
    }

    /// Quotient and remainder of `self / d`.
    ///
    /// Panics if `d` is zero.
    pub fn div_mod(self, d: Polynomial) -> (Polynomial, Polynomial) {
        assert!(d.0 != 0, "polynomial division by zero");
        let d_deg = d.degree();
        let mut x = self.0;
        let mut q = 0u64;
        let mut diff = Polynomial(x).degree() - d_deg;
        while diff >= 0 {
            x ^= d.0 << diff;
            q |= 1 << diff;
            diff = Polynomial(x).degree() - d_deg;
        }
        (Polynomial(q), Polynomial(x))
    }

    pub fn modulo(self, d: Polynomial) -> Polynomial {
        self.div_mod(d).1
    }

    pub fn gcd(self, other: Polynomial) -> Polynomial {
        let (mut a, mut b) = (self, other);
        while b.0 != 0 {
            let r = a.modulo(b);
            a = b;
            b = r;
        }
        a
    }

    /// `self * f mod g`.
    pub fn mul_mod(self, f: Polynomial, g: Polynomial) -> Polynomial {
        let mut acc = 0u64;
        let mut a = self.modulo(g);
        let mut bits = f.0;
        while bits != 0 {
            if bits & 1 == 1 {
                acc ^= a.0;
            }
            a = Polynomial(a.0 << 1).modulo(g);
            bits >>= 1;
        }
        Polynomial(acc)
    }

    /// `x^(2^p) - x mod g`.
    fn qp(p: i32, g: Polynomial) -> Polynomial {
        let mut res = Polynomial(2);
        for _ in 0..p {
            res = res.mul_mod(res, g);
        }
        (res + Polynomial(2)).modulo(g)
    }

    /// Ben-Or irreducibility test.
    pub fn is_irreducible(self) -> bool {
        let deg = self.degree();
        if deg < 1 {
            return false;
        }
        (1..=deg / 2).all(|i| self.gcd(Self::qp(i, self)) == Polynomial(1))
    }

    /// Draw a random irreducible polynomial of degree 53 from the OS RNG.
    pub fn random() -> Result<Self> {
        Self::derive(&mut rand::rngs::OsRng)
    }

    /// Draw a random irreducible polynomial of degree 53 from `rng`.
    pub fn derive<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        for _ in 0..RANDOM_MAX_TRIES {
            // Degree 53 with the constant term set.
            let candidate = Polynomial((rng.next_u64() & ((1 << 54) - 1)) | (1 << 53) | 1);
            if candidate.is_irreducible() {
                return Ok(candidate);
            }
        }
        Err(CchunkError::PolynomialSearch(RANDOM_MAX_TRIES))
    }

    /// Check that the rolling hash can be parameterised with this polynomial.
    /// Irreducibility is not checked here.
    pub fn check_chunkable(self) -> Result<()> {
        let deg = self.degree();
        if !CHUNKABLE_DEGREES.contains(&deg) {
            return Err(CchunkError::InvalidPolynomial(
                self.0,
                format!(
                    "degree {deg} is outside {}..={}",
                    CHUNKABLE_DEGREES.start(),
                    CHUNKABLE_DEGREES.end()
                ),
            ));
        }
        Ok(())
    }
}

impl Default for Polynomial {
    fn default() -> Self {
        DEFAULT_POLYNOMIAL
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: Polynomial) -> Polynomial {
        Polynomial(self.0 ^ rhs.0)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Polynomial {
    type Err = CchunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(Polynomial)
            .map_err(|e| CchunkError::Config(format!("invalid polynomial {s:?}: {e}")))
    }
}
