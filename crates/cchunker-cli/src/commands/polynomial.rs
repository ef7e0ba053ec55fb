use anyhow::{Context, Result};
use std::io::{self, Write};

use cchunker_core::polynomial::Polynomial;

/// Print a fresh irreducible polynomial in decimal.
pub fn generate() -> Result<()> {
    let polynomial = Polynomial::random().context("unable to generate polynomial")?;
    writeln!(io::stdout(), "{polynomial}").context("unable to print polynomial")?;
    Ok(())
}

pub fn check(polynomial: Polynomial) -> Result<()> {
    if !polynomial.is_irreducible() {
        anyhow::bail!(
            "polynomial {polynomial} is not irreducible, it is not suitable for content chunking"
        );
    }
    polynomial
        .check_chunkable()
        .context("polynomial is not suitable for content chunking")?;
    tracing::info!(%polynomial, degree = polynomial.degree(), "polynomial is irreducible");
    Ok(())
}
