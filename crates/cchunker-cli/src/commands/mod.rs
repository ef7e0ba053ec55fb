pub mod polynomial;
pub mod reduce;
pub mod split;

use anyhow::{Context, Result};
use std::path::Path;

use cchunker_core::CchunkError;
use cchunker_core::config::ChunkerConfig;
use cchunker_core::types::ProfileKind;

use crate::ChunkArgs;

/// Build the run configuration: flags override the config file, which
/// overrides the built-in defaults.
pub fn resolve_config(config_path: Option<&Path>, chunking: &ChunkArgs) -> Result<ChunkerConfig> {
    let mut config = match config_path {
        Some(path) => ChunkerConfig::load(path)
            .with_context(|| format!("error loading config {}", path.display()))?,
        None => ChunkerConfig::default(),
    };

    if let Some(polynomial) = chunking.polynomial {
        config.polynomial = polynomial;
    }
    if let Some(profile) = ProfileKind::from_flags(chunking.small_chunks, chunking.large_chunks)? {
        config.profile = profile;
    }

    tracing::debug!(
        polynomial = %config.polynomial,
        profile = %config.profile,
        strict_lines = config.strict_lines,
        "resolved configuration"
    );
    Ok(config)
}

/// Name the pipeline stage an error came from.
pub fn stage(err: &CchunkError) -> &'static str {
    match err {
        CchunkError::Read(_) => "error getting next data chunk",
        CchunkError::Spawn { .. }
        | CchunkError::ProcessorFailed { .. }
        | CchunkError::LineContract { .. } => "error running chunk processing command",
        CchunkError::Write(_) => "error writing output",
        CchunkError::NotConverging { .. } => "error reducing input",
        CchunkError::InvalidProfile(_) | CchunkError::InvalidPolynomial(..) => {
            "invalid chunking configuration"
        }
        _ => "error",
    }
}

/// Attach the failing stage to a pipeline error.
pub fn with_stage<T>(result: cchunker_core::Result<T>) -> Result<T> {
    result.map_err(|err| {
        let stage = stage(&err);
        anyhow::Error::new(err).context(stage)
    })
}
