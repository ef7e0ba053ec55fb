use anyhow::Result;
use std::ffi::OsString;
use std::io;

use cchunker_core::chunk::RabinChunkEngine;
use cchunker_core::config::ChunkerConfig;
use cchunker_core::dispatch::CommandProcessor;
use cchunker_core::driver;
use cchunker_core::summary::MemorySink;

use super::with_stage;

pub fn run(config: &ChunkerConfig, command: &[OsString]) -> Result<()> {
    let engine = with_stage(RabinChunkEngine::new(
        config.polynomial,
        config.size_profile(),
    ))?;
    let processor = with_stage(CommandProcessor::new(command.iter().cloned()))?;

    // TODO: spill summaries to a temporary file once a level outgrows memory.
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let stats = with_stage(driver::reduce(
        &engine,
        stdin,
        &processor,
        config.line_check(),
        || Ok(MemorySink::new()),
        &mut stdout,
    ))?;

    tracing::info!(
        levels = stats.levels,
        summary_bytes = stats.summary_bytes,
        "done"
    );
    Ok(())
}
