use anyhow::Result;
use std::ffi::OsString;
use std::io;

use cchunker_core::chunk::RabinChunkEngine;
use cchunker_core::config::ChunkerConfig;
use cchunker_core::dispatch::CommandProcessor;
use cchunker_core::driver;

use super::with_stage;

pub fn run(config: &ChunkerConfig, command: &[OsString]) -> Result<()> {
    let engine = with_stage(RabinChunkEngine::new(
        config.polynomial,
        config.size_profile(),
    ))?;
    let processor = with_stage(CommandProcessor::new(command.iter().cloned()))?;

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let stats = with_stage(driver::split(&engine, stdin, &processor, &mut stdout))?;

    tracing::info!(chunks = stats.chunks, bytes = stats.bytes, "done");
    Ok(())
}
