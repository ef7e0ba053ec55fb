use thiserror::Error;

#[derive(Debug, Error)]
pub enum CchunkError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read error")]
    Read(#[source] std::io::Error),

    #[error("Write error")]
    Write(#[source] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}")]
    ConfigNotFound(String),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    // Chunking
    #[error("Invalid size profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid polynomial {0:#x}: {1}")]
    InvalidPolynomial(u64, String),

    #[error("Unable to find a new random irreducible polynomial after {0} tries")]
    PolynomialSearch(usize),

    // Processor
    #[error("Failed to start chunk processor `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunk processor failed on chunk {chunk}: {status}")]
    ProcessorFailed {
        chunk: u64,
        status: std::process::ExitStatus,
    },

    #[error("Chunk processor printed {lines} line(s) for chunk {chunk}, expected exactly one")]
    LineContract { chunk: u64, lines: usize },

    // Reduction
    #[error(
        "Reduction is not converging at iteration {iteration}: {chunks} chunks turned {input_bytes} input bytes into {summary_bytes} summary bytes"
    )]
    NotConverging {
        iteration: u64,
        chunks: u64,
        input_bytes: u64,
        summary_bytes: u64,
    },
}

pub type Result<T> = std::result::Result<T, CchunkError>;
