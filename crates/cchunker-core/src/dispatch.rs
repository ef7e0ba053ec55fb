use std::ffi::OsString;
use std::io::{self, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

use crate::error::{CchunkError, Result};
use crate::types::LineCheck;

/// Something that consumes one chunk at a time.
pub trait Processor {
    /// Process `chunk`, streaming whatever it produces into `out`.
    fn pass_through(&self, index: u64, chunk: &[u8], out: &mut dyn Write) -> Result<()>;

    /// Process `chunk` and return everything it produced.
    fn capture(&self, index: u64, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.pass_through(index, chunk, &mut output)?;
        Ok(output)
    }
}

/// Runs an external command once per chunk, feeding the chunk on stdin.
///
/// stderr is inherited, so processor diagnostics always reach the
/// caller's error stream.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandProcessor {
    pub fn new<I, S>(command: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut parts = command.into_iter().map(Into::into);
        let program = parts
            .next()
            .ok_or_else(|| CchunkError::Config("no chunk processing command given".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Processor for CommandProcessor {
    fn pass_through(&self, index: u64, chunk: &[u8], out: &mut dyn Write) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| CchunkError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;

        let (stdin, mut stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CchunkError::Io(io::Error::other(
                    "chunk processor pipes were not created",
                )));
            }
        };

        // Feed stdin from a second thread while stdout is drained here, so
        // neither pipe can fill up and stall the other.
        let (fed, copied) = thread::scope(|s| {
            let feeder = s.spawn(move || feed(stdin, chunk));
            let copied = io::copy(&mut stdout, out);
            if copied.is_err() {
                let _ = child.kill();
            }
            let fed = feeder
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (fed, copied)
        });

        let status = child.wait()?;
        copied.map_err(CchunkError::Write)?;
        if !status.success() {
            return Err(CchunkError::ProcessorFailed {
                chunk: index,
                status,
            });
        }
        fed?;
        Ok(())
    }
}

/// Write the whole chunk and close stdin. A processor that stops reading
/// early is judged by its exit status, not by the broken pipe.
fn feed(mut stdin: ChildStdin, chunk: &[u8]) -> io::Result<()> {
    match stdin.write_all(chunk) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Enforce the one-line-per-chunk contract on captured output.
pub fn check_line(index: u64, output: &[u8], check: LineCheck) -> Result<()> {
    if check == LineCheck::Off {
        return Ok(());
    }
    let newlines = output.iter().filter(|&&b| b == b'\n').count();
    if newlines == 1 && output.ends_with(b"\n") {
        return Ok(());
    }
    let unterminated = usize::from(!output.is_empty() && !output.ends_with(b"\n"));
    Err(CchunkError::LineContract {
        chunk: index,
        lines: newlines + unterminated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_rejected() {
        let err = CommandProcessor::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, CchunkError::Config(_)));
    }

    #[test]
    fn command_split_into_program_and_args() {
        let processor = CommandProcessor::new(["sha256sum", "-b"]).unwrap();
        assert_eq!(processor.program, "sha256sum");
        assert_eq!(processor.args, vec![OsString::from("-b")]);
    }

    #[test]
    fn single_line_contract() {
        check_line(0, b"abc\n", LineCheck::Strict).unwrap();
        check_line(0, b"\n", LineCheck::Strict).unwrap();

        let err = check_line(3, b"a\nb\n", LineCheck::Strict).unwrap_err();
        assert!(matches!(err, CchunkError::LineContract { chunk: 3, lines: 2 }));

        let err = check_line(0, b"abc", LineCheck::Strict).unwrap_err();
        assert!(matches!(err, CchunkError::LineContract { lines: 1, .. }));

        let err = check_line(0, b"", LineCheck::Strict).unwrap_err();
        assert!(matches!(err, CchunkError::LineContract { lines: 0, .. }));

        check_line(0, b"a\nb\nc", LineCheck::Off).unwrap();
        check_line(0, b"", LineCheck::Off).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn cat_passes_chunk_through() {
        let processor = CommandProcessor::new(["cat"]).unwrap();
        let mut out = Vec::new();
        processor.pass_through(0, b"some chunk bytes", &mut out).unwrap();
        assert_eq!(out, b"some chunk bytes");
    }

    #[cfg(unix)]
    #[test]
    fn large_chunk_with_echoing_processor_does_not_deadlock() {
        let processor = CommandProcessor::new(["cat"]).unwrap();
        let chunk: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let output = processor.capture(0, &chunk).unwrap();
        assert_eq!(output, chunk);
    }

    #[cfg(unix)]
    #[test]
    fn processor_that_ignores_input_is_fine() {
        let processor = CommandProcessor::new(["sh", "-c", "echo done"]).unwrap();
        let chunk = vec![1u8; 1024 * 1024];
        assert_eq!(processor.capture(0, &chunk).unwrap(), b"done\n");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_an_error() {
        let processor = CommandProcessor::new(["sh", "-c", "cat >/dev/null; exit 2"]).unwrap();
        let err = processor.capture(5, b"data").unwrap_err();
        match err {
            CchunkError::ProcessorFailed { chunk, status } => {
                assert_eq!(chunk, 5);
                assert_eq!(status.code(), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Output stream that refuses every write.
    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[cfg(unix)]
    #[test]
    fn write_failure_stops_endless_processor() {
        let processor = CommandProcessor::new(["yes"]).unwrap();
        let err = processor
            .pass_through(0, b"x", &mut ClosedOutput)
            .unwrap_err();
        match err {
            CchunkError::Write(source) => assert_eq!(source.to_string(), "sink gone"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let processor = CommandProcessor::new(["cchunker-no-such-program"]).unwrap();
        let err = processor.capture(0, b"data").unwrap_err();
        assert!(matches!(err, CchunkError::Spawn { .. }));
    }
}
