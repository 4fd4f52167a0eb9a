// retrieve.rs
//
// Range retrieval from a coordinate-sorted, position-indexed file. The
// retrieval itself is delegated to an external tool; this module only owns
// the lifecycle of that tool's output stream.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::error::RsIndexError;
use crate::records::Region;

const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Regions passed on a single tabix command line. Longer lists are split over
/// consecutive invocations to stay clear of the OS argument length limit.
pub const DEFAULT_REGIONS_PER_CALL: usize = 10_000;

/// Something that, given a sorted file and a sorted list of regions, streams
/// back every record overlapping any of the regions.
pub trait RegionSource {
    type Stream: RegionStream;

    /// Begin retrieval. With `include_header`, header lines are emitted
    /// before any record.
    fn start(
        &self,
        source: &Path,
        regions: &[Region],
        include_header: bool,
    ) -> Result<Self::Stream, RsIndexError>;
}

/// The line stream of a started retrieval.
///
/// Reading to the end reports a failed producer as an I/O error. `stop` may
/// be called at any point to release the producer early; implementations
/// also release it on drop.
pub trait RegionStream: BufRead {
    fn stop(&mut self) -> Result<(), RsIndexError>;
}

/// Runs `tabix <file> [-h] <region>...` and streams its standard output.
/// Its standard error is passed through untouched.
#[derive(Debug, Clone)]
pub struct Tabix {
    program: PathBuf,
    regions_per_call: usize,
}

impl Default for Tabix {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tabix"),
            regions_per_call: DEFAULT_REGIONS_PER_CALL,
        }
    }
}

impl Tabix {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn regions_per_call(mut self, n: usize) -> Self {
        self.regions_per_call = n.max(1);
        self
    }

    /// The tabix command line for one batch of regions.
    pub fn command(&self, source: &Path, regions: &[String], include_header: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(source);
        if include_header {
            cmd.arg("-h");
        }
        cmd.args(regions);
        cmd
    }
}

impl RegionSource for Tabix {
    type Stream = TabixStream;

    fn start(
        &self,
        source: &Path,
        regions: &[Region],
        include_header: bool,
    ) -> Result<TabixStream, RsIndexError> {
        let batches: VecDeque<Vec<String>> = regions
            .chunks(self.regions_per_call)
            .map(|batch| batch.iter().map(Region::to_string).collect())
            .collect();

        let mut stream = TabixStream {
            tabix: self.clone(),
            source: source.to_path_buf(),
            include_header,
            batches,
            current: None,
            failure: None,
        };
        stream.spawn_next()?;
        Ok(stream)
    }
}

#[derive(Debug)]
struct RunningTabix {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

/// Output of one or more consecutive tabix runs, read as a single stream.
#[derive(Debug)]
pub struct TabixStream {
    tabix: Tabix,
    source: PathBuf,
    include_header: bool,
    batches: VecDeque<Vec<String>>,
    current: Option<RunningTabix>,
    failure: Option<RsIndexError>,
}

impl TabixStream {
    fn spawn_next(&mut self) -> Result<(), RsIndexError> {
        let Some(batch) = self.batches.pop_front() else {
            self.current = None;
            return Ok(());
        };

        debug!(
            "running {} on {} with {} regions",
            self.tabix.program.display(),
            self.source.display(),
            batch.len()
        );
        let mut child = self
            .tabix
            .command(&self.source, &batch, self.include_header)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                RsIndexError::Retrieval(format!(
                    "could not run {}: {}",
                    self.tabix.program.display(),
                    e
                ))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RsIndexError::Retrieval("tabix stdout was not captured".into()))?;

        // only the first batch carries the header
        self.include_header = false;
        self.current = Some(RunningTabix {
            child,
            stdout: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stdout),
        });
        Ok(())
    }

    /// Reap the exhausted run and start the next batch, if any.
    ///
    /// A failed run ends the stream. Reading reports it as an I/O error and
    /// the next [`stop`](RegionStream::stop) returns it as a retrieval error.
    fn advance(&mut self) -> io::Result<()> {
        if let Some(mut run) = self.current.take() {
            let status = run.child.wait()?;
            if !status.success() {
                return Err(self.fail(RsIndexError::Retrieval(format!(
                    "{} exited with {}",
                    self.tabix.program.display(),
                    status
                ))));
            }
        }
        self.spawn_next().map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: RsIndexError) -> io::Error {
        self.batches.clear();
        let reported = io::Error::new(io::ErrorKind::Other, error.to_string());
        self.failure = Some(error);
        reported
    }
}

impl Read for TabixStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for TabixStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        loop {
            let Some(run) = self.current.as_mut() else {
                return Ok(&[]);
            };
            if !run.stdout.fill_buf()?.is_empty() {
                break;
            }
            self.advance()?;
        }
        match self.current.as_mut() {
            Some(run) => run.stdout.fill_buf(),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let Some(run) = self.current.as_mut() {
            run.stdout.consume(amt);
        }
    }
}

impl RegionStream for TabixStream {
    fn stop(&mut self) -> Result<(), RsIndexError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        self.batches.clear();
        if let Some(mut run) = self.current.take() {
            if run.child.try_wait()?.is_none() {
                debug!("stopping {} early", self.tabix.program.display());
                // the child may exit between try_wait and kill
                if let Err(e) = run.child.kill() {
                    if e.kind() != io::ErrorKind::InvalidInput {
                        return Err(e.into());
                    }
                }
                run.child.wait()?;
            }
        }
        Ok(())
    }
}

impl Drop for TabixStream {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
