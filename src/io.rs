// io.rs

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Error, Read, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Paths that stand for the standard streams.
pub const STDIO_PATH: &str = "-";

#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A file to read, transparently decompressed when it is gzip or bgzip
/// compressed. `-` reads standard input (never decompressed).
pub struct InputStream {
    filepath: PathBuf,
}

impl InputStream {
    pub fn new(filepath: &Path) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    fn is_stdin(&self) -> bool {
        self.filepath.as_os_str() == STDIO_PATH
    }

    fn is_gzipped(file: &mut File) -> Result<bool, IoError> {
        let mut header = [0u8; 2];
        // Files shorter than the magic are plain text
        let is_gzipped = match file.read_exact(&mut header) {
            Ok(()) => header == GZIP_MAGIC,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(e) => return Err(e.into()),
        };
        // Reset the file pointer
        file.rewind()?;
        Ok(is_gzipped)
    }

    pub fn reader(&self) -> Result<BufReader<Box<dyn Read>>, IoError> {
        let reader: Box<dyn Read> = if self.is_stdin() {
            Box::new(io::stdin())
        } else {
            let mut file = File::open(&self.filepath)?;
            if Self::is_gzipped(&mut file)? {
                // bgzip output is a series of gzip members
                Box::new(MultiGzDecoder::new(file))
            } else {
                Box::new(file)
            }
        };
        Ok(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, reader))
    }
}

/// Read newline-delimited identifiers, skipping blank and `#` lines.
pub fn read_identifiers(path: &Path) -> Result<Vec<String>, IoError> {
    let reader = InputStream::new(path).reader()?;
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if id.is_empty() || id.starts_with('#') {
            continue;
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

#[derive(Clone)]
pub struct OutputStreamBuilder {
    filepath: Option<PathBuf>,
    buffer_size: usize,
    compression_level: Compression,
}

impl Default for OutputStreamBuilder {
    fn default() -> Self {
        Self {
            filepath: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            compression_level: Compression::default(),
        }
    }
}

impl OutputStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` or `-` writes to standard output.
    pub fn filepath(mut self, path: Option<impl AsRef<Path>>) -> Self {
        self.filepath = path
            .map(|p| p.as_ref().to_path_buf())
            .filter(|p| p.as_os_str() != STDIO_PATH);
        self
    }

    pub fn build(self) -> OutputStream {
        OutputStream {
            filepath: self.filepath,
            buffer_size: self.buffer_size,
            compression_level: self.compression_level,
        }
    }
}

/// Output destination: standard output, a plain file, or a gzip
/// compressed file when the name ends in `.gz`.
pub struct OutputStream {
    filepath: Option<PathBuf>,
    buffer_size: usize,
    compression_level: Compression,
}

impl OutputStream {
    pub fn new(filepath: Option<impl AsRef<Path>>) -> Self {
        OutputStreamBuilder::new().filepath(filepath).build()
    }

    fn should_compress(&self) -> bool {
        self.filepath
            .as_ref()
            .map_or(false, |p| p.extension().map_or(false, |ext| ext == "gz"))
    }

    pub fn writer(&self) -> Result<Box<dyn Write>, Error> {
        match &self.filepath {
            Some(path) => {
                let file = File::create(path)?;
                let writer: Box<dyn Write> = if self.should_compress() {
                    Box::new(BufWriter::with_capacity(
                        self.buffer_size,
                        GzEncoder::new(file, self.compression_level),
                    ))
                } else {
                    Box::new(BufWriter::with_capacity(self.buffer_size, file))
                };
                Ok(writer)
            }
            None => Ok(Box::new(BufWriter::with_capacity(
                self.buffer_size,
                io::stdout(),
            ))),
        }
    }
}
