// test_utils.rs

#[cfg(test)]
pub mod test_utils {
    use std::cell::{Cell, RefCell};
    use std::env;
    use std::io::{self, BufRead, Cursor, Read};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use tempfile;

    use crate::error::RsIndexError;
    use crate::records::{is_header, Region, VariantLine};
    use crate::retrieve::{RegionSource, RegionStream};

    pub struct TestDir {
        dir: PathBuf,
        #[allow(dead_code)] // held only to delete the directory on drop
        temp_dir: Option<tempfile::TempDir>,
    }

    impl TestDir {
        pub fn new(prefix: &str) -> std::io::Result<Self> {
            let keep_output = env::var("KEEP_TEST_OUTPUT").is_ok();
            if keep_output {
                let output_dir = env::current_dir()?.join("test_output").join(prefix);
                std::fs::create_dir_all(&output_dir)?;
                Ok(TestDir {
                    dir: output_dir,
                    temp_dir: None,
                })
            } else {
                let temp_dir = tempfile::tempdir()?;
                let dir = temp_dir.path().to_path_buf();
                Ok(TestDir {
                    dir,
                    temp_dir: Some(temp_dir),
                })
            }
        }

        pub fn path(&self) -> &Path {
            &self.dir
        }
    }

    /// Region retrieval over an in-memory VCF: for each region in turn, every
    /// record whose position falls inside it. Records the regions it is asked
    /// for and how often a stream is stopped.
    pub struct MemorySource {
        header: Vec<String>,
        records: Vec<String>,
        requests: RefCell<Vec<Vec<String>>>,
        stops: Rc<Cell<usize>>,
    }

    impl MemorySource {
        pub fn new(vcf: &str) -> Self {
            let (header, records): (Vec<String>, Vec<String>) = vcf
                .split_inclusive('\n')
                .map(str::to_string)
                .partition(|line| is_header(line));
            Self {
                header,
                records,
                requests: RefCell::new(Vec::new()),
                stops: Rc::new(Cell::new(0)),
            }
        }

        pub fn requests(&self) -> Vec<Vec<String>> {
            self.requests.borrow().clone()
        }

        pub fn stops(&self) -> usize {
            self.stops.get()
        }
    }

    impl RegionSource for MemorySource {
        type Stream = MemoryStream;

        fn start(
            &self,
            _source: &Path,
            regions: &[Region],
            include_header: bool,
        ) -> Result<MemoryStream, RsIndexError> {
            self.requests
                .borrow_mut()
                .push(regions.iter().map(Region::to_string).collect());

            let mut out = String::new();
            if include_header {
                self.header.iter().for_each(|line| out.push_str(line));
            }
            for region in regions {
                for line in &self.records {
                    let Some(record) = VariantLine::parse(line) else {
                        continue;
                    };
                    let Ok(position) = record.position.parse::<u64>() else {
                        continue;
                    };
                    if region.contains(record.chrom, position) {
                        out.push_str(line);
                    }
                }
            }

            Ok(MemoryStream {
                inner: Cursor::new(out.into_bytes()),
                stops: Rc::clone(&self.stops),
                stopped: false,
            })
        }
    }

    pub struct MemoryStream {
        inner: Cursor<Vec<u8>>,
        stops: Rc<Cell<usize>>,
        stopped: bool,
    }

    impl Read for MemoryStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl BufRead for MemoryStream {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    impl RegionStream for MemoryStream {
        fn stop(&mut self) -> Result<(), RsIndexError> {
            if !self.stopped {
                self.stopped = true;
                self.stops.set(self.stops.get() + 1);
            }
            Ok(())
        }
    }
}
