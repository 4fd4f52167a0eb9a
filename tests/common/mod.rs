// tests/common/mod.rs

#![allow(dead_code)]

use rsindex::error::RsIndexError;
use rsindex::records::{is_header, VariantLine};
use rsindex::{Region, RegionSource, RegionStream};
use std::fs;
use std::io::{self, BufRead, Cursor, Read};
use std::path::Path;
use std::process::{Command, Stdio};

pub const VCF: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=1>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
1\t1900106\trs72634902;rs145742571\tTCTC\tT\t.\tPASS\t.\n\
1\t1946968\trs1287502205\tG\tA\t.\tPASS\t.\n\
4\t218446\trs1234497371\tC\tCA,CAA\t.\tPASS\t.\n\
9\t500\trs111\tA\tG\t.\tPASS\t.\n\
9\t500\trs222\tA\tT\t.\tPASS\t.\n\
9\t600\tesv3585029\tA\tT\t.\tPASS\t.\n\
17\t132359\trs1472751972\tC\tT\t.\tPASS\t.\n\
17\t944196\trs182553373\tG\tA\t.\tPASS\t.\n";

/// Whether an external tool can be started at all.
pub fn have_tool(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Region retrieval by scanning a plain-text VCF, one pass per region, the
/// way tabix answers a list of regions.
pub struct ScanSource;

impl RegionSource for ScanSource {
    type Stream = ScanStream;

    fn start(
        &self,
        source: &Path,
        regions: &[Region],
        include_header: bool,
    ) -> Result<ScanStream, RsIndexError> {
        let text = fs::read_to_string(source)?;
        let mut out = String::new();
        if include_header {
            text.split_inclusive('\n')
                .filter(|line| is_header(line))
                .for_each(|line| out.push_str(line));
        }
        for region in regions {
            for line in text.split_inclusive('\n').filter(|line| !is_header(line)) {
                let hit = VariantLine::parse(line)
                    .and_then(|r| Some((r.chrom, r.position.parse::<u64>().ok()?)))
                    .map_or(false, |(chrom, pos)| region.contains(chrom, pos));
                if hit {
                    out.push_str(line);
                }
            }
        }
        Ok(ScanStream(Cursor::new(out.into_bytes())))
    }
}

pub struct ScanStream(Cursor<Vec<u8>>);

impl Read for ScanStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl BufRead for ScanStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.0.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.0.consume(amt)
    }
}

impl RegionStream for ScanStream {
    fn stop(&mut self) -> Result<(), RsIndexError> {
        Ok(())
    }
}

/// Write `text` as a bgzip compressed, tabix indexed VCF at `path`.
pub fn bgzip_and_index(text: &str, path: &Path) {
    let plain = path.with_extension("");
    fs::write(&plain, text).expect("Failed to write VCF");
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("bgzip -c {} > {}", plain.display(), path.display()))
        .status()
        .expect("Failed to execute bgzip");
    assert!(status.success(), "bgzip command failed");

    let status = Command::new("tabix")
        .arg("-p")
        .arg("vcf")
        .arg(path)
        .status()
        .expect("Failed to execute tabix");
    assert!(status.success(), "tabix indexing failed");
}
