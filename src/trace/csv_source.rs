//! CSV chunk files
//!
//! Chunk `i` of a trace named `prefix` lives at `{dir}/{prefix}_{i}.csv`.
//! Files carry a header row; the `blockaddress` and `type` columns are
//! required, `count` is optional (raw traces log one access per row). Any
//! other column, such as a leading row index, is ignored.
//!
//! Rows with a missing field, an unparseable address or count, or an unknown
//! type are skipped. A read failure part-way through a file is yielded as an
//! error and ends the chunk.

use super::source::RecordSource;
use super::{parse_block_address, AccessRecord, AccessType};
use crate::error::AnalysisError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Record source reading chunked CSV files from a directory
#[derive(Debug, Clone)]
pub struct CsvChunkSource {
    dir: PathBuf,
    prefix: String,
}

impl CsvChunkSource {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of chunk `chunk`
    pub fn chunk_path(&self, chunk: usize) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.prefix, chunk))
    }
}

impl RecordSource for CsvChunkSource {
    type Records<'a> = CsvRecords;

    fn open(&self, chunk: usize) -> Result<Self::Records<'_>, AnalysisError> {
        let path = self.chunk_path(chunk);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AnalysisError::ChunkNotFound { chunk, location: path });
            }
            Err(e) => return Err(e.into()),
        };
        CsvRecords::new(file, &path, chunk)
    }
}

/// Read a single CSV table (e.g. an aggregated count table) as records
pub fn read_table(path: &Path) -> Result<CsvRecords, AnalysisError> {
    let file = File::open(path)?;
    CsvRecords::new(file, path, 0)
}

/// Column positions of the fields we consume
#[derive(Debug, Clone, Copy)]
struct Columns {
    blockaddress: usize,
    access_type: usize,
    count: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Self, AnalysisError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let missing = |name: &str| AnalysisError::MalformedTable {
            location: path.to_path_buf(),
            reason: format!("missing '{}' column", name),
        };

        Ok(Self {
            blockaddress: find("blockaddress").ok_or_else(|| missing("blockaddress"))?,
            access_type: find("type").ok_or_else(|| missing("type"))?,
            count: find("count"),
        })
    }

    fn parse(&self, row: &csv::StringRecord) -> Option<AccessRecord> {
        let blockaddress = parse_block_address(row.get(self.blockaddress)?)?;
        let access_type: AccessType = row.get(self.access_type)?.parse().ok()?;
        let count = match self.count {
            Some(idx) => row.get(idx)?.trim().parse().ok()?,
            None => 1,
        };
        Some(AccessRecord::new(blockaddress, access_type, count))
    }
}

/// Lazy iterator over one CSV chunk
pub struct CsvRecords<R = File> {
    reader: csv::Reader<R>,
    row: csv::StringRecord,
    columns: Columns,
    chunk: usize,
    yielded: usize,
    skipped: usize,
    done: bool,
}

impl<R: Read> CsvRecords<R> {
    fn new(input: R, path: &Path, chunk: usize) -> Result<Self, AnalysisError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);
        let columns = Columns::locate(reader.headers()?, path)?;

        Ok(Self {
            reader,
            row: csv::StringRecord::new(),
            columns,
            chunk,
            yielded: 0,
            skipped: 0,
            done: false,
        })
    }

    /// Rows skipped as malformed so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn finish(&mut self) {
        self.done = true;
        if self.skipped > 0 {
            tracing::debug!(
                chunk = self.chunk,
                records = self.yielded,
                skipped = self.skipped,
                "skipped malformed rows"
            );
        }
    }
}

impl<R: Read> Iterator for CsvRecords<R> {
    type Item = Result<AccessRecord, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.read_record(&mut self.row) {
                Ok(true) => match self.columns.parse(&self.row) {
                    Some(record) => {
                        self.yielded += 1;
                        return Some(Ok(record));
                    }
                    None => self.skipped += 1,
                },
                Ok(false) => self.finish(),
                Err(e) if e.is_io_error() => {
                    tracing::warn!(chunk = self.chunk, records = self.yielded, error = %e, "read failed mid-chunk");
                    self.finish();
                    return Some(Err(e.into()));
                }
                // A broken row (e.g. invalid UTF-8) is skipped
                Err(_) => self.skipped += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};

    /// Serves `data`, then fails every read
    struct FailingReader {
        data: io::Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "device went away")),
                n => Ok(n),
            }
        }
    }

    fn write_chunk(dir: &Path, name: &str, content: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_reads_raw_chunk_with_index_column() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(
            dir.path(),
            "trace_0.csv",
            ",blockaddress,type\n0,4096,readi\n1,0x2000,write\n2,4096,readd\n",
        );

        let source = CsvChunkSource::new(dir.path(), "trace");
        let records: Vec<_> = source.open(0).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![
                AccessRecord::access(4096, AccessType::ReadI),
                AccessRecord::access(8192, AccessType::Write),
                AccessRecord::access(4096, AccessType::ReadD),
            ]
        );
    }

    #[test]
    fn test_reads_count_column() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(
            dir.path(),
            "agg_0.csv",
            "blockaddress,count,type\n10,7,read\n11,3,read&write\n",
        );

        let source = CsvChunkSource::new(dir.path(), "agg");
        let records: Vec<_> = source.open(0).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(records[0], AccessRecord::new(10, AccessType::Read, 7));
        assert_eq!(records[1], AccessRecord::new(11, AccessType::ReadWrite, 3));
    }

    #[test]
    fn test_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(
            dir.path(),
            "trace_0.csv",
            "blockaddress,type\n1,read\nnot-a-number,read\n2\n3,exec\n4,write,extra\n",
        );

        let source = CsvChunkSource::new(dir.path(), "trace");
        let mut records = source.open(0).unwrap();
        let collected: Vec<_> = records.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            collected,
            vec![
                AccessRecord::access(1, AccessType::Read),
                AccessRecord::access(4, AccessType::Write),
            ]
        );
        assert_eq!(records.skipped(), 3);
    }

    #[test]
    fn test_read_single_table() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(dir.path(), "agg.csv", "blockaddress,count,type\n5,2,write\n");

        let records: Vec<_> = read_table(&dir.path().join("agg.csv"))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records, vec![AccessRecord::new(5, AccessType::Write, 2)]);
        assert!(matches!(
            read_table(&dir.path().join("absent.csv")),
            Err(AnalysisError::Io(_))
        ));
    }

    #[test]
    fn test_missing_chunk_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvChunkSource::new(dir.path(), "trace");
        assert!(matches!(
            source.open(3),
            Err(AnalysisError::ChunkNotFound { chunk: 3, .. })
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(dir.path(), "trace_0.csv", "address,type\n1,read\n");

        let source = CsvChunkSource::new(dir.path(), "trace");
        assert!(matches!(
            source.open(0),
            Err(AnalysisError::MalformedTable { .. })
        ));
    }

    #[test]
    fn test_read_failure_mid_chunk_is_yielded() {
        let reader = FailingReader {
            data: io::Cursor::new(b"blockaddress,type\n1,read\n2,write\n".to_vec()),
        };
        let records = CsvRecords::new(reader, Path::new("flaky.csv"), 0).unwrap();
        let items: Vec<_> = records.collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &AccessRecord::access(1, AccessType::Read));
        assert_eq!(items[1].as_ref().unwrap(), &AccessRecord::access(2, AccessType::Write));
        assert!(matches!(items[2], Err(AnalysisError::Csv(_))));
    }
}
