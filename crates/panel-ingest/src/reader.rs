//! Batched CSV reading with sniffed delimiter and encoding.
//!
//! Survey files are large (tens of millions of rows for exit exams), so
//! records are streamed in bounded batches and only the columns a schema
//! needs are decoded.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use panel_model::{ProcessingOptions, TextEncoding};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::sniff::{UTF8_BOM, decode, sniff_delimiter, sniff_encoding};

/// Bytes buffered for sniffing; enough for the widest census headers.
/// Encoding evidence past this window is never seen.
const SNIFF_CAPACITY: usize = 256 * 1024;

/// One data row as positional decoded cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    cells: Vec<String>,
}

impl RawRecord {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Cell at `index`; `None` for rows shorter than the header.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RawRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Streams a delimited survey file in batches.
pub struct SurveyReader<R: Read> {
    name: String,
    reader: csv::Reader<BufReader<R>>,
    header: Vec<String>,
    delimiter: u8,
    encoding: TextEncoding,
    batch_size: usize,
    projection: Option<Vec<bool>>,
    record: csv::ByteRecord,
    records_read: u64,
}

impl SurveyReader<File> {
    /// Opens a file on disk.
    pub fn open(path: &Path, options: &ProcessingOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(name, file, options)
    }
}

impl<R: Read> SurveyReader<R> {
    /// Sniffs the format, strips a UTF-8 BOM and reads the header line.
    pub fn from_reader(name: impl Into<String>, inner: R, options: &ProcessingOptions) -> Result<Self> {
        let name = name.into();
        let mut buffered = BufReader::with_capacity(SNIFF_CAPACITY, inner);
        let sample = buffered.fill_buf().map_err(|source| IngestError::StreamRead {
            name: name.clone(),
            source,
        })?;
        if sample.is_empty() {
            return Err(IngestError::EmptyInput { name });
        }

        let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(sample));
        let encoding = options.encoding.unwrap_or_else(|| sniff_encoding(sample));
        let has_bom = sample.starts_with(UTF8_BOM);
        if has_bom {
            buffered.consume(UTF8_BOM.len());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(buffered);

        let mut first = csv::ByteRecord::new();
        let has_header = reader
            .read_byte_record(&mut first)
            .map_err(|e| IngestError::csv(&name, &e))?;
        if !has_header {
            return Err(IngestError::EmptyInput { name });
        }
        let header: Vec<String> = first
            .iter()
            .map(|cell| decode(cell, encoding).trim().to_string())
            .collect();

        debug!(
            source = %name,
            delimiter = %char::from(delimiter).escape_default(),
            encoding = %encoding,
            bom = has_bom,
            columns = header.len(),
            "Read header"
        );

        Ok(Self {
            name,
            reader,
            header,
            delimiter,
            encoding,
            batch_size: options.batch_size.max(1),
            projection: None,
            record: csv::ByteRecord::new(),
            records_read: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Restricts decoding to the given column indexes. Other cells come
    /// back as empty strings, keeping positions intact.
    pub fn set_projection(&mut self, indexes: impl IntoIterator<Item = usize>) {
        let mut keep = vec![false; self.header.len()];
        for index in indexes {
            if index >= keep.len() {
                keep.resize(index + 1, false);
            }
            keep[index] = true;
        }
        self.projection = Some(keep);
    }

    /// Reads the next batch. Returns `None` once the input is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<Vec<RawRecord>>> {
        let mut batch = Vec::with_capacity(self.batch_size.min(8192));
        while batch.len() < self.batch_size {
            let more = self
                .reader
                .read_byte_record(&mut self.record)
                .map_err(|e| IngestError::csv(&self.name, &e))?;
            if !more {
                break;
            }
            if self.record.iter().all(<[u8]>::is_empty) {
                continue;
            }
            batch.push(self.decode_record());
        }
        self.records_read += batch.len() as u64;
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    fn decode_record(&self) -> RawRecord {
        let cells = self
            .record
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let wanted = self
                    .projection
                    .as_ref()
                    .is_none_or(|keep| keep.get(index).copied().unwrap_or(false));
                if wanted {
                    decode(cell, self.encoding).into_owned()
                } else {
                    String::new()
                }
            })
            .collect();
        RawRecord::new(cells)
    }
}
