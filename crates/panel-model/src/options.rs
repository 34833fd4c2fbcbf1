//! Per-run processing options.

use crate::config::NetworkFilter;
use crate::schema::TextEncoding;

/// Default number of records read per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Default number of distinct unresolved geo values kept for diagnostics.
pub const DEFAULT_GEO_SAMPLE_LIMIT: usize = 10;

/// Options that shape how a file is read, never what it aggregates to.
///
/// Results are identical for any `batch_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub batch_size: usize,
    pub geo_sample_limit: usize,
    pub network_filter: NetworkFilter,
    /// Forces the text encoding instead of sniffing it.
    pub encoding: Option<TextEncoding>,
    /// Forces the delimiter instead of sniffing it.
    pub delimiter: Option<u8>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            geo_sample_limit: DEFAULT_GEO_SAMPLE_LIMIT,
            network_filter: NetworkFilter::All,
            encoding: None,
            delimiter: None,
        }
    }
}

impl ProcessingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero is treated as one record per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_geo_sample_limit(mut self, limit: usize) -> Self {
        self.geo_sample_limit = limit;
        self
    }

    #[must_use]
    pub fn with_network_filter(mut self, filter: NetworkFilter) -> Self {
        self.network_filter = filter;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}
