//! Append-only compressed block storage for raw trades.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use datums_types::Trade;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Size in bytes of a block header: LE `u32` compressed length, LE `u32`
/// ceiling of the largest timestamp in the block.
const BLOCK_HEADER_SIZE: usize = 8;

/// File name of the last-timestamp marker, stored next to the block file.
const LAST_FILE_NAME: &str = "cache_last";

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error while reading or writing the cache files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A block failed to decompress or carried a malformed payload.
    #[error("corrupt cache block: {0}")]
    Corrupt(String),

    /// The last-timestamp marker file holds something other than an integer.
    #[error("invalid last-timestamp marker: {0}")]
    InvalidMarker(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Append-only local store of raw trades, compressed in blocks.
///
/// Each [`update`](Self::update) appends one block to the block file and
/// overwrites a sibling `cache_last` marker with the remote high-water mark.
/// On-disk block layout:
///
/// - LE `u32`: compressed payload length
/// - LE `u32`: ceiling of the largest timestamp in the block
/// - zlib-compressed payload of packed LE `f64` `(price, volume, timestamp)`
///   triples
///
/// The timestamp ceiling in the header is an upper bound, not necessarily
/// tight; [`get`](Self::get) uses it only to skip whole blocks that end
/// before the requested `since`. Blocks are appended in arrival order and
/// never rewritten. The block is written before the marker, so a crash
/// between the two leaves a dangling block and a stale marker: the next
/// update re-fetches and re-appends that page (at-least-once, never lost
/// data).
///
/// A cache file must only be held by one writer at a time; this is a usage
/// constraint, not an enforced lock.
#[derive(Debug, Clone)]
pub struct TradesCache {
    file: PathBuf,
    last_file: PathBuf,
}

impl TradesCache {
    /// Creates a cache over the given block file path.
    ///
    /// The marker file lives next to it as `cache_last`. Neither file needs
    /// to exist yet; a cold cache reads as empty.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let last_file = file.with_file_name(LAST_FILE_NAME);
        Self { file, last_file }
    }

    /// Appends `trades` as one compressed block and records `last` as the
    /// new high-water mark.
    ///
    /// An empty `trades` slice appends no block but still overwrites the
    /// marker, so the high-water mark advances even when a remote page
    /// carried no trades.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn update(&self, trades: &[Trade], last: i64) -> Result<()> {
        if let Some(newest) = trades.last() {
            if let Some(parent) = self.file.parent() {
                fs::create_dir_all(parent)?;
            }
            let compressed = compress_trades(trades)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file)?;
            file.write_u32::<LittleEndian>(compressed.len() as u32)?;
            file.write_u32::<LittleEndian>(newest.timestamp.ceil() as u32)?;
            file.write_all(&compressed)?;
        }

        if let Some(parent) = self.last_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.last_file, last.to_string())?;
        Ok(())
    }

    /// Returns all cached trades with `since <= timestamp <= until`,
    /// inclusive on both ends, in append order.
    ///
    /// Blocks whose header ceiling is below `since` are seeked over without
    /// decompression. There is no per-block minimum, so the scan always runs
    /// through to the end of the file; correctness comes from the per-trade
    /// filter. A missing cache file yields an empty result (cold start). A
    /// torn block at the end of the file terminates the scan after the last
    /// complete block.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Corrupt`] if a block fails to decompress.
    pub fn get(&self, since: f64, until: f64) -> Result<Vec<Trade>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.file)?;
        let mut trades = Vec::new();
        while let Some((size, max_ts)) = read_block_header(&mut file)? {
            if f64::from(max_ts) < since {
                file.seek(SeekFrom::Current(i64::from(size)))?;
                continue;
            }

            let mut compressed = vec![0u8; size as usize];
            match file.read_exact(&mut compressed) {
                Ok(()) => {}
                // Torn tail from an interrupted write; everything before it
                // is intact.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            for trade in decompress_trades(&compressed)? {
                if since <= trade.timestamp && trade.timestamp <= until {
                    trades.push(trade);
                }
            }
        }
        Ok(trades)
    }

    /// Returns the persisted high-water mark, or 0 if no update has ever
    /// recorded one.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker file exists but cannot be read or
    /// parsed.
    pub fn last_timestamp(&self) -> Result<i64> {
        if !self.last_file.exists() {
            return Ok(0);
        }

        let text = fs::read_to_string(&self.last_file)?;
        text.trim()
            .parse()
            .map_err(|_| CacheError::InvalidMarker(text))
    }
}

/// Packs trades as little-endian `f64` triples and zlib-compresses them.
fn compress_trades(trades: &[Trade]) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(trades.len() * Trade::PACKED_SIZE);
    for trade in trades {
        raw.write_f64::<LittleEndian>(trade.price)?;
        raw.write_f64::<LittleEndian>(trade.volume)?;
        raw.write_f64::<LittleEndian>(trade.timestamp)?;
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Decompresses one block payload back into trades.
fn decompress_trades(compressed: &[u8]) -> Result<Vec<Trade>> {
    let mut raw = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut raw)
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;

    if !raw.len().is_multiple_of(Trade::PACKED_SIZE) {
        return Err(CacheError::Corrupt(format!(
            "payload length {} is not a multiple of {}",
            raw.len(),
            Trade::PACKED_SIZE
        )));
    }

    Ok(raw
        .chunks_exact(Trade::PACKED_SIZE)
        .map(|chunk| {
            Trade::new(
                LittleEndian::read_f64(&chunk[0..8]),
                LittleEndian::read_f64(&chunk[8..16]),
                LittleEndian::read_f64(&chunk[16..24]),
            )
        })
        .collect())
}

/// Reads the next block header, or `None` at end of file.
///
/// A header shorter than [`BLOCK_HEADER_SIZE`] is a torn write at the file
/// tail and also terminates the scan.
fn read_block_header(file: &mut File) -> Result<Option<(u32, u32)>> {
    let mut buf = [0u8; BLOCK_HEADER_SIZE];
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    if filled < buf.len() {
        return Ok(None);
    }
    Ok(Some((
        LittleEndian::read_u32(&buf[0..4]),
        LittleEndian::read_u32(&buf[4..8]),
    )))
}
