//! Splitting stored binaries into download pieces.
//!
//! Download is stateless: any piece of a stored binary can be computed from
//! the bytes and the piece size alone, so clients may fetch pieces in any
//! order and retry any of them.

use bytes::Bytes;

/// Size of one download piece on the wire (100 KiB).
pub const DOWNLOAD_PIECE_SIZE: usize = 100 * 1024;

/// Binaries strictly larger than this (1 MiB) are not embedded in sync
/// responses; only their length is sent.
pub const INLINE_BINARY_LIMIT: usize = 1024 * 1024;

/// Number of pieces `len` bytes split into at `piece_size`.
///
/// # Panics
///
/// Panics if `piece_size` is zero.
pub fn piece_count(len: usize, piece_size: usize) -> usize {
    assert!(piece_size > 0, "piece size must be non-zero");
    len.div_ceil(piece_size)
}

/// Split `data` into ordered pieces of `piece_size` bytes.
///
/// The last piece is shorter when the length is not a multiple of
/// `piece_size`. Empty input yields no pieces. Pieces share the input's
/// buffer; nothing is copied.
///
/// # Panics
///
/// Panics if `piece_size` is zero.
pub fn split_into_pieces(data: &Bytes, piece_size: usize) -> Vec<Bytes> {
    assert!(piece_size > 0, "piece size must be non-zero");

    let mut pieces = Vec::with_capacity(piece_count(data.len(), piece_size));
    let mut start = 0;
    while start < data.len() {
        let end = (start + piece_size).min(data.len());
        pieces.push(data.slice(start..end));
        start = end;
    }
    pieces
}
