//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use keepsync_core::{piece_count, Metadata, SecretDraft};

/// Generate payload bytes of up to `max_len`.
pub fn payload(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

/// Generate a non-empty opaque ciphertext-like string.
pub fn opaque_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/]{1,64}={0,2}".prop_map(String::from)
}

/// Generate a metadata map.
pub fn metadata() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map("[a-z_]{1,12}", ".{0,24}", 0..6).prop_map(Metadata)
}

/// Generate a valid draft, with an attachment half of the time.
pub fn secret_draft() -> impl Strategy<Value = SecretDraft> {
    (
        opaque_text(),
        opaque_text(),
        metadata(),
        prop::option::of(payload(512)),
    )
        .prop_map(|(login, password, metadata, binary_data)| SecretDraft {
            login,
            password,
            metadata,
            binary_data,
        })
}

/// A payload to push through the chunked path.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub payload: Bytes,
    pub piece_size: usize,
    /// Upload order of piece indices; a permutation of `0..pieces`.
    pub order: Vec<usize>,
}

impl UploadPlan {
    pub fn pieces(&self) -> usize {
        piece_count(self.payload.len(), self.piece_size)
    }
}

impl Arbitrary for UploadPlan {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1usize..=64, 1usize..=2048)
            .prop_flat_map(|(piece_size, len)| {
                let pieces = piece_count(len, piece_size);
                (
                    prop::collection::vec(any::<u8>(), len..=len),
                    Just(piece_size),
                    Just((0..pieces).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
            .prop_map(|(payload, piece_size, order)| UploadPlan {
                payload: Bytes::from(payload),
                piece_size,
                order,
            })
            .boxed()
    }
}
