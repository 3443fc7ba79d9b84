//! Property tests for piece splitting and reassembly.

use bytes::Bytes;
use proptest::prelude::*;

use keepsync_core::{piece_count, split_into_pieces, AccountId};
use keepsync_testkit::generators::{payload, UploadPlan};
use keepsync_transfer::{AssemblerConfig, ChunkAssembler, TransferError};

fn assembler() -> ChunkAssembler {
    ChunkAssembler::new(AssemblerConfig::default())
}

proptest! {
    #[test]
    fn reassembly_is_byte_identical_in_any_order(plan: UploadPlan) {
        let pieces = split_into_pieces(&plan.payload, plan.piece_size);
        prop_assert_eq!(pieces.len(), plan.pieces());

        let assembler = assembler();
        let ticket = assembler
            .init_upload(&AccountId::from("alice"), pieces.len(), plan.payload.len() as u64)
            .unwrap();
        for &index in &plan.order {
            assembler
                .upload_piece(&ticket.upload_id, index, pieces[index].clone())
                .unwrap();
        }

        let joined = assembler.reassemble(&ticket.upload_id).unwrap();
        prop_assert_eq!(joined, plan.payload.clone());
    }

    #[test]
    fn pieces_have_declared_sizes(data in payload(4096), piece_size in 1usize..=512) {
        let pieces = split_into_pieces(&data, piece_size);
        prop_assert_eq!(pieces.len(), piece_count(data.len(), piece_size));

        if let Some((last, full)) = pieces.split_last() {
            prop_assert!(full.iter().all(|p| p.len() == piece_size));
            prop_assert!(!last.is_empty() && last.len() <= piece_size);
        }

        let total: usize = pieces.iter().map(Bytes::len).sum();
        prop_assert_eq!(total, data.len());
    }

    #[test]
    fn incomplete_iff_a_piece_is_missing(plan: UploadPlan, skip in any::<prop::sample::Index>()) {
        let pieces = split_into_pieces(&plan.payload, plan.piece_size);
        let missing = plan.order[skip.index(plan.order.len())];

        let assembler = assembler();
        let ticket = assembler
            .init_upload(&AccountId::from("alice"), pieces.len(), plan.payload.len() as u64)
            .unwrap();
        for &index in plan.order.iter().filter(|&&i| i != missing) {
            assembler
                .upload_piece(&ticket.upload_id, index, pieces[index].clone())
                .unwrap();
        }

        prop_assert_eq!(
            assembler.reassemble(&ticket.upload_id),
            Err(TransferError::IncompleteUpload {
                received: pieces.len() - 1,
                total: pieces.len(),
            })
        );

        assembler
            .upload_piece(&ticket.upload_id, missing, pieces[missing].clone())
            .unwrap();
        prop_assert_eq!(assembler.reassemble(&ticket.upload_id).unwrap(), plan.payload);
    }

    #[test]
    fn redelivery_keeps_the_last_copy(plan: UploadPlan) {
        let pieces = split_into_pieces(&plan.payload, plan.piece_size);

        let assembler = assembler();
        let ticket = assembler
            .init_upload(&AccountId::from("alice"), pieces.len(), plan.payload.len() as u64)
            .unwrap();
        for (index, piece) in pieces.iter().enumerate() {
            assembler
                .upload_piece(&ticket.upload_id, index, Bytes::from(vec![0xAA; piece.len()]))
                .unwrap();
        }
        for &index in &plan.order {
            assembler
                .upload_piece(&ticket.upload_id, index, pieces[index].clone())
                .unwrap();
        }

        prop_assert_eq!(assembler.reassemble(&ticket.upload_id).unwrap(), plan.payload);
    }
}

#[test]
fn sizes_around_piece_boundary() {
    for (len, expected) in [(300, 3), (99, 1), (250, 3), (100, 1), (101, 2)] {
        let data = Bytes::from(vec![7u8; len]);
        let pieces = split_into_pieces(&data, 100);
        assert_eq!(pieces.len(), expected, "len {len}");

        let assembler = assembler();
        let ticket = assembler
            .init_upload(&AccountId::from("bob"), pieces.len(), len as u64)
            .unwrap();
        for (index, piece) in pieces.into_iter().enumerate().rev() {
            assembler.upload_piece(&ticket.upload_id, index, piece).unwrap();
        }
        assert_eq!(assembler.reassemble(&ticket.upload_id).unwrap(), data);
    }
}
