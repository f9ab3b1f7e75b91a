//! Property-based tests for batch validation and the file count limit.
//!
//! For any sequence of batches the manager never tracks more files than
//! allowed, and validation splits every batch into accepted files and
//! issues without losing or inventing a file.

#[path = "../common/mod.rs"]
mod common;

use asset_uploader::config::UploadConfig;
use asset_uploader::upload::{validate, AcceptList, SourceFile, UploadManager, ValidationIssue};
use common::ScriptedTransfer;
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;

const MIME_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "application/pdf",
    "text/plain",
    "application/zip",
];

fn arb_file() -> impl Strategy<Value = SourceFile> {
    ("[a-z]{1,8}", 0u64..2_000, prop::sample::select(MIME_TYPES.to_vec())).prop_map(
        |(name, size, mime)| {
            let mut file = SourceFile::new(format!("{}.bin", name), mime, Vec::new());
            file.size = size;
            file
        },
    )
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<SourceFile>>> {
    prop::collection::vec(prop::collection::vec(arb_file(), 0..6), 1..8)
}

fn arb_accept() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        Just("image/*".to_string()),
        Just("image/png, application/pdf".to_string()),
        Just("text/*,application/*".to_string()),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// The tracked file count never exceeds `max_files`, and a batch is either
// refused whole or considered file by file.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn file_count_never_exceeds_limit(
        max_files in 1usize..8,
        batches in arb_batches(),
    ) {
        let config = UploadConfig {
            max_files,
            max_size: 1_000,
            ..UploadConfig::default()
        };

        let counts = runtime().block_on(async move {
            let mut manager = UploadManager::new(config, Arc::new(ScriptedTransfer::new()));
            let mut counts = Vec::new();
            for batch in batches {
                let before = manager.tasks().len();
                let attempted = batch.len();
                let errors_before = manager.validation_errors().len();
                let added = manager.accept(batch).len();
                let rejected = manager.validation_errors().len() - errors_before;
                manager.wait_idle().await;
                counts.push((before, attempted, added, rejected, manager.tasks().len()));
            }
            counts
        });

        for (before, attempted, added, rejected, after) in counts {
            prop_assert!(after <= max_files);
            prop_assert_eq!(after, before + added);
            if before + attempted > max_files {
                prop_assert_eq!(added, 0);
                prop_assert_eq!(rejected, 1);
            } else {
                prop_assert_eq!(added + rejected, attempted);
            }
        }
    }

    #[test]
    fn validation_partitions_the_batch(
        files in prop::collection::vec(arb_file(), 0..12),
        current in 0usize..6,
        max_size in 0u64..2_000,
        accept in arb_accept(),
    ) {
        let config = UploadConfig {
            max_files: 10,
            max_size,
            accept: accept.clone(),
            ..UploadConfig::default()
        };
        let total = files.len();
        let validation = validate(files, current, &config);

        if current + total > config.max_files {
            prop_assert!(validation.accepted.is_empty());
            prop_assert_eq!(
                validation.rejected,
                vec![ValidationIssue::TooManyFiles { max_files: 10, attempted: total }]
            );
        } else {
            prop_assert_eq!(validation.accepted.len() + validation.rejected.len(), total);
            let list = AcceptList::parse(&accept);
            for file in &validation.accepted {
                prop_assert!(file.size <= max_size);
                if let Some(list) = &list {
                    prop_assert!(list.matches(&file.mime_type));
                }
            }
            let too_many = validation
                .rejected
                .iter()
                .any(|issue| matches!(issue, ValidationIssue::TooManyFiles { .. }));
            prop_assert!(!too_many);
        }
    }
}

#[rstest]
#[case("*", "application/x-anything", true)]
#[case("", "text/plain", true)]
#[case("image/*", "image/webp", true)]
#[case("image/*", "video/mp4", false)]
#[case("image/png, application/pdf", "APPLICATION/PDF", true)]
#[case("image/png, application/pdf", "image/jpeg", false)]
#[case("application/vnd.ms-excel", "application/vnd.ms-excel", true)]
fn accept_list_matches(#[case] accept: &str, #[case] mime_type: &str, #[case] expected: bool) {
    let matched = AcceptList::parse(accept)
        .map(|list| list.matches(mime_type))
        .unwrap_or(true);
    assert_eq!(matched, expected);
}
