//! End-to-end DID lifecycle: a create, an update, a recover, and a
//! deactivate, each anchored as its own transaction and assembled through
//! `assemble_operations` before landing in the operation index, exactly the
//! way a running node would observe them one anchor at a time.

use std::sync::Arc;

use sidetree_core::encoding;
use sidetree_core::multihash;
use sidetree_core::operation::{
    Patch, PatchData, ReplaceDocument, SignedDataDeactivate, SignedDataRecover, SignedDataUpdate,
    TransactionCoordinates,
};
use sidetree_core::protocol::{Protocol, StaticProtocolClient};
use sidetree_services::{assemble_operations, AnchorTransaction, OperationIndex};
use tokio_util::sync::CancellationToken;

use crate::support::{commitment_for, create_materials, reveal_encoded, InMemoryCas, MagicStringVerifier, PassthroughCompression, VALID_SIGNATURE};

fn anchor_file(map_file_hash: Option<&str>, create: serde_json::Value, recover: serde_json::Value, deactivate: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "mapFileHash": map_file_hash,
        "createOperations": create,
        "recoverOperations": recover,
        "deactivateOperations": deactivate,
    }))
    .unwrap()
}

fn map_file(chunk_hash: &str, updates: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "chunks": [{"chunkFileHash": chunk_hash}],
        "updateOperations": updates,
    }))
    .unwrap()
}

fn chunk_file(deltas: &[&PatchData]) -> Vec<u8> {
    let encoded: Vec<String> = deltas
        .iter()
        .map(|d| encoding::encode(&serde_json::to_vec(d).unwrap()))
        .collect();
    serde_json::to_vec(&serde_json::json!({ "deltas": encoded })).unwrap()
}

#[tokio::test]
async fn create_update_recover_deactivate_resolves_through_every_stage() {
    let namespace = "doc:ns";
    let protocol = Protocol::default();
    let code = protocol.hash_algorithm_code;

    let cas = Arc::new(InMemoryCas::new());
    let compression = Arc::new(PassthroughCompression);
    let protocol_client = Arc::new(StaticProtocolClient::new().with_namespace(namespace, protocol));
    let index = OperationIndex::new();
    let cancel = CancellationToken::new();

    // --- create ---
    let (suffix_data, create_patch) = create_materials("key-1", b"recovery-reveal-1", b"update-reveal-1");
    let unique_suffix = sidetree_core::operation::derive_unique_suffix(code, &suffix_data).unwrap();

    cas.put("chunk-1", chunk_file(&[&create_patch]));
    cas.put("map-1", map_file("chunk-1", serde_json::json!([])));
    cas.put(
        "anchor-1",
        anchor_file(Some("map-1"), serde_json::json!([{"suffixData": suffix_data}]), serde_json::json!([]), serde_json::json!([])),
    );

    let txn1 = AnchorTransaction {
        anchor_string: "1.anchor-1".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 1,
        transaction_number: 1,
    };
    let ops = assemble_operations(&txn1, cas.clone(), compression.clone(), protocol_client.clone(), &cancel)
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 1, transaction_number: 1, operation_index: 0 },
    );

    let after_create = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert!(after_create.method_metadata.published);
    assert_eq!(after_create.document.public_key.len(), 1);

    // --- update: add a service endpoint, reveal update-reveal-1 ---
    let update_patch = PatchData {
        patches: vec![Patch::AddServices {
            service_endpoints: vec![sidetree_core::document::ServiceEndpointEntry {
                id: "svc-1".to_string(),
                endpoint_type: "LinkedDomains".to_string(),
                service_endpoint: "https://example.org".to_string(),
            }],
        }],
        next_update_commitment: commitment_for(b"update-reveal-2"),
    };
    let update_signed = SignedDataUpdate {
        update_reveal_value: reveal_encoded(b"update-reveal-1"),
        key_id: "key-1".to_string(),
        signature: VALID_SIGNATURE.to_string(),
    };

    cas.put("chunk-2", chunk_file(&[&update_patch]));
    cas.put(
        "map-2",
        map_file("chunk-2", serde_json::json!([{"didSuffix": unique_suffix, "signedData": update_signed}])),
    );
    cas.put("anchor-2", anchor_file(Some("map-2"), serde_json::json!([]), serde_json::json!([]), serde_json::json!([])));

    let txn2 = AnchorTransaction {
        anchor_string: "1.anchor-2".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 2,
        transaction_number: 2,
    };
    let ops = assemble_operations(&txn2, cas.clone(), compression.clone(), protocol_client.clone(), &cancel)
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 2, transaction_number: 2, operation_index: 0 },
    );

    let after_update = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert_eq!(after_update.document.service.len(), 1);
    assert_eq!(after_update.document.public_key.len(), 1);

    // --- recover: replace the document with a fresh key, roll the recovery key ---
    let recover_patch = PatchData {
        patches: vec![Patch::Replace {
            document: ReplaceDocument {
                public_key: vec![sidetree_core::document::PublicKeyEntry {
                    id: "key-2".to_string(),
                    key_type: "JsonWebKey2020".to_string(),
                    public_key_jwk: serde_json::json!({"kty": "EC"}),
                    purposes: vec!["authentication".to_string()],
                }],
                service: vec![],
            },
        }],
        next_update_commitment: commitment_for(b"update-reveal-3"),
    };
    let recover_canonical = encoding::canonical_serialize(&recover_patch).unwrap();
    let recover_patch_hash = encoding::encode(&multihash::compute_multihash(code, &recover_canonical).unwrap());
    let recover_signed = SignedDataRecover {
        recovery_reveal_value: reveal_encoded(b"recovery-reveal-1"),
        new_recovery_key: serde_json::json!({"kty": "EC", "role": "recovery-2"}),
        next_recovery_commitment: commitment_for(b"recovery-reveal-2"),
        next_update_commitment: commitment_for(b"update-reveal-3"),
        patch_data_hash: recover_patch_hash,
        signature: VALID_SIGNATURE.to_string(),
    };

    cas.put("chunk-3", chunk_file(&[&recover_patch]));
    cas.put("map-3", map_file("chunk-3", serde_json::json!([])));
    cas.put(
        "anchor-3",
        anchor_file(
            Some("map-3"),
            serde_json::json!([]),
            serde_json::json!([{"didSuffix": unique_suffix, "signedData": recover_signed}]),
            serde_json::json!([]),
        ),
    );

    let txn3 = AnchorTransaction {
        anchor_string: "1.anchor-3".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 3,
        transaction_number: 3,
    };
    let ops = assemble_operations(&txn3, cas.clone(), compression.clone(), protocol_client.clone(), &cancel)
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 3, transaction_number: 3, operation_index: 0 },
    );

    let after_recover = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert_eq!(after_recover.document.public_key.len(), 1);
    assert_eq!(after_recover.document.public_key[0].id, "key-2");
    assert!(after_recover.document.service.is_empty());

    // --- deactivate: reveal recovery-reveal-2, the commitment the recover just set ---
    let deactivate_signed = SignedDataDeactivate {
        recovery_reveal_value: reveal_encoded(b"recovery-reveal-2"),
        signature: VALID_SIGNATURE.to_string(),
    };
    cas.put(
        "anchor-4",
        anchor_file(None, serde_json::json!([]), serde_json::json!([]), serde_json::json!([{"didSuffix": unique_suffix, "signedData": deactivate_signed}])),
    );

    let txn4 = AnchorTransaction {
        anchor_string: "1.anchor-4".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 4,
        transaction_number: 4,
    };
    let ops = assemble_operations(&txn4, cas.clone(), compression.clone(), protocol_client.clone(), &cancel)
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 4, transaction_number: 4, operation_index: 0 },
    );

    let after_deactivate = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert!(after_deactivate.method_metadata.deactivated);
    assert!(after_deactivate.document.public_key.is_empty());

    // A fifth operation against a deactivated DID is dropped, not applied.
    let (_late_suffix_data, late_patch) = create_materials("key-late", b"x", b"y");
    cas.put("chunk-5", chunk_file(&[&late_patch]));
    cas.put("map-5", map_file("chunk-5", serde_json::json!([{
        "didSuffix": unique_suffix,
        "signedData": SignedDataUpdate {
            update_reveal_value: reveal_encoded(b"update-reveal-3"),
            key_id: "key-2".to_string(),
            signature: VALID_SIGNATURE.to_string(),
        },
    }])));
    cas.put("anchor-5", anchor_file(Some("map-5"), serde_json::json!([]), serde_json::json!([]), serde_json::json!([])));
    let txn5 = AnchorTransaction {
        anchor_string: "1.anchor-5".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 5,
        transaction_number: 5,
    };
    let ops = assemble_operations(&txn5, cas, compression, protocol_client, &cancel).await.unwrap();
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 5, transaction_number: 5, operation_index: 0 },
    );
    let still_deactivated = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert!(still_deactivated.method_metadata.deactivated);
}

/// A recover's chunk-file delta is matched to its anchor-file entry purely
/// positionally; nothing before the processor fold re-checks it against the
/// commitment carried in `signed_data.patch_data_hash`. Substitute a
/// different delta in the chunk file than the one the recover actually
/// committed to and confirm the fold drops the operation rather than
/// silently applying the swapped patch.
#[tokio::test]
async fn recover_with_a_substituted_chunk_delta_is_dropped_by_the_fold() {
    let namespace = "doc:ns";
    let protocol = Protocol::default();
    let code = protocol.hash_algorithm_code;

    let cas = Arc::new(InMemoryCas::new());
    let compression = Arc::new(PassthroughCompression);
    let protocol_client = Arc::new(StaticProtocolClient::new().with_namespace(namespace, protocol));
    let index = OperationIndex::new();
    let cancel = CancellationToken::new();

    let (suffix_data, create_patch) = create_materials("key-1", b"recovery-reveal-1", b"update-reveal-1");
    let unique_suffix = sidetree_core::operation::derive_unique_suffix(code, &suffix_data).unwrap();

    cas.put("chunk-1", chunk_file(&[&create_patch]));
    cas.put("map-1", map_file("chunk-1", serde_json::json!([])));
    cas.put(
        "anchor-1",
        anchor_file(Some("map-1"), serde_json::json!([{"suffixData": suffix_data}]), serde_json::json!([]), serde_json::json!([])),
    );
    let txn1 = AnchorTransaction {
        anchor_string: "1.anchor-1".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 1,
        transaction_number: 1,
    };
    let ops = assemble_operations(&txn1, cas.clone(), compression.clone(), protocol_client.clone(), &cancel)
        .await
        .unwrap();
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 1, transaction_number: 1, operation_index: 0 },
    );
    let after_create = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert_eq!(after_create.document.public_key[0].id, "key-1");

    // The recover's signed_data commits to `committed_patch`, but the chunk
    // file actually carries `substituted_patch`.
    let committed_patch = PatchData {
        patches: vec![Patch::Replace {
            document: ReplaceDocument {
                public_key: vec![sidetree_core::document::PublicKeyEntry {
                    id: "key-2".to_string(),
                    key_type: "JsonWebKey2020".to_string(),
                    public_key_jwk: serde_json::json!({"kty": "EC"}),
                    purposes: vec!["authentication".to_string()],
                }],
                service: vec![],
            },
        }],
        next_update_commitment: commitment_for(b"update-reveal-3"),
    };
    let committed_canonical = encoding::canonical_serialize(&committed_patch).unwrap();
    let committed_patch_hash = encoding::encode(&multihash::compute_multihash(code, &committed_canonical).unwrap());

    let substituted_patch = PatchData {
        patches: vec![Patch::Replace {
            document: ReplaceDocument {
                public_key: vec![sidetree_core::document::PublicKeyEntry {
                    id: "attacker-key".to_string(),
                    key_type: "JsonWebKey2020".to_string(),
                    public_key_jwk: serde_json::json!({"kty": "EC"}),
                    purposes: vec!["authentication".to_string()],
                }],
                service: vec![],
            },
        }],
        next_update_commitment: commitment_for(b"update-reveal-3"),
    };

    let recover_signed = SignedDataRecover {
        recovery_reveal_value: reveal_encoded(b"recovery-reveal-1"),
        new_recovery_key: serde_json::json!({"kty": "EC", "role": "recovery-2"}),
        next_recovery_commitment: commitment_for(b"recovery-reveal-2"),
        next_update_commitment: commitment_for(b"update-reveal-3"),
        patch_data_hash: committed_patch_hash,
        signature: VALID_SIGNATURE.to_string(),
    };

    cas.put("chunk-2", chunk_file(&[&substituted_patch]));
    cas.put("map-2", map_file("chunk-2", serde_json::json!([])));
    cas.put(
        "anchor-2",
        anchor_file(
            Some("map-2"),
            serde_json::json!([]),
            serde_json::json!([{"didSuffix": unique_suffix, "signedData": recover_signed}]),
            serde_json::json!([]),
        ),
    );

    let txn2 = AnchorTransaction {
        anchor_string: "1.anchor-2".to_string(),
        namespace: namespace.to_string(),
        transaction_time: 2,
        transaction_number: 2,
    };
    let ops = assemble_operations(&txn2, cas, compression, protocol_client, &cancel).await.unwrap();
    assert_eq!(ops.len(), 1);
    index.insert(
        ops.into_iter().next().unwrap(),
        TransactionCoordinates { transaction_time: 2, transaction_number: 2, operation_index: 0 },
    );

    let after_recover_attempt = index.resolve(&unique_suffix, &MagicStringVerifier);
    assert_eq!(after_recover_attempt.document.public_key.len(), 1);
    assert_eq!(after_recover_attempt.document.public_key[0].id, "key-1");
}
