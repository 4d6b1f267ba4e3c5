//! Resolving a DID via its inline `initial-values` create request, without
//! ever touching the operation index.

use sidetree_core::encoding;
use sidetree_core::operation::SuffixData;
use sidetree_core::protocol::Protocol;
use sidetree_services::ProcessorError;

use crate::support::create_materials;

fn build_create_request(suffix_data: &SuffixData, patch_data: &sidetree_core::operation::PatchData) -> Vec<u8> {
    let request = serde_json::json!({
        "type": "create",
        "suffix_data": encoding::encode(&serde_json::to_vec(suffix_data).unwrap()),
        "delta": encoding::encode(&serde_json::to_vec(patch_data).unwrap()),
    });
    serde_json::to_vec(&request).unwrap()
}

#[test]
fn valid_initial_values_resolve_unpublished_with_the_created_document() {
    let protocol = Protocol::default();
    let (suffix_data, patch_data) = create_materials("key-1", b"recovery-reveal", b"update-reveal");
    let unique_suffix = sidetree_core::operation::derive_unique_suffix(protocol.hash_algorithm_code, &suffix_data).unwrap();

    let request_bytes = build_create_request(&suffix_data, &patch_data);
    let initial_values = encoding::encode(&request_bytes);
    let did = format!("doc:ns:{unique_suffix}");

    let result = sidetree_services::resolve_unpublished(&did, &initial_values, &protocol).unwrap();
    assert!(!result.method_metadata.published);
    assert_eq!(result.document.id, unique_suffix);
    assert_eq!(result.document.public_key.len(), 1);
    assert_eq!(result.document.public_key[0].id, "key-1");
}

#[test]
fn did_suffix_not_matching_the_derived_suffix_is_rejected() {
    let protocol = Protocol::default();
    let (suffix_data, patch_data) = create_materials("key-1", b"recovery-reveal", b"update-reveal");
    let request_bytes = build_create_request(&suffix_data, &patch_data);
    let initial_values = encoding::encode(&request_bytes);

    let did = "doc:ns:not-the-real-suffix";
    let err = sidetree_services::resolve_unpublished(did, &initial_values, &protocol).unwrap_err();
    assert!(matches!(err, ProcessorError::DidMismatch));
}

#[test]
fn malformed_initial_values_encoding_is_rejected() {
    let protocol = Protocol::default();
    let did = "doc:ns:abc";
    let err = sidetree_services::resolve_unpublished(did, "not valid multibase!!", &protocol).unwrap_err();
    assert!(matches!(err, ProcessorError::Parse(_)));
}

#[test]
fn tampered_patch_data_hash_fails_at_parse_time() {
    let protocol = Protocol::default();
    let (suffix_data, patch_data) = create_materials("key-1", b"recovery-reveal", b"update-reveal");
    let unique_suffix = sidetree_core::operation::derive_unique_suffix(protocol.hash_algorithm_code, &suffix_data).unwrap();

    let mut tampered = suffix_data.clone();
    tampered.patch_data_hash = "tampered-hash".to_string();
    let request_bytes = build_create_request(&tampered, &patch_data);
    let initial_values = encoding::encode(&request_bytes);
    let did = format!("doc:ns:{unique_suffix}");

    let err = sidetree_services::resolve_unpublished(&did, &initial_values, &protocol).unwrap_err();
    assert!(matches!(err, ProcessorError::Parse(_)));
}

#[test]
fn did_without_a_namespace_delimiter_is_rejected() {
    let protocol = Protocol::default();
    let err = sidetree_services::resolve_unpublished("no-colon-here", "whatever", &protocol).unwrap_err();
    assert!(matches!(err, ProcessorError::MalformedDid(_)));
}
