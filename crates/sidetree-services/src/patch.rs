//! Patch validation and application.
//!
//! `validate` enforces the tag-specific schema for a single patch.
//! `apply` is the pure fold used by both create (`base = Document::empty()`)
//! and update/recover (`base = prior document`): replay is naturally a fold
//! over a pure state transition.

use std::collections::HashSet;

use sidetree_core::document::Document;
use sidetree_core::operation::Patch;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch list must be non-empty")]
    Empty,
    #[error("duplicate public key id {0:?}")]
    DuplicateKeyId(String),
    #[error("duplicate service endpoint id {0:?}")]
    DuplicateServiceId(String),
}

/// Validate a full `patches` list: non-empty, and each patch internally
/// consistent (no duplicate ids within the patch).
pub fn validate_patches(patches: &[Patch]) -> Result<(), PatchError> {
    if patches.is_empty() {
        return Err(PatchError::Empty);
    }
    for patch in patches {
        validate_patch(patch)?;
    }
    Ok(())
}

fn validate_patch(patch: &Patch) -> Result<(), PatchError> {
    match patch {
        Patch::Replace { document } => {
            assert_unique_key_ids(&document.public_key)?;
            assert_unique_service_ids(&document.service)?;
        }
        Patch::AddPublicKeys { public_keys } => assert_unique_key_ids(public_keys)?,
        Patch::AddServices { service_endpoints } => assert_unique_service_ids(service_endpoints)?,
        Patch::RemovePublicKeys { .. } | Patch::RemoveServices { .. } => {}
    }
    Ok(())
}

fn assert_unique_key_ids(keys: &[sidetree_core::document::PublicKeyEntry]) -> Result<(), PatchError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(&key.id) {
            return Err(PatchError::DuplicateKeyId(key.id.clone()));
        }
    }
    Ok(())
}

fn assert_unique_service_ids(
    services: &[sidetree_core::document::ServiceEndpointEntry],
) -> Result<(), PatchError> {
    let mut seen = HashSet::new();
    for service in services {
        if !seen.insert(&service.id) {
            return Err(PatchError::DuplicateServiceId(service.id.clone()));
        }
    }
    Ok(())
}

/// Fold a sequence of patches over `base`, producing the resulting document.
/// Assumes `validate_patches` already passed — this function does not
/// re-validate, it only applies.
pub fn apply(patches: &[Patch], base: Document) -> Document {
    patches.iter().fold(base, apply_one)
}

fn apply_one(mut document: Document, patch: &Patch) -> Document {
    match patch {
        Patch::Replace { document: replace } => Document {
            public_key: replace.public_key.clone(),
            service: replace.service.clone(),
        },
        Patch::AddPublicKeys { public_keys } => {
            for key in public_keys {
                document.public_key.retain(|existing| existing.id != key.id);
                document.public_key.push(key.clone());
            }
            document
        }
        Patch::RemovePublicKeys { ids } => {
            document.public_key.retain(|key| !ids.contains(&key.id));
            document
        }
        Patch::AddServices { service_endpoints } => {
            for service in service_endpoints {
                document.service.retain(|existing| existing.id != service.id);
                document.service.push(service.clone());
            }
            document
        }
        Patch::RemoveServices { ids } => {
            document.service.retain(|service| !ids.contains(&service.id));
            document
        }
    }
}
