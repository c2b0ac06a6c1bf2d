use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use certia_core::{AuthorizationError, BlobLocation, BlobMetadata, Principal, Role};
use certia_storage::{BlobAddressResolver, StorageBackendError, StorageResult};

/// Roles permitted to modify any stored document.
pub const UNCONDITIONAL_MUTATION_ROLES: [Role; 2] = [Role::Admin, Role::CaseOfficer];

/// Roles permitted to modify only documents they uploaded themselves.
pub const OWNER_MUTATION_ROLES: [Role; 1] = [Role::Applicant];

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),

    #[error(transparent)]
    Storage(#[from] StorageBackendError),
}

/// Authorisation gate every document mutation passes through.
///
/// The document's metadata is fetched exactly once, at entry, and handed to
/// the permitted action so the mutation never reads it a second time. The
/// ownership predicate runs only for roles outside the unconditional list.
pub struct OwnershipGuard;

impl OwnershipGuard {
    pub async fn authorize<M, MFut, O, A, AFut, T>(
        principal: &Principal,
        unconditional_roles: &[Role],
        owner_roles: &[Role],
        fetch_metadata: M,
        ownership: O,
        action: A,
    ) -> Result<T, MutationError>
    where
        M: FnOnce() -> MFut,
        MFut: Future<Output = StorageResult<BlobMetadata>>,
        O: FnOnce(&BlobMetadata, &Principal) -> bool,
        A: FnOnce(BlobMetadata) -> AFut,
        AFut: Future<Output = StorageResult<T>>,
    {
        let metadata = fetch_metadata().await.map_err(StorageBackendError::from)?;

        let permitted = unconditional_roles.contains(&principal.role)
            || (owner_roles.contains(&principal.role) && ownership(&metadata, principal));
        if !permitted {
            warn!(principal = %principal, "document mutation denied");
            return Err(MutationError::Forbidden(AuthorizationError::new(
                principal.id.clone(),
                principal.role,
            )));
        }

        action(metadata)
            .await
            .map_err(|e| MutationError::Storage(e.into()))
    }
}

/// Ownership-gated document mutations: delete and metadata update. Admins
/// and case officers act on any document; applicants only on their own
/// uploads.
#[derive(Clone)]
pub struct MutationService {
    resolver: BlobAddressResolver,
}

impl MutationService {
    pub fn new(resolver: BlobAddressResolver) -> Self {
        MutationService { resolver }
    }

    pub async fn delete_document(
        &self,
        principal: &Principal,
        location: &BlobLocation,
    ) -> Result<(), MutationError> {
        let store = self
            .resolver
            .store_for(location)
            .await
            .map_err(|e| MutationError::Storage(e.into()))?;
        let blob_path = location.blob_path();
        let fetch_store = store.clone();
        let fetch_path = blob_path.clone();

        OwnershipGuard::authorize(
            principal,
            &UNCONDITIONAL_MUTATION_ROLES,
            &OWNER_MUTATION_ROLES,
            move || async move { fetch_store.metadata(&fetch_path).await },
            BlobMetadata::is_owned_by,
            move |_current: BlobMetadata| async move { store.delete(&blob_path).await },
        )
        .await?;

        info!(location = %location, principal = %principal, "document deleted");
        Ok(())
    }

    /// Fold `updates` into the document's stored metadata. System keys
    /// written at upload, such as the applicant marker, are preserved.
    pub async fn update_document_metadata(
        &self,
        principal: &Principal,
        location: &BlobLocation,
        updates: BlobMetadata,
    ) -> Result<(), MutationError> {
        let store = self
            .resolver
            .store_for(location)
            .await
            .map_err(|e| MutationError::Storage(e.into()))?;
        let blob_path = location.blob_path();
        let fetch_store = store.clone();
        let fetch_path = blob_path.clone();

        OwnershipGuard::authorize(
            principal,
            &UNCONDITIONAL_MUTATION_ROLES,
            &OWNER_MUTATION_ROLES,
            move || async move { fetch_store.metadata(&fetch_path).await },
            BlobMetadata::is_owned_by,
            move |current: BlobMetadata| async move {
                let mut merged = current;
                merged.merge_updates(updates);
                store.set_metadata(&blob_path, &merged).await
            },
        )
        .await?;

        info!(location = %location, principal = %principal, "document metadata updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use certia_storage::StorageError;

    fn owned_by(id: &str) -> BlobMetadata {
        let mut metadata = BlobMetadata::new();
        metadata.insert("applicant", id);
        metadata
    }

    async fn decide(
        principal: &Principal,
        metadata: BlobMetadata,
        fetches: &AtomicUsize,
        actions: &AtomicUsize,
    ) -> Result<(), MutationError> {
        OwnershipGuard::authorize(
            principal,
            &UNCONDITIONAL_MUTATION_ROLES,
            &OWNER_MUTATION_ROLES,
            || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(metadata)
            },
            BlobMetadata::is_owned_by,
            |_current| async {
                actions.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_metadata_is_fetched_exactly_once_per_decision() {
        let cases = [
            (Principal::new("root", Role::Admin), "someone-else", true),
            (Principal::new("alice", Role::Applicant), "alice", true),
            (Principal::new("alice", Role::Applicant), "bob", false),
        ];

        for (principal, owner, expect_ok) in cases {
            let fetches = AtomicUsize::new(0);
            let actions = AtomicUsize::new(0);
            let result = decide(&principal, owned_by(owner), &fetches, &actions).await;

            assert_eq!(result.is_ok(), expect_ok, "principal {}", principal);
            assert_eq!(fetches.load(Ordering::SeqCst), 1, "principal {}", principal);
            assert_eq!(
                actions.load(Ordering::SeqCst),
                usize::from(expect_ok),
                "principal {}",
                principal
            );
        }
    }

    #[tokio::test]
    async fn test_unconditional_roles_bypass_the_ownership_predicate() {
        let predicate_ran = AtomicBool::new(false);
        let principal = Principal::new("officer-9", Role::CaseOfficer);

        let result = OwnershipGuard::authorize(
            &principal,
            &UNCONDITIONAL_MUTATION_ROLES,
            &OWNER_MUTATION_ROLES,
            || async { Ok(owned_by("someone-else")) },
            |_: &BlobMetadata, _: &Principal| {
                predicate_ran.store(true, Ordering::SeqCst);
                false
            },
            |_current| async { Ok(()) },
        )
        .await;

        assert!(result.is_ok());
        assert!(!predicate_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_owner_roles_require_a_matching_applicant() {
        let principal = Principal::new("alice", Role::Applicant);
        let fetches = AtomicUsize::new(0);
        let actions = AtomicUsize::new(0);

        let denied = decide(&principal, owned_by("bob"), &fetches, &actions).await;
        match denied {
            Err(MutationError::Forbidden(err)) => {
                assert_eq!(
                    err.to_string(),
                    "alice (applicant) is not permitted to modify this document"
                );
            }
            other => panic!("expected denial, got {:?}", other),
        }
        assert_eq!(actions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_roles_outside_both_lists_are_denied() {
        let principal = Principal::new("officer-9", Role::CaseOfficer);
        let actions = AtomicUsize::new(0);

        let result = OwnershipGuard::authorize(
            &principal,
            &[Role::Admin],
            &[Role::Applicant],
            || async { Ok(owned_by("officer-9")) },
            BlobMetadata::is_owned_by,
            |_current| async {
                actions.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(MutationError::Forbidden(_))));
        assert_eq!(actions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_surface_with_their_status() {
        let principal = Principal::new("root", Role::Admin);

        let result: Result<(), MutationError> = OwnershipGuard::authorize(
            &principal,
            &UNCONDITIONAL_MUTATION_ROLES,
            &OWNER_MUTATION_ROLES,
            || async { Err(StorageError::NotFound("missing.pdf".to_string())) },
            BlobMetadata::is_owned_by,
            |_current| async { Ok(()) },
        )
        .await;

        match result {
            Err(MutationError::Storage(err)) => assert_eq!(err.status, 404),
            other => panic!("expected storage error, got {:?}", other),
        }
    }
}
