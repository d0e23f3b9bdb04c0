//! `verify()`: check every store and checkout without mutating anything,
//! surfacing the integrity failure taxonomy.

use crate::error::{Error, IntegrityKind, Result};
use crate::identity::RepoId;
use crate::integrity;
use crate::metadata;

use super::{id_from_store_path, Coordinator};

/// Verification result for one side (store, read-only checkout, or
/// modifiable checkout) of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStatus {
    /// The side does not exist at all, which is not itself a defect — a
    /// read-only checkout is optional until a `clone` requests it.
    Absent,
    /// Structurally valid.
    Valid,
    /// Invalid, carrying the specific taxonomy member.
    Invalid(IntegrityKind),
}

/// Verification outcome for one cache entry.
#[derive(Debug)]
pub struct VerifyEntry {
    /// The entry's identity.
    pub id: RepoId,
    /// Status of the bare store.
    pub store: VerifyStatus,
    /// Status of the read-only checkout.
    pub read_only: VerifyStatus,
    /// Status of the modifiable checkout.
    pub modifiable: VerifyStatus,
}

impl VerifyEntry {
    /// True if every present side validated cleanly.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !matches!(self.store, VerifyStatus::Invalid(_))
            && !matches!(self.read_only, VerifyStatus::Invalid(_))
            && !matches!(self.modifiable, VerifyStatus::Invalid(_))
    }
}

impl Coordinator {
    /// Verify a single entry identified by `id`, or every enumerated entry
    /// when `id` is `None`.
    pub async fn verify(&self, id: Option<&RepoId>) -> Result<Vec<VerifyEntry>> {
        match id {
            Some(id) => Ok(vec![self.verify_one(id).await?]),
            None => {
                let entries = metadata::enumerate(&self.config.cache_root).await?;
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let id = id_from_store_path(&self.config.cache_root, &entry.store_path)?;
                    out.push(self.verify_one(&id).await?);
                }
                Ok(out)
            }
        }
    }

    async fn verify_one(&self, id: &RepoId) -> Result<VerifyEntry> {
        let store_path = self.store_path(id);
        let checkout_path = self.checkout_path(id);
        let modifiable_path = self.modifiable_path(id);
        let objects_path = self.store_objects_path(id);

        let store = classify(integrity::validate_store(self.vcs.as_ref(), &store_path).await);
        let read_only = classify(integrity::validate_checkout(&checkout_path, &objects_path).await);
        let modifiable = classify(integrity::validate_checkout(&modifiable_path, &objects_path).await);

        Ok(VerifyEntry {
            id: id.clone(),
            store,
            read_only,
            modifiable,
        })
    }
}

fn classify(result: Result<()>) -> VerifyStatus {
    match result {
        Ok(()) => VerifyStatus::Valid,
        Err(Error::Integrity {
            kind: IntegrityKind::NotExists,
            ..
        }) => VerifyStatus::Absent,
        Err(Error::Integrity { kind, .. }) => VerifyStatus::Invalid(kind),
        Err(_) => VerifyStatus::Invalid(IntegrityKind::Corrupted),
    }
}
