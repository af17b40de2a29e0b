//! Passcode-length tiers and purchase entitlements.
//!
//! Every entry starts at the free three-digit tier. Longer passcodes are
//! bought per length from an external purchase collaborator; each purchase
//! authorizes exactly one upgrade of one entry. The collaborator reports how
//! many purchases exist and the store remembers how many were applied, so
//! an entitlement is available while `granted > used`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{Result, VaultError};
use crate::identity::Identity;
use crate::passcode::validate_length;
use crate::storage::{StoreTransaction, VaultEntry};

/// External source of purchase entitlements.
pub trait EntitlementSource: Send + Sync {
    /// Number of purchases of `length` held by `owner`.
    fn granted(&self, owner: &Identity, length: u8) -> Result<u32>;
}

/// Whether `owner` has an unapplied purchase of `length`, given the number
/// of purchases the collaborator reported before `tx` began.
///
/// Grants are read outside the transaction because a source may share the
/// store's connection.
pub fn has_entitlement(
    granted: u32,
    tx: &mut dyn StoreTransaction,
    owner: &Identity,
    length: u8,
) -> Result<bool> {
    let used = tx.entitlement_uses(owner, length)?;
    Ok(granted > used)
}

/// Check the non-entitlement preconditions of an upgrade.
pub fn check_upgrade(entry: &VaultEntry, owner: &Identity, target_length: u8) -> Result<()> {
    if !entry.is_owned_by(owner) {
        return Err(VaultError::NotOwner(entry.id));
    }
    validate_length(target_length)?;
    if target_length <= entry.passcode_length {
        return Err(VaultError::LengthNotIncreasing {
            current: entry.passcode_length,
            requested: target_length,
        });
    }
    Ok(())
}

/// Apply an upgrade: raise the length and clear the passcode.
///
/// The entry is not challengeable until the owner sets a passcode of the
/// new length.
pub fn apply_upgrade(entry: &mut VaultEntry, target_length: u8, now: DateTime<Utc>) {
    entry.passcode_length = target_length;
    entry.passcode = None;
    entry.updated_at = now;
}

/// In-memory entitlement source.
#[derive(Debug, Default)]
pub struct StaticEntitlements {
    grants: Mutex<HashMap<(Identity, u8), u32>>,
}

impl StaticEntitlements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one purchase of `length` for `owner`.
    pub fn grant(&self, owner: &Identity, length: u8) -> Result<()> {
        validate_length(length)?;
        let mut grants = self
            .grants
            .lock()
            .map_err(|_| VaultError::Storage("Entitlement state poisoned".to_string()))?;
        *grants.entry((owner.clone(), length)).or_insert(0) += 1;
        Ok(())
    }
}

impl EntitlementSource for StaticEntitlements {
    fn granted(&self, owner: &Identity, length: u8) -> Result<u32> {
        let grants = self
            .grants
            .lock()
            .map_err(|_| VaultError::Storage("Entitlement state poisoned".to_string()))?;
        Ok(grants.get(&(owner.clone(), length)).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::passcode::Passcode;

    fn entry(owner: &Identity) -> VaultEntry {
        let now = Utc::now();
        VaultEntry {
            id: Uuid::new_v4(),
            keyword: "k".to_string(),
            passcode_length: 4,
            passcode: Some(Passcode::parse("1234").unwrap()),
            owner: owner.clone(),
            grace_deadline: None,
            body: String::new(),
            media_urls: Vec::new(),
            view_count: 0,
            stolen_count: 0,
            failed_count: 0,
            notify_threshold: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_upgrade_rules() {
        let owner = Identity::device("owner");
        let entry = entry(&owner);

        assert!(check_upgrade(&entry, &owner, 6).is_ok());
        assert!(matches!(
            check_upgrade(&entry, &Identity::device("other"), 6),
            Err(VaultError::NotOwner(_))
        ));
        assert!(matches!(
            check_upgrade(&entry, &owner, 4),
            Err(VaultError::LengthNotIncreasing {
                current: 4,
                requested: 4
            })
        ));
        assert!(matches!(
            check_upgrade(&entry, &owner, 3),
            Err(VaultError::LengthNotIncreasing { .. })
        ));
        assert!(check_upgrade(&entry, &owner, 11).is_err());
    }

    #[test]
    fn test_apply_upgrade_clears_passcode() {
        let owner = Identity::device("owner");
        let mut entry = entry(&owner);
        apply_upgrade(&mut entry, 7, Utc::now());
        assert_eq!(entry.passcode_length, 7);
        assert!(entry.passcode.is_none());
    }

    #[test]
    fn test_static_entitlements_count_grants() {
        let source = StaticEntitlements::new();
        let owner = Identity::account("a");
        assert_eq!(source.granted(&owner, 5).unwrap(), 0);
        source.grant(&owner, 5).unwrap();
        source.grant(&owner, 5).unwrap();
        assert_eq!(source.granted(&owner, 5).unwrap(), 2);
        assert_eq!(source.granted(&owner, 6).unwrap(), 0);
        assert!(source.grant(&owner, 2).is_err());
    }
}
