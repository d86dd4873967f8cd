//! The issuer registry.
//!
//! State is an immutable [`RegistrySnapshot`] behind `RwLock<Arc<_>>`.
//! Readers clone the `Arc` and work on a consistent view; a refresh builds
//! the next snapshot off to the side and swaps it in under the write lock.
//! At most one refresh runs at a time ([`IssuerRegistry::begin_refresh`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bat_types::{Amount, Issuer, IssuerSet, Timestamp};

use crate::catalog::validate_issuers;
use crate::IssuerError;

/// A consistent view of the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Issuers in the latest accepted catalog, in discovery order.
    pub active: IssuerSet,
    /// Issuers dropped from the catalog whose tokens may still be outstanding.
    pub retired: IssuerSet,
}

impl RegistrySnapshot {
    pub fn lookup(&self, name: &str) -> Option<&Issuer> {
        self.active.get(name).or_else(|| self.retired.get(name))
    }

    pub fn lookup_by_public_key(&self, public_key: &str) -> Option<&Issuer> {
        self.active
            .get_by_public_key(public_key)
            .or_else(|| self.retired.get_by_public_key(public_key))
    }
}

/// What a successful update changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: usize,
    pub retired: usize,
    pub total: usize,
}

pub struct IssuerRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    refreshing: AtomicBool,
}

impl IssuerRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::default())),
            refreshing: AtomicBool::new(false),
        }
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Claim the single refresh slot.
    ///
    /// The guard may be held across the catalog fetch; it releases the slot
    /// when dropped.
    pub fn begin_refresh(&self) -> Result<RefreshGuard<'_>, IssuerError> {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| IssuerError::RefreshInProgress)?;
        Ok(RefreshGuard { registry: self })
    }

    /// Validate and atomically replace the active issuers.
    pub fn update(&self, issuers: IssuerSet) -> Result<UpdateSummary, IssuerError> {
        self.begin_refresh()?.apply(issuers)
    }

    pub fn lookup(&self, name: &str) -> Option<Issuer> {
        self.snapshot().lookup(name).cloned()
    }

    pub fn lookup_by_public_key(&self, public_key: &str) -> Option<Issuer> {
        self.snapshot().lookup_by_public_key(public_key).cloned()
    }

    pub fn is_expired(&self, issuer: &Issuer, now: Timestamp) -> bool {
        issuer.is_expired(now)
    }

    /// The active issuer for `denomination` at `now`, if any.
    pub fn active_for(&self, denomination: Amount, now: Timestamp) -> Option<Issuer> {
        self.snapshot()
            .active
            .iter()
            .find(|i| i.is_active(now) && i.denomination().ok() == Some(denomination))
            .cloned()
    }

    /// Active, unexpired issuers at `now`, in discovery order.
    pub fn current(&self, now: Timestamp) -> Vec<Issuer> {
        self.snapshot()
            .active
            .iter()
            .filter(|i| i.is_active(now))
            .cloned()
            .collect()
    }

    /// Whether `name` is in the latest catalog and active at `now`.
    pub fn is_current(&self, name: &str, now: Timestamp) -> bool {
        self.snapshot()
            .active
            .get(name)
            .is_some_and(|i| i.is_active(now))
    }

    /// Drop retired issuers for which `has_outstanding` reports no tokens.
    /// Returns how many were dropped.
    pub fn prune_retired(&self, has_outstanding: impl Fn(&Issuer) -> bool) -> usize {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let keep: Vec<Issuer> = guard
            .retired
            .iter()
            .filter(|i| has_outstanding(i))
            .cloned()
            .collect();
        let pruned = guard.retired.len() - keep.len();
        if pruned > 0 {
            let next = RegistrySnapshot {
                active: guard.active.clone(),
                retired: IssuerSet::new(keep),
            };
            *guard = Arc::new(next);
            tracing::info!(pruned, "pruned drained retired issuers");
        }
        pruned
    }

    fn swap(&self, next: RegistrySnapshot) {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }
}

impl Default for IssuerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to replace the registry contents.
pub struct RefreshGuard<'a> {
    registry: &'a IssuerRegistry,
}

impl RefreshGuard<'_> {
    /// Validate `issuers` and swap them in. On error nothing changes.
    pub fn apply(self, issuers: IssuerSet) -> Result<UpdateSummary, IssuerError> {
        let list = issuers.into_vec();
        if let Err(e) = validate_issuers(&list) {
            tracing::warn!(error = %e, "rejected issuer catalog, keeping previous issuers");
            return Err(e);
        }

        let previous = self.registry.snapshot();
        let incoming = IssuerSet::new(list);

        let added = incoming
            .iter()
            .filter(|i| previous.active.get(&i.name) != Some(*i))
            .count();

        // Dropped (or re-keyed) issuers join the retired set; a name that
        // reappears unchanged in the catalog is no longer retired.
        let mut retired: Vec<Issuer> = previous
            .retired
            .iter()
            .filter(|i| incoming.get(&i.name) != Some(*i))
            .cloned()
            .collect();
        let mut newly_retired = 0;
        for old in previous.active.iter() {
            if incoming.get(&old.name) == Some(old) {
                continue;
            }
            if !retired.iter().any(|r| r == old) {
                retired.push(old.clone());
                newly_retired += 1;
            }
        }

        let summary = UpdateSummary {
            added,
            retired: newly_retired,
            total: incoming.len(),
        };
        self.registry.swap(RegistrySnapshot {
            active: incoming,
            retired: IssuerSet::new(retired),
        });
        tracing::info!(
            added = summary.added,
            retired = summary.retired,
            total = summary.total,
            "issuer catalog updated"
        );
        Ok(summary)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.registry.refreshing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_crypto::IssuerSecretKey;
    use rand::rngs::OsRng;

    fn issuer(name: &str, from: u64, until: u64) -> Issuer {
        let key = IssuerSecretKey::generate(&mut OsRng).unwrap().public_key();
        Issuer::new(name, key.to_base64(), Timestamp::new(from), Timestamp::new(until))
    }

    fn set(issuers: &[Issuer]) -> IssuerSet {
        issuers.iter().cloned().collect()
    }

    #[test]
    fn update_then_lookup() {
        let registry = IssuerRegistry::new();
        let a = issuer("BAT0.05", 0, 100);
        registry.update(set(&[a.clone()])).unwrap();
        assert_eq!(registry.lookup("BAT0.05"), Some(a.clone()));
        assert_eq!(registry.lookup_by_public_key(&a.public_key), Some(a));
        assert!(registry.lookup("BAT1").is_none());
    }

    #[test]
    fn malformed_update_keeps_previous_state() {
        let registry = IssuerRegistry::new();
        let a = issuer("BAT0.05", 0, 100);
        registry.update(set(&[a.clone()])).unwrap();
        let before = registry.snapshot();

        let mut bad = issuer("BAT0.1", 0, 100);
        bad.public_key.clear();
        let err = registry.update(set(&[issuer("BAT1", 0, 100), bad])).unwrap_err();
        assert!(matches!(err, IssuerError::InvalidCatalog(_)));
        assert_eq!(*registry.snapshot(), *before);
        assert!(registry.lookup("BAT1").is_none());
    }

    #[test]
    fn dropped_issuers_retire_until_pruned() {
        let registry = IssuerRegistry::new();
        let old = issuer("BAT0.05", 0, 100);
        let new = issuer("BAT0.050", 100, 200);
        registry.update(set(&[old.clone()])).unwrap();
        let summary = registry.update(set(&[new.clone()])).unwrap();
        assert_eq!(summary.retired, 1);

        assert_eq!(registry.lookup("BAT0.05"), Some(old.clone()));
        assert!(!registry.is_current("BAT0.05", Timestamp::new(50)));

        assert_eq!(registry.prune_retired(|_| true), 0);
        assert!(registry.lookup("BAT0.05").is_some());
        assert_eq!(registry.prune_retired(|_| false), 1);
        assert!(registry.lookup("BAT0.05").is_none());
    }

    #[test]
    fn active_for_and_current_respect_time() {
        let registry = IssuerRegistry::new();
        let first = issuer("BAT0.05", 0, 100);
        let second = issuer("BAT0.050", 100, 200);
        registry.update(set(&[first.clone(), second.clone()])).unwrap();

        let value = Amount::from_decimal_str("0.05").unwrap();
        assert_eq!(registry.active_for(value, Timestamp::new(10)), Some(first.clone()));
        assert_eq!(registry.active_for(value, Timestamp::new(150)), Some(second));
        assert!(registry.active_for(value, Timestamp::new(250)).is_none());

        assert_eq!(registry.current(Timestamp::new(10)), vec![first.clone()]);
        assert!(registry.is_expired(&first, Timestamp::new(100)));
    }

    #[test]
    fn only_one_refresh_at_a_time() {
        let registry = IssuerRegistry::new();
        let guard = registry.begin_refresh().unwrap();
        assert_eq!(
            registry.update(IssuerSet::default()).unwrap_err(),
            IssuerError::RefreshInProgress
        );
        drop(guard);
        assert!(registry.update(IssuerSet::default()).is_ok());
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_swap() {
        let registry = IssuerRegistry::new();
        registry.update(set(&[issuer("BAT0.05", 0, 100)])).unwrap();
        let held = registry.snapshot();
        registry.update(set(&[issuer("BAT1", 0, 100)])).unwrap();
        assert!(held.active.contains("BAT0.05"));
        assert!(!held.active.contains("BAT1"));
        assert!(registry.snapshot().active.contains("BAT1"));
    }
}
