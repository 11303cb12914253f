// crates/migrate-preflight-cloud/src/cache.rs
// ============================================================================
// Module: Response Cache
// Description: Per-run cache with single-flight population per key.
// Purpose: Guarantee one upstream call per key under concurrent requesters.
// Dependencies: migrate-preflight-core, std
// ============================================================================

//! ## Overview
//! Values are immutable snapshots for the lifetime of a run, so entries
//! never expire. Population is single-flight: the first requester of a key
//! performs the upstream call while later requesters block on the slot. A
//! failed flight hands its error to the waiters already parked on it and
//! clears the slot, so the next requester starts a fresh flight.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use migrate_preflight_core::Appliance;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::DiscoveredMachine;
use migrate_preflight_core::RegionCode;
use migrate_preflight_core::ResourceGroupName;
use migrate_preflight_core::SkuInfo;
use migrate_preflight_core::SubscriptionId;

// ============================================================================
// SECTION: Keys and Values
// ============================================================================

/// Cache key: operation plus the identifiers that scope it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CacheKey {
    /// `list_locations` for a subscription.
    Locations {
        /// Subscription scope.
        subscription: SubscriptionId,
    },
    /// `list_vm_skus` for a subscription and region.
    VmSkus {
        /// Subscription scope.
        subscription: SubscriptionId,
        /// Region scope.
        region: RegionCode,
    },
    /// `list_appliances` for a migrate project.
    Appliances {
        /// Subscription scope.
        subscription: SubscriptionId,
        /// Resource group scope.
        resource_group: ResourceGroupName,
        /// Project scope.
        project: String,
    },
    /// `list_discovered_machines` for a migrate project.
    DiscoveredMachines {
        /// Subscription scope.
        subscription: SubscriptionId,
        /// Resource group scope.
        resource_group: ResourceGroupName,
        /// Project scope.
        project: String,
    },
}

/// Cached operation result.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// Region set from `list_locations`.
    Locations(BTreeSet<RegionCode>),
    /// SKU list from `list_vm_skus`.
    VmSkus(Vec<SkuInfo>),
    /// Appliance list from `list_appliances`.
    Appliances(Vec<Appliance>),
    /// Machine list from `list_discovered_machines`.
    DiscoveredMachines(Vec<DiscoveredMachine>),
}

// ============================================================================
// SECTION: Single-Flight Slots
// ============================================================================

#[derive(Debug)]
enum SlotState {
    /// First requester is performing the upstream call.
    InFlight,
    /// Upstream call completed.
    Ready(CacheValue),
    /// Upstream call failed; waiters receive this error.
    Failed(CloudError),
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::InFlight),
            ready: Condvar::new(),
        })
    }

    /// Blocks until the flight resolves, then returns its result.
    fn wait(&self) -> Result<CacheValue, CloudError> {
        let mut state = lock(&self.state);
        loop {
            match &*state {
                SlotState::InFlight => {
                    state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
                SlotState::Ready(value) => return Ok(value.clone()),
                SlotState::Failed(err) => return Err(err.clone()),
            }
        }
    }

    /// Publishes the flight result and wakes every waiter.
    fn publish(&self, result: &Result<CacheValue, CloudError>) {
        let mut state = lock(&self.state);
        *state = match result {
            Ok(value) => SlotState::Ready(value.clone()),
            Err(err) => SlotState::Failed(err.clone()),
        };
        drop(state);
        self.ready.notify_all();
    }
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Per-run response cache shared across all workers.
#[derive(Debug, Default)]
pub struct ResponseCache {
    slots: Mutex<BTreeMap<CacheKey, Arc<Slot>>>,
}

impl ResponseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, fetching it at most once across
    /// concurrent requesters.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; concurrent waiters of the same failed
    /// flight receive clones of it.
    pub fn get_or_fetch(
        &self,
        key: CacheKey,
        fetch: impl FnOnce() -> Result<CacheValue, CloudError>,
    ) -> Result<CacheValue, CloudError> {
        let (slot, leader) = {
            let mut slots = lock(&self.slots);
            match slots.get(&key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Slot::new();
                    slots.insert(key.clone(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if !leader {
            return slot.wait();
        }

        let result = fetch();
        slot.publish(&result);
        if result.is_err() {
            // Clear the failed flight so the next requester retries, unless
            // a newer slot already replaced it.
            let mut slots = lock(&self.slots);
            if slots.get(&key).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                slots.remove(&key);
            }
        }
        result
    }

    /// Number of populated or in-flight keys.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Returns true when no key has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.slots).is_empty()
    }
}

/// Locks a mutex, recovering the guard from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
