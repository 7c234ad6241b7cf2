//! The API group registry.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::registry::group::GroupDescriptor;
use crate::registry::notifier::{self, ChangeEvents, ChangeNotifier};
use crate::registry::RegistryError;

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The name was not registered before.
    Inserted,
    /// A group with the same name was overwritten.
    Replaced,
}

/// Process-wide catalog of API groups, keyed by group name.
///
/// Every read and write goes through one mutex, so `list` always returns a
/// state that existed at a single instant. Change events are published
/// after the lock is released.
#[derive(Debug)]
pub struct Registry {
    groups: Mutex<BTreeMap<String, GroupDescriptor>>,
    notifier: ChangeNotifier,
}

impl Registry {
    /// Create an empty registry and the receiving end of its change queue.
    pub fn new(config: &RegistryConfig) -> (Self, ChangeEvents) {
        let (notifier, events) = notifier::channel(config);
        (
            Self {
                groups: Mutex::new(BTreeMap::new()),
                notifier,
            },
            events,
        )
    }

    fn groups(&self) -> MutexGuard<'_, BTreeMap<String, GroupDescriptor>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the group under its name.
    ///
    /// Replacing an existing group is reported as an anomaly but still
    /// succeeds; the new descriptor wins.
    pub async fn register(&self, group: GroupDescriptor) -> Registration {
        let name = group.name().to_string();
        let (outcome, count) = {
            let mut groups = self.groups();
            let outcome = match groups.insert(name.clone(), group) {
                Some(_) => Registration::Replaced,
                None => Registration::Inserted,
            };
            (outcome, groups.len())
        };

        if outcome == Registration::Replaced {
            metrics::record_registry_anomaly("duplicate");
            tracing::error!(group = %name, "API group already registered, replacing it");
        }
        metrics::record_registry_mutation("register", count);
        tracing::info!(group = %name, "Registered API group");

        self.notifier.notify().await;
        outcome
    }

    /// Remove the group with the given name.
    ///
    /// An unknown name is an anomaly: nothing changes and no event is sent.
    pub async fn unregister(&self, name: &str) -> Result<GroupDescriptor, RegistryError> {
        let (removed, count) = {
            let mut groups = self.groups();
            let removed = groups.remove(name);
            (removed, groups.len())
        };

        let Some(removed) = removed else {
            metrics::record_registry_anomaly("not_found");
            tracing::error!(group = %name, "API group not found");
            return Err(RegistryError::GroupNotFound(name.to_string()));
        };

        metrics::record_registry_mutation("unregister", count);
        tracing::info!(group = %name, "Unregistered API group");

        self.notifier.notify().await;
        Ok(removed)
    }

    /// Snapshot of all groups, ascending by name.
    pub fn list(&self) -> Vec<GroupDescriptor> {
        self.groups().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<GroupDescriptor> {
        self.groups().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups().is_empty()
    }

    /// Change events lost to a full queue.
    pub fn dropped_events(&self) -> u64 {
        self.notifier.dropped()
    }
}
