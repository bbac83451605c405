use std::collections::BTreeSet;
use std::sync::Arc;

/// Module name meaning "no route is active yet". Never tracked.
pub const NO_ROUTE: &str = "__no_route__";

/// Names of modules activated at least once this session.
///
/// Cheap to clone. [`MountedSet::same_as`] tells callers whether an
/// activation produced a new set or handed back the unchanged one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountedSet(Arc<BTreeSet<String>>);

impl MountedSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Same underlying set, not merely equal contents.
    pub fn same_as(&self, other: &MountedSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Grows the mounted set monotonically.
#[derive(Debug, Default)]
pub struct MountTracker {
    mounted: MountedSet,
}

impl MountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as activated and return the current set.
    ///
    /// Re-activating a mounted module, or activating [`NO_ROUTE`], returns
    /// the existing set untouched.
    pub fn activate(&mut self, name: &str) -> MountedSet {
        if name == NO_ROUTE || self.mounted.contains(name) {
            return self.mounted.clone();
        }

        let mut next = (*self.mounted.0).clone();
        next.insert(name.to_string());
        self.mounted = MountedSet(Arc::new(next));
        tracing::debug!(module = %name, mounted = self.mounted.len(), "Module activated for the first time");
        self.mounted.clone()
    }

    pub fn mounted(&self) -> MountedSet {
        self.mounted.clone()
    }

    pub fn is_mounted(&self, name: &str) -> bool {
        self.mounted.contains(name)
    }
}
