use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Typed handle for a blackboard entry.
///
/// The key is still a plain (case-sensitive) string; the type parameter only
/// fixes the value type at the call site.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

struct Entry {
    value: Box<dyn Any>,
    revision: u64,
}

/// Key-value store shared by every node of one tree instance.
///
/// Reads never fail: a missing key (or a value stored under a different type)
/// yields the caller's default. Writes overwrite unconditionally and bump the
/// entry's revision so watchers can detect changes by polling.
#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<String, Entry>,
    revision: u64,
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("revision", &self.revision)
            .finish()
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn set_value<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.revision = self.revision.wrapping_add(1);
        self.values.insert(
            key.into(),
            Entry {
                value: Box::new(value),
                revision: self.revision,
            },
        );
    }

    pub fn get_value<T: Clone + 'static>(&self, key: &str, default: T) -> T {
        self.value::<T>(key).cloned().unwrap_or(default)
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if an entry was removed.
    pub fn remove_value(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn value<T: 'static>(&self, key: &str) -> Option<&T> {
        let entry = self.values.get(key)?;
        let value = entry.value.downcast_ref::<T>();
        if value.is_none() {
            warn_mismatch::<T>(key);
        }
        value
    }

    pub fn value_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        let entry = self.values.get_mut(key)?;
        let value = entry.value.downcast_mut::<T>();
        if value.is_none() {
            warn_mismatch::<T>(key);
        }
        value
    }

    /// Remove and return a value. A value of another type is left in place.
    pub fn take_value<T: 'static>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.value.is::<T>() {
            warn_mismatch::<T>(key);
            return None;
        }
        let entry = self.values.remove(key)?;
        entry.value.downcast::<T>().ok().map(|b| *b)
    }

    /// Revision of the last write to `key`, or `None` when the key is absent.
    ///
    /// Revisions are unique across the whole blackboard, so a remove followed
    /// by a re-insert is observable as a change.
    pub fn revision(&self, key: &str) -> Option<u64> {
        self.values.get(key).map(|e| e.revision)
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.has_value(key.name)
    }

    pub fn set<T: 'static>(&mut self, key: BbKey<T>, value: T) {
        self.set_value(key.name, value);
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        self.value(key.name)
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        self.value_mut(key.name)
    }

    pub fn get_or<T: Clone + 'static>(&self, key: BbKey<T>, default: T) -> T {
        self.get_value(key.name, default)
    }

    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        self.take_value(key.name)
    }
}

fn warn_mismatch<T>(key: &str) {
    tracing::warn!(
        key,
        requested = type_name::<T>(),
        "blackboard type mismatch (stored type differs from requested)"
    );
}
