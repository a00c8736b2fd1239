//! Identifier newtypes and the identifier allocator.
//!
//! SimConnect refers to client events, data definitions, data requests and
//! notification groups by caller-chosen `DWORD`s.  Each kind gets its own
//! newtype so they cannot be mixed up at call sites, and its own [`IdPool`]
//! which hands out dense values together with a unique name.
//!
//! # Thread safety
//!
//! [`IdPool::allocate`] reads the pool size and appends in two steps and is
//! not safe to call from several threads.  Wrap shared pools in
//! [`SharedIdPool`], which serialises allocation behind a
//! `parking_lot::Mutex`.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

macro_rules! declare_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

declare_id!(
    /// Client event ID, mapped onto a simulator event name.
    EventId
);

declare_id!(
    /// Data definition ID (one block layout agreed with the simulator).
    DefinitionId
);

declare_id!(
    /// Data request ID, echoed back in object-data and facility records.
    RequestId
);

declare_id!(
    /// Notification group ID.
    GroupId
);

/// First value handed out by every pool.
pub const POOL_BASE: u32 = 1;

/// Name of the reserved event that fires when the simulation starts.
pub const SIM_START_EVENT_NAME: &str = "EVENT_SIM_START";

/// Append-only pool of uniquely named, dense identifiers.
///
/// Values are `base + index`, so they are strictly increasing in allocation
/// order.  Entries are never removed.
#[derive(Debug, Clone)]
pub struct IdPool<T> {
    prefix: &'static str,
    base: u32,
    names: Vec<String>,
    _kind: std::marker::PhantomData<T>,
}

impl<T> IdPool<T>
where
    T: Copy + From<u32> + Into<u32>,
{
    pub fn new(prefix: &'static str) -> Self {
        Self::with_base(prefix, POOL_BASE)
    }

    pub fn with_base(prefix: &'static str, base: u32) -> Self {
        Self {
            prefix,
            base,
            names: Vec::new(),
            _kind: std::marker::PhantomData,
        }
    }

    /// Pool for client events, seeded with [`SIM_START_EVENT_NAME`].
    pub fn events() -> Self {
        let mut pool = Self::new("Event");
        pool.names.push(SIM_START_EVENT_NAME.to_owned());
        pool
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a synthesised `prefix + N` name and return its value.
    ///
    /// `N` is the current pool size.  If a caller already appended that
    /// exact name through [`IdPool::allocate_named`], `N` is bumped until the
    /// name is free.
    pub fn allocate(&mut self) -> T {
        let mut n = self.names.len();
        let mut name = format!("{}{n}", self.prefix);
        while self.contains(&name) {
            n += 1;
            name = format!("{}{n}", self.prefix);
        }
        self.push(name)
    }

    /// Return the value for `name`, appending it first if unknown.
    ///
    /// The flag is `true` when the name was newly appended.
    pub fn allocate_named(&mut self, name: &str) -> (T, bool) {
        match self.find(name) {
            Some(existing) => (existing, false),
            None => (self.push(name.to_owned()), true),
        }
    }

    pub fn find(&self, name: &str) -> Option<T> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| self.value_at(index))
    }

    pub fn name_of(&self, id: T) -> Option<&str> {
        let raw: u32 = id.into();
        let index = raw.checked_sub(self.base)? as usize;
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// All entries in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (T, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (self.value_at(i), n.as_str()))
    }

    fn push(&mut self, name: String) -> T {
        self.names.push(name);
        self.value_at(self.names.len() - 1)
    }

    fn value_at(&self, index: usize) -> T {
        T::from(self.base + index as u32)
    }
}

/// [`IdPool`] behind a mutex, for pools shared between threads.
#[derive(Debug)]
pub struct SharedIdPool<T> {
    inner: Mutex<IdPool<T>>,
}

impl<T> SharedIdPool<T>
where
    T: Copy + From<u32> + Into<u32>,
{
    pub fn new(pool: IdPool<T>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    pub fn allocate(&self) -> T {
        self.inner.lock().allocate()
    }

    pub fn allocate_named(&self, name: &str) -> (T, bool) {
        self.inner.lock().allocate_named(name)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of the pool as it is right now.
    pub fn snapshot(&self) -> IdPool<T> {
        self.inner.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_empty_event_pool_names() {
        let mut pool: IdPool<EventId> = IdPool::new("Event");
        let ids: Vec<EventId> = (0..3).map(|_| pool.allocate()).collect();
        let names: Vec<&str> = ids.iter().map(|&id| pool.name_of(id).unwrap()).collect();
        assert_eq!(names, ["Event0", "Event1", "Event2"]);
    }

    #[test]
    fn test_allocations_strictly_increasing_and_unique() {
        let mut pool: IdPool<RequestId> = IdPool::new("Request");
        let ids: Vec<u32> = (0..50).map(|_| pool.allocate().0).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], POOL_BASE);

        let names: HashSet<&str> = pool.iter().map(|(_, n)| n).collect();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn test_allocate_skips_taken_name() {
        let mut pool: IdPool<DefinitionId> = IdPool::new("Definition");
        let (custom, fresh) = pool.allocate_named("Definition1");
        assert!(fresh);
        let next = pool.allocate();
        assert_ne!(pool.name_of(next), pool.name_of(custom));
        assert_eq!(pool.name_of(next), Some("Definition2"));
    }

    #[test]
    fn test_allocate_named_returns_existing() {
        let mut pool: IdPool<EventId> = IdPool::events();
        let (brakes, fresh) = pool.allocate_named("BRAKES");
        assert!(fresh);
        let (again, fresh_again) = pool.allocate_named("BRAKES");
        assert!(!fresh_again);
        assert_eq!(brakes, again);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_event_pool_seeded_with_sim_start() {
        let pool: IdPool<EventId> = IdPool::events();
        assert_eq!(pool.find(SIM_START_EVENT_NAME), Some(EventId(POOL_BASE)));
    }

    #[test]
    fn test_name_of_out_of_range() {
        let mut pool: IdPool<GroupId> = IdPool::new("Group");
        pool.allocate();
        assert_eq!(pool.name_of(GroupId(0)), None);
        assert_eq!(pool.name_of(GroupId(99)), None);
    }

    #[test]
    fn test_shared_pool_concurrent_allocation_unique() {
        let pool = Arc::new(SharedIdPool::new(IdPool::<RequestId>::new("Request")));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || (0..25).map(|_| pool.allocate().0).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(all.len(), 100);
        assert_eq!(pool.len(), 100);
    }
}
