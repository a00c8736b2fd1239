//! Facility list listeners and fan-out.
//!
//! A [`FacilityListener`] watches one request ID.  When an airport, waypoint,
//! NDB or VOR list record carrying that ID is dispatched, the listener's
//! shared parent sink is dumped first, then its own sink.  Several listeners
//! usually share one parent (e.g. a facilities object owning per-kind
//! lists), which is why sinks are held behind `Arc<parking_lot::Mutex<_>>`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::ids::RequestId;
use crate::recv::{Facility, FacilityList};

/// Receiver of raw facility list records.
pub trait FacilityDump {
    fn dump(&mut self, list: &FacilityList<'_>);
}

impl<F> FacilityDump for F
where
    F: FnMut(&FacilityList<'_>),
{
    fn dump(&mut self, list: &FacilityList<'_>) {
        self(list)
    }
}

/// Sink shared between the dispatcher and its owner.
pub type SharedDump = Arc<Mutex<dyn FacilityDump + Send>>;

/// Wrap a sink so it can be registered and still read by the caller.
pub fn shared<D: FacilityDump + Send + 'static>(dump: D) -> Arc<Mutex<D>> {
    Arc::new(Mutex::new(dump))
}

pub struct FacilityListener {
    pub request_id: RequestId,
    parent: SharedDump,
    sink: SharedDump,
}

impl FacilityListener {
    pub fn new(request_id: RequestId, parent: SharedDump, sink: SharedDump) -> Self {
        Self {
            request_id,
            parent,
            sink,
        }
    }

    fn fire(&self, list: &FacilityList<'_>) {
        self.parent.lock().dump(list);
        self.sink.lock().dump(list);
    }
}

impl std::fmt::Debug for FacilityListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityListener")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Caller-owned listener list.  Entries are never removed.
#[derive(Debug, Default)]
pub struct FacilityListeners {
    listeners: Vec<FacilityListener>,
}

impl FacilityListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: FacilityListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Fire every listener watching `list.request_id`, in registration order.
    ///
    /// Returns how many listeners fired; zero matches is not an error.
    pub fn fan_out(&self, list: &FacilityList<'_>) -> usize {
        let mut fired = 0;
        for listener in self
            .listeners
            .iter()
            .filter(|l| l.request_id == list.request_id)
        {
            listener.fire(list);
            fired += 1;
        }
        fired
    }
}

/// Sink that accumulates decoded entries across a multi-record list.
#[derive(Debug, Default, Clone)]
pub struct FacilityCollector {
    pub entries: Vec<Facility>,
    pub records: u32,
    pub complete: bool,
}

impl FacilityDump for FacilityCollector {
    fn dump(&mut self, list: &FacilityList<'_>) {
        self.entries.extend(list.entries());
        self.records += 1;
        if list.is_last() {
            self.complete = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::scripted::facility_list_record;
    use crate::recv::{FacilityListKind, Recv};

    /// Appends `tag` to a shared journal on every dump.
    fn journal_sink(journal: &Arc<Mutex<Vec<String>>>, tag: &str) -> SharedDump {
        let journal = Arc::clone(journal);
        let tag = tag.to_owned();
        shared(move |_: &FacilityList<'_>| journal.lock().push(tag.clone()))
    }

    fn airport(icao: &str) -> Facility {
        Facility {
            icao: icao.into(),
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            mag_var: None,
            frequency: None,
            vor: None,
        }
    }

    fn with_list<R>(raw: &[u8], f: impl FnOnce(&FacilityList<'_>) -> R) -> R {
        match Recv::parse(raw).unwrap() {
            Recv::FacilityList(list) => f(&list),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fan_out_order_and_filtering() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let parent = journal_sink(&journal, "parent");

        let mut listeners = FacilityListeners::new();
        listeners.register(FacilityListener::new(
            RequestId(5),
            Arc::clone(&parent),
            journal_sink(&journal, "airports"),
        ));
        listeners.register(FacilityListener::new(
            RequestId(6),
            Arc::clone(&parent),
            journal_sink(&journal, "vors"),
        ));
        listeners.register(FacilityListener::new(
            RequestId(5),
            Arc::clone(&parent),
            journal_sink(&journal, "airports-2"),
        ));

        let raw = facility_list_record(FacilityListKind::Airport, RequestId(5), 0, 1, &[]);
        let fired = with_list(&raw, |list| listeners.fan_out(list));

        assert_eq!(fired, 2);
        assert_eq!(
            *journal.lock(),
            ["parent", "airports", "parent", "airports-2"]
        );
    }

    #[test]
    fn test_fan_out_no_match() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = FacilityListeners::new();
        listeners.register(FacilityListener::new(
            RequestId(1),
            journal_sink(&journal, "p"),
            journal_sink(&journal, "s"),
        ));
        let raw = facility_list_record(FacilityListKind::Ndb, RequestId(2), 0, 1, &[]);
        assert_eq!(with_list(&raw, |list| listeners.fan_out(list)), 0);
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn test_collector_accumulates_until_last() {
        let collector = shared(FacilityCollector::default());
        let sink: SharedDump = collector.clone();
        let parent: SharedDump = shared(|_: &FacilityList<'_>| {});
        let mut listeners = FacilityListeners::new();
        listeners.register(FacilityListener::new(RequestId(9), parent, sink));

        let first = facility_list_record(FacilityListKind::Airport, RequestId(9), 0, 2, &[airport("KSEA")]);
        let second = facility_list_record(FacilityListKind::Airport, RequestId(9), 1, 2, &[airport("KBFI")]);
        with_list(&first, |l| listeners.fan_out(l));
        assert!(!collector.lock().complete);
        with_list(&second, |l| listeners.fan_out(l));

        let c = collector.lock();
        assert!(c.complete);
        assert_eq!(c.records, 2);
        let icaos: Vec<&str> = c.entries.iter().map(|e| e.icao.as_str()).collect();
        assert_eq!(icaos, ["KSEA", "KBFI"]);
    }
}
