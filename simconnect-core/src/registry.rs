//! Request registry: in-flight [`Request`]s keyed by request ID.
//!
//! Iteration follows first-registration order, which is what exception
//! correlation relies on ("first match wins").

use std::collections::HashMap;

use crate::ids::RequestId;
use crate::request::Request;

#[derive(Debug, Default)]
pub struct RequestRegistry {
    requests: HashMap<RequestId, Request>,
    order: Vec<RequestId>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by request ID.
    ///
    /// Overwriting keeps the slot's original position in iteration order.
    pub fn register(&mut self, request: Request) {
        let id = request.request_id;
        if self.requests.insert(id, request).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.requests.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Requests in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> + '_ {
        self.order.iter().filter_map(|id| self.requests.get(id))
    }

    /// First registered request whose last send carried `send_id`.
    pub fn find_by_send_id(&self, send_id: u32) -> Option<&Request> {
        self.iter().find(|r| r.last_sent_id == Some(send_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DefinitionId;
    use crate::request::Definition;

    fn req(id: u32, field: &str) -> Request {
        Request::new(
            RequestId(id),
            DefinitionId(id),
            vec![Definition::new(field, "Float64")],
        )
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut reg = RequestRegistry::new();
        reg.register(req(7, "ALTITUDE"));
        reg.register(req(7, "ALTITUDE"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut reg = RequestRegistry::new();
        reg.register(req(1, "A"));
        reg.register(req(2, "B"));
        reg.register(req(1, "C"));
        let names: Vec<&str> = reg
            .iter()
            .map(|r| r.definitions[0].name.as_str())
            .collect();
        assert_eq!(names, ["C", "B"]);
    }

    #[test]
    fn test_find_by_send_id_first_match() {
        let mut reg = RequestRegistry::new();
        for (id, field) in [(3, "FIRST"), (1, "SECOND")] {
            let mut r = req(id, field);
            r.last_sent_id = Some(55);
            reg.register(r);
        }
        let hit = reg.find_by_send_id(55).unwrap();
        assert_eq!(hit.request_id, RequestId(3));
        assert!(reg.find_by_send_id(56).is_none());
    }
}
