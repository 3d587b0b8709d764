use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Bodies seen at the pre-flight event, waiting for their headers event.
///
/// Bounded: once `capacity` entries are pending, the oldest is dropped.
#[derive(Debug)]
pub struct PendingBodies {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Option<Vec<u8>>>,
}

impl PendingBodies {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, request_id: String, body: Option<Vec<u8>>) {
        if let Some(slot) = self.entries.get_mut(&request_id) {
            *slot = body;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    if self.entries.remove(&oldest).is_some() {
                        debug!(request_id = %oldest, "evicted unmatched pre-flight body");
                    }
                }
                None => break,
            }
        }
        self.order.push_back(request_id.clone());
        self.entries.insert(request_id, body);
    }

    /// Removes the entry. The outer `None` means the request was never
    /// buffered; the inner one that it carried no body.
    pub fn take(&mut self, request_id: &str) -> Option<Option<Vec<u8>>> {
        let body = self.entries.remove(request_id)?;
        self.order.retain(|id| id != request_id);
        Some(body)
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
