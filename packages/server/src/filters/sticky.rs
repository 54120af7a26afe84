use common::{AttributeModel, Payload, merge_payload};
use dashmap::DashMap;

/// Per-session storage of filter values.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str, slot: &str) -> Option<Payload>;
    fn save(&self, session_id: &str, slot: &str, values: Payload);
    fn clear(&self, session_id: &str, slot: &str);
}

/// Process-local session store.
#[derive(Default)]
pub struct MemorySessionStore {
    slots: DashMap<(String, String), Payload>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: &str, slot: &str) -> Option<Payload> {
        self.slots
            .get(&(session_id.to_string(), slot.to_string()))
            .map(|values| values.clone())
    }

    fn save(&self, session_id: &str, slot: &str, values: Payload) {
        self.slots
            .insert((session_id.to_string(), slot.to_string()), values);
    }

    fn clear(&self, session_id: &str, slot: &str) {
        self.slots.remove(&(session_id.to_string(), slot.to_string()));
    }
}

/// A filter that remembers its last submitted values for the session.
///
/// Values are kept in the slot `<app name>:<filter name>`. On every request
/// the stored values are merged with the submitted ones, submitted values
/// winning, and the merge is stored back.
pub struct StickyFilter<'a> {
    store: &'a dyn SessionStore,
    slot: String,
}

impl<'a> StickyFilter<'a> {
    pub fn new(store: &'a dyn SessionStore, app_name: &str, filter_name: &str) -> Self {
        Self {
            store,
            slot: format!("{app_name}:{filter_name}"),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Populate `model` from the stored and submitted values. Only declared
    /// attributes are assigned or stored. Returns the assigned names.
    pub fn apply<M: AttributeModel>(
        &self,
        session_id: &str,
        model: &mut M,
        submitted: &Payload,
    ) -> Vec<String> {
        let declared = model.attribute_names();
        let mut values = self.store.load(session_id, &self.slot).unwrap_or_default();
        for (key, value) in submitted {
            if declared.contains(&key.as_str()) {
                values.insert(key.clone(), value.clone());
            }
        }

        let assigned = merge_payload(model, &values);
        self.store.save(session_id, &self.slot, values);
        assigned
    }

    pub fn reset(&self, session_id: &str) {
        self.store.clear(session_id, &self.slot);
    }
}
