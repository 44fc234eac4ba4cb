//! In-memory table of per-server connection records.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::models::{
    CapabilitySet, Connection, ConnectionStatus, ServerDescriptor,
};

/// Connection records keyed by server name, kept in insertion order.
///
/// Lock sections never span an `.await`; capability snapshots are swapped
/// in as a single `Arc` so readers see either the old or the new set.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<Vec<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Connection>> {
        self.connections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Connection>> {
        self.connections.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or overwrite the record for `descriptor` in `connecting` state.
    ///
    /// A previously cached capability set survives the overwrite until the
    /// next successful introspection replaces it.
    pub fn begin_connect(&self, descriptor: &ServerDescriptor) {
        let mut fresh = Connection::connecting(descriptor);
        let mut connections = self.write();
        if let Some(existing) = connections
            .iter_mut()
            .find(|c| c.server_name == descriptor.name)
        {
            fresh.capabilities = existing.capabilities.take();
            fresh.last_contact = existing.last_contact;
            *existing = fresh;
        } else {
            connections.push(fresh);
        }
    }

    /// Apply `f` to the named record. Returns false when no record exists.
    pub fn update<F>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce(&mut Connection),
    {
        let mut connections = self.write();
        match connections.iter_mut().find(|c| c.server_name == name) {
            Some(connection) => {
                f(connection);
                true
            }
            None => false,
        }
    }

    pub fn mark_connected(&self, name: &str) -> bool {
        self.update(name, Connection::mark_connected)
    }

    pub fn degrade(&self, name: &str, message: &str) -> bool {
        self.update(name, |c| c.degrade(message))
    }

    /// Degrade only a record that is still `connecting` or `connected`.
    ///
    /// Failures that land after a teardown leave the `disconnected` record
    /// alone. Returns whether the record was degraded.
    pub fn degrade_if_live(&self, name: &str, message: &str) -> bool {
        let mut degraded = false;
        self.update(name, |c| {
            if matches!(
                c.status,
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            ) {
                c.degrade(message);
                degraded = true;
            }
        });
        degraded
    }

    pub fn disconnect(&self, name: &str) -> bool {
        self.update(name, Connection::disconnect)
    }

    pub fn touch(&self, name: &str) -> bool {
        self.update(name, Connection::touch)
    }

    /// Swap in a new capability snapshot.
    ///
    /// Skipped for records that were disconnected while introspection was
    /// running, so a teardown is never undone by a late refresh.
    pub fn replace_capabilities(&self, name: &str, capabilities: CapabilitySet) -> bool {
        let snapshot = Arc::new(capabilities);
        let mut connections = self.write();
        match connections.iter_mut().find(|c| c.server_name == name) {
            Some(c) if c.status != ConnectionStatus::Disconnected => {
                c.capabilities = Some(snapshot);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Connection> {
        self.read().iter().find(|c| c.server_name == name).cloned()
    }

    pub fn all(&self) -> Vec<Connection> {
        self.read().clone()
    }

    pub fn status(&self, name: &str) -> Option<ConnectionStatus> {
        self.read()
            .iter()
            .find(|c| c.server_name == name)
            .map(|c| c.status)
    }

    pub fn base_url(&self, name: &str) -> Option<String> {
        self.read()
            .iter()
            .find(|c| c.server_name == name)
            .and_then(|c| c.base_url.clone())
    }

    pub fn capabilities(&self, name: &str) -> Option<Arc<CapabilitySet>> {
        self.read()
            .iter()
            .find(|c| c.server_name == name)
            .and_then(|c| c.capabilities.clone())
    }

    /// Cached capabilities of every record, whatever its status.
    pub fn all_capabilities(&self) -> Vec<(String, Arc<CapabilitySet>)> {
        self.read()
            .iter()
            .filter_map(|c| {
                c.capabilities
                    .as_ref()
                    .map(|caps| (c.server_name.clone(), Arc::clone(caps)))
            })
            .collect()
    }

    /// Cached capabilities of `connected` records only.
    pub fn connected_capabilities(&self) -> Vec<(String, Arc<CapabilitySet>)> {
        self.read()
            .iter()
            .filter(|c| c.is_connected())
            .filter_map(|c| {
                c.capabilities
                    .as_ref()
                    .map(|caps| (c.server_name.clone(), Arc::clone(caps)))
            })
            .collect()
    }

    pub fn names_with_status(&self, status: ConnectionStatus) -> Vec<String> {
        self.read()
            .iter()
            .filter(|c| c.status == status)
            .map(|c| c.server_name.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|c| c.server_name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ToolDescriptor;
    use serde_json::Value;

    fn caps(tool: &str) -> CapabilitySet {
        CapabilitySet::new(
            vec![ToolDescriptor {
                name: tool.to_string(),
                description: String::new(),
                input_schema: Value::Null,
            }],
            vec![],
            vec![],
        )
    }

    fn registry() -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        registry.begin_connect(&ServerDescriptor::http("a", "127.0.0.1", 8001));
        registry.begin_connect(&ServerDescriptor::http("b", "127.0.0.1", 8002));
        registry
    }

    #[test]
    fn test_insertion_order_preserved() {
        let registry = registry();
        registry.begin_connect(&ServerDescriptor::http("a", "127.0.0.1", 9001));

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(
            registry.base_url("a").as_deref(),
            Some("http://127.0.0.1:9001")
        );
    }

    #[test]
    fn test_connected_capabilities_filters_status() {
        let registry = registry();
        registry.replace_capabilities("a", caps("add_task"));
        registry.replace_capabilities("b", caps("search_notes"));
        registry.mark_connected("a");
        registry.degrade("b", "health check failed");

        let connected = registry.connected_capabilities();
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].0, "a");
        assert_eq!(registry.all_capabilities().len(), 2);
    }

    #[test]
    fn test_replace_skipped_after_disconnect() {
        let registry = registry();
        registry.mark_connected("a");
        registry.disconnect("a");

        assert!(!registry.replace_capabilities("a", caps("add_task")));
        assert!(registry.capabilities("a").is_none());
        assert_eq!(registry.status("a"), Some(ConnectionStatus::Disconnected));
    }

    #[test]
    fn test_reconnect_keeps_stale_capabilities() {
        let registry = registry();
        registry.replace_capabilities("a", caps("add_task"));
        registry.mark_connected("a");

        registry.begin_connect(&ServerDescriptor::http("a", "127.0.0.1", 8001));

        assert_eq!(registry.status("a"), Some(ConnectionStatus::Connecting));
        assert!(registry.capabilities("a").unwrap().has_tool("add_task"));
        assert!(registry.get("a").unwrap().last_contact.is_some());
    }

    #[test]
    fn test_late_failure_leaves_disconnected_record() {
        let registry = registry();
        registry.mark_connected("a");
        registry.disconnect("a");

        assert!(!registry.degrade_if_live("a", "health check failed"));
        let record = registry.get("a").unwrap();
        assert_eq!(record.status, ConnectionStatus::Disconnected);
        assert!(record.error_message.is_none());
        assert!(record.base_url.is_none());

        assert!(registry.degrade_if_live("b", "health check failed"));
        assert_eq!(registry.status("b"), Some(ConnectionStatus::Error));
        assert!(!registry.degrade_if_live("b", "again"));
    }

    #[test]
    fn test_update_unknown_server() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.touch("missing"));
        assert!(registry.get("missing").is_none());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_names_with_status() {
        let registry = registry();
        registry.mark_connected("b");
        assert_eq!(
            registry.names_with_status(ConnectionStatus::Connected),
            vec!["b"]
        );
        assert_eq!(
            registry.names_with_status(ConnectionStatus::Connecting),
            vec!["a"]
        );
    }
}
