//! Tenant-scoped rooms of live channel connections.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;

pub type ConnectionId = u64;

/// The set of live connections per tenant room. Joins happen at handshake
/// completion, leaves on disconnect; broadcast enumeration and membership
/// changes are serialized by the registry lock. The registry's lifetime is
/// the server's lifetime.
#[derive(Default)]
pub struct RoomRegistry {
    next_id: AtomicU64,
    rooms: Mutex<HashMap<String, HashMap<ConnectionId, UnboundedSender<String>>>>,
}

#[must_use]
pub fn room_name(tenant_id: &str) -> String {
    format!("store:{tenant_id}")
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to its tenant room and returns its id.
    pub fn join(&self, tenant_id: &str, sender: UnboundedSender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(room_name(tenant_id))
            .or_default()
            .insert(id, sender);
        id
    }

    /// Removes a connection; empty rooms are dropped.
    pub fn leave(&self, tenant_id: &str, id: ConnectionId) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let name = room_name(tenant_id);
        if let Some(members) = rooms.get_mut(&name) {
            members.remove(&id);
            if members.is_empty() {
                rooms.remove(&name);
            }
        }
    }

    /// Sends `frame` to every member of the tenant room except `exclude`.
    /// Connections whose receiver is gone are pruned. Returns the number of
    /// members the frame was delivered to.
    pub fn broadcast(&self, tenant_id: &str, frame: &str, exclude: Option<ConnectionId>) -> usize {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let name = room_name(tenant_id);
        let Some(members) = rooms.get_mut(&name) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sender) in members.iter() {
            if Some(*id) == exclude {
                continue;
            }
            if sender.send(frame.to_string()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            members.remove(&id);
        }
        if members.is_empty() {
            rooms.remove(&name);
        }
        delivered
    }

    #[must_use]
    pub fn member_count(&self, tenant_id: &str) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.get(&room_name(tenant_id)).map_or(0, |members| members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_join_and_leave() {
        let registry = RoomRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.join("tenant-1", tx);
        assert_eq!(registry.member_count("tenant-1"), 1);

        registry.leave("tenant-1", id);
        assert_eq!(registry.member_count("tenant-1"), 0);
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let id1 = registry.join("tenant-1", tx1);
        let _id2 = registry.join("tenant-1", tx2);

        let delivered = registry.broadcast("tenant-1", "hello", Some(id1));
        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_full_room() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.join("tenant-1", tx1);
        registry.join("tenant-1", tx2);

        let delivered = registry.broadcast("tenant-1", "hello", None);
        assert_eq!(delivered, 2);
        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_is_tenant_scoped() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.join("tenant-1", tx1);
        registry.join("tenant-2", tx2);

        registry.broadcast("tenant-1", "hello", None);
        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_prunes_dead_connections() {
        let registry = RoomRegistry::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.join("tenant-1", tx1);
        registry.join("tenant-1", tx2);
        drop(rx1);

        let delivered = registry.broadcast("tenant-1", "hello", None);
        assert_eq!(delivered, 1);
        assert_eq!(registry.member_count("tenant-1"), 1);
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_room_name() {
        assert_eq!(room_name("abc"), "store:abc");
    }
}
