//! Realtime change feed: per-restaurant fan-out of row changes and
//! notifications to connected sockets.
//!
//! DESIGN
//! ======
//! Subscribers are grouped by owner (restaurant) id. Each one has a bounded
//! `mpsc` sender and a `FeedFilter` saying which tables and event kinds it
//! wants. Owners see every row of their restaurant; customer watchers are
//! pinned to a single order id and only ever see that order.
//!
//! TRADE-OFFS
//! ==========
//! Delivery is best-effort (`try_send`): a subscriber whose channel is full
//! misses the frame rather than stalling the publisher. Clients treat a
//! change frame as a hint to refetch, so a dropped frame heals on the next
//! one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::domain::notify::Notification;
use crate::frame::{Data, Frame};

// =============================================================================
// TYPES
// =============================================================================

/// Tables that publish changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Orders,
    MenuItems,
}

impl FeedTable {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::MenuItems => "menu_items",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "orders" => Some(Self::Orders),
            "menu_items" => Some(Self::MenuItems),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Every change kind, for `*` subscriptions.
pub const ALL_KINDS: [ChangeKind; 3] = [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete];

impl ChangeKind {
    /// Event name as it appears in frame data (`INSERT` / `UPDATE` / `DELETE`).
    #[must_use]
    pub fn event(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    #[must_use]
    pub fn syscall(self) -> &'static str {
        match self {
            Self::Insert => frames::syscall::CHANGE_INSERT,
            Self::Update => frames::syscall::CHANGE_UPDATE,
            Self::Delete => frames::syscall::CHANGE_DELETE,
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One row change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: FeedTable,
    pub kind: ChangeKind,
    /// Row snapshot after the change (before it, for deletes).
    pub record: serde_json::Value,
    /// Order the row belongs to; customer watchers match on this.
    pub order_id: Option<Uuid>,
}

/// Who a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    /// Owner sockets of the restaurant.
    Owner,
    /// Customer sockets watching one order.
    Order(Uuid),
}

/// What a subscriber wants to receive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    tables: HashMap<FeedTable, HashSet<ChangeKind>>,
    order_id: Option<Uuid>,
}

impl FeedFilter {
    /// Owner socket with no table subscriptions yet.
    #[must_use]
    pub fn owner() -> Self {
        Self::default()
    }

    /// Customer socket pinned to one order, receiving its updates.
    #[must_use]
    pub fn order_watcher(order_id: Uuid) -> Self {
        let mut filter = Self { tables: HashMap::new(), order_id: Some(order_id) };
        filter.subscribe(FeedTable::Orders, &[ChangeKind::Update]);
        filter
    }

    pub fn subscribe(&mut self, table: FeedTable, kinds: &[ChangeKind]) {
        self.tables.entry(table).or_default().extend(kinds.iter().copied());
    }

    pub fn unsubscribe(&mut self, table: FeedTable) {
        self.tables.remove(&table);
    }

    #[must_use]
    pub fn order_id(&self) -> Option<Uuid> {
        self.order_id
    }

    #[must_use]
    pub fn matches_change(&self, event: &ChangeEvent) -> bool {
        let wants_kind = self
            .tables
            .get(&event.table)
            .is_some_and(|kinds| kinds.contains(&event.kind));
        if !wants_kind {
            return false;
        }
        match self.order_id {
            Some(watched) => event.order_id == Some(watched),
            None => true,
        }
    }

    #[must_use]
    pub fn matches_target(&self, target: NotifyTarget) -> bool {
        match (target, self.order_id) {
            (NotifyTarget::Owner, None) => true,
            (NotifyTarget::Order(id), Some(watched)) => id == watched,
            _ => false,
        }
    }
}

struct Subscriber {
    tx: mpsc::Sender<Frame>,
    filter: FeedFilter,
}

// =============================================================================
// HUB
// =============================================================================

/// Subscriber registry. Clone is cheap; all clones share one registry.
#[derive(Clone, Default)]
pub struct FeedHub {
    owners: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, Subscriber>>>>,
}

impl FeedHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket under `owner_id`.
    pub async fn subscribe(&self, owner_id: Uuid, client_id: Uuid, tx: mpsc::Sender<Frame>, filter: FeedFilter) {
        let mut owners = self.owners.write().await;
        owners
            .entry(owner_id)
            .or_default()
            .insert(client_id, Subscriber { tx, filter });
    }

    /// Change a registered socket's filter. Returns `false` if it is gone.
    pub async fn update_filter(&self, owner_id: Uuid, client_id: Uuid, update: impl FnOnce(&mut FeedFilter)) -> bool {
        let mut owners = self.owners.write().await;
        let Some(sub) = owners
            .get_mut(&owner_id)
            .and_then(|clients| clients.get_mut(&client_id))
        else {
            return false;
        };
        update(&mut sub.filter);
        true
    }

    /// Remove a socket; drops the owner entry once empty.
    pub async fn unsubscribe(&self, owner_id: Uuid, client_id: Uuid) {
        let mut owners = self.owners.write().await;
        if let Some(clients) = owners.get_mut(&owner_id) {
            clients.remove(&client_id);
            if clients.is_empty() {
                owners.remove(&owner_id);
            }
        }
    }

    pub async fn subscriber_count(&self, owner_id: Uuid) -> usize {
        self.owners.read().await.get(&owner_id).map_or(0, HashMap::len)
    }

    /// Total connected sockets across all restaurants.
    pub async fn total_subscribers(&self) -> usize {
        self.owners.read().await.values().map(HashMap::len).sum()
    }

    /// Send a row change to every matching subscriber. Returns how many
    /// subscribers it reached.
    pub async fn publish(&self, owner_id: Uuid, event: &ChangeEvent) -> usize {
        let mut data = Data::new();
        data.insert("table".into(), serde_json::json!(event.table.as_str()));
        data.insert("event".into(), serde_json::json!(event.kind.event()));
        data.insert("record".into(), event.record.clone());
        let frame = Frame::request(event.kind.syscall(), data)
            .with_owner_id(owner_id)
            .with_from("system");

        self.fan_out(owner_id, &frame, |filter| filter.matches_change(event))
            .await
    }

    /// Push a `notify:show` frame to the target sockets.
    pub async fn notify(&self, owner_id: Uuid, notification: &Notification, target: NotifyTarget) -> usize {
        let data = match serde_json::to_value(notification) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => Data::new(),
        };
        let frame = Frame::request(frames::syscall::NOTIFY_SHOW, data)
            .with_owner_id(owner_id)
            .with_from("system");

        self.fan_out(owner_id, &frame, |filter| filter.matches_target(target))
            .await
    }

    async fn fan_out(&self, owner_id: Uuid, frame: &Frame, wants: impl Fn(&FeedFilter) -> bool) -> usize {
        let owners = self.owners.read().await;
        let Some(clients) = owners.get(&owner_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (client_id, sub) in clients {
            if !wants(&sub.filter) {
                continue;
            }
            match sub.tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(%client_id, error = %e, "feed: dropped frame"),
            }
        }
        delivered
    }
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
