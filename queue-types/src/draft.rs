//! The draft record and its synchronization status.
//!
//! A [`Draft`] is a lead captured locally that the server has not yet
//! confirmed. Drafts are persisted as plain camelCase records so the file
//! format stays readable by other tooling.

use serde::{Deserialize, Serialize};

use crate::{DraftId, RemoteId, Timestamp};

/// Who the lead is for.
///
/// Either a customer the remote system already knows, or a free-text name
/// captured before a customer lookup completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CustomerRef {
    /// Resolved remote customer id.
    Remote {
        /// Remote customer identifier.
        id: String,
    },
    /// Free-text customer name.
    Name {
        /// Name as typed by the user.
        name: String,
    },
}

impl CustomerRef {
    /// Reference a known remote customer.
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote { id: id.into() }
    }

    /// Reference a customer by free-text name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Name { name: name.into() }
    }
}

/// One product line on a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product SKU.
    pub sku: String,
    /// Number of units (must be positive).
    pub quantity: u32,
    /// Price per unit (finite, non-negative).
    pub unit_price: f64,
}

impl LineItem {
    /// Create a line item.
    pub fn new(sku: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            unit_price,
        }
    }
}

/// Caller-supplied content of a draft.
///
/// Everything except identity, timestamps and sync status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInput {
    /// Customer the lead is for.
    pub customer: CustomerRef,
    /// Ordered product lines (may be empty).
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl DraftInput {
    /// Create input for the given customer with no items.
    pub fn new(customer: CustomerRef) -> Self {
        Self {
            customer,
            items: Vec::new(),
        }
    }

    /// Append a line item.
    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }
}

/// Synchronization status of a draft.
///
/// Carries exactly the data each status needs: a synced draft always has a
/// remote id, a failed one always has an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncState {
    /// Waiting for its first attempt.
    Pending,
    /// An attempt is in flight.
    Syncing,
    /// Confirmed by the server.
    Synced {
        /// Identifier the server assigned.
        #[serde(rename = "remoteId")]
        remote_id: RemoteId,
    },
    /// The last attempt failed; retryable.
    Error {
        /// Why the last attempt failed.
        #[serde(rename = "lastError")]
        message: String,
    },
}

impl SyncState {
    /// Short lowercase name, used in logs and listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced { .. } => "synced",
            Self::Error { .. } => "error",
        }
    }
}

/// A lead captured locally and not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Immutable local identifier.
    pub id: DraftId,
    /// Customer the lead is for.
    pub customer: CustomerRef,
    /// Ordered product lines.
    pub items: Vec<LineItem>,
    /// Set once at creation; total order for sync processing.
    pub created_at: Timestamp,
    /// Last time the record was written.
    pub updated_at: Timestamp,
    /// Number of sync attempts started so far.
    #[serde(default)]
    pub attempts: u32,
    /// Current sync status.
    pub sync_state: SyncState,
}

impl Draft {
    /// Create a pending draft from input.
    ///
    /// Does not validate; callers go through the queue facade.
    pub fn new(input: DraftInput, created_at: Timestamp) -> Self {
        Self {
            id: DraftId::new(),
            customer: input.customer,
            items: input.items,
            created_at,
            updated_at: created_at,
            attempts: 0,
            sync_state: SyncState::Pending,
        }
    }

    /// Remote id, present only once synced.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match &self.sync_state {
            SyncState::Synced { remote_id } => Some(remote_id),
            _ => None,
        }
    }

    /// Last error, present only in the error state.
    pub fn last_error(&self) -> Option<&str> {
        match &self.sync_state {
            SyncState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Not yet confirmed by the server (counts toward the pending total).
    pub fn is_pending(&self) -> bool {
        !matches!(self.sync_state, SyncState::Synced { .. })
    }

    /// An attempt is currently in flight.
    pub fn is_syncing(&self) -> bool {
        matches!(self.sync_state, SyncState::Syncing)
    }
}
