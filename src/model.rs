//! Core domain entities — mails, orders, customers, and specification rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Mail ────────────────────────────────────────────────────────────

/// An inbound email with parsed metadata and attachments.
///
/// Created once by the mail feed (or the ingestion adapter); afterwards only
/// the `order_id` link and the read flag are mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mail {
    /// Unique ID (UUID string).
    pub id: String,
    /// Subject line, may be empty.
    pub subject: String,
    /// Display name of the sender, may be empty.
    pub from_name: String,
    /// Sender address, may be empty for malformed mails.
    pub from_email: String,
    /// When the mail was sent.
    pub date: DateTime<Utc>,
    /// Plain-text body, may be empty.
    pub text: String,
    /// HTML body, may be empty.
    pub html: String,
    /// Attachments in their original order.
    pub attachments: Vec<Attachment>,
    /// The order this mail currently belongs to, if any.
    pub order_id: Option<String>,
    /// Whether an operator has opened the mail.
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A mail attachment. Owned by exactly one mail, immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique ID (UUID string).
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    /// Opaque reference into the external attachment file store.
    pub file_ref: String,
    /// Position within the mail's attachment list.
    pub position: u32,
}

/// Input record for inserting a mail with its attachments.
#[derive(Debug, Clone)]
pub struct NewMail {
    pub subject: String,
    pub from_name: String,
    pub from_email: String,
    pub date: DateTime<Utc>,
    pub text: String,
    pub html: String,
    pub attachments: Vec<NewAttachment>,
}

/// Input record for a single attachment.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub mime_type: String,
    pub file_ref: String,
}

// ── Order ───────────────────────────────────────────────────────────

/// Workshop order category. The declaration order is the fixed
/// classifier priority used for deterministic tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderCategory {
    /// Fret replacement and fret dressing.
    Refret,
    /// Setup work: action, intonation, string changes.
    Setup,
    /// Pickups, pots, wiring, jacks.
    Electronics,
    /// Finish and lacquer work.
    Finish,
    /// Full custom instrument builds.
    CustomBuild,
    /// Generic repairs that fit no specific category.
    Repair,
}

impl OrderCategory {
    /// All categories in fixed priority order.
    pub const ALL: [OrderCategory; 6] = [
        Self::Refret,
        Self::Setup,
        Self::Electronics,
        Self::Finish,
        Self::CustomBuild,
        Self::Repair,
    ];

    /// Position in the fixed priority order (lower ranks first on ties).
    pub fn priority(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(usize::MAX)
    }
}

impl std::fmt::Display for OrderCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refret => write!(f, "refret"),
            Self::Setup => write!(f, "setup"),
            Self::Electronics => write!(f, "electronics"),
            Self::Finish => write!(f, "finish"),
            Self::CustomBuild => write!(f, "custom_build"),
            Self::Repair => write!(f, "repair"),
        }
    }
}

impl std::str::FromStr for OrderCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refret" => Ok(Self::Refret),
            "setup" => Ok(Self::Setup),
            "electronics" => Ok(Self::Electronics),
            "finish" => Ok(Self::Finish),
            "custom_build" => Ok(Self::CustomBuild),
            "repair" => Ok(Self::Repair),
            _ => Err(format!("Unknown order category: {}", s)),
        }
    }
}

/// Workflow status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly created, not yet picked up.
    Inbox,
    /// Being worked on.
    InProgress,
    /// Waiting on parts or a customer decision.
    Waiting,
    /// Finished.
    Done,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Inbox
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbox => write!(f, "inbox"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Waiting => write!(f, "waiting"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Self::Inbox),
            "in_progress" => Ok(Self::InProgress),
            "waiting" => Ok(Self::Waiting),
            "done" => Ok(Self::Done),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// A workshop order. The `id` doubles as the business order number
/// (`PREFIX-YYYY-NNN`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub category: OrderCategory,
    pub status: OrderStatus,
    /// Usually the originating mail subject.
    pub title: String,
    pub customer_id: String,
    pub assignee_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Customer ────────────────────────────────────────────────────────

/// A customer record, looked up by email and created on first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// Input record for creating a customer.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

// ── Specification rows ──────────────────────────────────────────────

/// One append-only specification row. Several rows may share an
/// `(order_id, key)`; the effective value is derived on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEntry {
    /// Monotonically increasing rowid, a proxy for write recency.
    pub row_id: i64,
    pub order_id: String,
    pub key: String,
    pub value: String,
}

/// A proposed specification value derived from mail content.
/// Transient: becomes a `SpecEntry` only through an explicit write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Schema field key (e.g. `mensur`).
    pub field: String,
    /// Proposed value (e.g. `648 mm`).
    pub value: String,
}

// ── Order timeline projections ──────────────────────────────────────

/// A communication entry in an order's message timeline. Entries derived
/// from a mail carry a `[mail:<id>]` marker inside the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMessage {
    pub id: String,
    pub order_id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    /// When the underlying communication happened (not the insert time).
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An entry in an order's attachment/image gallery. Entries derived from a
/// mail attachment carry a deterministic `mail:<mail>:att:<att>` comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderImage {
    pub id: String,
    pub order_id: String,
    /// Opaque reference into the external attachment file store.
    pub file_ref: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_roundtrip() {
        for cat in OrderCategory::ALL {
            let parsed = OrderCategory::from_str(&cat.to_string()).unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn category_priority_follows_declaration_order() {
        assert_eq!(OrderCategory::Refret.priority(), 0);
        assert_eq!(OrderCategory::Repair.priority(), 5);
        assert!(OrderCategory::Setup.priority() < OrderCategory::Finish.priority());
    }

    #[test]
    fn unknown_category_rejected() {
        assert!(OrderCategory::from_str("gardening").is_err());
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            OrderStatus::Inbox,
            OrderStatus::InProgress,
            OrderStatus::Waiting,
            OrderStatus::Done,
        ] {
            assert_eq!(OrderStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn default_status_is_inbox() {
        assert_eq!(OrderStatus::default(), OrderStatus::Inbox);
    }
}
