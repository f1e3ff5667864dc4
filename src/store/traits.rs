//! Persistence trait for the intake engine.
//!
//! Implementations must be `Send + Sync` for use behind `Arc<dyn IntakeStore>`.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::model::{
    Customer, Mail, NewCustomer, NewMail, Order, OrderCategory, OrderImage, OrderMessage,
    SpecEntry,
};

/// Storage backend for mails, orders, customers and specification rows.
#[async_trait]
pub trait IntakeStore: Send + Sync {
    /// Initialize the schema (run pending migrations).
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Mails ───────────────────────────────────────────────────────

    /// Insert a mail with its attachments. IDs and timestamps are
    /// assigned by the store.
    async fn insert_mail(&self, mail: NewMail) -> Result<Mail, DatabaseError>;

    /// Load a mail with its attachments in original order.
    async fn get_mail(&self, id: &str) -> Result<Option<Mail>, DatabaseError>;

    /// Set or clear the mail's owning order.
    async fn set_mail_order(
        &self,
        mail_id: &str,
        order_id: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Flip the operator read flag.
    async fn mark_mail_read(&self, mail_id: &str, is_read: bool) -> Result<(), DatabaseError>;

    // ── Customers ───────────────────────────────────────────────────

    /// Exact-match lookup by email address.
    async fn find_customer_by_email(&self, email: &str)
    -> Result<Option<Customer>, DatabaseError>;

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, DatabaseError>;

    // ── Orders ──────────────────────────────────────────────────────

    /// ID of the most recently created order, if any.
    async fn latest_order_id(&self) -> Result<Option<String>, DatabaseError>;

    /// Insert an order under its caller-chosen ID.
    ///
    /// Returns [`DatabaseError::Conflict`] when the ID is already taken,
    /// so callers can re-allocate and retry.
    async fn insert_order(&self, order: &Order) -> Result<(), DatabaseError>;

    async fn get_order(&self, id: &str) -> Result<Option<Order>, DatabaseError>;

    async fn update_order_category(
        &self,
        order_id: &str,
        category: OrderCategory,
    ) -> Result<(), DatabaseError>;

    // ── Specification rows ──────────────────────────────────────────

    /// Append one row; never overwrites. Returns the stored row with its
    /// assigned rowid.
    async fn append_spec_entry(
        &self,
        order_id: &str,
        key: &str,
        value: &str,
    ) -> Result<SpecEntry, DatabaseError>;

    /// All rows of one order in rowid order.
    async fn list_spec_entries(&self, order_id: &str) -> Result<Vec<SpecEntry>, DatabaseError>;

    /// Apply a schema migration for one order in a single transaction:
    /// delete every row of the keys in `drop_keys`, then insert the
    /// `(key, value)` pairs in `writes`. All-or-nothing.
    async fn apply_spec_migration(
        &self,
        order_id: &str,
        drop_keys: &[String],
        writes: &[(String, String)],
    ) -> Result<(), DatabaseError>;

    // ── Order timeline messages ─────────────────────────────────────

    async fn insert_order_message(&self, message: &OrderMessage) -> Result<(), DatabaseError>;

    /// Whether the order already has a message whose body contains `marker`.
    async fn order_message_with_marker(
        &self,
        order_id: &str,
        marker: &str,
    ) -> Result<bool, DatabaseError>;

    /// Delete messages whose body contains `marker`. Returns the number
    /// of deleted rows.
    async fn delete_order_messages_with_marker(
        &self,
        order_id: &str,
        marker: &str,
    ) -> Result<u64, DatabaseError>;

    async fn list_order_messages(&self, order_id: &str)
    -> Result<Vec<OrderMessage>, DatabaseError>;

    // ── Order gallery images ────────────────────────────────────────

    async fn insert_order_image(&self, image: &OrderImage) -> Result<(), DatabaseError>;

    /// Whether the order already has an image with exactly this comment.
    async fn order_image_with_comment(
        &self,
        order_id: &str,
        comment: &str,
    ) -> Result<bool, DatabaseError>;

    /// Delete images whose comment starts with `prefix`. Returns the
    /// number of deleted rows.
    async fn delete_order_images_with_comment_prefix(
        &self,
        order_id: &str,
        prefix: &str,
    ) -> Result<u64, DatabaseError>;

    async fn list_order_images(&self, order_id: &str) -> Result<Vec<OrderImage>, DatabaseError>;
}
