//! libSQL backend — async `IntakeStore` implementation.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync` and
//! safe for concurrent async use. Explicit transactions are serialized
//! behind a lock, since the connection can hold only one at a time.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::model::{
    Attachment, Customer, Mail, NewCustomer, NewMail, Order, OrderCategory, OrderImage,
    OrderMessage, SpecEntry,
};
use crate::store::migrations;
use crate::store::traits::IntakeStore;

/// libSQL database backend.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    /// Held around `BEGIN`..`COMMIT`; concurrent transactions on one
    /// connection would otherwise nest and fail.
    tx_lock: Mutex<()>,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
            tx_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
            tx_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn load_attachments(&self, mail_id: &str) -> Result<Vec<Attachment>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE mail_id = ?1 ORDER BY position"
                ),
                params![mail_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_attachments: {e}")))?;

        let mut attachments = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_attachment(&row) {
                Ok(att) => attachments.push(att),
                Err(e) => {
                    tracing::warn!("Skipping attachment row: {e}");
                }
            }
        }
        Ok(attachments)
    }

    /// The statements of one spec migration, run inside an open transaction.
    async fn spec_migration_body(
        &self,
        order_id: &str,
        drop_keys: &[String],
        writes: &[(String, String)],
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        for key in drop_keys {
            conn.execute(
                "DELETE FROM spec_entries WHERE order_id = ?1 AND key = ?2",
                params![order_id, key.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("spec migration delete: {e}")))?;
        }
        for (key, value) in writes {
            conn.execute(
                "INSERT INTO spec_entries (order_id, key, value) VALUES (?1, ?2, ?3)",
                params![order_id, key.as_str(), value.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("spec migration insert: {e}")))?;
        }
        Ok(())
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn row_to_mail(row: &libsql::Row) -> Result<Mail, libsql::Error> {
    let date_str: String = row.get(4)?;
    let order_id: Option<String> = row.get(7).ok();
    let is_read: i64 = row.get(8).unwrap_or(0);
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(Mail {
        id: row.get(0)?,
        subject: row.get(1)?,
        from_name: row.get(2)?,
        from_email: row.get(3)?,
        date: parse_datetime(&date_str),
        text: row.get(5)?,
        html: row.get(6)?,
        attachments: Vec::new(),
        order_id,
        is_read: is_read != 0,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_attachment(row: &libsql::Row) -> Result<Attachment, libsql::Error> {
    let position: i64 = row.get(4).unwrap_or(0);
    Ok(Attachment {
        id: row.get(0)?,
        filename: row.get(1)?,
        mime_type: row.get(2)?,
        file_ref: row.get(3)?,
        position: position as u32,
    })
}

fn row_to_order(row: &libsql::Row) -> Result<Order, libsql::Error> {
    let category_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let assignee_id: Option<String> = row.get(5).ok();
    let created_str: String = row.get(6)?;

    Ok(Order {
        id: row.get(0)?,
        category: category_str.parse().unwrap_or(OrderCategory::Repair),
        status: status_str.parse().unwrap_or_default(),
        title: row.get(3)?,
        customer_id: row.get(4)?,
        assignee_id,
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_customer(row: &libsql::Row) -> Result<Customer, libsql::Error> {
    let created_str: String = row.get(7)?;
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        street: row.get(4)?,
        postal_code: row.get(5)?,
        city: row.get(6)?,
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_spec_entry(row: &libsql::Row) -> Result<SpecEntry, libsql::Error> {
    Ok(SpecEntry {
        row_id: row.get(0)?,
        order_id: row.get(1)?,
        key: row.get(2)?,
        value: row.get(3)?,
    })
}

fn row_to_order_message(row: &libsql::Row) -> Result<OrderMessage, libsql::Error> {
    let date_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;
    Ok(OrderMessage {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sender: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        date: parse_datetime(&date_str),
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_order_image(row: &libsql::Row) -> Result<OrderImage, libsql::Error> {
    let created_str: String = row.get(4)?;
    Ok(OrderImage {
        id: row.get(0)?,
        order_id: row.get(1)?,
        file_ref: row.get(2)?,
        comment: row.get(3)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const MAIL_COLUMNS: &str =
    "id, subject, from_name, from_email, date, text, html, order_id, is_read, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str = "id, filename, mime_type, file_ref, position";

const ORDER_COLUMNS: &str = "id, category, status, title, customer_id, assignee_id, created_at";

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, street, postal_code, city, created_at";

const SPEC_COLUMNS: &str = "row_id, order_id, key, value";

const ORDER_MESSAGE_COLUMNS: &str = "id, order_id, sender, subject, body, date, created_at";

const ORDER_IMAGE_COLUMNS: &str = "id, order_id, file_ref, comment, created_at";

#[async_trait]
impl IntakeStore for LibSqlStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Mails ───────────────────────────────────────────────────────

    async fn insert_mail(&self, mail: NewMail) -> Result<Mail, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO mails (id, subject, from_name, from_email, date, text, html, order_id, is_read, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, 0, ?8, ?9)",
            params![
                id.clone(),
                mail.subject.clone(),
                mail.from_name.clone(),
                mail.from_email.clone(),
                mail.date.to_rfc3339(),
                mail.text.clone(),
                mail.html.clone(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_mail: {e}")))?;

        let mut attachments = Vec::new();
        for (position, att) in mail.attachments.into_iter().enumerate() {
            let att_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO attachments (id, mail_id, filename, mime_type, file_ref, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    att_id.clone(),
                    id.clone(),
                    att.filename.clone(),
                    att.mime_type.clone(),
                    att.file_ref.clone(),
                    position as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_mail attachment: {e}")))?;

            attachments.push(Attachment {
                id: att_id,
                filename: att.filename,
                mime_type: att.mime_type,
                file_ref: att.file_ref,
                position: position as u32,
            });
        }

        debug!(mail_id = %id, attachments = attachments.len(), "Mail inserted");
        Ok(Mail {
            id,
            subject: mail.subject,
            from_name: mail.from_name,
            from_email: mail.from_email,
            date: mail.date,
            text: mail.text,
            html: mail.html,
            attachments,
            order_id: None,
            is_read: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_mail(&self, id: &str) -> Result<Option<Mail>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MAIL_COLUMNS} FROM mails WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_mail: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let mut mail = row_to_mail(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_mail row parse: {e}")))?;
                mail.attachments = self.load_attachments(&mail.id).await?;
                Ok(Some(mail))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_mail: {e}"))),
        }
    }

    async fn set_mail_order(
        &self,
        mail_id: &str,
        order_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE mails SET order_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![mail_id, opt_text(order_id), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_mail_order: {e}")))?;
        debug!(mail_id = %mail_id, order_id = ?order_id, "Mail order link updated");
        Ok(())
    }

    async fn mark_mail_read(&self, mail_id: &str, is_read: bool) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE mails SET is_read = ?2, updated_at = ?3 WHERE id = ?1",
                params![mail_id, is_read as i64, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("mark_mail_read: {e}")))?;
        Ok(())
    }

    // ── Customers ───────────────────────────────────────────────────

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1 LIMIT 1"),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_customer_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let customer = row_to_customer(&row).map_err(|e| {
                    DatabaseError::Query(format!("find_customer_by_email row parse: {e}"))
                })?;
                Ok(Some(customer))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_customer_by_email: {e}"))),
        }
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn()
            .execute(
                "INSERT INTO customers (id, name, email, phone, street, postal_code, city, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.clone(),
                    customer.name.clone(),
                    customer.email.clone(),
                    customer.phone.clone(),
                    customer.street.clone(),
                    customer.postal_code.clone(),
                    customer.city.clone(),
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_customer: {e}")))?;

        debug!(customer_id = %id, email = %customer.email, "Customer inserted");
        Ok(Customer {
            id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            street: customer.street,
            postal_code: customer.postal_code,
            city: customer.city,
            created_at: now,
        })
    }

    // ── Orders ──────────────────────────────────────────────────────

    async fn latest_order_id(&self) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id FROM orders ORDER BY created_at DESC, id DESC LIMIT 1",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_order_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("latest_order_id: {e}")))?;
                Ok(Some(id))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("latest_order_id: {e}"))),
        }
    }

    async fn insert_order(&self, order: &Order) -> Result<(), DatabaseError> {
        let result = self
            .conn()
            .execute(
                "INSERT INTO orders (id, category, status, title, customer_id, assignee_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    order.id.clone(),
                    order.category.to_string(),
                    order.status.to_string(),
                    order.title.clone(),
                    order.customer_id.clone(),
                    opt_text(order.assignee_id.as_deref()),
                    order.created_at.to_rfc3339(),
                ],
            )
            .await;

        match result {
            Ok(_) => {
                debug!(order_id = %order.id, category = %order.category, "Order inserted");
                Ok(())
            }
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => Err(
                DatabaseError::Conflict(format!("order id already taken: {}", order.id)),
            ),
            Err(e) => Err(DatabaseError::Query(format!("insert_order: {e}"))),
        }
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_order: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let order = row_to_order(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_order row parse: {e}")))?;
                Ok(Some(order))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_order: {e}"))),
        }
    }

    async fn update_order_category(
        &self,
        order_id: &str,
        category: OrderCategory,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE orders SET category = ?2 WHERE id = ?1",
                params![order_id, category.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_order_category: {e}")))?;
        Ok(())
    }

    // ── Specification rows ──────────────────────────────────────────

    async fn append_spec_entry(
        &self,
        order_id: &str,
        key: &str,
        value: &str,
    ) -> Result<SpecEntry, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO spec_entries (order_id, key, value) VALUES (?1, ?2, ?3)",
            params![order_id, key, value],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("append_spec_entry: {e}")))?;

        Ok(SpecEntry {
            row_id: conn.last_insert_rowid(),
            order_id: order_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    async fn list_spec_entries(&self, order_id: &str) -> Result<Vec<SpecEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SPEC_COLUMNS} FROM spec_entries WHERE order_id = ?1 ORDER BY row_id"
                ),
                params![order_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_spec_entries: {e}")))?;

        let mut entries = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_spec_entry(&row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping spec row: {e}");
                }
            }
        }
        Ok(entries)
    }

    async fn apply_spec_migration(
        &self,
        order_id: &str,
        drop_keys: &[String],
        writes: &[(String, String)],
    ) -> Result<(), DatabaseError> {
        if drop_keys.is_empty() && writes.is_empty() {
            return Ok(());
        }

        let _tx = self.tx_lock.lock().await;
        let conn = self.conn();
        conn.execute_batch("BEGIN IMMEDIATE")
            .await
            .map_err(|e| DatabaseError::Query(format!("spec migration begin: {e}")))?;

        match self.spec_migration_body(order_id, drop_keys, writes).await {
            Ok(()) => {
                conn.execute_batch("COMMIT")
                    .await
                    .map_err(|e| DatabaseError::Query(format!("spec migration commit: {e}")))?;
                debug!(
                    order_id = %order_id,
                    dropped = drop_keys.len(),
                    written = writes.len(),
                    "Spec migration applied"
                );
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK").await;
                Err(e)
            }
        }
    }

    // ── Order timeline messages ─────────────────────────────────────

    async fn insert_order_message(&self, message: &OrderMessage) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO order_messages (id, order_id, sender, subject, body, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id.clone(),
                    message.order_id.clone(),
                    message.sender.clone(),
                    message.subject.clone(),
                    message.body.clone(),
                    message.date.to_rfc3339(),
                    message.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_order_message: {e}")))?;
        Ok(())
    }

    async fn order_message_with_marker(
        &self,
        order_id: &str,
        marker: &str,
    ) -> Result<bool, DatabaseError> {
        let pattern = format!("%{marker}%");
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM order_messages WHERE order_id = ?1 AND body LIKE ?2",
                params![order_id, pattern],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("order_message_with_marker: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row.get(0).unwrap_or(0);
                Ok(count > 0)
            }
            _ => Ok(false),
        }
    }

    async fn delete_order_messages_with_marker(
        &self,
        order_id: &str,
        marker: &str,
    ) -> Result<u64, DatabaseError> {
        let pattern = format!("%{marker}%");
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM order_messages WHERE order_id = ?1 AND body LIKE ?2",
                params![order_id, pattern],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_order_messages_with_marker: {e}")))?;
        Ok(deleted)
    }

    async fn list_order_messages(
        &self,
        order_id: &str,
    ) -> Result<Vec<OrderMessage>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ORDER_MESSAGE_COLUMNS} FROM order_messages WHERE order_id = ?1 ORDER BY date, id"
                ),
                params![order_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_order_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_order_message(&row) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    tracing::warn!("Skipping order message row: {e}");
                }
            }
        }
        Ok(messages)
    }

    // ── Order gallery images ────────────────────────────────────────

    async fn insert_order_image(&self, image: &OrderImage) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO order_images (id, order_id, file_ref, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    image.id.clone(),
                    image.order_id.clone(),
                    image.file_ref.clone(),
                    image.comment.clone(),
                    image.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_order_image: {e}")))?;
        Ok(())
    }

    async fn order_image_with_comment(
        &self,
        order_id: &str,
        comment: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM order_images WHERE order_id = ?1 AND comment = ?2",
                params![order_id, comment],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("order_image_with_comment: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row.get(0).unwrap_or(0);
                Ok(count > 0)
            }
            _ => Ok(false),
        }
    }

    async fn delete_order_images_with_comment_prefix(
        &self,
        order_id: &str,
        prefix: &str,
    ) -> Result<u64, DatabaseError> {
        let pattern = format!("{prefix}%");
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM order_images WHERE order_id = ?1 AND comment LIKE ?2",
                params![order_id, pattern],
            )
            .await
            .map_err(|e| {
                DatabaseError::Query(format!("delete_order_images_with_comment_prefix: {e}"))
            })?;
        Ok(deleted)
    }

    async fn list_order_images(&self, order_id: &str) -> Result<Vec<OrderImage>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ORDER_IMAGE_COLUMNS} FROM order_images WHERE order_id = ?1 ORDER BY created_at, id"
                ),
                params![order_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_order_images: {e}")))?;

        let mut images = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_order_image(&row) {
                Ok(img) => images.push(img),
                Err(e) => {
                    tracing::warn!("Skipping order image row: {e}");
                }
            }
        }
        Ok(images)
    }
}
