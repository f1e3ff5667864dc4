//! Artifact linking: project a mail into an order's message timeline
//! and image gallery, reconciling moves between orders.
//!
//! Derived artifacts carry deterministic markers so the projection is
//! idempotent: the timeline message embeds `[mail:<id>]` in its body,
//! each gallery image a `mail:<mail>:att:<attachment>` comment.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::extract::strip_html;
use crate::model::{Attachment, Mail, OrderImage, OrderMessage};
use crate::store::IntakeStore;

fn mail_marker(mail_id: &str) -> String {
    format!("[mail:{mail_id}]")
}

fn attachment_comment(mail_id: &str, attachment_id: &str) -> String {
    format!("mail:{mail_id}:att:{attachment_id}")
}

/// Comment prefix shared by every image derived from one mail.
fn mail_comment_prefix(mail_id: &str) -> String {
    format!("mail:{mail_id}:")
}

/// Project a mail into the target order's timeline and gallery.
///
/// Safe to call repeatedly: each mail yields exactly one message and
/// one gallery entry per attachment no matter how often it runs. When
/// the mail was previously linked to a different order, that order's
/// derived artifacts are removed first.
///
/// A missing mail is a no-op; a missing target order is an error.
pub async fn link_mail_artifacts(
    store: &dyn IntakeStore,
    mail_id: &str,
    order_id: &str,
) -> Result<()> {
    let Some(mail) = store.get_mail(mail_id).await? else {
        debug!(mail_id = %mail_id, "Mail is gone, nothing to link");
        return Ok(());
    };
    let Some(order) = store.get_order(order_id).await? else {
        return Err(Error::not_found("order", order_id));
    };

    if let Some(previous) = mail.order_id.as_deref()
        && previous != order.id
    {
        let messages = store
            .delete_order_messages_with_marker(previous, &mail_marker(&mail.id))
            .await?;
        let images = store
            .delete_order_images_with_comment_prefix(previous, &mail_comment_prefix(&mail.id))
            .await?;
        info!(
            mail_id = %mail.id,
            from_order = %previous,
            to_order = %order.id,
            messages,
            images,
            "Moved mail artifacts to another order"
        );
    }

    ensure_message(store, &mail, &order.id).await?;
    for attachment in &mail.attachments {
        ensure_image(store, &mail.id, attachment, &order.id).await?;
    }

    store.set_mail_order(&mail.id, Some(&order.id)).await?;
    Ok(())
}

/// Insert the timeline message for a mail unless one already exists.
async fn ensure_message(store: &dyn IntakeStore, mail: &Mail, order_id: &str) -> Result<()> {
    let marker = mail_marker(&mail.id);
    if store.order_message_with_marker(order_id, &marker).await? {
        debug!(mail_id = %mail.id, order_id = %order_id, "Timeline message already present");
        return Ok(());
    }

    let body_text = if mail.text.trim().is_empty() {
        strip_html(&mail.html)
    } else {
        mail.text.trim().to_string()
    };
    let body = if body_text.is_empty() {
        marker
    } else {
        format!("{body_text}\n\n{marker}")
    };

    store
        .insert_order_message(&OrderMessage {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            sender: sender_line(mail),
            subject: mail.subject.clone(),
            body,
            date: mail.date,
            created_at: Utc::now(),
        })
        .await?;
    Ok(())
}

/// Insert the gallery entry for an attachment unless one already exists.
async fn ensure_image(
    store: &dyn IntakeStore,
    mail_id: &str,
    attachment: &Attachment,
    order_id: &str,
) -> Result<()> {
    let comment = attachment_comment(mail_id, &attachment.id);
    if store.order_image_with_comment(order_id, &comment).await? {
        return Ok(());
    }

    store
        .insert_order_image(&OrderImage {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            file_ref: attachment.file_ref.clone(),
            comment,
            created_at: Utc::now(),
        })
        .await?;
    Ok(())
}

fn sender_line(mail: &Mail) -> String {
    match (mail.from_name.trim(), mail.from_email.trim()) {
        ("", "") => "Unknown sender".to_string(),
        (name, "") => name.to_string(),
        ("", email) => email.to_string(),
        (name, email) => format!("{name} <{email}>"),
    }
}
