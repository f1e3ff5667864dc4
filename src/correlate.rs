//! Mail-to-order correlation: get-or-create the order a mail belongs to.
//!
//! Order IDs are year-scoped sequence numbers (`PREFIX-YYYY-NNN`). The ID
//! is derived from the most recently created order and claimed by insert;
//! the primary key rejects a concurrent duplicate, in which case the
//! sequence is re-read and the insert retried.

use chrono::{Datelike, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{DatabaseError, Error, Result};
use crate::model::{Customer, Mail, NewCustomer, Order, OrderStatus};
use crate::store::IntakeStore;

/// Attempts before giving up on ID allocation.
const MAX_ID_ATTEMPTS: u32 = 5;

/// The result of correlating a mail: the owning order and the mail with
/// its link set.
#[derive(Debug, Clone)]
pub struct CorrelatedOrder {
    pub order: Order,
    pub mail: Mail,
}

/// Get or create the order for a mail.
///
/// A mail that already references an order short-circuits to that order;
/// a reference to a missing order is a data-integrity violation and is
/// surfaced, never repaired. Otherwise a customer is found or created
/// from the sender identity and a fresh order is allocated.
pub async fn ensure_order_from_mail(
    store: &dyn IntakeStore,
    config: &EngineConfig,
    mail_id: &str,
) -> Result<CorrelatedOrder> {
    let Some(mut mail) = store.get_mail(mail_id).await? else {
        return Err(Error::not_found("mail", mail_id));
    };

    if let Some(order_id) = &mail.order_id {
        let Some(order) = store.get_order(order_id).await? else {
            return Err(Error::DataIntegrity(format!(
                "mail {mail_id} references missing order {order_id}"
            )));
        };
        debug!(mail_id = %mail_id, order_id = %order.id, "Mail already linked to order");
        return Ok(CorrelatedOrder { order, mail });
    }

    let customer = find_or_create_customer(store, config, &mail).await?;
    let order = create_order(store, config, &mail, &customer).await?;
    store.set_mail_order(&mail.id, Some(&order.id)).await?;
    mail.order_id = Some(order.id.clone());

    info!(mail_id = %mail_id, order_id = %order.id, "Order created from mail");
    Ok(CorrelatedOrder { order, mail })
}

/// Look the customer up by the sender address, creating one if absent.
/// The customer name falls back from display name to address to a fixed
/// placeholder.
async fn find_or_create_customer(
    store: &dyn IntakeStore,
    config: &EngineConfig,
    mail: &Mail,
) -> Result<Customer> {
    let email = mail.from_email.trim().to_lowercase();
    if !email.is_empty()
        && let Some(customer) = store.find_customer_by_email(&email).await?
    {
        debug!(customer_id = %customer.id, "Customer found by email");
        return Ok(customer);
    }

    let name = if !mail.from_name.trim().is_empty() {
        mail.from_name.trim().to_string()
    } else if !email.is_empty() {
        email.clone()
    } else {
        config.placeholder_customer.clone()
    };

    let customer = store
        .insert_customer(NewCustomer {
            name,
            email,
            ..Default::default()
        })
        .await?;
    info!(customer_id = %customer.id, "Customer created for sender");
    Ok(customer)
}

/// Allocate an order ID and insert the order, retrying on ID conflicts.
async fn create_order(
    store: &dyn IntakeStore,
    config: &EngineConfig,
    mail: &Mail,
    customer: &Customer,
) -> Result<Order> {
    let title = if mail.subject.trim().is_empty() {
        config.fallback_order_title.clone()
    } else {
        mail.subject.trim().to_string()
    };
    let year = Utc::now().year();

    for attempt in 0..MAX_ID_ATTEMPTS {
        let latest = store.latest_order_id().await?;
        let order = Order {
            id: next_order_id(&config.order_prefix, year, latest.as_deref()),
            category: config.default_category,
            status: OrderStatus::default(),
            title: title.clone(),
            customer_id: customer.id.clone(),
            assignee_id: None,
            created_at: Utc::now(),
        };

        match store.insert_order(&order).await {
            Ok(()) => return Ok(order),
            Err(DatabaseError::Conflict(_)) => {
                warn!(order_id = %order.id, attempt, "Order id already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Database(DatabaseError::Conflict(format!(
        "could not allocate an order id after {MAX_ID_ATTEMPTS} attempts"
    ))))
}

/// Next ID in the year-scoped sequence. The sequence continues from the
/// latest order when its ID matches `PREFIX-YYYY-NNN` for the current
/// year and restarts at 1 otherwise.
fn next_order_id(prefix: &str, year: i32, latest: Option<&str>) -> String {
    let sequence = latest
        .and_then(|id| parse_order_id(prefix, id))
        .filter(|(id_year, _)| *id_year == year)
        .map(|(_, n)| n + 1)
        .unwrap_or(1);
    format!("{prefix}-{year}-{sequence:03}")
}

fn parse_order_id(prefix: &str, id: &str) -> Option<(i32, u32)> {
    let rest = id.strip_prefix(prefix)?.strip_prefix('-')?;
    let (year_str, seq_str) = rest.split_once('-')?;
    if year_str.len() != 4 {
        return None;
    }
    Some((year_str.parse().ok()?, seq_str.parse().ok()?))
}
