//! Specification store logic: effective-value resolution and alias-based
//! schema migration.
//!
//! Specification rows are append-only and several rows may share an
//! `(order, key)`. Readers never see the raw rows; they see the effective
//! map computed by [`resolve_effective`]. Schema evolution is handled by
//! [`migrate_spec_schema`], which renames aliased keys and prunes keys the
//! current category no longer allows. Migration is idempotent, so
//! concurrent runs for the same order converge on the same result.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{OrderCategory, SpecEntry};
use crate::schema::SchemaRegistry;
use crate::store::IntakeStore;

/// Resolve the effective value per key: the longest value wins, ties go
/// to the row with the greater rowid (the more recent write).
pub fn resolve_effective(rows: &[SpecEntry]) -> BTreeMap<String, String> {
    let mut best: BTreeMap<&str, &SpecEntry> = BTreeMap::new();
    for row in rows {
        match best.get(row.key.as_str()) {
            Some(current) => {
                let wins = row.value.len() > current.value.len()
                    || (row.value.len() == current.value.len() && row.row_id > current.row_id);
                if wins {
                    best.insert(row.key.as_str(), row);
                }
            }
            None => {
                best.insert(row.key.as_str(), row);
            }
        }
    }
    best.into_iter()
        .map(|(key, row)| (key.to_string(), row.value.clone()))
        .collect()
}

/// The physical changes one schema migration will apply.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Keys whose rows are deleted.
    pub drop_keys: Vec<String>,
    /// `(key, value)` pairs inserted for renamed keys.
    pub writes: Vec<(String, String)>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.drop_keys.is_empty() && self.writes.is_empty()
    }
}

/// Compute the migration plan for one order's rows.
///
/// Aliased keys are renamed to their canonical name unless the canonical
/// key already carries a value (the canonical value always wins, the alias
/// is dropped). Afterwards every key outside the category's allowed set is
/// dropped. An empty plan means the rows already match the schema.
pub fn plan_migration(
    rows: &[SpecEntry],
    schema: &dyn SchemaRegistry,
    category: OrderCategory,
) -> MigrationPlan {
    let effective = resolve_effective(rows);
    let mut result = effective.clone();
    let mut drop_keys: Vec<String> = Vec::new();
    let mut writes: Vec<(String, String)> = Vec::new();

    for (old_key, new_key) in schema.aliases() {
        if let Some(value) = result.get(*old_key).cloned() {
            if !result.contains_key(*new_key) {
                result.insert((*new_key).to_string(), value.clone());
                writes.push(((*new_key).to_string(), value));
            }
            result.remove(*old_key);
            drop_keys.push((*old_key).to_string());
        }
    }

    let keys: Vec<String> = result.keys().cloned().collect();
    for key in keys {
        if !schema.is_allowed(category, &key) {
            result.remove(&key);
            if writes.iter().any(|(k, _)| *k == key) {
                // A rename whose target is not allowed either: the old
                // rows are already dropped, just skip the insert.
                writes.retain(|(k, _)| *k != key);
            } else {
                drop_keys.push(key);
            }
        }
    }

    if result == effective {
        return MigrationPlan::default();
    }
    MigrationPlan { drop_keys, writes }
}

/// The effective specification map of one order.
pub async fn effective_spec(
    store: &dyn IntakeStore,
    order_id: &str,
) -> Result<BTreeMap<String, String>> {
    let rows = store.list_spec_entries(order_id).await?;
    Ok(resolve_effective(&rows))
}

/// Migrate one order's specification rows to the current schema.
///
/// A missing order is nothing to do, not an error. The write is one
/// atomic transaction and is skipped entirely when the rows already
/// match the schema.
pub async fn migrate_spec_schema(
    store: &dyn IntakeStore,
    schema: &dyn SchemaRegistry,
    order_id: &str,
) -> Result<()> {
    let Some(order) = store.get_order(order_id).await? else {
        debug!(order_id = %order_id, "No order to migrate");
        return Ok(());
    };

    let rows = store.list_spec_entries(order_id).await?;
    let plan = plan_migration(&rows, schema, order.category);
    if plan.is_empty() {
        debug!(order_id = %order_id, "Specification already matches schema");
        return Ok(());
    }

    info!(
        order_id = %order_id,
        dropped = plan.drop_keys.len(),
        renamed = plan.writes.len(),
        "Migrating specification keys"
    );
    store
        .apply_spec_migration(order_id, &plan.drop_keys, &plan.writes)
        .await?;
    Ok(())
}

/// Append one validated specification value.
///
/// The key must be allowed for the order's current category; anything
/// else is rejected before any write.
pub async fn write_spec(
    store: &dyn IntakeStore,
    schema: &dyn SchemaRegistry,
    order_id: &str,
    key: &str,
    value: &str,
) -> Result<SpecEntry> {
    let Some(order) = store.get_order(order_id).await? else {
        return Err(Error::not_found("order", order_id));
    };
    if !schema.is_allowed(order.category, key) {
        return Err(Error::Validation(format!(
            "field '{key}' is not allowed for category '{}'",
            order.category
        )));
    }
    Ok(store.append_spec_entry(order_id, key, value).await?)
}
