//! Intake engine facade.
//!
//! Bundles the extractor, classifier and suggestion builder with the
//! store-backed operations behind a single handle for a thin HTTP/UI
//! layer. The analysis calls are pure; everything else goes through
//! the injected [`IntakeStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::artifacts;
use crate::classify::{CategoryScore, Classifier, MailSignals};
use crate::config::EngineConfig;
use crate::correlate::{self, CorrelatedOrder};
use crate::error::{Error, Result};
use crate::extract::{FieldExtractor, FieldMap};
use crate::model::{OrderCategory, SpecEntry, Suggestion};
use crate::schema::SchemaRegistry;
use crate::specs;
use crate::store::IntakeStore;
use crate::suggest::{self, MailIdentity};

pub struct IntakeEngine {
    store: Arc<dyn IntakeStore>,
    schema: Arc<dyn SchemaRegistry>,
    config: EngineConfig,
    extractor: FieldExtractor,
    classifier: Classifier,
}

impl IntakeEngine {
    pub fn new(
        store: Arc<dyn IntakeStore>,
        schema: Arc<dyn SchemaRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            schema,
            config,
            extractor: FieldExtractor::new(),
            classifier: Classifier::new(),
        }
    }

    // ── Pure analysis ───────────────────────────────────────────────

    /// Extract normalized specification fields from mail bodies.
    pub fn extract_fields(&self, text: &str, html: &str) -> FieldMap {
        self.extractor.extract(text, html)
    }

    /// Rank every order category for a mail, best first.
    pub fn classify(&self, signals: &MailSignals, fields: &FieldMap) -> Vec<CategoryScore> {
        self.classifier.classify(signals, fields)
    }

    /// Propose spec values for a category from extracted fields.
    pub fn build_suggestions(
        &self,
        mail: &MailIdentity,
        fields: &FieldMap,
        category: OrderCategory,
    ) -> Vec<Suggestion> {
        suggest::build_suggestions(self.schema.as_ref(), mail, fields, category)
    }

    // ── Store-backed operations ─────────────────────────────────────

    /// Get or create the order a mail belongs to.
    pub async fn ensure_order_from_mail(&self, mail_id: &str) -> Result<CorrelatedOrder> {
        correlate::ensure_order_from_mail(self.store.as_ref(), &self.config, mail_id).await
    }

    /// Project a mail into an order's timeline and gallery.
    pub async fn link_mail_artifacts(&self, mail_id: &str, order_id: &str) -> Result<()> {
        artifacts::link_mail_artifacts(self.store.as_ref(), mail_id, order_id).await
    }

    /// Bring an order's spec rows in line with the current schema.
    pub async fn migrate_spec_schema(&self, order_id: &str) -> Result<()> {
        specs::migrate_spec_schema(self.store.as_ref(), self.schema.as_ref(), order_id).await
    }

    /// The order's effective specification map.
    pub async fn effective_spec(&self, order_id: &str) -> Result<BTreeMap<String, String>> {
        specs::effective_spec(self.store.as_ref(), order_id).await
    }

    /// Append a validated specification value.
    pub async fn write_spec(&self, order_id: &str, key: &str, value: &str) -> Result<SpecEntry> {
        specs::write_spec(self.store.as_ref(), self.schema.as_ref(), order_id, key, value).await
    }

    /// Set or clear the read flag on a mail.
    pub async fn mark_mail_read(&self, mail_id: &str, read: bool) -> Result<()> {
        if self.store.get_mail(mail_id).await?.is_none() {
            return Err(Error::not_found("mail", mail_id));
        }
        self.store.mark_mail_read(mail_id, read).await?;
        Ok(())
    }

    /// Change an order's category. Spec rows are not touched here; the
    /// next migration run prunes what the new category disallows.
    pub async fn set_order_category(&self, order_id: &str, category: OrderCategory) -> Result<()> {
        let Some(order) = self.store.get_order(order_id).await? else {
            return Err(Error::not_found("order", order_id));
        };
        self.store.update_order_category(order_id, category).await?;
        debug!(
            order_id = %order_id,
            from = %order.category,
            to = %category,
            "Order category changed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewMail, OrderStatus};
    use crate::schema::StaticSchema;
    use crate::store::LibSqlStore;
    use chrono::Utc;

    async fn engine() -> (IntakeEngine, Arc<LibSqlStore>) {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let engine = IntakeEngine::new(
            store.clone(),
            Arc::new(StaticSchema::new()),
            EngineConfig::default(),
        );
        (engine, store)
    }

    fn plain_mail(text: &str) -> NewMail {
        NewMail {
            subject: "Anfrage".into(),
            from_name: "Hans".into(),
            from_email: "hans@example.com".into(),
            date: Utc::now(),
            text: text.into(),
            html: String::new(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn analysis_calls_compose() {
        let (engine, _store) = engine().await;
        let fields = engine.extract_fields("Mensur: 648 mm bitte", "");
        let identity = MailIdentity {
            id: "m1".into(),
            subject: "Anfrage".into(),
            date: Utc::now(),
        };
        let suggestions =
            engine.build_suggestions(&identity, &fields, OrderCategory::Refret);
        assert!(
            suggestions
                .iter()
                .any(|s| s.field == "mensur" && s.value == "648 mm")
        );
    }

    #[tokio::test]
    async fn mark_mail_read_requires_an_existing_mail() {
        let (engine, store) = engine().await;
        let mail = store.insert_mail(plain_mail("Hallo")).await.unwrap();

        engine.mark_mail_read(&mail.id, true).await.unwrap();
        assert!(store.get_mail(&mail.id).await.unwrap().unwrap().is_read);

        let err = engine.mark_mail_read("no-such-mail", true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn set_order_category_updates_an_existing_order() {
        let (engine, store) = engine().await;
        let mail = store.insert_mail(plain_mail("Hallo")).await.unwrap();
        let correlated = engine.ensure_order_from_mail(&mail.id).await.unwrap();

        engine
            .set_order_category(&correlated.order.id, OrderCategory::Refret)
            .await
            .unwrap();
        let order = store.get_order(&correlated.order.id).await.unwrap().unwrap();
        assert_eq!(order.category, OrderCategory::Refret);
        assert_eq!(order.status, OrderStatus::Inbox);

        let err = engine
            .set_order_category("W-0000-001", OrderCategory::Setup)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {err:?}");
    }
}
