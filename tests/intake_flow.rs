//! End-to-end intake flow tests.
//!
//! Each test drives the public engine surface against a fresh in-memory
//! store: parse an .eml, extract and classify, correlate the order,
//! link artifacts and work with the specification rows.

use std::sync::Arc;

use chrono::{Datelike, Utc};

use mail_intake::classify::MailSignals;
use mail_intake::config::EngineConfig;
use mail_intake::engine::IntakeEngine;
use mail_intake::error::Error;
use mail_intake::extract::{FieldMap, fields};
use mail_intake::ingest;
use mail_intake::model::{Mail, NewAttachment, NewMail, OrderCategory};
use mail_intake::schema::StaticSchema;
use mail_intake::store::{IntakeStore, LibSqlStore};
use mail_intake::suggest::MailIdentity;

const REFRET_EML: &str = "From: Hans Maier <hans@example.com>\r\n\
Subject: Refret meiner Strat\r\n\
Date: Mon, 12 Jan 2026 10:30:00 +0100\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hallo,\r\n\
bitte einmal neue Bünde auf meine Strat.\r\n\
Mensur: 648 mm, Radius 9,5 Zoll, Griffbrett Ebenholz.\r\n\
Danke, Hans Maier\r\n\
--b\r\n\
Content-Type: image/jpeg\r\n\
Content-Disposition: attachment; filename=\"hals.jpg\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
/9j/4AAQSkZJRgABAQ==\r\n\
--b--\r\n";

const SETUP_EML: &str = "From: Petra Berg <petra@example.com>\r\n\
Subject: Gitarre einstellen\r\n\
Date: Tue, 13 Jan 2026 09:00:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Die Saitenlage ist zu hoch und es schnarrt ab dem 5. Bund.\r\n\
Saiten: 10-46 bitte.\r\n";

async fn engine_with_store() -> (IntakeEngine, Arc<LibSqlStore>) {
    let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let engine = IntakeEngine::new(
        store.clone(),
        Arc::new(StaticSchema::new()),
        EngineConfig::default(),
    );
    (engine, store)
}

/// Parse an .eml and insert it the way a mail feed would, with synthetic
/// storage references for the attachment bytes.
async fn ingest_eml(store: &LibSqlStore, raw: &str) -> Mail {
    let inbound = ingest::parse_inbound(raw.as_bytes()).unwrap();
    let attachments = inbound
        .attachments
        .iter()
        .enumerate()
        .map(|(i, a)| NewAttachment {
            filename: a.filename.clone(),
            mime_type: a.mime_type.clone(),
            file_ref: format!("blob/{i}"),
        })
        .collect();
    store
        .insert_mail(NewMail {
            subject: inbound.subject,
            from_name: inbound.from_name,
            from_email: inbound.from_email,
            date: inbound.date,
            text: inbound.text,
            html: inbound.html,
            attachments,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn eml_to_effective_spec() {
    let (engine, store) = engine_with_store().await;
    let mail = ingest_eml(&store, REFRET_EML).await;

    let extracted = engine.extract_fields(&mail.text, &mail.html);
    assert_eq!(extracted.get(fields::SCALE_LENGTH).unwrap(), "648 mm");
    assert_eq!(extracted.get(fields::FRETBOARD_RADIUS).unwrap(), "9.5\"");
    assert_eq!(extracted.get(fields::FRETBOARD_MATERIAL).unwrap(), "Ebony");

    let ranked = engine.classify(&MailSignals::from_mail(&mail), &extracted);
    assert_eq!(ranked[0].category, OrderCategory::Refret);
    assert!(ranked[0].score > ranked[1].score);

    let correlated = engine.ensure_order_from_mail(&mail.id).await.unwrap();
    assert_eq!(correlated.order.id, format!("W-{}-001", Utc::now().year()));

    engine
        .link_mail_artifacts(&mail.id, &correlated.order.id)
        .await
        .unwrap();
    engine
        .set_order_category(&correlated.order.id, OrderCategory::Refret)
        .await
        .unwrap();

    let suggestions = engine.build_suggestions(
        &MailIdentity::from_mail(&mail),
        &extracted,
        OrderCategory::Refret,
    );
    assert_eq!(suggestions.len(), 3);
    for suggestion in &suggestions {
        engine
            .write_spec(&correlated.order.id, &suggestion.field, &suggestion.value)
            .await
            .unwrap();
    }

    let spec = engine.effective_spec(&correlated.order.id).await.unwrap();
    assert_eq!(spec.get("mensur").unwrap(), "648 mm");
    assert_eq!(spec.get("griffbrettradius").unwrap(), "9.5\"");
    assert_eq!(spec.get("griffbrettmaterial").unwrap(), "Ebony");

    let messages = store.list_order_messages(&correlated.order.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.contains("neue Bünde"));
    let images = store.list_order_images(&correlated.order.id).await.unwrap();
    assert_eq!(images.len(), 1);
}

#[tokio::test]
async fn two_mails_get_sequential_orders_and_separate_customers() {
    let (engine, store) = engine_with_store().await;
    let year = Utc::now().year();
    let refret_mail = ingest_eml(&store, REFRET_EML).await;
    let setup_mail = ingest_eml(&store, SETUP_EML).await;

    let first = engine.ensure_order_from_mail(&refret_mail.id).await.unwrap();
    let second = engine.ensure_order_from_mail(&setup_mail.id).await.unwrap();

    assert_eq!(first.order.id, format!("W-{year}-001"));
    assert_eq!(second.order.id, format!("W-{year}-002"));
    assert_ne!(first.order.customer_id, second.order.customer_id);

    // Repeating the correlation does not mint a new order.
    let again = engine.ensure_order_from_mail(&refret_mail.id).await.unwrap();
    assert_eq!(again.order.id, first.order.id);
}

#[tokio::test]
async fn relinking_moves_artifacts_between_orders() {
    let (engine, store) = engine_with_store().await;
    let mail = ingest_eml(&store, REFRET_EML).await;
    let other = ingest_eml(&store, SETUP_EML).await;

    let order_a = engine.ensure_order_from_mail(&mail.id).await.unwrap().order;
    let order_b = engine.ensure_order_from_mail(&other.id).await.unwrap().order;

    engine.link_mail_artifacts(&mail.id, &order_a.id).await.unwrap();
    engine.link_mail_artifacts(&mail.id, &order_b.id).await.unwrap();

    assert!(store.list_order_messages(&order_a.id).await.unwrap().is_empty());
    assert!(store.list_order_images(&order_a.id).await.unwrap().is_empty());
    assert_eq!(store.list_order_messages(&order_b.id).await.unwrap().len(), 1);
    assert_eq!(store.list_order_images(&order_b.id).await.unwrap().len(), 1);

    let mail = store.get_mail(&mail.id).await.unwrap().unwrap();
    assert_eq!(mail.order_id.as_deref(), Some(order_b.id.as_str()));
}

#[tokio::test]
async fn legacy_alias_rows_migrate_on_order_load() {
    let (engine, store) = engine_with_store().await;
    let mail = ingest_eml(&store, SETUP_EML).await;
    let order = engine.ensure_order_from_mail(&mail.id).await.unwrap().order;

    // A row written under the pre-rename key, as an old client would.
    store
        .append_spec_entry(&order.id, "color", "Rot")
        .await
        .unwrap();

    engine.migrate_spec_schema(&order.id).await.unwrap();

    let spec = engine.effective_spec(&order.id).await.unwrap();
    assert_eq!(spec.get("farbe").unwrap(), "Rot");
    assert!(!spec.contains_key("color"));
}

#[tokio::test]
async fn spec_writes_validate_against_the_order_category() {
    let (engine, store) = engine_with_store().await;
    let mail = ingest_eml(&store, SETUP_EML).await;
    // Orders start in the default category (repair).
    let order = engine.ensure_order_from_mail(&mail.id).await.unwrap().order;

    let err = engine
        .write_spec(&order.id, "mensur", "648 mm")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {err:?}");

    engine
        .write_spec(&order.id, "schaden", "Riss in der Decke")
        .await
        .unwrap();
    let spec = engine.effective_spec(&order.id).await.unwrap();
    assert_eq!(spec.get("schaden").unwrap(), "Riss in der Decke");
}

#[tokio::test]
async fn classifier_ranking_is_total_even_for_irrelevant_mail() {
    let (engine, _store) = engine_with_store().await;

    let ranked = engine.classify(&MailSignals::default(), &FieldMap::new());
    assert_eq!(ranked.len(), OrderCategory::ALL.len());
    for (entry, expected) in ranked.iter().zip(OrderCategory::ALL) {
        assert_eq!(entry.category, expected);
        assert_eq!(entry.score, 0);
    }
}
