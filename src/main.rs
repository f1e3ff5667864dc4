//! Demo binary: analyze an `.eml` file against the intake engine and,
//! with `--commit`, turn it into a workshop order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use uuid::Uuid;

use mail_intake::classify::{AttachmentMeta, MailSignals};
use mail_intake::config::EngineConfig;
use mail_intake::engine::IntakeEngine;
use mail_intake::ingest::{self, InboundMail};
use mail_intake::model::{NewAttachment, NewMail, OrderCategory};
use mail_intake::schema::StaticSchema;
use mail_intake::store::{IntakeStore, LibSqlStore};
use mail_intake::suggest::MailIdentity;

struct Args {
    eml_path: PathBuf,
    commit: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = parse_args();

    let db_path =
        std::env::var("MAIL_INTAKE_DB").unwrap_or_else(|_| "./data/mail-intake.db".to_string());

    if !args.json {
        eprintln!("📬 Mail Intake v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("   Database: {}", db_path);
        eprintln!("   Mail: {}", args.eml_path.display());
    }

    let store = Arc::new(
        LibSqlStore::new_local(Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );
    let engine = IntakeEngine::new(
        store.clone(),
        Arc::new(StaticSchema::new()),
        EngineConfig::from_env(),
    );

    // ── Analysis ─────────────────────────────────────────────────────
    let raw = std::fs::read(&args.eml_path)
        .with_context(|| format!("read {}", args.eml_path.display()))?;
    let inbound = ingest::parse_inbound(&raw)?;

    let fields = engine.extract_fields(&inbound.text, &inbound.html);
    let signals = MailSignals {
        subject: inbound.subject.clone(),
        text: inbound.text.clone(),
        html: inbound.html.clone(),
        attachments: inbound
            .attachments
            .iter()
            .map(|a| AttachmentMeta {
                filename: a.filename.clone(),
                mime_type: a.mime_type.clone(),
            })
            .collect(),
    };
    let ranked = engine.classify(&signals, &fields);
    let top = ranked
        .first()
        .map(|r| r.category)
        .unwrap_or(OrderCategory::Repair);

    let identity = MailIdentity {
        id: "unsaved".to_string(),
        subject: inbound.subject.clone(),
        date: inbound.date,
    };
    let suggestions = engine.build_suggestions(&identity, &fields, top);

    if args.json {
        let document = serde_json::json!({
            "subject": inbound.subject,
            "from": { "name": inbound.from_name, "email": inbound.from_email },
            "fields": fields,
            "ranking": ranked,
            "suggestions": suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("\nSubject: {}", inbound.subject);
    println!("From:    {} <{}>", inbound.from_name, inbound.from_email);
    println!("\nExtracted fields:");
    for (key, value) in &fields {
        println!("  {key:<20} {value}");
    }
    if fields.is_empty() {
        println!("  (none)");
    }
    println!("\nCategory ranking:");
    for entry in &ranked {
        println!("  {:<13} {}", entry.category.to_string(), entry.score);
    }
    println!("\nSuggested {top} spec:");
    for suggestion in &suggestions {
        println!("  {:<20} {}", suggestion.field, suggestion.value);
    }
    if suggestions.is_empty() {
        println!("  (none)");
    }

    if !args.commit {
        println!("\nDry run. Pass --commit to create the order.");
        return Ok(());
    }

    // ── Commit ───────────────────────────────────────────────────────
    let attachment_dir = Path::new(&db_path)
        .parent()
        .unwrap_or(Path::new("."))
        .join("attachments");
    let new_mail = persist_inbound(inbound, &attachment_dir)?;
    let mail = store.insert_mail(new_mail).await?;

    let correlated = engine.ensure_order_from_mail(&mail.id).await?;
    engine
        .link_mail_artifacts(&mail.id, &correlated.order.id)
        .await?;
    if top != correlated.order.category {
        engine.set_order_category(&correlated.order.id, top).await?;
    }
    for suggestion in &suggestions {
        engine
            .write_spec(&correlated.order.id, &suggestion.field, &suggestion.value)
            .await?;
    }
    engine.migrate_spec_schema(&correlated.order.id).await?;
    engine.mark_mail_read(&mail.id, true).await?;

    let spec = engine.effective_spec(&correlated.order.id).await?;
    println!("\nOrder {} ({top}):", correlated.order.id);
    for (key, value) in &spec {
        println!("  {key:<20} {value}");
    }
    if spec.is_empty() {
        println!("  (no spec values)");
    }

    Ok(())
}

fn parse_args() -> Args {
    let mut eml_path = None;
    let mut commit = false;
    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--commit" => commit = true,
            "--json" => json = true,
            "--help" | "-h" => {
                println!("Usage: mail-intake <mail.eml> [--commit | --json]");
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {arg}");
                std::process::exit(2);
            }
            _ => eml_path = Some(PathBuf::from(arg)),
        }
    }
    let Some(eml_path) = eml_path else {
        eprintln!("Usage: mail-intake <mail.eml> [--commit | --json]");
        std::process::exit(2);
    };
    if commit && json {
        eprintln!("--json prints the analysis only and cannot be combined with --commit");
        std::process::exit(2);
    }
    Args {
        eml_path,
        commit,
        json,
    }
}

/// Store attachment bytes on disk and turn the parsed mail into an
/// insertable record; the written paths become the file references.
fn persist_inbound(inbound: InboundMail, dir: &Path) -> anyhow::Result<NewMail> {
    if !inbound.attachments.is_empty() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let mut attachments = Vec::with_capacity(inbound.attachments.len());
    for attachment in &inbound.attachments {
        let safe_name = attachment.filename.replace(['/', '\\'], "_");
        let path = dir.join(format!("{}-{}", Uuid::new_v4(), safe_name));
        std::fs::write(&path, &attachment.data)
            .with_context(|| format!("write {}", path.display()))?;
        attachments.push(NewAttachment {
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            file_ref: path.to_string_lossy().into_owned(),
        });
    }

    Ok(NewMail {
        subject: inbound.subject,
        from_name: inbound.from_name,
        from_email: inbound.from_email,
        date: inbound.date,
        text: inbound.text,
        html: inbound.html,
        attachments,
    })
}
