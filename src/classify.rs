//! Order-category classifier over mail signals.
//!
//! Each category owns a signal set: keyword regexes over subject and body,
//! attachment-name patterns, and the presence of certain extracted fields.
//! The score is a weighted count of matched signals; the result is always a
//! total ranking over every known category, down to score 0, so callers can
//! rely on a non-empty, deterministic list.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::extract::{FieldMap, fields, strip_html};
use crate::model::{Mail, OrderCategory};

/// A term that names the work itself.
const WEIGHT_SPECIFIC: u32 = 3;
/// An attachment filename hinting at the work.
const WEIGHT_ATTACHMENT: u32 = 2;
/// An extracted field typical for the category.
const WEIGHT_FIELD: u32 = 2;
/// A word that merely fits the topic.
const WEIGHT_GENERIC: u32 = 1;

/// The classifier's view of a mail.
#[derive(Debug, Clone, Default)]
pub struct MailSignals {
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<AttachmentMeta>,
}

/// Filename and MIME type of one attachment.
#[derive(Debug, Clone)]
pub struct AttachmentMeta {
    pub filename: String,
    pub mime_type: String,
}

impl MailSignals {
    pub fn from_mail(mail: &Mail) -> Self {
        Self {
            subject: mail.subject.clone(),
            text: mail.text.clone(),
            html: mail.html.clone(),
            attachments: mail
                .attachments
                .iter()
                .map(|a| AttachmentMeta {
                    filename: a.filename.clone(),
                    mime_type: a.mime_type.clone(),
                })
                .collect(),
        }
    }
}

/// One ranked classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub category: OrderCategory,
    pub score: u32,
}

/// A weighted keyword regex matched against subject plus body.
struct Keyword {
    regex: Regex,
    weight: u32,
}

/// All signals one category responds to.
struct CategorySignals {
    category: OrderCategory,
    keywords: Vec<Keyword>,
    attachment_names: Vec<Regex>,
    /// Photo attachments count as a weak hint for this category.
    image_attachments: bool,
    /// Extraction field names whose presence counts for this category.
    fields: Vec<&'static str>,
}

impl CategorySignals {
    fn score(&self, haystack: &str, attachments: &[AttachmentMeta], fields: &FieldMap) -> u32 {
        let mut score = 0;
        for kw in &self.keywords {
            if kw.regex.is_match(haystack) {
                score += kw.weight;
            }
        }
        for pattern in &self.attachment_names {
            if attachments.iter().any(|a| pattern.is_match(&a.filename)) {
                score += WEIGHT_ATTACHMENT;
            }
        }
        if self.image_attachments
            && attachments.iter().any(|a| a.mime_type.starts_with("image/"))
        {
            score += WEIGHT_GENERIC;
        }
        for field in &self.fields {
            if fields.contains_key(*field) {
                score += WEIGHT_FIELD;
            }
        }
        score
    }
}

/// Deterministic keyword/heuristic classifier.
pub struct Classifier {
    signals: Vec<CategorySignals>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Build the classifier with the built-in signal sets. Patterns are
    /// literals, so compilation cannot fail at runtime.
    pub fn new() -> Self {
        let specific = |pattern: &str| Keyword {
            regex: Regex::new(pattern).unwrap(),
            weight: WEIGHT_SPECIFIC,
        };
        let generic = |pattern: &str| Keyword {
            regex: Regex::new(pattern).unwrap(),
            weight: WEIGHT_GENERIC,
        };
        let name = |pattern: &str| Regex::new(pattern).unwrap();

        let signals = vec![
            CategorySignals {
                category: OrderCategory::Refret,
                keywords: vec![
                    specific(r"(?i)\brefret\w*\b|\bneu\s*bundier\w*\b|\bbundier\w*\b"),
                    specific(r"(?i)\bbünde\b|\bbuende\b|\bbunddraht\b|\bfretwire\b|\bfrets\b|\bfret\s*(?:job|work)\b"),
                    // Fretboard woods name refret work more often than not.
                    specific(r"(?i)\bebenholz\b|\bebony\b|\bpalisander\b|\brosewood\b|\bpau[\s-]?ferro\b"),
                    generic(r"(?i)\bgriffbrett\w*\b|\bfretboard\b|\babgespielt\b|\bworn\b"),
                ],
                attachment_names: vec![name(r"(?i)fret|bund")],
                image_attachments: false,
                fields: vec![fields::FRETBOARD_RADIUS, fields::FRETBOARD_MATERIAL],
            },
            CategorySignals {
                category: OrderCategory::Setup,
                keywords: vec![
                    specific(r"(?i)\bsetup\b|\beinstellung\b|\beinstellen\b|\bsaitenlage\b"),
                    specific(r"(?i)\boktavreinheit\b|\bintonation\b|\btruss\s*rod\b|\bhalsstab\b"),
                    generic(r"(?i)\bschnarr\w*\b|\bbuzz\w*\b|\bbespielbarkeit\b|\bplayability\b"),
                ],
                attachment_names: vec![name(r"(?i)setup")],
                image_attachments: false,
                fields: vec![fields::STRING_GAUGE],
            },
            CategorySignals {
                category: OrderCategory::Electronics,
                keywords: vec![
                    specific(r"(?i)\btonabnehmer\b|\bpickups?\b|\belektronik\b|\belectronics?\b"),
                    specific(r"(?i)\bpotis?\b|\bpotentiometer\b|\bverkabelung\b|\bwiring\b|\bschaltung\b"),
                    specific(r"(?i)\bklinkenbuchse\b|\boutput\s*jack\b"),
                    generic(r"(?i)\bbrummt?\b|\bhum(?:ming)?\b|\bkratzt\b|\bcrackl\w*\b|\bwackelkontakt\b"),
                ],
                attachment_names: vec![name(r"(?i)wiring|schaltplan")],
                image_attachments: false,
                fields: vec![],
            },
            CategorySignals {
                category: OrderCategory::Finish,
                keywords: vec![
                    specific(r"(?i)\blackier\w*\b|\black\b|\bnitro(?:lack)?\b|\brefinish\w*\b|\bfinish\b"),
                    specific(r"(?i)\bpolier\w*\b|\bpolish\w*\b|\brelic\w*\b"),
                    generic(r"(?i)\bfarbe\b|\bcolou?r\b|\bkratzer\b|\bscratch\w*\b|\bmatt\b|\bgloss\w*\b"),
                ],
                attachment_names: vec![name(r"(?i)farbe|color|finish|lack")],
                image_attachments: true,
                fields: vec![fields::COLOR],
            },
            CategorySignals {
                category: OrderCategory::CustomBuild,
                keywords: vec![
                    specific(r"(?i)\bcustom\s*(?:build|bau|shop|guitar)\b|\bneubau\b|\bkomplettbau\b"),
                    specific(r"(?i)\b(?:sonder|maß|mass)anfertigung\b|\bbauen\s+lassen\b"),
                    generic(r"(?i)\bkorpus\b|\bbody\b|\bhals\b|\bneck\b|\bmensur\b|\bscale\s*length\b"),
                ],
                attachment_names: vec![name(r"(?i)entwurf|design|sketch|zeichnung")],
                image_attachments: false,
                fields: vec![fields::SCALE_LENGTH],
            },
            CategorySignals {
                category: OrderCategory::Repair,
                keywords: vec![
                    specific(r"(?i)\bkopfplattenbruch\b|\bheadstock\s*break\b|\bhalsbruch\b|\bneck\s*reset\b"),
                    // "repair" alone is how people describe almost anything.
                    generic(r"(?i)\breparatur\b|\breparieren\b|\brepair\w*\b|\bdefekt\b"),
                    generic(r"(?i)\bkaputt\b|\bgebrochen\b|\bbroken\b|\briss\b|\bcrack\w*\b|\bbruch\b|\bschaden\b|\bdamage\w*\b"),
                ],
                attachment_names: vec![name(r"(?i)schaden|damage|bruch|crack")],
                image_attachments: true,
                fields: vec![],
            },
        ];

        Self { signals }
    }

    /// Rank every known category against the mail.
    ///
    /// The result always contains each category exactly once, sorted by
    /// score descending with ties broken by the fixed category priority.
    pub fn classify(&self, mail: &MailSignals, fields: &FieldMap) -> Vec<CategoryScore> {
        let mut haystack = format!("{}\n{}", mail.subject, mail.text);
        if !mail.html.trim().is_empty() {
            haystack.push('\n');
            haystack.push_str(&strip_html(&mail.html));
        }

        let mut ranked: Vec<CategoryScore> = OrderCategory::ALL
            .iter()
            .map(|&category| {
                let score = self
                    .signals
                    .iter()
                    .find(|s| s.category == category)
                    .map(|s| s.score(&haystack, &mail.attachments, fields))
                    .unwrap_or(0);
                CategoryScore { category, score }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.category.priority().cmp(&b.category.priority()))
        });

        if let Some(top) = ranked.first() {
            debug!(category = %top.category, score = top.score, "Mail classified");
        }
        ranked
    }
}
