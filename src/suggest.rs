//! Suggestion builder: extracted fields to schema-filtered proposals.
//!
//! Suggestions are advisory and transient. Nothing here persists; a
//! suggestion only becomes a specification row once a caller explicitly
//! writes it.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::extract::{FieldMap, fields};
use crate::model::{Mail, OrderCategory, Suggestion};
use crate::schema::SchemaRegistry;

/// Fixed mapping from schema keys to the extraction fields that feed them.
/// Schema keys without a source here are never suggested automatically.
const FIELD_SOURCES: &[(&str, &str)] = &[
    ("mensur", fields::SCALE_LENGTH),
    ("griffbrettradius", fields::FRETBOARD_RADIUS),
    ("griffbrettmaterial", fields::FRETBOARD_MATERIAL),
    ("farbe", fields::COLOR),
    ("saitenstaerke", fields::STRING_GAUGE),
];

/// The mail a batch of suggestions was derived from.
#[derive(Debug, Clone)]
pub struct MailIdentity {
    pub id: String,
    pub subject: String,
    pub date: DateTime<Utc>,
}

impl MailIdentity {
    pub fn from_mail(mail: &Mail) -> Self {
        Self {
            id: mail.id.clone(),
            subject: mail.subject.clone(),
            date: mail.date,
        }
    }
}

/// Propose specification values for one category.
///
/// Iterates the category's allowed fields in declared order and emits a
/// suggestion wherever the mapped extraction field carries a value.
pub fn build_suggestions(
    schema: &dyn SchemaRegistry,
    mail: &MailIdentity,
    extracted: &FieldMap,
    category: OrderCategory,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for key in schema.allowed_fields(category) {
        let source = FIELD_SOURCES
            .iter()
            .find(|(schema_key, _)| schema_key == key);
        if let Some((_, source)) = source
            && let Some(value) = extracted.get(*source)
        {
            suggestions.push(Suggestion {
                field: (*key).to_string(),
                value: value.clone(),
            });
        }
    }

    debug!(
        mail_id = %mail.id,
        category = %category,
        count = suggestions.len(),
        "Suggestions built"
    );
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StaticSchema;

    fn identity() -> MailIdentity {
        MailIdentity {
            id: "mail-1".into(),
            subject: "Refret".into(),
            date: Utc::now(),
        }
    }

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_extraction_fields_to_schema_keys() {
        let schema = StaticSchema::new();
        let extracted = map(&[
            (fields::SCALE_LENGTH, "648 mm"),
            (fields::FRETBOARD_RADIUS, "12\""),
        ]);
        let suggestions =
            build_suggestions(&schema, &identity(), &extracted, OrderCategory::Refret);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].field, "mensur");
        assert_eq!(suggestions[0].value, "648 mm");
        assert_eq!(suggestions[1].field, "griffbrettradius");
        assert_eq!(suggestions[1].value, "12\"");
    }

    #[test]
    fn restricted_to_the_categorys_allowed_fields() {
        let schema = StaticSchema::new();
        // Color is extracted but not part of the Setup schema.
        let extracted = map(&[(fields::COLOR, "Black"), (fields::STRING_GAUGE, "10-46")]);
        let suggestions =
            build_suggestions(&schema, &identity(), &extracted, OrderCategory::Setup);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].field, "saitenstaerke");
    }

    #[test]
    fn unmapped_schema_keys_are_never_suggested() {
        let schema = StaticSchema::new();
        let extracted = map(&[
            (fields::SCALE_LENGTH, "628 mm"),
            (fields::CONTACT_EMAIL, "x@example.com"),
        ]);
        let suggestions =
            build_suggestions(&schema, &identity(), &extracted, OrderCategory::Refret);
        // Only mensur has a source; bunddraht etc. stay untouched.
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].field, "mensur");
    }

    #[test]
    fn missing_values_yield_no_suggestion() {
        let schema = StaticSchema::new();
        let suggestions =
            build_suggestions(&schema, &identity(), &FieldMap::new(), OrderCategory::Finish);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn order_follows_schema_declaration() {
        let schema = StaticSchema::new();
        let extracted = map(&[
            (fields::COLOR, "Sunburst"),
            (fields::SCALE_LENGTH, "648 mm"),
            (fields::FRETBOARD_MATERIAL, "Maple"),
        ]);
        let suggestions =
            build_suggestions(&schema, &identity(), &extracted, OrderCategory::CustomBuild);
        let keys: Vec<&str> = suggestions.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(keys, vec!["mensur", "griffbrettmaterial", "farbe"]);
    }

    #[test]
    fn builder_is_pure() {
        let schema = StaticSchema::new();
        let extracted = map(&[(fields::COLOR, "Red")]);
        let first = build_suggestions(&schema, &identity(), &extracted, OrderCategory::Finish);
        let second = build_suggestions(&schema, &identity(), &extracted, OrderCategory::Finish);
        assert_eq!(first, second);
    }
}
