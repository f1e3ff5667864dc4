//! Category schema registry — the declarative category→allowed-field and
//! field→label tables the engine treats as read-only input.
//!
//! Injected as a trait so tests (and a future admin UI) can substitute
//! their own tables without touching engine code.

use crate::model::OrderCategory;

/// Read-only lookup interface for the specification schema.
pub trait SchemaRegistry: Send + Sync {
    /// Allowed specification keys for a category, in display order.
    fn allowed_fields(&self, category: OrderCategory) -> &[&'static str];

    /// Human-readable label for a field key.
    fn field_label(&self, key: &str) -> Option<&'static str>;

    /// Global alias table (`old key → new key`) from past schema renames.
    fn aliases(&self) -> &[(&'static str, &'static str)];

    /// Whether `key` is valid for `category` under the current schema.
    fn is_allowed(&self, category: OrderCategory, key: &str) -> bool {
        self.allowed_fields(category).contains(&key)
    }
}

/// The built-in production schema.
#[derive(Default)]
pub struct StaticSchema;

impl StaticSchema {
    pub fn new() -> Self {
        Self
    }
}

/// Field→label table. Keys are the canonical specification keys; older
/// keys only appear in [`ALIASES`].
const LABELS: &[(&str, &str)] = &[
    ("mensur", "Scale length"),
    ("griffbrettradius", "Fretboard radius"),
    ("griffbrettmaterial", "Fretboard material"),
    ("farbe", "Color"),
    ("bunddraht", "Fret wire"),
    ("saitenlage", "Action"),
    ("saitenstaerke", "String gauge"),
    ("tonabnehmer", "Pickups"),
    ("schaltung", "Wiring"),
    ("lackart", "Finish type"),
    ("korpusmaterial", "Body wood"),
    ("schaden", "Damage description"),
];

/// Renames from earlier schema revisions. Applied in order; a canonical
/// value always wins over an aliased one.
const ALIASES: &[(&str, &str)] = &[
    ("color", "farbe"),
    ("scale", "mensur"),
    ("radius", "griffbrettradius"),
    ("fretwire", "bunddraht"),
    ("pickup", "tonabnehmer"),
    ("finish", "lackart"),
];

impl SchemaRegistry for StaticSchema {
    fn allowed_fields(&self, category: OrderCategory) -> &[&'static str] {
        match category {
            OrderCategory::Refret => {
                &["mensur", "griffbrettradius", "griffbrettmaterial", "bunddraht"]
            }
            OrderCategory::Setup => &["mensur", "saitenlage", "saitenstaerke"],
            OrderCategory::Electronics => &["tonabnehmer", "schaltung"],
            OrderCategory::Finish => &["farbe", "lackart"],
            OrderCategory::CustomBuild => &[
                "mensur",
                "griffbrettradius",
                "griffbrettmaterial",
                "korpusmaterial",
                "farbe",
                "saitenstaerke",
            ],
            OrderCategory::Repair => &["schaden", "farbe"],
        }
    }

    fn field_label(&self, key: &str) -> Option<&'static str> {
        LABELS.iter().find(|(k, _)| *k == key).map(|(_, l)| *l)
    }

    fn aliases(&self) -> &[(&'static str, &'static str)] {
        ALIASES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_fields() {
        for cat in OrderCategory::ALL {
            assert!(
                !StaticSchema.allowed_fields(cat).is_empty(),
                "category {cat} has no allowed fields"
            );
        }
    }

    #[test]
    fn every_allowed_field_has_a_label() {
        for cat in OrderCategory::ALL {
            for key in StaticSchema.allowed_fields(cat) {
                assert!(
                    StaticSchema.field_label(key).is_some(),
                    "field {key} has no label"
                );
            }
        }
    }

    #[test]
    fn alias_targets_are_canonical_keys() {
        for (old, new) in StaticSchema.aliases() {
            assert!(
                StaticSchema.field_label(new).is_some(),
                "alias {old} points at unknown key {new}"
            );
            assert!(
                StaticSchema.field_label(old).is_none(),
                "alias source {old} is still a canonical key"
            );
        }
    }

    #[test]
    fn is_allowed_checks_category_set() {
        assert!(StaticSchema.is_allowed(OrderCategory::Finish, "farbe"));
        assert!(!StaticSchema.is_allowed(OrderCategory::Finish, "mensur"));
    }
}
