//! Field extractor — raw mail text/HTML to a normalized field map.
//!
//! Every field has its own independent extraction rule; there is no
//! cross-field scoring. Matching is case-insensitive and first-match-wins
//! per field. The extractor is a pure function over its input: it never
//! errors and returns an empty map for empty input.

pub mod html;

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

pub use html::strip_html;

/// Extracted fields keyed by the stable names in [`fields`].
pub type FieldMap = BTreeMap<String, String>;

/// Stable extraction field names.
pub mod fields {
    pub const SCALE_LENGTH: &str = "scale-length";
    pub const FRETBOARD_RADIUS: &str = "fretboard-radius";
    pub const FRETBOARD_MATERIAL: &str = "fretboard-material";
    pub const COLOR: &str = "color";
    pub const STRING_GAUGE: &str = "string-gauge";
    pub const CONTACT_NAME: &str = "contact-name";
    pub const CONTACT_EMAIL: &str = "contact-email";
    pub const CONTACT_PHONE: &str = "contact-phone";
    pub const CONTACT_ADDRESS: &str = "contact-address";
}

/// A controlled-vocabulary term: language variants normalized to one label.
struct VocabTerm {
    canonical: &'static str,
    regex: Regex,
}

/// Compiled extraction rules for all known fields.
pub struct FieldExtractor {
    scale_length: Regex,
    radius_inches: Regex,
    radius_mm_after: Regex,
    radius_mm_before: Regex,
    string_gauge: Regex,
    contact_email: Regex,
    contact_phone: Regex,
    contact_name: Regex,
    street: Regex,
    zip_city: Regex,
    materials: Vec<VocabTerm>,
    colors: Vec<VocabTerm>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    /// Compile all extraction rules. Patterns are literals, so compilation
    /// cannot fail at runtime.
    pub fn new() -> Self {
        let vocab = |canonical: &'static str, pattern: &str| VocabTerm {
            canonical,
            regex: Regex::new(pattern).unwrap(),
        };

        Self {
            // 3-4 digit number followed by "mm"; scale lengths live in the
            // 590-900 mm range, so the plain unit-qualified rule is enough.
            scale_length: Regex::new(r"(?i)\b(\d{3,4})\s*mm\b").unwrap(),
            radius_inches: Regex::new(
                r#"(?i)\b(\d{1,2}(?:[.,]\d{1,2})?)\s*(?:"|''|″|zoll\b|inch(?:es)?\b)"#,
            )
            .unwrap(),
            radius_mm_after: Regex::new(r"(?i)\bradius\b\D{0,16}?(\d{2,3})\s*mm\b").unwrap(),
            radius_mm_before: Regex::new(r"(?i)\b(\d{2,3})\s*mm\b[^\d\n]{0,20}?\bradius\b")
                .unwrap(),
            string_gauge: Regex::new(
                r"(?i)\b(?:saiten\w*|strings?\b|gauge\b|satz\b)\D{0,16}?(\d{2,3})\s*[-–]\s*(\d{2,3})\b",
            )
            .unwrap(),
            contact_email: Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+-]*@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .unwrap(),
            contact_phone: Regex::new(
                r"(?im)\b(?:tel(?:efon)?|fon|phone|mobil(?:e)?|handy)\b\s*[.:]?\s*(\+?[0-9][0-9\s()/-]{5,})",
            )
            .unwrap(),
            contact_name: Regex::new(r"(?im)^\s*(?:name|kontakt|ansprechpartner)\s*:\s*(\S.*)$")
                .unwrap(),
            street: Regex::new(
                r"(?i)\b([\w-]{0,40}?(?:straße|strasse|str\.|weg|allee|gasse|platz|ring)\s*\d+[a-z]?)\b",
            )
            .unwrap(),
            zip_city: Regex::new(r"\b(\d{5})\s+([A-ZÄÖÜ][\wäöüß-]+)").unwrap(),
            materials: vec![
                vocab("Ebony", r"(?i)\b(?:ebenholz|ebony)\b"),
                vocab("Rosewood", r"(?i)\b(?:palisander|rosewood)\b"),
                vocab("Maple", r"(?i)\b(?:ahorn|maple)\b"),
                vocab("Pau Ferro", r"(?i)\bpau[\s-]?ferro\b"),
                vocab("Walnut", r"(?i)\b(?:nussbaum|walnut)\b"),
                vocab("Wenge", r"(?i)\bwenge\b"),
            ],
            colors: vec![
                vocab("Black", r"(?i)\b(?:schwarz|black)\b"),
                vocab("White", r"(?i)\b(?:weiß|weiss|white)\b"),
                vocab("Red", r"(?i)\b(?:rot|red)\b"),
                vocab("Blue", r"(?i)\b(?:blau|blue)\b"),
                vocab("Green", r"(?i)\b(?:grün|gruen|green)\b"),
                vocab("Sunburst", r"(?i)\bsunburst\b"),
                vocab("Natural", r"(?i)\bnatur(?:al)?\b"),
            ],
        }
    }

    /// Extract all recognizable fields from a mail body.
    ///
    /// HTML is reduced to plain text before matching; text and reduced HTML
    /// are matched as one haystack. Only present fields appear in the map.
    pub fn extract(&self, text: &str, html: &str) -> FieldMap {
        let mut haystack = text.to_string();
        if !html.trim().is_empty() {
            if !haystack.is_empty() {
                haystack.push('\n');
            }
            haystack.push_str(&strip_html(html));
        }

        let mut map = FieldMap::new();
        if haystack.trim().is_empty() {
            return map;
        }

        if let Some(m) = self.scale_length.captures(&haystack) {
            map.insert(fields::SCALE_LENGTH.into(), format!("{} mm", &m[1]));
        }
        if let Some(v) = self.radius(&haystack) {
            map.insert(fields::FRETBOARD_RADIUS.into(), v);
        }
        if let Some(v) = first_vocab(&self.materials, &haystack) {
            map.insert(fields::FRETBOARD_MATERIAL.into(), v.into());
        }
        if let Some(v) = first_vocab(&self.colors, &haystack) {
            map.insert(fields::COLOR.into(), v.into());
        }
        if let Some(m) = self.string_gauge.captures(&haystack) {
            map.insert(fields::STRING_GAUGE.into(), format!("{}-{}", &m[1], &m[2]));
        }
        if let Some(m) = self.contact_email.find(&haystack) {
            map.insert(fields::CONTACT_EMAIL.into(), m.as_str().to_lowercase());
        }
        if let Some(v) = self.phone(&haystack) {
            map.insert(fields::CONTACT_PHONE.into(), v);
        }
        if let Some(m) = self.contact_name.captures(&haystack) {
            map.insert(fields::CONTACT_NAME.into(), m[1].trim().to_string());
        }
        if let Some(v) = self.address(&haystack) {
            map.insert(fields::CONTACT_ADDRESS.into(), v);
        }

        debug!(found = map.len(), "Fields extracted");
        map
    }

    /// Fretboard radius: inch notations first, then millimeters qualified
    /// by proximity to the word "radius".
    fn radius(&self, haystack: &str) -> Option<String> {
        if let Some(m) = self.radius_inches.captures(haystack) {
            return Some(format!("{}\"", m[1].replace(',', ".")));
        }
        if let Some(m) = self.radius_mm_after.captures(haystack) {
            return Some(format!("{} mm", &m[1]));
        }
        if let Some(m) = self.radius_mm_before.captures(haystack) {
            return Some(format!("{} mm", &m[1]));
        }
        None
    }

    /// Labeled phone number with at least six digits.
    fn phone(&self, haystack: &str) -> Option<String> {
        let m = self.contact_phone.captures(haystack)?;
        let raw = m[1].trim_end_matches(|c: char| !c.is_ascii_digit());
        if raw.chars().filter(char::is_ascii_digit).count() < 6 {
            return None;
        }
        Some(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Street + number, optionally joined with a ZIP/city pair.
    fn address(&self, haystack: &str) -> Option<String> {
        let street = self
            .street
            .captures(haystack)
            .map(|m| m[1].trim().to_string());
        let zip_city = self
            .zip_city
            .captures(haystack)
            .map(|m| format!("{} {}", &m[1], &m[2]));

        match (street, zip_city) {
            (Some(s), Some(z)) => Some(format!("{}, {}", s, z)),
            (Some(s), None) => Some(s),
            (None, Some(z)) => Some(z),
            (None, None) => None,
        }
    }
}

/// First vocabulary term (in declared order) that matches the haystack.
fn first_vocab(terms: &[VocabTerm], haystack: &str) -> Option<&'static str> {
    terms
        .iter()
        .find(|t| t.regex.is_match(haystack))
        .map(|t| t.canonical)
}
