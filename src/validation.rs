//! Validation System - SVG Structural Rules
//!
//! Rules inspect a parsed document and produce violations.
//! The verifier runs every rule and collects what they report.

use roxmltree::{Document, ParsingOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgViolation {
    pub rule: &'static str,
    pub message: String,
}

/// Validation rule trait - produces at most one violation per document
pub trait SvgRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, document: &Document<'_>) -> Option<SvgViolation>;
}

/// Root element must not fix its own size
pub struct RootAttributeRule {
    attribute: &'static str,
}

impl RootAttributeRule {
    pub const fn forbid(attribute: &'static str) -> Self {
        Self { attribute }
    }
}

impl SvgRule for RootAttributeRule {
    fn name(&self) -> &'static str {
        self.attribute
    }

    fn check(&self, document: &Document<'_>) -> Option<SvgViolation> {
        document
            .root_element()
            .has_attribute(self.attribute)
            .then(|| SvgViolation {
                rule: self.name(),
                message: format!(
                    "Root SVG element must not have a `{}` attribute",
                    self.attribute
                ),
            })
    }
}

pub struct SvgVerifier {
    rules: Vec<Box<dyn SvgRule>>,
}

impl SvgVerifier {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RootAttributeRule::forbid("width")),
                Box::new(RootAttributeRule::forbid("height")),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn SvgRule>>) -> Self {
        Self { rules }
    }

    /// Parse `source` and run every rule against it.
    ///
    /// DTDs are allowed since exported SVGs commonly carry a doctype.
    pub fn verify(&self, source: &str) -> Result<Vec<SvgViolation>, roxmltree::Error> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(source, options)?;
        Ok(self
            .rules
            .iter()
            .filter_map(|rule| rule.check(&document))
            .collect())
    }
}

impl Default for SvgVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(source: &str) -> Vec<String> {
        SvgVerifier::new()
            .verify(source)
            .unwrap()
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_clean_svg_passes() {
        assert!(messages("<svg></svg>").is_empty());
        assert!(messages(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"/>"#).is_empty());
    }

    #[test]
    fn test_width_and_height_both_reported() {
        assert_eq!(
            messages(r#"<svg width="100" height="100"></svg>"#),
            vec![
                "Root SVG element must not have a `width` attribute",
                "Root SVG element must not have a `height` attribute",
            ]
        );
    }

    #[test]
    fn test_empty_attribute_still_counts() {
        assert_eq!(messages(r#"<svg height=""></svg>"#).len(), 1);
    }

    #[test]
    fn test_nested_dimensions_ignored() {
        assert!(messages(r#"<svg><rect width="1" height="1"/></svg>"#).is_empty());
    }

    #[test]
    fn test_doctype_allowed() {
        let source = r#"<?xml version="1.0"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg width="1"></svg>"#;
        assert_eq!(messages(source).len(), 1);
    }

    #[test]
    fn test_malformed_xml_errors() {
        assert!(SvgVerifier::new().verify("<svg>").is_err());
        assert!(SvgVerifier::new().verify("not xml").is_err());
    }

    #[test]
    fn test_custom_rules() {
        let verifier = SvgVerifier::with_rules(vec![Box::new(RootAttributeRule::forbid("style"))]);
        let found = verifier.verify(r#"<svg style="x" width="1"/>"#).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "style");
    }
}
