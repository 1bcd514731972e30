use crate::{anchor::Anchor, shape::Component};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// A list of glyphs in the font
pub struct GlyphList(pub Vec<Glyph>);
impl GlyphList {
    /// Get a glyph by name
    pub fn get(&self, g: &str) -> Option<&Glyph> {
        self.0.iter().find(|&glyph| glyph.name == g)
    }
    /// Get a glyph by name, mutably
    pub fn get_mut(&mut self, g: &str) -> Option<&mut Glyph> {
        self.0.iter_mut().find(|glyph| glyph.name == g)
    }

    /// Get a glyph by index
    pub fn get_by_index(&self, id: usize) -> Option<&Glyph> {
        self.0.get(id)
    }
    /// Get a glyph by index, mutably
    pub fn get_by_index_mut(&mut self, id: usize) -> Option<&mut Glyph> {
        self.0.get_mut(id)
    }
    /// Get an iterator over the glyphs
    pub fn iter(&self) -> std::slice::Iter<'_, Glyph> {
        self.0.iter()
    }
}

impl Deref for GlyphList {
    type Target = Vec<Glyph>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl DerefMut for GlyphList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// The OpenType category of a glyph
pub enum GlyphCategory {
    /// A base glyph
    Base,
    /// A mark glyph
    Mark,
    /// An unknown / un-set category
    #[default]
    Unknown,
    /// A ligature glyph
    Ligature,
    /// Custom
    Custom(String),
}

impl GlyphCategory {
    /// Interpret a category string as found in `public.openTypeCategories`
    pub fn from_opentype_category(s: &str) -> Self {
        match s {
            "base" => GlyphCategory::Base,
            "mark" => GlyphCategory::Mark,
            "ligature" => GlyphCategory::Ligature,
            "" => GlyphCategory::Unknown,
            other => GlyphCategory::Custom(other.to_string()),
        }
    }

    /// The category string as found in `public.openTypeCategories`
    pub fn as_opentype_category(&self) -> Option<&str> {
        match self {
            GlyphCategory::Base => Some("base"),
            GlyphCategory::Mark => Some("mark"),
            GlyphCategory::Ligature => Some("ligature"),
            GlyphCategory::Custom(s) => Some(s.as_str()),
            GlyphCategory::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
/// A glyph in the font
pub struct Glyph {
    /// The name of the glyph
    pub name: SmolStr,
    /// The category of the glyph
    #[serde(default, skip_serializing_if = "crate::serde_helpers::is_unknown_category")]
    pub category: GlyphCategory,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Unicode codepoints assigned to the glyph
    pub codepoints: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Anchors, in the order they are defined
    pub anchors: Vec<Anchor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Component references
    pub components: Vec<Component>,
}

impl Glyph {
    /// Create a new, empty glyph
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Glyph {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get an anchor by name
    pub fn get_anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_opentype_categories() {
        for (s, cat) in [
            ("base", GlyphCategory::Base),
            ("mark", GlyphCategory::Mark),
            ("ligature", GlyphCategory::Ligature),
            ("component", GlyphCategory::Custom("component".to_string())),
            ("unassigned", GlyphCategory::Custom("unassigned".to_string())),
        ] {
            assert_eq!(GlyphCategory::from_opentype_category(s), cat);
            assert_eq!(cat.as_opentype_category(), Some(s));
        }
        assert_eq!(
            GlyphCategory::from_opentype_category(""),
            GlyphCategory::Unknown
        );
    }

    #[test]
    fn test_glyph_serialization_skips_empty_fields() {
        let glyph = Glyph::new("space");
        assert_eq!(serde_json::to_string(&glyph).unwrap(), r#"{"name":"space"}"#);
        let glyph: Glyph =
            serde_json::from_str(r#"{"name":"a_a","category":"ligature"}"#).unwrap();
        assert_eq!(glyph.category, GlyphCategory::Ligature);
    }
}
