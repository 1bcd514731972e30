//! Glue between the `fea-rs-ast` statements the feature writers emit and [`Features`]
use std::collections::BTreeSet;

use fea_rs_ast::{AsFea, FeatureFile, GlyphClass, GlyphContainer, GlyphName, Metric, ToplevelItem};
use smol_str::SmolStr;

use crate::Features;

/// Name of the [`Features`] prefix which receives generated definitions
pub const FONTMARKS_PREFIX: &str = "fontmarks";

/// An anchor position, rounded to integer font units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorPoint {
    /// X coordinate
    pub x: i16,
    /// Y coordinate
    pub y: i16,
}

impl AnchorPoint {
    /// Round a position, ties to even
    pub fn round(x: f64, y: f64) -> Self {
        AnchorPoint {
            x: x.round_ties_even() as i16,
            y: y.round_ties_even() as i16,
        }
    }

    /// The position of a plain `<anchor x y>`; named and variable anchors have none
    pub fn from_anchor(anchor: &fea_rs_ast::Anchor) -> Option<Self> {
        if anchor.name.is_some() {
            return None;
        }
        match (&anchor.x, &anchor.y) {
            (Metric::Scalar(x), Metric::Scalar(y)) => Some(AnchorPoint { x: *x, y: *y }),
            _ => None,
        }
    }

    /// As a feature-file anchor
    pub fn to_anchor(self) -> fea_rs_ast::Anchor {
        fea_rs_ast::Anchor::new_simple(self.x, self.y, 0..0)
    }
}

/// A single glyph
pub fn glyph(name: &str) -> GlyphContainer {
    GlyphContainer::GlyphName(GlyphName::new(name))
}

/// A glyph class literal
pub fn glyph_class(names: &[SmolStr]) -> GlyphClass {
    GlyphClass::new(names.iter().map(|n| glyph(n)).collect(), 0..0)
}

/// A reference to a named class; `name` is given without `@`
pub fn class_reference(name: &str) -> GlyphContainer {
    GlyphContainer::GlyphClassName(format!("@{}", name).into())
}

/// The glyph names spelled out in a container; named classes and ranges are not resolved
pub fn glyph_names(container: &GlyphContainer) -> Vec<SmolStr> {
    match container {
        GlyphContainer::GlyphName(name) => vec![name.name.clone()],
        GlyphContainer::GlyphClass(class) => class.glyphs.iter().flat_map(glyph_names).collect(),
        _ => vec![],
    }
}

/// Add generated feature code to a font's feature code
///
/// Feature blocks become entries of [`Features::features`], holding their
/// statements without the `feature` wrapper. Everything else is appended to the
/// [`FONTMARKS_PREFIX`] prefix, which is rendered before them.
pub fn merge_into(feature_file: &FeatureFile, features: &mut Features) {
    let mut definitions = vec![];
    for item in feature_file.iter() {
        match item {
            ToplevelItem::Feature(block) => {
                let statements: Vec<String> =
                    block.statements.iter().map(|s| s.as_fea("")).collect();
                features
                    .features
                    .push((block.name.clone(), statements.join("\n")));
            }
            other => definitions.push(other.as_fea("")),
        }
    }
    if definitions.iter().all(|d| d.is_empty()) {
        return;
    }
    let prefix = features
        .prefixes
        .entry(FONTMARKS_PREFIX.into())
        .or_default();
    if !prefix.is_empty() {
        prefix.push('\n');
    }
    prefix.push_str(definitions.join("\n").trim_end());
}

/// Make a valid class name from `name`
///
/// Characters outside `[A-Za-z0-9._]` are dropped. If `existing` is given, the
/// name is made unique among those by appending `_1`, `_2`, ...
pub fn make_fea_class_name(name: &str, existing: Option<&BTreeSet<SmolStr>>) -> SmolStr {
    let name: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();
    let Some(existing) = existing else {
        return name.into();
    };
    let mut candidate: SmolStr = name.as_str().into();
    let mut i = 1;
    while existing.contains(&candidate) {
        candidate = format!("{}_{}", name, i).into();
        i += 1;
    }
    candidate
}
