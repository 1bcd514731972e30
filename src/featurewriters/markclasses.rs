use std::collections::{BTreeSet, HashMap};

use fea_rs_ast::{MarkClass, MarkClassDefinition};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::layout::ast::{self, make_fea_class_name, AnchorPoint};

/// Mark classes keyed by name, each mapping glyph names to their mark anchor
pub type MarkClassMembers = IndexMap<SmolStr, IndexMap<SmolStr, AnchorPoint>>;

/// The mark classes available to a writer run
#[derive(Debug, Clone, Default)]
pub struct MarkClasses {
    /// New `markClass` definitions, in the order they were made
    pub definitions: Vec<MarkClassDefinition>,
    /// Every mark class, including those already in the target document
    pub members: MarkClassMembers,
    /// The class used for each anchor key
    pub by_key: HashMap<SmolStr, SmolStr>,
}

impl MarkClasses {
    /// The class name attached to an anchor key
    pub fn class_for_key(&self, key: &str) -> Option<&SmolStr> {
        self.by_key.get(key)
    }

    /// The glyphs of the class attached to an anchor key, in class order
    pub fn glyphs_for_key(&self, key: &str) -> Vec<SmolStr> {
        self.class_for_key(key)
            .and_then(|name| self.members.get(name))
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Builds mark classes, one per mark anchor name
///
/// Classes already defined are extended. A glyph which is
/// already in a class at a different position gets a new class of its own.
pub struct MarkClassBuilder {
    prefix: String,
    /// Names used by other feature code, which cannot be extended
    reserved: BTreeSet<SmolStr>,
    classes: MarkClasses,
}

impl MarkClassBuilder {
    /// Create a builder
    ///
    /// `existing` holds the mark classes already defined, in the target document or
    /// the font's feature code; `reserved` the class names used elsewhere.
    pub fn new(prefix: &str, existing: MarkClassMembers, reserved: BTreeSet<SmolStr>) -> Self {
        MarkClassBuilder {
            prefix: prefix.to_string(),
            reserved,
            classes: MarkClasses {
                members: existing,
                ..Default::default()
            },
        }
    }

    fn taken_names(&self) -> BTreeSet<SmolStr> {
        self.reserved
            .iter()
            .chain(self.classes.members.keys())
            .cloned()
            .collect()
    }

    /// Add the glyphs carrying the mark anchor `mark_anchor_name`, whose key is `key`
    pub fn add_group(
        &mut self,
        mark_anchor_name: &str,
        key: &str,
        glyphs: &IndexMap<SmolStr, AnchorPoint>,
    ) {
        let mut class_name =
            make_fea_class_name(&format!("{}{}", self.prefix, mark_anchor_name), None);
        if !self.classes.members.contains_key(&class_name) && self.reserved.contains(&class_name)
        {
            class_name = make_fea_class_name(&class_name, Some(&self.taken_names()));
        }
        for (glyph, anchor) in glyphs {
            if let Some(definition) = self.define(glyph, *anchor, &class_name) {
                class_name = definition.mark_class.name.clone();
                self.classes.definitions.push(definition);
            }
            self.classes.by_key.insert(key.into(), class_name.clone());
        }
    }

    fn define(
        &mut self,
        glyph: &SmolStr,
        anchor: AnchorPoint,
        class_name: &SmolStr,
    ) -> Option<MarkClassDefinition> {
        let mut class_name = class_name.clone();
        if let Some(existing) = self
            .classes
            .members
            .get(&class_name)
            .and_then(|members| members.get(glyph))
        {
            if *existing == anchor {
                log::debug!(
                    "Glyph {} already defined in markClass @{}",
                    glyph,
                    class_name
                );
                return None;
            }
            class_name = make_fea_class_name(&class_name, Some(&self.taken_names()));
            log::debug!(
                "Glyph {} has a different anchor in an existing class; defining @{}",
                glyph,
                class_name
            );
        }
        self.classes
            .members
            .entry(class_name.clone())
            .or_default()
            .insert(glyph.clone(), anchor);
        Some(MarkClassDefinition::new(
            MarkClass::new(&class_name),
            anchor.to_anchor(),
            ast::glyph(glyph),
        ))
    }

    /// Finish building
    pub fn finish(self) -> MarkClasses {
        self.classes
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use fea_rs_ast::AsFea;
    use pretty_assertions::assert_eq;

    fn summary(classes: &MarkClasses) -> Vec<(String, String, i16)> {
        classes
            .definitions
            .iter()
            .map(|d| {
                (
                    ast::glyph_names(&d.glyphs).join(" "),
                    d.mark_class.name.to_string(),
                    AnchorPoint::from_anchor(&d.anchor).unwrap().y,
                )
            })
            .collect()
    }

    fn group(entries: &[(&str, i16, i16)]) -> IndexMap<SmolStr, AnchorPoint> {
        entries
            .iter()
            .map(|(g, x, y)| (SmolStr::from(*g), AnchorPoint { x: *x, y: *y }))
            .collect()
    }

    #[test]
    fn test_one_class_per_mark_anchor() {
        let mut builder = MarkClassBuilder::new("MC", IndexMap::new(), BTreeSet::new());
        builder.add_group("_bottom", "bottom", &group(&[("dotbelowcomb", 0, 0)]));
        builder.add_group(
            "_top",
            "top",
            &group(&[("acutecomb", 0, 500), ("gravecomb", 10, 500)]),
        );
        let classes = builder.finish();
        assert_eq!(
            summary(&classes),
            vec![
                ("dotbelowcomb".to_string(), "MC_bottom".to_string(), 0),
                ("acutecomb".to_string(), "MC_top".to_string(), 500),
                ("gravecomb".to_string(), "MC_top".to_string(), 500)
            ]
        );
        assert_eq!(
            classes.definitions[0].as_fea(""),
            "markClass dotbelowcomb <anchor 0 0> @MC_bottom;"
        );
        assert_eq!(classes.class_for_key("top").unwrap(), "MC_top");
        assert_eq!(
            classes.glyphs_for_key("top"),
            vec![SmolStr::from("acutecomb"), SmolStr::from("gravecomb")]
        );
    }

    #[test]
    fn test_identical_definition_is_skipped() {
        let mut existing = MarkClassMembers::new();
        existing.insert("MC_top".into(), group(&[("acutecomb", 0, 500)]));
        let mut builder = MarkClassBuilder::new("MC", existing, BTreeSet::new());
        builder.add_group("_top", "top", &group(&[("acutecomb", 0, 500)]));
        let classes = builder.finish();
        assert!(classes.definitions.is_empty());
        assert_eq!(classes.class_for_key("top").unwrap(), "MC_top");
    }

    #[test]
    fn test_conflicting_definition_forks_a_class() {
        let mut existing = MarkClassMembers::new();
        existing.insert("MC_top".into(), group(&[("acutecomb", 0, 500)]));
        let mut builder = MarkClassBuilder::new("MC", existing, BTreeSet::new());
        builder.add_group(
            "_top",
            "top",
            &group(&[("acutecomb", 0, 520), ("gravecomb", 0, 500)]),
        );
        let classes = builder.finish();
        assert_eq!(
            summary(&classes),
            vec![
                ("acutecomb".to_string(), "MC_top_1".to_string(), 520),
                ("gravecomb".to_string(), "MC_top_1".to_string(), 500)
            ]
        );
        assert_eq!(classes.class_for_key("top").unwrap(), "MC_top_1");
        // The original class is untouched
        assert_eq!(classes.members["MC_top"].len(), 1);
    }

    #[test]
    fn test_reserved_names_are_avoided() {
        let reserved = BTreeSet::from(["MC_top".into()]);
        let mut builder = MarkClassBuilder::new("MC", IndexMap::new(), reserved);
        builder.add_group("_top", "top", &group(&[("acutecomb", 0, 500)]));
        builder.add_group("_top.alt", "top.alt", &group(&[("tildecomb", 0, 500)]));
        let classes = builder.finish();
        assert_eq!(classes.class_for_key("top").unwrap(), "MC_top_1");
        assert_eq!(classes.class_for_key("top.alt").unwrap(), "MC_top.alt");
    }
}
