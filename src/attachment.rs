use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::Font;

/// An explicit attachment record, as found in filter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Anchor names found on base glyphs
    #[serde(default)]
    pub base: Vec<SmolStr>,
    /// Anchor names found on mark glyphs
    #[serde(default)]
    pub mark: Vec<SmolStr>,
}

/// A set of base anchor names and mark anchor names which attach to one another
///
/// For example `top`, `top_1` and `top_viet` on the base side all attach to `_top`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// Anchor names found on base glyphs
    pub base: Vec<SmolStr>,
    /// Anchor names found on mark glyphs
    pub mark: Vec<SmolStr>,
}

impl Attachment {
    /// Whether the anchor name is on either side of this attachment
    pub fn contains(&self, name: &str) -> bool {
        self.is_base(name) || self.is_mark(name)
    }

    /// Whether the anchor name is on the base side
    pub fn is_base(&self, name: &str) -> bool {
        self.base.iter().any(|n| n == name)
    }

    /// Whether the anchor name is on the mark side
    pub fn is_mark(&self, name: &str) -> bool {
        self.mark.iter().any(|n| n == name)
    }
}

impl From<&AttachmentConfig> for Attachment {
    fn from(config: &AttachmentConfig) -> Self {
        Attachment {
            base: config.base.clone(),
            mark: config.mark.clone(),
        }
    }
}

/// All attachments of a font
#[derive(Debug, Clone, Default)]
pub struct Attachments(Vec<Attachment>);

impl Attachments {
    /// Build the attachments for a font
    ///
    /// Explicit records are used verbatim. Otherwise every anchor name in the font
    /// is classified: a name matching `mark_pattern` is a mark member keyed by the
    /// name without the match; a name with an inner `_` is a base member keyed by
    /// the part before the last `_`; anything else is its own key. Attachments
    /// lacking either side are dropped.
    pub fn collect(
        font: &Font,
        explicit: Option<&[AttachmentConfig]>,
        mark_pattern: &Regex,
    ) -> Self {
        if let Some(explicit) = explicit.filter(|e| !e.is_empty()) {
            return Attachments(explicit.iter().map(Attachment::from).collect());
        }

        let anchor_names: BTreeSet<&str> = font
            .glyphs
            .iter()
            .flat_map(|g| g.anchors.iter())
            .map(|a| a.name.as_str())
            .collect();

        let mut by_key: BTreeMap<SmolStr, Attachment> = BTreeMap::new();
        for name in anchor_names {
            if let Some(m) = mark_anchor_match(mark_pattern, name) {
                let key: SmolStr = name.replacen(m, "", 1).into();
                by_key.entry(key).or_default().mark.push(name.into());
            } else if let Some((key, _)) = name
                .rsplit_once('_')
                .filter(|_| name.find('_').is_some_and(|ix| ix > 0))
            {
                by_key.entry(key.into()).or_default().base.push(name.into());
            } else {
                by_key.entry(name.into()).or_default().base.push(name.into());
            }
        }
        Attachments(
            by_key
                .into_values()
                .filter(|at| !at.base.is_empty() && !at.mark.is_empty())
                .collect(),
        )
    }

    /// The index of the first attachment containing this anchor name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|at| at.contains(name))
    }

    /// The first attachment containing this anchor name
    pub fn get(&self, name: &str) -> Option<&Attachment> {
        self.index_of(name).map(|ix| &self.0[ix])
    }

    /// The attachment at the given index
    pub fn by_index(&self, index: usize) -> Option<&Attachment> {
        self.0.get(index)
    }

    /// Iterate over all attachments
    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.0.iter()
    }

    /// The number of attachments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attachments at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The text matched by the mark pattern, if it matches at the start of the name
pub(crate) fn mark_anchor_match<'a>(mark_pattern: &Regex, name: &'a str) -> Option<&'a str> {
    mark_pattern
        .find(name)
        .filter(|m| m.start() == 0)
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{Anchor, Glyph};
    use pretty_assertions::assert_eq;

    fn font_with_anchors(glyphs: &[(&str, &[&str])]) -> Font {
        let mut font = Font::new();
        for (name, anchors) in glyphs {
            let mut glyph = Glyph::new(*name);
            glyph.anchors = anchors.iter().map(|a| Anchor::new(*a, 0.0, 0.0)).collect();
            font.glyphs.push(glyph);
        }
        font
    }

    fn sorted(names: &[SmolStr]) -> Vec<&str> {
        let mut names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_inferred_attachments() {
        let font = font_with_anchors(&[
            ("a", &["top", "bottom"]),
            ("acutecomb", &["_top"]),
            ("dotbelowcomb", &["_bottom"]),
            ("circumflexcomb", &["top", "top_viet", "_top"]),
            ("f_f", &["top_1", "top_2"]),
        ]);
        let attachments = Attachments::collect(&font, None, &Regex::new("^_").unwrap());
        assert_eq!(attachments.len(), 2);

        let top = attachments.get("top").unwrap();
        assert_eq!(sorted(&top.base), vec!["top", "top_1", "top_2", "top_viet"]);
        assert_eq!(sorted(&top.mark), vec!["_top"]);
        for name in ["_top", "top_1", "top_viet"] {
            assert_eq!(attachments.index_of(name), attachments.index_of("top"));
        }

        let bottom = attachments.get("bottom").unwrap();
        assert_eq!(sorted(&bottom.base), vec!["bottom"]);
        assert_eq!(sorted(&bottom.mark), vec!["_bottom"]);
        assert_eq!(attachments.index_of("_bottom"), attachments.index_of("bottom"));
    }

    #[test]
    fn test_one_sided_attachments_are_dropped() {
        let font = font_with_anchors(&[("a", &["top", "caret_1", "exit"]), ("b", &["_entry"])]);
        let attachments = Attachments::collect(&font, None, &Regex::new("^_").unwrap());
        assert!(attachments.is_empty());
        assert_eq!(attachments.get("top"), None);
    }

    #[test]
    fn test_explicit_attachments_are_verbatim() {
        let font = font_with_anchors(&[("a", &["top", "bottom"])]);
        let explicit = vec![AttachmentConfig {
            base: vec!["top".into(), "top_viet".into()],
            mark: vec!["_top".into()],
        }];
        let attachments =
            Attachments::collect(&font, Some(&explicit), &Regex::new("^_").unwrap());
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments.get("top_viet"), Some(&Attachment::from(&explicit[0])));
        assert_eq!(attachments.get("bottom"), None);
    }
}
