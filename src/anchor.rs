use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::FontmarksError;

/// The prefix which marks an anchor as belonging to a mark glyph (`_top`)
pub const MARK_PREFIX: &str = "_";
/// The separator between an anchor key and its ligature component index (`top_2`)
pub const LIGA_SEPARATOR: &str = "_";

/// A named attachment point on a glyph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// The anchor's name
    pub name: String,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Anchor {
    /// Create a new anchor
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Anchor {
            name: name.into(),
            x,
            y,
        }
    }
}

/// The semantic role of an anchor, derived from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorName {
    /// Whether this anchor sits on a mark glyph (its name carries the mark prefix)
    pub is_mark: bool,
    /// The base identity of the anchor, with the mark prefix and ligature suffix removed
    ///
    /// Empty for the bare `_1`, `_2` anchors which denote a null ligature component.
    pub key: SmolStr,
    /// The 1-based ligature component index, if any
    pub number: Option<u32>,
}

/// The anchor naming convention
#[derive(Debug, Clone)]
pub struct AnchorNaming {
    /// Prefix of mark anchors
    pub mark_prefix: String,
    /// Separator before a ligature component index
    pub liga_separator: String,
    /// Anything matching this pattern is removed from the name before parsing
    pub ignore: Option<Regex>,
}

impl Default for AnchorNaming {
    fn default() -> Self {
        AnchorNaming {
            mark_prefix: MARK_PREFIX.to_string(),
            liga_separator: LIGA_SEPARATOR.to_string(),
            ignore: None,
        }
    }
}

impl AnchorNaming {
    /// Parse an anchor name into its role, key and ligature index
    ///
    /// Trailing digits only count as a ligature index when they follow the
    /// ligature separator; `top1` is a plain anchor with key `top1`.
    pub fn parse(&self, name: &str) -> Result<AnchorName, FontmarksError> {
        let name: String = match &self.ignore {
            Some(re) => re.replace_all(name, "").into_owned(),
            None => name.to_string(),
        };
        let digits_start = name
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        let mut key: &str = &name;
        let mut number = None;
        if let Some(start) = digits_start {
            let remainder = &name[..start];
            if !self.liga_separator.is_empty() && remainder.ends_with(&self.liga_separator) {
                if let Ok(n) = name[start..].parse::<u32>() {
                    key = &remainder[..remainder.len() - self.liga_separator.len()];
                    number = Some(n);
                }
            }
        }

        let is_mark = name.starts_with(&self.mark_prefix) && !key.is_empty();
        if is_mark {
            if number.is_some() {
                return Err(FontmarksError::MarkAnchorNumbered { name });
            }
            key = &key[self.mark_prefix.len()..];
            if key.is_empty() {
                return Err(FontmarksError::EmptyMarkKey { name });
            }
        }
        if number == Some(0) {
            return Err(FontmarksError::LigatureIndexBelowOne { name });
        }
        Ok(AnchorName {
            is_mark,
            key: key.into(),
            number,
        })
    }

    /// The name a mark anchor attaching to `key` would carry
    pub fn mark_anchor_name(&self, key: &str) -> SmolStr {
        format!("{}{}", self.mark_prefix, key).into()
    }
}

#[cfg(feature = "ufo")]
mod ufo {
    use super::*;

    impl From<&norad::Anchor> for Anchor {
        fn from(a: &norad::Anchor) -> Self {
            Anchor {
                x: a.x,
                y: a.y,
                // Unnamed anchors are kept with an empty name and discarded by consumers
                name: a.name.as_ref().map(|x| x.to_string()).unwrap_or_default(),
            }
        }
    }

    impl TryFrom<&Anchor> for norad::Anchor {
        type Error = FontmarksError;

        fn try_from(a: &Anchor) -> Result<Self, FontmarksError> {
            let name = if a.name.is_empty() {
                None
            } else {
                Some(norad::Name::new(&a.name)?)
            };
            Ok(norad::Anchor::new(
                a.x,
                a.y,
                name,
                None,
                None,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("top", false, "top", None)]
    #[case("_top", true, "top", None)]
    #[case("top_1", false, "top", Some(1))]
    #[case("top_12", false, "top", Some(12))]
    #[case("top_viet", false, "top_viet", None)]
    #[case("top1", false, "top1", None)]
    #[case("_1", false, "", Some(1))]
    #[case("_3", false, "", Some(3))]
    #[case("caret_", false, "caret_", None)]
    fn test_parse_anchor_name(
        #[case] name: &str,
        #[case] is_mark: bool,
        #[case] key: &str,
        #[case] number: Option<u32>,
    ) {
        let parsed = AnchorNaming::default().parse(name).unwrap();
        assert_eq!(
            parsed,
            AnchorName {
                is_mark,
                key: key.into(),
                number
            }
        );
    }

    #[test]
    fn test_numbered_mark_anchor_is_an_error() {
        let err = AnchorNaming::default().parse("_top_1").unwrap_err();
        assert!(matches!(err, FontmarksError::MarkAnchorNumbered { .. }));
    }

    #[test]
    fn test_empty_mark_key_is_an_error() {
        let err = AnchorNaming::default().parse("_").unwrap_err();
        assert!(matches!(err, FontmarksError::EmptyMarkKey { .. }));
    }

    #[test]
    fn test_ligature_index_zero_is_an_error() {
        let err = AnchorNaming::default().parse("top_0").unwrap_err();
        assert!(matches!(err, FontmarksError::LigatureIndexBelowOne { .. }));
    }

    #[test]
    fn test_ignore_pattern() {
        let naming = AnchorNaming {
            ignore: Some(Regex::new(r"\.alt$").unwrap()),
            ..Default::default()
        };
        let parsed = naming.parse("top_2.alt").unwrap();
        assert_eq!(parsed.key, "top");
        assert_eq!(parsed.number, Some(2));
    }

    #[test]
    fn test_mark_anchor_name() {
        assert_eq!(AnchorNaming::default().mark_anchor_name("top"), "_top");
    }
}
