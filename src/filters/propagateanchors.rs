use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
    attachment::{mark_anchor_match, AttachmentConfig, Attachments},
    filters::FontFilter,
    unicode, Anchor, Font, FontmarksError, GlyphCategory,
};

/// Default pattern recognising mark anchors
pub const DEFAULT_MARK_PATTERN: &str = "^_";

fn vertical_opposite(name: &str) -> Option<&'static str> {
    match name {
        "top" => Some("bottom"),
        "topleft" => Some("bottomleft"),
        "topright" => Some("bottomright"),
        "bottom" => Some("top"),
        "bottomleft" => Some("topleft"),
        "bottomright" => Some("topright"),
        _ => None,
    }
}

fn horizontal_opposite(name: &str) -> Option<&'static str> {
    match name {
        "bottomleft" => Some("bottomright"),
        "bottomright" => Some("bottomleft"),
        "topleft" => Some("topright"),
        "topright" => Some("topleft"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// A filter that propagates anchors from glyphs to the composite glyphs using them as components
///
/// Some anchors are not copied, depending on whether the composite glyph is a
/// base glyph, a mark glyph or a ligature:
///
/// - base glyphs drop anchors which are already attached to one another inside
///   the composite (the `top` of `a` and the `_top` of `dieresiscomb` in
///   `adieresis`), and any remaining mark anchors;
/// - mark glyphs keep at most one attachment per position, and do not inherit an
///   anchor whose opposite (`top`/`bottom`) they already define;
/// - ligatures number each anchor by the component it came from (`top_1`, `top_2`).
///
/// Anchors already present on a composite glyph are never replaced.
pub struct PropagateAnchors {
    /// Explicit attachments; inferred from anchor names when not given
    pub attachments: Option<Vec<AttachmentConfig>>,
    /// Regular expression recognising mark anchors
    pub mark_pattern: String,
    /// Only report (and directly process) these glyphs
    ///
    /// Their components are still processed as needed.
    pub include: Option<Vec<SmolStr>>,
}

impl Default for PropagateAnchors {
    fn default() -> Self {
        PropagateAnchors {
            attachments: None,
            mark_pattern: DEFAULT_MARK_PATTERN.to_string(),
            include: None,
        }
    }
}

impl PropagateAnchors {
    /// Create a new PropagateAnchors filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit attachments instead of inferring them from anchor names
    pub fn with_attachments(mut self, attachments: Vec<AttachmentConfig>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    /// Only process the given glyphs (and, as needed, their components)
    pub fn with_include<T: Into<SmolStr>>(mut self, glyphs: Vec<T>) -> Self {
        self.include = Some(glyphs.into_iter().map(|g| g.into()).collect());
        self
    }

    /// Propagate anchors, returning the names of the included glyphs which gained anchors
    pub fn run(&self, font: &mut Font) -> Result<BTreeSet<SmolStr>, FontmarksError> {
        let mark_re = Regex::new(&self.mark_pattern)?;
        let attachments = Attachments::collect(font, self.attachments.as_deref(), &mark_re);
        log::debug!("Collected {} anchor attachments", attachments.len());
        let include: Option<HashSet<SmolStr>> =
            self.include.as_ref().map(|i| i.iter().cloned().collect());

        let mut run = PropagationRun::new(font, attachments, mark_re, include);
        for ix in 0..font.glyphs.len() {
            if run.is_included(&font.glyphs[ix].name) {
                run.propagate(font, ix);
            }
        }
        Ok(run.modified)
    }
}

impl FontFilter for PropagateAnchors {
    fn apply(&self, font: &mut Font) -> Result<(), FontmarksError> {
        let modified = self.run(font)?;
        if !modified.is_empty() {
            log::info!("Glyphs with propagated anchors: {}", modified.len());
        }
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, FontmarksError>
    where
        Self: Sized,
    {
        if s.trim().is_empty() {
            return Ok(PropagateAnchors::new());
        }
        serde_json::from_str(s).map_err(|e| {
            FontmarksError::FilterError(format!("Bad anchor propagation options: {}", e))
        })
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("propagateanchors")
            .long("propagate-anchors")
            .value_name("OPTIONS")
            .num_args(0..=1)
            .default_missing_value("")
            .help("Propagate anchors to composite glyphs (optionally with JSON options)")
    }
}

/// An anchor on its way from a component to the composite glyph
#[derive(Debug, Clone)]
struct PropagatedAnchor {
    anchor: Anchor,
    /// Index of the component within the composite glyph
    component: usize,
    component_is_mark: bool,
    attachment: usize,
}

/// State for one propagation pass over a font
struct PropagationRun {
    attachments: Attachments,
    mark_re: Regex,
    include: Option<HashSet<SmolStr>>,
    indices: HashMap<SmolStr, usize>,
    processed: Vec<bool>,
    modified: BTreeSet<SmolStr>,
}

impl PropagationRun {
    fn new(
        font: &Font,
        attachments: Attachments,
        mark_re: Regex,
        include: Option<HashSet<SmolStr>>,
    ) -> Self {
        let mut indices = HashMap::new();
        for (ix, glyph) in font.glyphs.iter().enumerate() {
            indices.entry(glyph.name.clone()).or_insert(ix);
        }
        PropagationRun {
            attachments,
            mark_re,
            include,
            indices,
            processed: vec![false; font.glyphs.len()],
            modified: BTreeSet::new(),
        }
    }

    fn is_included(&self, name: &str) -> bool {
        self.include.as_ref().is_none_or(|i| i.contains(name))
    }

    fn propagate(&mut self, font: &mut Font, ix: usize) {
        // Also breaks cycles: a glyph reached again is taken as it stands
        if self.processed[ix] {
            return;
        }
        self.processed[ix] = true;
        if font.glyphs[ix].components.is_empty() {
            return;
        }

        let mut propagated = self.collect_component_anchors(font, ix);
        // Existing anchors win
        let glyph = &font.glyphs[ix];
        propagated.retain(|pa| glyph.get_anchor(&pa.anchor.name).is_none());
        let category = self
            .classify(font, ix, &mut HashSet::new())
            .unwrap_or_default();
        log::debug!(
            "Propagating {} anchors into {} ({:?})",
            propagated.len(),
            glyph.name,
            category
        );

        match category {
            GlyphCategory::Base => {
                self.prune_attached_anchors(&mut propagated, false);
                self.prune_mark_anchors(&mut propagated);
            }
            GlyphCategory::Mark => {
                let own_names: HashSet<&str> =
                    glyph.anchors.iter().map(|a| a.name.as_str()).collect();
                self.prune_opposite_mark_anchors(&own_names, &mut propagated);
                self.prune_attached_anchors(&mut propagated, true);
            }
            GlyphCategory::Ligature => {
                self.prune_attached_anchors(&mut propagated, false);
                self.prune_mark_anchors(&mut propagated);
                number_ligature_anchors(&mut propagated);
                propagated.retain(|pa| glyph.get_anchor(&pa.anchor.name).is_none());
            }
            GlyphCategory::Unknown | GlyphCategory::Custom(_) => {
                self.prune_attached_anchors(&mut propagated, false);
            }
        }

        if propagated.is_empty() {
            return;
        }
        propagated.sort_by_key(|pa| {
            (
                pa.anchor.name.clone(),
                OrderedFloat(pa.anchor.x),
                OrderedFloat(pa.anchor.y),
            )
        });
        let glyph = &mut font.glyphs[ix];
        glyph
            .anchors
            .extend(propagated.into_iter().map(|pa| pa.anchor));
        if self.is_included(&glyph.name) {
            self.modified.insert(glyph.name.clone());
        }
    }

    /// Bring each component's anchors into the composite's coordinate space
    ///
    /// Anchors with no attachment are skipped.
    fn collect_component_anchors(&mut self, font: &mut Font, ix: usize) -> Vec<PropagatedAnchor> {
        let glyph_name = font.glyphs[ix].name.clone();
        let components = font.glyphs[ix].components.clone();
        let mut propagated = vec![];

        for (component_ix, component) in components.iter().enumerate() {
            let Some(&base_ix) = self.indices.get(&component.reference) else {
                log::warn!(
                    "Anchors not propagated for inexistent component {} in glyph {}",
                    component.reference,
                    glyph_name
                );
                continue;
            };
            self.propagate(font, base_ix);

            let base = &font.glyphs[base_ix];
            let component_is_mark = base
                .anchors
                .iter()
                .any(|a| mark_anchor_match(&self.mark_re, &a.name).is_some());

            for base_anchor in base.anchors.iter() {
                let mut name = base_anchor.name.clone();
                if component.is_flipped_horizontally() {
                    if let Some(opposite) = horizontal_opposite(&name) {
                        name = opposite.to_string();
                    }
                }
                if component.is_flipped_vertically() && vertical_opposite(&name).is_some() {
                    log::debug!(
                        "Keeping the name of anchor {} from vertically flipped component {} in {}",
                        name,
                        component.reference,
                        glyph_name
                    );
                }
                let Some(attachment) = self.attachments.index_of(&name) else {
                    continue;
                };
                let (x, y) = component.transform_point(base_anchor.x, base_anchor.y);
                propagated.push(PropagatedAnchor {
                    anchor: Anchor::new(name, x, y),
                    component: component_ix,
                    component_is_mark,
                    attachment,
                });
            }
        }
        propagated
    }

    /// Work out the category of a glyph: explicit, then from its first codepoint,
    /// then from its own mark anchors, then from its components.
    ///
    /// `None` means the category could not be determined.
    fn classify(
        &self,
        font: &Font,
        ix: usize,
        visiting: &mut HashSet<usize>,
    ) -> Option<GlyphCategory> {
        let glyph = &font.glyphs[ix];
        if glyph.category != GlyphCategory::Unknown {
            return Some(glyph.category.clone());
        }
        if let Some(&codepoint) = glyph.codepoints.first() {
            return Some(if unicode::is_mark(codepoint) {
                GlyphCategory::Mark
            } else {
                GlyphCategory::Base
            });
        }
        if glyph.anchors.iter().any(|a| {
            self.attachments
                .get(&a.name)
                .is_some_and(|at| at.is_mark(&a.name))
        }) {
            return Some(GlyphCategory::Mark);
        }
        if glyph.components.is_empty() || !visiting.insert(ix) {
            return None;
        }
        let component_categories: Vec<GlyphCategory> = glyph
            .components
            .iter()
            .filter_map(|c| self.indices.get(&c.reference))
            .filter_map(|&cix| self.classify(font, cix, visiting))
            .collect();
        visiting.remove(&ix);
        // Components of undetermined category do not count against this
        if component_categories
            .iter()
            .all(|c| *c == GlyphCategory::Mark)
        {
            return Some(GlyphCategory::Mark);
        }
        None
    }

    /// Remove pairs of anchors which attach to each other inside the composite
    ///
    /// Each mark anchor coming from a mark component is matched with the closest
    /// base anchor of the same attachment on another component. Both are removed,
    /// along with the other base anchors of that attachment on the same component
    /// (`top_viet` goes when `top` does). With `keep_farthest`, the farthest match
    /// for each mark anchor name survives.
    fn prune_attached_anchors(&self, propagated: &mut Vec<PropagatedAnchor>, keep_farthest: bool) {
        let mut matches: IndexMap<String, Vec<(f64, usize, usize)>> = IndexMap::new();
        for (i, pa1) in propagated.iter().enumerate() {
            let Some(attachment) = self.attachments.by_index(pa1.attachment) else {
                continue;
            };
            if !attachment.is_mark(&pa1.anchor.name) || !pa1.component_is_mark {
                continue;
            }
            let mut matched: Option<(usize, f64)> = None;
            for (j, pa2) in propagated.iter().enumerate() {
                if i == j
                    || pa1.attachment != pa2.attachment
                    || !attachment.is_base(&pa2.anchor.name)
                    || pa1.component == pa2.component
                {
                    continue;
                }
                let distance = squared_distance(&pa1.anchor, &pa2.anchor);
                match matched {
                    Some((_, best)) if distance >= best => {}
                    _ => matched = Some((j, distance)),
                }
            }
            if let Some((j, distance)) = matched {
                matches
                    .entry(pa1.anchor.name.clone())
                    .or_default()
                    .push((distance, i, j));
            }
        }

        let mut removed = vec![false; propagated.len()];
        for group in matches.values_mut() {
            group.sort_by(|a, b| a.0.total_cmp(&b.0));
            let last = group.len() - 1;
            for (n, &(_, i, j)) in group.iter().enumerate() {
                if keep_farthest && n == last {
                    break;
                }
                removed[i] = true;
                removed[j] = true;
                let base = &propagated[j];
                let Some(attachment) = self.attachments.by_index(base.attachment) else {
                    continue;
                };
                for (k, pa) in propagated.iter().enumerate() {
                    if pa.component == base.component && attachment.is_base(&pa.anchor.name) {
                        removed[k] = true;
                    }
                }
            }
        }
        let mut removed = removed.into_iter();
        propagated.retain(|_| !removed.next().unwrap_or(false));
    }

    fn prune_mark_anchors(&self, propagated: &mut Vec<PropagatedAnchor>) {
        propagated.retain(|pa| {
            !self
                .attachments
                .by_index(pa.attachment)
                .is_some_and(|at| at.is_mark(&pa.anchor.name))
        });
    }

    /// Drop anchors whose attachment is the opposite of one the mark glyph already has
    fn prune_opposite_mark_anchors(
        &self,
        own_names: &HashSet<&str>,
        propagated: &mut Vec<PropagatedAnchor>,
    ) {
        propagated.retain(|pa| {
            let Some(attachment) = self.attachments.by_index(pa.attachment) else {
                return true;
            };
            !attachment.base.iter().any(|name| {
                [vertical_opposite(name), horizontal_opposite(name)]
                    .into_iter()
                    .flatten()
                    .any(|opposite| own_names.contains(opposite))
            })
        });
    }
}

/// Rename `top`, `top`, ... to `top_1`, `top_2`, ... in component order
fn number_ligature_anchors(propagated: &mut [PropagatedAnchor]) {
    let mut counters: HashMap<String, usize> = HashMap::new();
    for pa in propagated.iter_mut() {
        let counter = counters.entry(pa.anchor.name.clone()).or_default();
        *counter += 1;
        pa.anchor.name = format!("{}_{}", pa.anchor.name, counter);
    }
}

fn squared_distance(a: &Anchor, b: &Anchor) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}
