use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use fea_rs_ast::{
    Comment, FeatureBlock, FeatureFile, GlyphClassDefinition, LookupBlock, LookupFlagStatement,
    MarkBasePosStatement, MarkClass, MarkLigPosStatement, MarkMarkPosStatement, Statement,
    ToplevelItem,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
    anchor::{AnchorName, AnchorNaming},
    featurewriters::{
        markclasses::{MarkClassBuilder, MarkClassMembers, MarkClasses},
        FeatureWriter,
    },
    layout::{
        ast::{self, make_fea_class_name, AnchorPoint},
        closure::close_layout,
        inventory::FeatureInventory,
        parse_font_features,
    },
    unicode, Font, FontmarksError,
};

/// The features a [`MarkFeatureWriter`] can generate
pub const MARK_FEATURES: [&str; 4] = ["mark", "mkmk", "abvm", "blwm"];

/// What to do about features which already exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterMode {
    /// Leave existing features alone and do not generate them
    #[default]
    Skip,
}

/// Generates `mark`, `mkmk`, `abvm` and `blwm` features from glyph anchors
///
/// Base glyphs carry anchors such as `top`; mark glyphs carry the matching
/// `_top`. Ligatures number their anchors by component (`top_1`, `top_2`), and a
/// bare `_2` leaves that component without an anchor. Mark glyphs may also carry
/// base anchors, which are used for mark-to-mark attachment.
///
/// Glyphs of the Indic scripts (and glyphs reachable from them through
/// substitutions) are placed in `abvm`/`blwm` rather than `mark`/`mkmk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkFeatureWriter {
    /// Prefix of generated mark class names
    pub mark_class_prefix: String,
    /// How anchor names are interpreted
    #[serde(skip)]
    pub naming: AnchorNaming,
    /// Only generate these features
    pub features: Option<Vec<SmolStr>>,
    /// What to do about features which already exist
    pub mode: WriterMode,
    /// ISO 15924 codes of the scripts handled by `abvm`/`blwm`
    pub indic_scripts: Vec<SmolStr>,
    /// Anchor names which always go in `abvm`
    pub abvm_names: Vec<SmolStr>,
    /// Anchor names which always go in `blwm`
    pub blwm_names: Vec<SmolStr>,
}

fn smol_strs(items: &[&str]) -> Vec<SmolStr> {
    items.iter().map(|s| SmolStr::from(*s)).collect()
}

impl Default for MarkFeatureWriter {
    fn default() -> Self {
        MarkFeatureWriter {
            mark_class_prefix: "MC".to_string(),
            naming: AnchorNaming::default(),
            features: None,
            mode: WriterMode::Skip,
            indic_scripts: smol_strs(&[
                "Beng", "Cham", "Deva", "Gujr", "Guru", "Knda", "Mlym", "Orya", "Taml", "Telu",
            ]),
            abvm_names: smol_strs(&["top", "topleft", "topright", "candra", "bindu", "candrabindu"]),
            blwm_names: smol_strs(&["bottom", "bottomleft", "bottomright", "nukta"]),
        }
    }
}

impl MarkFeatureWriter {
    /// Create a writer with the default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Only generate the given features
    pub fn with_features<T: Into<SmolStr>>(mut self, tags: Vec<T>) -> Self {
        self.features = Some(tags.into_iter().map(|t| t.into()).collect());
        self
    }

    fn requested_features(&self) -> Vec<SmolStr> {
        match &self.features {
            None => smol_strs(&MARK_FEATURES),
            Some(tags) => tags
                .iter()
                .filter(|tag| {
                    let supported = MARK_FEATURES.contains(&tag.as_str());
                    if !supported {
                        log::warn!("Feature {} is not generated by the mark writer; ignored", tag);
                    }
                    supported
                })
                .cloned()
                .collect(),
        }
    }

    /// The features still to generate, given the existing ones
    fn todo(&self, existing: &BTreeSet<SmolStr>) -> BTreeSet<SmolStr> {
        match self.mode {
            WriterMode::Skip => self
                .requested_features()
                .into_iter()
                .filter(|tag| {
                    if existing.contains(tag) {
                        log::debug!("Feature {} already present; skipped", tag);
                        return false;
                    }
                    true
                })
                .collect(),
        }
    }

    /// Collect each glyph's named anchors, in glyph order
    fn anchor_lists(&self, font: &Font) -> Result<IndexMap<SmolStr, Vec<NamedAnchor>>, FontmarksError> {
        let mut result = IndexMap::new();
        for glyph in font.glyphs.iter() {
            let mut anchors: IndexMap<&str, NamedAnchor> = IndexMap::new();
            for anchor in glyph.anchors.iter() {
                if anchor.name.is_empty() {
                    log::warn!("Unnamed anchor discarded in glyph {}", glyph.name);
                    continue;
                }
                if anchors.contains_key(anchor.name.as_str()) {
                    log::warn!("Duplicate anchor {} in glyph {}", anchor.name, glyph.name);
                }
                anchors.insert(
                    anchor.name.as_str(),
                    NamedAnchor {
                        name: anchor.name.as_str().into(),
                        x: anchor.x,
                        y: anchor.y,
                        parsed: self.naming.parse(&anchor.name)?,
                        mark_class: None,
                    },
                );
            }
            if !anchors.is_empty() {
                result.insert(glyph.name.clone(), anchors.into_values().collect());
            }
        }
        Ok(result)
    }

    /// Glyphs of the Indic scripts, plus anything substitutions can turn them into
    fn indic_glyphs(
        &self,
        font: &Font,
        user_features: Option<&mut fea_rs_ast::FeatureFile>,
    ) -> Result<HashSet<SmolStr>, FontmarksError> {
        let scripts = unicode::scripts_from_short_names(self.indic_scripts.iter().map(|s| s.as_str()));
        let seeds: HashSet<SmolStr> = font
            .unicode_map()
            .into_iter()
            .filter(|(codepoint, _)| unicode::in_scripts(*codepoint, &scripts))
            .map(|(_, glyph)| glyph)
            .collect();
        match user_features {
            Some(feature_file) if !seeds.is_empty() => close_layout(feature_file, seeds),
            _ => Ok(seeds),
        }
    }

    fn is_above(&self, anchor: &NamedAnchor, threshold: f64) -> bool {
        if self.abvm_names.contains(&anchor.name) {
            return true;
        }
        if self.blwm_names.contains(&anchor.name) {
            return false;
        }
        anchor.y >= threshold
    }
}

impl FeatureWriter for MarkFeatureWriter {
    fn write(&self, font: &Font, feature_file: &mut FeatureFile) -> Result<bool, FontmarksError> {
        let anchor_lists = self.anchor_lists(font)?;
        let pairs = anchor_pairs(&self.naming, &anchor_lists);
        if pairs.is_empty() {
            log::debug!("No mark-attaching anchors found; skipped");
            return Ok(false);
        }

        // What the user's code and the target document already define
        let mut user_features = parse_font_features(font)?;
        let mut inventory = match user_features.as_mut() {
            Some(parsed) => FeatureInventory::collect(parsed)?,
            None => FeatureInventory::default(),
        };
        inventory.extend(FeatureInventory::collect(feature_file)?);
        let todo = self.todo(&inventory.features);
        if todo.is_empty() {
            log::debug!("No features to be generated; skipped");
            return Ok(false);
        }

        let mut run = MarkWriterRun {
            writer: self,
            anchor_lists,
            pairs,
            mark_glyphs: HashSet::new(),
            classes: MarkClasses::default(),
            taken_names: BTreeSet::new(),
            threshold: f64::from(font.upm / 2),
        };
        run.prune_unused_anchors();
        run.make_mark_classes(inventory.mark_classes, inventory.classes);

        let indic_glyphs = self.indic_glyphs(font, user_features.as_mut())?;
        let features = run.make_features(&todo, &indic_glyphs);
        if features.is_empty() {
            return Ok(false);
        }
        log::info!(
            "Generated mark features: {}",
            features.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        feature_file.statements.extend(
            run.classes
                .definitions
                .iter()
                .cloned()
                .map(ToplevelItem::MarkClassDefinition),
        );
        feature_file
            .statements
            .push(ToplevelItem::Comment(Comment::new(String::new())));
        feature_file
            .statements
            .extend(features.into_values().map(ToplevelItem::Feature));
        Ok(true)
    }
}

/// An anchor with its parsed name and, on base anchors, the mark class attaching to it
#[derive(Debug, Clone)]
struct NamedAnchor {
    name: SmolStr,
    x: f64,
    y: f64,
    parsed: AnchorName,
    mark_class: Option<SmolStr>,
}

/// Map base anchor names to the mark anchor names they pair with
fn anchor_pairs(
    naming: &AnchorNaming,
    anchor_lists: &IndexMap<SmolStr, Vec<NamedAnchor>>,
) -> HashMap<SmolStr, SmolStr> {
    let mark_names: HashSet<&str> = anchor_lists
        .values()
        .flatten()
        .filter(|a| a.parsed.is_mark)
        .map(|a| a.name.as_str())
        .collect();
    let mut pairs = HashMap::new();
    for anchor in anchor_lists.values().flatten() {
        if anchor.parsed.is_mark {
            continue;
        }
        let mark_name = naming.mark_anchor_name(&anchor.parsed.key);
        if mark_names.contains(mark_name.as_str()) {
            pairs.insert(anchor.name.clone(), mark_name);
        }
    }
    pairs
}

/// An anchor and the mark class which attaches to it
type MarkAttachment = (fea_rs_ast::Anchor, MarkClass);

fn sorted_attachments(anchors: &[NamedAnchor]) -> Vec<MarkAttachment> {
    let mut anchors: Vec<&NamedAnchor> = anchors.iter().collect();
    anchors.sort_by(|a, b| a.name.cmp(&b.name));
    anchors
        .into_iter()
        .filter_map(|a| {
            a.mark_class.as_ref().map(|class| {
                (
                    AnchorPoint::round(a.x, a.y).to_anchor(),
                    MarkClass::new(class),
                )
            })
        })
        .collect()
}

/// A positioning rule before it is turned into a statement
#[derive(Debug, Clone)]
enum MarkPos {
    Base {
        glyph: SmolStr,
        marks: Vec<NamedAnchor>,
    },
    Ligature {
        glyph: SmolStr,
        components: Vec<Vec<NamedAnchor>>,
    },
    Mark {
        glyph: SmolStr,
        marks: Vec<NamedAnchor>,
    },
}

impl MarkPos {
    fn glyph(&self) -> &SmolStr {
        match self {
            MarkPos::Base { glyph, .. }
            | MarkPos::Ligature { glyph, .. }
            | MarkPos::Mark { glyph, .. } => glyph,
        }
    }

    /// Keep only the anchors passing `keep`; `None` if nothing is left
    fn filter(&self, keep: &dyn Fn(&NamedAnchor) -> bool) -> Option<MarkPos> {
        let kept = |marks: &[NamedAnchor]| -> Vec<NamedAnchor> {
            marks.iter().filter(|a| keep(a)).cloned().collect()
        };
        match self {
            MarkPos::Base { glyph, marks } => {
                let marks = kept(marks);
                (!marks.is_empty()).then(|| MarkPos::Base {
                    glyph: glyph.clone(),
                    marks,
                })
            }
            MarkPos::Mark { glyph, marks } => {
                let marks = kept(marks);
                (!marks.is_empty()).then(|| MarkPos::Mark {
                    glyph: glyph.clone(),
                    marks,
                })
            }
            MarkPos::Ligature { glyph, components } => {
                let components: Vec<Vec<NamedAnchor>> =
                    components.iter().map(|c| kept(c)).collect();
                components
                    .iter()
                    .any(|c| !c.is_empty())
                    .then(|| MarkPos::Ligature {
                        glyph: glyph.clone(),
                        components,
                    })
            }
        }
    }

    fn to_statement(&self) -> Statement {
        match self {
            MarkPos::Base { glyph, marks } => Statement::MarkBasePos(MarkBasePosStatement::new(
                ast::glyph(glyph),
                sorted_attachments(marks),
                0..0,
            )),
            MarkPos::Mark { glyph, marks } => Statement::MarkMarkPos(MarkMarkPosStatement::new(
                ast::glyph(glyph),
                sorted_attachments(marks),
                0..0,
            )),
            // An empty component renders as <anchor NULL>
            MarkPos::Ligature { glyph, components } => {
                Statement::MarkLigPos(MarkLigPosStatement::new(
                    ast::glyph(glyph),
                    components.iter().map(|c| sorted_attachments(c)).collect(),
                    0..0,
                ))
            }
        }
    }
}

fn feature_block(tag: &str, statements: Vec<Statement>) -> FeatureBlock {
    FeatureBlock::new(tag.into(), statements, false, 0..0)
}

type GlyphPredicate<'a> = &'a dyn Fn(&str) -> bool;
type AnchorPredicate<'a> = &'a dyn Fn(&NamedAnchor) -> bool;

fn iter_attachments(
    attachments: &[MarkPos],
    include: GlyphPredicate,
    marks_filter: Option<AnchorPredicate>,
) -> Vec<MarkPos> {
    attachments
        .iter()
        .filter(|pos| include(pos.glyph().as_str()))
        .filter_map(|pos| match marks_filter {
            Some(keep) => pos.filter(keep),
            None => Some(pos.clone()),
        })
        .collect()
}

/// State for one writer invocation
struct MarkWriterRun<'a> {
    writer: &'a MarkFeatureWriter,
    anchor_lists: IndexMap<SmolStr, Vec<NamedAnchor>>,
    pairs: HashMap<SmolStr, SmolStr>,
    /// Glyphs carrying a mark anchor which pairs with something
    mark_glyphs: HashSet<SmolStr>,
    classes: MarkClasses,
    /// Class names which generated glyph classes must avoid
    taken_names: BTreeSet<SmolStr>,
    threshold: f64,
}

impl MarkWriterRun<'_> {
    /// Drop anchors which attach to nothing; bare ligature slots (`_1`) stay
    fn prune_unused_anchors(&mut self) {
        let attaching: HashSet<&SmolStr> = self.pairs.keys().chain(self.pairs.values()).collect();
        for anchors in self.anchor_lists.values_mut() {
            anchors.retain(|a| attaching.contains(&a.name) || a.parsed.key.is_empty());
        }
        self.anchor_lists.retain(|_, anchors| !anchors.is_empty());
    }

    fn make_mark_classes(&mut self, existing: MarkClassMembers, reserved: BTreeSet<SmolStr>) {
        let mark_anchor_names: HashSet<&SmolStr> = self.pairs.values().collect();
        let mut groups: BTreeMap<SmolStr, (SmolStr, IndexMap<SmolStr, AnchorPoint>)> =
            BTreeMap::new();
        for (glyph, anchors) in self.anchor_lists.iter() {
            for anchor in anchors {
                if !mark_anchor_names.contains(&anchor.name) {
                    continue;
                }
                groups
                    .entry(anchor.name.clone())
                    .or_insert_with(|| (anchor.parsed.key.clone(), IndexMap::new()))
                    .1
                    .insert(glyph.clone(), AnchorPoint::round(anchor.x, anchor.y));
                self.mark_glyphs.insert(glyph.clone());
            }
        }

        let mut builder =
            MarkClassBuilder::new(&self.writer.mark_class_prefix, existing, reserved.clone());
        for (mark_anchor_name, (key, glyphs)) in groups.iter() {
            builder.add_group(mark_anchor_name, key, glyphs);
        }
        self.classes = builder.finish();
        self.taken_names = reserved;
        self.taken_names
            .extend(self.classes.members.keys().cloned());

        for anchors in self.anchor_lists.values_mut() {
            for anchor in anchors.iter_mut() {
                if anchor.parsed.is_mark || anchor.parsed.key.is_empty() {
                    continue;
                }
                anchor.mark_class = self.classes.class_for_key(&anchor.parsed.key).cloned();
            }
        }
    }

    fn mark_to_base(&self) -> Vec<MarkPos> {
        let mut result = vec![];
        for (glyph, anchors) in self.anchor_lists.iter() {
            if self.mark_glyphs.contains(glyph) {
                continue;
            }
            // Numbered anchors belong to mark-to-ligature
            let marks: Vec<NamedAnchor> = anchors
                .iter()
                .filter(|a| a.parsed.number.is_none() && a.mark_class.is_some())
                .cloned()
                .collect();
            if !marks.is_empty() {
                result.push(MarkPos::Base {
                    glyph: glyph.clone(),
                    marks,
                });
            }
        }
        result
    }

    fn mark_to_ligature(&self) -> Vec<MarkPos> {
        let mut result = vec![];
        for (glyph, anchors) in self.anchor_lists.iter() {
            if self.mark_glyphs.contains(glyph) {
                continue;
            }
            let mut by_component: BTreeMap<u32, Vec<NamedAnchor>> = BTreeMap::new();
            for anchor in anchors {
                let Some(number) = anchor.parsed.number else {
                    continue;
                };
                if anchor.parsed.key.is_empty() {
                    by_component.insert(number, vec![]);
                } else if anchor.mark_class.is_some() {
                    by_component.entry(number).or_default().push(anchor.clone());
                }
            }
            let Some(&last) = by_component.keys().next_back() else {
                continue;
            };
            // Components without anchors get <anchor NULL>
            let components = (1..=last)
                .map(|n| by_component.get(&n).cloned().unwrap_or_default())
                .collect();
            result.push(MarkPos::Ligature {
                glyph: glyph.clone(),
                components,
            });
        }
        result
    }

    fn mark_to_mark(&self) -> BTreeMap<SmolStr, Vec<MarkPos>> {
        let mut result: BTreeMap<SmolStr, Vec<MarkPos>> = BTreeMap::new();
        for (glyph, anchors) in self.anchor_lists.iter() {
            if !self.mark_glyphs.contains(glyph) {
                continue;
            }
            for anchor in anchors {
                if anchor.parsed.is_mark {
                    continue;
                }
                if anchor.parsed.number.is_some() {
                    log::warn!(
                        "Invalid ligature anchor {} in mark glyph {}; skipped",
                        anchor.name,
                        glyph
                    );
                    continue;
                }
                if anchor.mark_class.is_none() {
                    continue;
                }
                result
                    .entry(anchor.parsed.key.clone())
                    .or_default()
                    .push(MarkPos::Mark {
                        glyph: glyph.clone(),
                        marks: vec![anchor.clone()],
                    });
            }
        }
        result
    }

    fn make_lookup(
        name: &str,
        attachments: &[MarkPos],
        include: GlyphPredicate,
        marks_filter: Option<AnchorPredicate>,
    ) -> Option<LookupBlock> {
        let statements: Vec<Statement> = iter_attachments(attachments, include, marks_filter)
            .iter()
            .map(|pos| pos.to_statement())
            .collect();
        (!statements.is_empty()).then(|| LookupBlock::new(name.into(), statements, false, 0..0))
    }

    fn make_mark_to_mark_lookup(
        &mut self,
        key: &str,
        attachments: &[MarkPos],
        include: GlyphPredicate,
        marks_filter: Option<AnchorPredicate>,
        feature_tag: Option<&str>,
    ) -> Option<LookupBlock> {
        let attachments = iter_attachments(attachments, include, marks_filter);
        if attachments.is_empty() {
            return None;
        }
        let prefix = feature_tag.map(|t| format!("{}_", t)).unwrap_or_default();
        let lookup_name = format!("{}mark2mark_{}", prefix, key);

        let class_glyphs = self.classes.glyphs_for_key(key);
        let mut members: Vec<SmolStr> = class_glyphs
            .iter()
            .filter(|g| include(g.as_str()))
            .cloned()
            .collect();
        members.extend(
            attachments
                .iter()
                .map(|pos| pos.glyph())
                .filter(|g| !class_glyphs.contains(g))
                .cloned(),
        );
        let class_name =
            make_fea_class_name(&format!("MFS_{}", lookup_name), Some(&self.taken_names));
        self.taken_names.insert(class_name.clone());

        let mut statements = vec![
            Statement::GlyphClassDefinition(GlyphClassDefinition::new(
                class_name.to_string(),
                ast::glyph_class(&members),
                0..0,
            )),
            Statement::LookupFlag(LookupFlagStatement::new(
                0,
                None,
                Some(ast::class_reference(&class_name)),
                0..0,
            )),
        ];
        statements.extend(attachments.iter().map(|pos| pos.to_statement()));
        Some(LookupBlock::new(lookup_name.into(), statements, false, 0..0))
    }

    fn make_features(
        &mut self,
        todo: &BTreeSet<SmolStr>,
        indic_glyphs: &HashSet<SmolStr>,
    ) -> BTreeMap<SmolStr, FeatureBlock> {
        let mark_to_base = self.mark_to_base();
        let mark_to_ligature = self.mark_to_ligature();
        let mark_to_mark = self.mark_to_mark();
        let is_indic = |glyph: &str| indic_glyphs.contains(glyph);
        let is_not_indic = |glyph: &str| !indic_glyphs.contains(glyph);

        let mut features = BTreeMap::new();
        if todo.contains("mark") {
            let statements: Vec<Statement> = [
                Self::make_lookup("mark2base", &mark_to_base, &is_not_indic, None),
                Self::make_lookup("mark2liga", &mark_to_ligature, &is_not_indic, None),
            ]
            .into_iter()
            .flatten()
            .map(Statement::LookupBlock)
            .collect();
            if !statements.is_empty() {
                features.insert("mark".into(), feature_block("mark", statements));
            }
        }
        if todo.contains("mkmk") {
            let mut statements = vec![];
            for (key, attachments) in mark_to_mark.iter() {
                if let Some(lookup) =
                    self.make_mark_to_mark_lookup(key, attachments, &is_not_indic, None, None)
                {
                    statements.push(Statement::LookupBlock(lookup));
                }
            }
            if !statements.is_empty() {
                features.insert("mkmk".into(), feature_block("mkmk", statements));
            }
        }
        if (todo.contains("abvm") || todo.contains("blwm")) && !indic_glyphs.is_empty() {
            let writer = self.writer;
            let threshold = self.threshold;
            let above = |a: &NamedAnchor| writer.is_above(a, threshold);
            let below = |a: &NamedAnchor| !writer.is_above(a, threshold);
            for (tag, marks_filter) in [("abvm", &above as AnchorPredicate), ("blwm", &below as AnchorPredicate)] {
                if !todo.contains(tag) {
                    continue;
                }
                let mut statements: Vec<Statement> = [
                    Self::make_lookup(
                        &format!("{}_mark2base", tag),
                        &mark_to_base,
                        &is_indic,
                        Some(marks_filter),
                    ),
                    Self::make_lookup(
                        &format!("{}_mark2liga", tag),
                        &mark_to_ligature,
                        &is_indic,
                        Some(marks_filter),
                    ),
                ]
                .into_iter()
                .flatten()
                .map(Statement::LookupBlock)
                .collect();
                for (key, attachments) in mark_to_mark.iter() {
                    if let Some(lookup) = self.make_mark_to_mark_lookup(
                        key,
                        attachments,
                        &is_indic,
                        Some(marks_filter),
                        Some(tag),
                    ) {
                        statements.push(Statement::LookupBlock(lookup));
                    }
                }
                if !statements.is_empty() {
                    features.insert(tag.into(), feature_block(tag, statements));
                }
            }
        }
        features
    }
}
