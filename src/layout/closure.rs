use std::collections::{HashMap, HashSet};

use fea_rs_ast::{FeatureFile, GlyphContainer, LayoutVisitor, Statement};
use smol_str::SmolStr;

use crate::FontmarksError;

const MAX_ROUNDS: usize = 10;

/// Extend a set of glyphs with every glyph the substitutions in `feature_file` can produce from them
///
/// Contextual rules only apply when all of their context glyphs are already reachable.
pub fn close_layout(
    feature_file: &mut FeatureFile,
    glyphs: HashSet<SmolStr>,
) -> Result<HashSet<SmolStr>, FontmarksError> {
    // A lookup referenced from a later rule may only become relevant once
    // that rule has added its input, so repeat until nothing changes.
    let mut visitor = SubstitutionClosure {
        glyphs,
        classes: HashMap::new(),
    };
    for round in 1..=MAX_ROUNDS {
        let before = visitor.glyphs.len();
        visitor.visit(feature_file).map_err(|e| {
            FontmarksError::FeatureParse(format!("Error computing substitution closure: {}", e))
        })?;
        if visitor.glyphs.len() == before {
            log::debug!("Substitution closure settled after {} rounds", round);
            return Ok(visitor.glyphs);
        }
    }
    Err(FontmarksError::LayoutClosureError)
}

struct SubstitutionClosure {
    glyphs: HashSet<SmolStr>,
    classes: HashMap<SmolStr, Vec<SmolStr>>,
}

impl SubstitutionClosure {
    /// Flatten a glyph container into glyph names, resolving named classes
    fn expand(&self, container: &GlyphContainer) -> Vec<SmolStr> {
        match container {
            GlyphContainer::GlyphName(glyph) => vec![glyph.name.clone()],
            GlyphContainer::GlyphNameOrRange(name) => vec![name.clone()],
            GlyphContainer::GlyphRange(range) => range.glyphset().into_iter().collect(),
            GlyphContainer::GlyphClass(class) => {
                class.glyphs.iter().flat_map(|gc| self.expand(gc)).collect()
            }
            GlyphContainer::GlyphClassName(name) => {
                let name = name.trim_start_matches('@');
                match self.classes.get(name) {
                    Some(members) => members.clone(),
                    None => {
                        log::warn!("No definition found for glyph class @{}", name);
                        vec![]
                    }
                }
            }
        }
    }

    fn reachable(&self, container: &GlyphContainer) -> bool {
        self.expand(container)
            .iter()
            .any(|g| self.glyphs.contains(g))
    }

    fn context_matches(&self, prefix: &[GlyphContainer], suffix: &[GlyphContainer]) -> bool {
        prefix.iter().chain(suffix.iter()).all(|gc| self.reachable(gc))
    }

    fn add_all<'a>(&mut self, outputs: impl IntoIterator<Item = &'a GlyphContainer>) {
        let produced: Vec<SmolStr> = outputs.into_iter().flat_map(|gc| self.expand(gc)).collect();
        for glyph in produced {
            if self.glyphs.insert(glyph.clone()) {
                log::debug!("Substitution closure reached {}", glyph);
            }
        }
    }
}

impl LayoutVisitor for SubstitutionClosure {
    fn depth_first(&self) -> bool {
        true
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> bool {
        match statement {
            Statement::GlyphClassDefinition(definition) => {
                let members = definition
                    .glyphs
                    .glyphs
                    .iter()
                    .flat_map(|gc| self.expand(gc))
                    .collect();
                self.classes
                    .insert(definition.name.to_string().into(), members);
            }
            Statement::SingleSubst(subst) => {
                if !self.context_matches(&subst.prefix, &subst.suffix) {
                    return true;
                }
                let inputs: Vec<SmolStr> =
                    subst.glyphs.iter().flat_map(|gc| self.expand(gc)).collect();
                let outputs: Vec<SmolStr> = subst
                    .replacement
                    .iter()
                    .flat_map(|gc| self.expand(gc))
                    .collect();
                // A class maps onto a class pairwise, or entirely onto one glyph
                let produced: Vec<SmolStr> = match outputs.as_slice() {
                    [single] => {
                        if inputs.iter().any(|input| self.glyphs.contains(input)) {
                            vec![single.clone()]
                        } else {
                            vec![]
                        }
                    }
                    _ => inputs
                        .iter()
                        .zip(outputs.iter())
                        .filter(|(input, _)| self.glyphs.contains(*input))
                        .map(|(_, output)| output.clone())
                        .collect(),
                };
                for glyph in produced {
                    self.glyphs.insert(glyph);
                }
            }
            Statement::MultipleSubst(subst) => {
                if self.context_matches(&subst.prefix, &subst.suffix)
                    && self.reachable(&subst.glyph)
                {
                    self.add_all(subst.replacement.iter());
                }
            }
            Statement::AlternateSubst(subst) => {
                if self.context_matches(&subst.prefix, &subst.suffix)
                    && self.reachable(&subst.glyph)
                {
                    self.add_all(std::iter::once(&subst.replacement));
                }
            }
            Statement::LigatureSubst(subst) => {
                if self.context_matches(&subst.prefix, &subst.suffix)
                    && subst.glyphs.iter().all(|gc| self.reachable(gc))
                {
                    self.add_all(std::iter::once(&subst.replacement));
                }
            }
            Statement::ReverseChainSubst(subst) => {
                if self.context_matches(&subst.prefix, &subst.suffix)
                    && subst.glyphs.iter().all(|gc| self.reachable(gc))
                {
                    self.add_all(subst.replacements.iter());
                }
            }
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn closure_of(glyph_names: &[&str], fea: &str, initial: &[&str]) -> Vec<SmolStr> {
        let names: Vec<&str> = glyph_names.to_vec();
        let mut feature_file = FeatureFile::new_from_fea(fea, Some(&names), None::<&str>).unwrap();
        let initial: HashSet<SmolStr> = initial.iter().map(|s| (*s).into()).collect();
        let mut result: Vec<SmolStr> = close_layout(&mut feature_file, initial)
            .unwrap()
            .into_iter()
            .collect();
        result.sort();
        result
    }

    #[test]
    fn test_single_substitutions() {
        assert_eq!(
            closure_of(
                &["ka-deva", "ka-deva.alt", "kha-deva", "kha-deva.alt"],
                "feature salt { sub ka-deva by ka-deva.alt; sub kha-deva by kha-deva.alt; } salt;",
                &["ka-deva"],
            ),
            vec!["ka-deva", "ka-deva.alt"]
        );
    }

    #[test]
    fn test_ligatures_need_all_components() {
        assert_eq!(
            closure_of(
                &["ka-deva", "virama-deva", "ssa-deva", "k_ssa-deva", "f", "i", "f_i"],
                "feature akhn { sub ka-deva virama-deva ssa-deva by k_ssa-deva; } akhn;\n\
                 feature liga { sub f i by f_i; } liga;",
                &["ka-deva", "virama-deva", "ssa-deva", "f"],
            ),
            vec!["f", "k_ssa-deva", "ka-deva", "ssa-deva", "virama-deva"]
        );
    }

    #[test]
    fn test_class_definitions_are_resolved() {
        assert_eq!(
            closure_of(
                &["a", "b", "a.sc", "b.sc"],
                "@lc = [a b]; @sc = [a.sc b.sc]; feature smcp { sub @lc by @sc; } smcp;",
                &["b"],
            ),
            vec!["b", "b.sc"]
        );
    }

    #[test]
    fn test_class_substituted_by_one_glyph() {
        assert_eq!(
            closure_of(
                &["a", "b", "c"],
                "feature ss01 { sub [a b] by c; } ss01;",
                &["b"],
            ),
            vec!["b", "c"]
        );
    }

    #[test]
    fn test_context_must_be_reachable() {
        assert_eq!(
            closure_of(
                &["a", "b", "c", "d", "e"],
                "feature calt { sub b a' by d; sub a by e; } calt;",
                &["a", "c"],
            ),
            vec!["a", "c", "e"]
        );
    }

    #[test]
    fn test_referenced_lookups_need_another_round() {
        assert_eq!(
            closure_of(
                &["a", "b", "c"],
                "lookup A { sub b by c; } A; feature foo { sub a by b; } foo; feature bar { sub b' lookup A; } bar;",
                &["a"],
            ),
            vec!["a", "b", "c"]
        );
    }
}
