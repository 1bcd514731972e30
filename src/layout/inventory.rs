use std::collections::BTreeSet;

use fea_rs_ast::{FeatureFile, LayoutVisitor, Statement};
use smol_str::SmolStr;

use crate::{
    featurewriters::MarkClassMembers,
    layout::ast::{glyph_names, AnchorPoint},
    FontmarksError,
};

/// The names already taken in existing feature code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureInventory {
    /// Tags of feature blocks
    pub features: BTreeSet<SmolStr>,
    /// Names of glyph classes and mark classes, without `@`
    pub classes: BTreeSet<SmolStr>,
    /// Members of the mark classes, with their anchors
    pub mark_classes: MarkClassMembers,
}

impl FeatureInventory {
    /// Take stock of a parsed feature file
    pub fn collect(feature_file: &mut FeatureFile) -> Result<Self, FontmarksError> {
        let mut inventory = FeatureInventory::default();
        inventory
            .visit(feature_file)
            .map_err(|e| FontmarksError::FeatureParse(e.to_string()))?;
        log::debug!(
            "Existing feature code defines features {:?} and {} classes",
            inventory.features,
            inventory.classes.len()
        );
        Ok(inventory)
    }

    /// Add what another inventory found
    pub fn extend(&mut self, other: FeatureInventory) {
        self.features.extend(other.features);
        self.classes.extend(other.classes);
        for (class, members) in other.mark_classes {
            self.mark_classes.entry(class).or_default().extend(members);
        }
    }
}

impl LayoutVisitor for FeatureInventory {
    fn depth_first(&self) -> bool {
        false
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> bool {
        match statement {
            Statement::FeatureBlock(block) => {
                self.features.insert(block.name.to_string().trim().into());
            }
            Statement::GlyphClassDefinition(definition) => {
                self.classes
                    .insert(definition.name.to_string().trim_start_matches('@').into());
            }
            Statement::MarkClassDefinition(definition) => {
                let name: SmolStr = definition
                    .mark_class
                    .name
                    .to_string()
                    .trim_start_matches('@')
                    .into();
                self.classes.insert(name.clone());
                let Some(anchor) = AnchorPoint::from_anchor(&definition.anchor) else {
                    log::debug!("Mark class @{} has an anchor without coordinates", name);
                    return true;
                };
                let members = self.mark_classes.entry(name).or_default();
                for glyph in glyph_names(&definition.glyphs) {
                    members.insert(glyph, anchor);
                }
            }
            _ => {}
        }
        true
    }
}
