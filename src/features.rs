use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Prefix under which free-form feature code loaded from a source is stored
pub const ANONYMOUS_PREFIX: &str = "anonymous";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// OpenType feature code, split into classes, prefixes and features
pub struct Features {
    /// Opentype classes
    ///
    /// The key should not start with @.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub classes: IndexMap<SmolStr, String>,
    /// Opentype prefixes
    ///
    /// A dictionary of OpenType lookups and other feature code to be placed before features are defined.
    /// The keys are user-defined names, the values are AFDKO feature code.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub prefixes: IndexMap<SmolStr, String>,
    /// OpenType features
    ///
    /// A list of OpenType feature code, expressed as a tuple (feature tag, code).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<(SmolStr, String)>,
}

impl Features {
    /// Render everything as a single AFDKO feature file
    pub fn to_fea(&self) -> String {
        let mut fea = String::new();
        for (name, glyphs) in &self.classes {
            fea.push_str(&format!("@{} = [{}];\n", name, glyphs));
        }
        for (prefix, code) in &self.prefixes {
            if prefix != ANONYMOUS_PREFIX {
                fea.push_str(&format!("# Prefix: {}\n", prefix));
            }
            fea.push_str(code);
            if !code.ends_with('\n') {
                fea.push('\n');
            }
        }
        for (name, code) in &self.features {
            fea.push_str(&format!("feature {} {{\n{}\n}} {};\n", name, code, name));
        }
        fea
    }

    /// Wrap free-form feature code
    pub fn from_fea(fea: &str) -> Features {
        // A very naive parser that just puts everything into the anonymous prefix.
        let mut features = Features::default();
        features
            .prefixes
            .insert(ANONYMOUS_PREFIX.into(), fea.to_string());
        features
    }

    /// Whether there is no feature code at all
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.features.is_empty()
            && self.prefixes.values().all(|code| code.trim().is_empty())
    }
}
