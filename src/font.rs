use crate::{features::Features, glyph::GlyphList, FontmarksError};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::BTreeMap, path::PathBuf};

#[cfg(feature = "cli")]
extern crate serde_json_path_to_error as serde_json;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A font source, reduced to what anchor propagation and mark feature generation need
pub struct Font {
    /// Units per em
    pub upm: u16,
    /// A list of the font's glyphs
    pub glyphs: GlyphList,
    /// OpenType feature code
    #[serde(default)]
    pub features: Features,
    /// The file the font was loaded from, if any
    ///
    /// Used to resolve `include` statements in feature code.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Font {
    fn default() -> Self {
        Self::new()
    }
}

impl Font {
    /// Create a new, empty font
    pub fn new() -> Self {
        Font {
            upm: 1000,
            glyphs: Default::default(),
            features: Default::default(),
            source: None,
        }
    }

    /// The names of all glyphs in the font, in glyph order
    pub fn glyph_names(&self) -> Vec<&str> {
        self.glyphs.iter().map(|g| g.name.as_str()).collect()
    }

    /// Map each encoded codepoint to the glyph which carries it
    ///
    /// If two glyphs claim the same codepoint, the first one in glyph order wins.
    pub fn unicode_map(&self) -> BTreeMap<u32, SmolStr> {
        let mut map = BTreeMap::new();
        for glyph in self.glyphs.iter() {
            for &cp in glyph.codepoints.iter() {
                if let Some(existing) = map.get(&cp) {
                    log::warn!(
                        "Codepoint U+{:04X} is mapped to both {} and {}; using {}",
                        cp,
                        existing,
                        glyph.name,
                        existing
                    );
                    continue;
                }
                map.insert(cp, glyph.name.clone());
            }
        }
        map
    }

    /// Save the font
    ///
    /// The format is chosen by extension:
    ///  - `.json` and `.fontmarks` files receive the native JSON serialization
    ///  - With the `ufo` feature, `.ufo` is also supported; anchors and feature code are
    ///    written back into the UFO the font was loaded from
    pub fn save<T: Into<std::path::PathBuf>>(&self, path: T) -> Result<(), FontmarksError> {
        let path = path.into();
        if matches!(
            path.extension().and_then(|x| x.to_str()),
            Some("json") | Some("fontmarks")
        ) {
            let file = std::fs::File::create(&path)?;
            let mut buffer = std::io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut buffer, &self)?;
            return Ok(());
        }
        #[cfg(feature = "ufo")]
        {
            if path.extension().and_then(|x| x.to_str()) == Some("ufo") {
                return crate::convertors::ufo::save(self, &path);
            }
        }
        Err(FontmarksError::UnknownFileType { path })
    }
}
