//! Anchor propagation and mark feature generation for font sources
//!
//! ```no_run
//! use fontmarks::filters::{FontFilter, PropagateAnchors, WriteMarkFeatures};
//!
//! let mut font = fontmarks::load("MyFont.ufo")?;
//! PropagateAnchors::default().apply(&mut font)?;
//! WriteMarkFeatures::default().apply(&mut font)?;
//! font.save("MyFont-marks.ufo")?;
//! # Ok::<(), fontmarks::FontmarksError>(())
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

#[cfg(feature = "cli")]
extern crate serde_json_path_to_error as serde_json;

mod anchor;
mod attachment;
pub mod convertors;
mod error;
mod features;
pub mod featurewriters;
pub mod filters;
mod font;
mod glyph;
pub mod layout;
mod serde_helpers;
mod shape;
mod unicode;

pub use crate::{
    anchor::{Anchor, AnchorName, AnchorNaming},
    attachment::{Attachment, AttachmentConfig, Attachments},
    error::FontmarksError,
    features::Features,
    font::Font,
    glyph::{Glyph, GlyphCategory, GlyphList},
    shape::Component,
};
use std::path::PathBuf;

/// Load a font
///
/// `.json` and `.fontmarks` files hold the native serialization; with the `ufo`
/// feature, `.ufo` sources are read too.
pub fn load(filename: impl Into<PathBuf>) -> Result<Font, FontmarksError> {
    let pb = filename.into();
    let pb_clone = pb.clone();

    let mut font: Font = match pb.extension() {
        Some(ext) if ext == "json" || ext == "fontmarks" => {
            let buffered = std::io::BufReader::new(std::fs::File::open(&pb)?);
            Ok(serde_json::from_reader(buffered)?)
        }
        #[cfg(feature = "ufo")]
        Some(ext) if ext == "ufo" => crate::convertors::ufo::load(pb),
        _ => Err(FontmarksError::UnknownFileType { path: pb }),
    }?;
    font.source = Some(pb_clone);
    Ok(font)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_load_unknown_extension() {
        assert!(matches!(
            load("font.glyphs"),
            Err(FontmarksError::UnknownFileType { .. })
        ));
    }
}
