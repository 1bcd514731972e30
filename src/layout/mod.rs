//! Feature code: the AST the writers emit, and what can be learned from the user's own code
pub mod ast;
pub(crate) mod closure;
pub(crate) mod inventory;

use crate::{Font, FontmarksError};

/// Parse the font's existing feature code, if it has any
pub(crate) fn parse_font_features(
    font: &Font,
) -> Result<Option<fea_rs_ast::FeatureFile>, FontmarksError> {
    if font.features.is_empty() {
        return Ok(None);
    }
    let fea = font.features.to_fea();
    let glyph_names = font.glyph_names();
    fea_rs_ast::FeatureFile::new_from_fea(&fea, Some(&glyph_names), font.source.clone())
        .map(Some)
        .map_err(|e| FontmarksError::FeatureParse(e.to_string()))
}
