//! Feature writers generate OpenType feature code from a font's glyph data
//!
//! A writer adds statements to a [`fea_rs_ast::FeatureFile`]
//! rather than touching the font's own feature code; the caller decides where the
//! result goes (see [`WriteMarkFeatures`](crate::filters::WriteMarkFeatures)).
mod markclasses;
mod markfeaturewriter;

pub use markclasses::{MarkClassBuilder, MarkClassMembers, MarkClasses};
pub use markfeaturewriter::{MarkFeatureWriter, WriterMode, MARK_FEATURES};

use fea_rs_ast::FeatureFile;

use crate::{Font, FontmarksError};

/// A generator of feature code
pub trait FeatureWriter {
    /// Add this writer's statements to `feature_file`
    ///
    /// Returns whether anything was written.
    fn write(&self, font: &Font, feature_file: &mut FeatureFile) -> Result<bool, FontmarksError>;
}
