use std::{io, path::PathBuf};
use thiserror::Error;
#[cfg(feature = "cli")]
extern crate serde_json_path_to_error as serde_json;

/// Errors produced while using the fontmarks crate
#[derive(Debug, Error)]
pub enum FontmarksError {
    #[error("Unknown file type for file {path:?}")]
    /// The file type is unknown
    UnknownFileType {
        /// The path of the file
        path: PathBuf,
    },

    #[error("IO Error: {0}")]
    /// IO error
    IO(#[from] io::Error),

    #[error("JSON conversion error: {0}")]
    /// JSON conversion error
    JsonSerialize(#[from] serde_json::Error),

    #[cfg(feature = "ufo")]
    #[error("Error loading UFO: {0}")]
    /// Error loading UFO
    UfoLoad(#[from] norad::error::FontLoadError),

    #[cfg(feature = "ufo")]
    #[error("Error saving UFO: {0}")]
    /// Error saving UFO
    UfoSave(#[from] norad::error::FontWriteError),

    #[cfg(feature = "ufo")]
    #[error("Error in UFO naming: {0}")]
    /// Error in UFO naming
    UfoName(#[from] norad::error::NamingError),

    #[error("Filter error: {0}")]
    /// General error when running a filter
    FilterError(String),

    #[error("Could not parse feature code: {0}")]
    /// The font's existing feature code could not be parsed
    FeatureParse(String),

    #[error("Invalid mark anchor pattern: {0}")]
    /// The regular expression used to recognise mark anchors is invalid
    InvalidMarkPattern(#[from] regex::Error),

    #[error("Mark anchor cannot be numbered: {name:?}")]
    /// A mark anchor (`_top`) also carried a ligature component index (`_top_1`)
    MarkAnchorNumbered {
        /// The offending anchor name
        name: String,
    },

    #[error("Mark anchor key is empty: {name:?}")]
    /// Stripping the mark prefix left nothing behind
    EmptyMarkKey {
        /// The offending anchor name
        name: String,
    },

    #[error("Ligature component indexes must start from 1: {name:?}")]
    /// A ligature anchor was numbered zero
    LigatureIndexBelowOne {
        /// The offending anchor name
        name: String,
    },

    /// Layout closure errors
    #[error("Glyphset grew unreasonably during layout closure")]
    LayoutClosureError,
}
