use crate::{
    featurewriters::{FeatureWriter, MarkFeatureWriter, MARK_FEATURES},
    filters::FontFilter,
    layout::ast::merge_into,
    Font, FontmarksError,
};

/// A filter that generates mark positioning features and adds them to the font's feature code
#[derive(Debug, Clone, Default)]
pub struct WriteMarkFeatures(pub MarkFeatureWriter);

impl WriteMarkFeatures {
    /// Create a new WriteMarkFeatures filter
    pub fn new(writer: MarkFeatureWriter) -> Self {
        WriteMarkFeatures(writer)
    }
}

impl FontFilter for WriteMarkFeatures {
    fn apply(&self, font: &mut Font) -> Result<(), FontmarksError> {
        let mut feature_file = fea_rs_ast::FeatureFile::new(vec![]);
        if self.0.write(font, &mut feature_file)? {
            merge_into(&feature_file, &mut font.features);
        } else {
            log::info!("No mark features generated");
        }
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, FontmarksError>
    where
        Self: Sized,
    {
        let s = s.trim();
        if s.is_empty() {
            return Ok(WriteMarkFeatures::default());
        }
        if s.starts_with('{') {
            let writer: MarkFeatureWriter = serde_json::from_str(s).map_err(|e| {
                FontmarksError::FilterError(format!("Bad mark feature options: {}", e))
            })?;
            return Ok(WriteMarkFeatures(writer));
        }
        let tags: Vec<&str> = s.split(',').map(|t| t.trim()).collect();
        if let Some(bad) = tags.iter().find(|t| !MARK_FEATURES.contains(t)) {
            return Err(FontmarksError::FilterError(format!(
                "Unknown mark feature {}; expected some of {}",
                bad,
                MARK_FEATURES.join(",")
            )));
        }
        Ok(WriteMarkFeatures(MarkFeatureWriter::new().with_features(tags)))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("writemarkfeatures")
            .long("mark-features")
            .value_name("FEATURES")
            .num_args(0..=1)
            .default_missing_value("")
            .help("Generate mark, mkmk, abvm and blwm features (optionally only the comma-separated FEATURES)")
    }
}
