use serde::{ser::SerializeSeq as _, Deserialize as _};

use crate::GlyphCategory;

pub(crate) fn affine_is_identity(affine: &kurbo::Affine) -> bool {
    *affine == kurbo::Affine::IDENTITY
}

pub(crate) fn is_unknown_category(category: &GlyphCategory) -> bool {
    *category == GlyphCategory::Unknown
}

pub(crate) fn serialize_affine<S>(affine: &kurbo::Affine, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let coeffs = affine.as_coeffs();
    let mut seq = serializer.serialize_seq(Some(coeffs.len()))?;
    for c in coeffs {
        seq.serialize_element(&c)?;
    }
    seq.end()
}

pub(crate) fn deserialize_affine<'de, D>(deserializer: D) -> Result<kurbo::Affine, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let coeffs: Vec<f64> = Vec::deserialize(deserializer)?;
    let coeffs: [f64; 6] = coeffs.try_into().map_err(|v: Vec<f64>| {
        serde::de::Error::custom(format!(
            "Expected six transform coefficients, found {}",
            v.len()
        ))
    })?;
    Ok(kurbo::Affine::new(coeffs))
}
