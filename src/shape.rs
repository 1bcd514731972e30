use crate::serde_helpers::affine_is_identity;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A component in a glyph
pub struct Component {
    /// The referenced glyph name
    pub reference: SmolStr,
    /// The transformation applied to the component
    #[serde(
        default = "kurbo::Affine::default",
        skip_serializing_if = "crate::serde_helpers::affine_is_identity",
        serialize_with = "crate::serde_helpers::serialize_affine",
        deserialize_with = "crate::serde_helpers::deserialize_affine"
    )]
    pub transform: kurbo::Affine,
}

impl Component {
    /// Create a component referencing `reference` with the given transform
    pub fn new(reference: impl Into<SmolStr>, transform: kurbo::Affine) -> Self {
        Component {
            reference: reference.into(),
            transform,
        }
    }

    /// Whether the component is mirrored horizontally
    pub fn is_flipped_horizontally(&self) -> bool {
        self.transform.as_coeffs()[0] < 0.0
    }

    /// Whether the component is mirrored vertically
    pub fn is_flipped_vertically(&self) -> bool {
        self.transform.as_coeffs()[3] < 0.0
    }

    /// Apply the component's transform to a point
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        if affine_is_identity(&self.transform) {
            return (x, y);
        }
        let p = self.transform * kurbo::Point::new(x, y);
        (p.x, p.y)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use kurbo::Affine;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transform_point() {
        let c = Component::new("a", Affine::translate((175.0, 0.0)));
        assert_eq!(c.transform_point(0.0, 300.0), (175.0, 300.0));
        let flipped = Component::new("a", Affine::new([-1.0, 0.0, 0.0, -1.0, 0.0, 280.0]));
        assert!(flipped.is_flipped_horizontally());
        assert!(flipped.is_flipped_vertically());
        assert_eq!(flipped.transform_point(10.0, 300.0), (-10.0, -20.0));
    }

    #[test]
    fn test_component_serialization() {
        let c = Component::new("a", Affine::translate((350.0, 0.0)));
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"reference":"a","transform":[1.0,0.0,0.0,1.0,350.0,0.0]}"#);
        let back: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        let plain: Component = serde_json::from_str(r#"{"reference":"b"}"#).unwrap();
        assert_eq!(plain.transform, Affine::IDENTITY);
    }
}
