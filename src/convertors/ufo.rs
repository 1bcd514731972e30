use crate::{features::Features, Anchor, Component, Font, FontmarksError, Glyph, GlyphCategory};
use std::path::Path;

const GLYPH_ORDER_KEY: &str = "public.glyphOrder";
const CATEGORIES_KEY: &str = "public.openTypeCategories";

/// Load a UFO
///
/// Only the default layer is read. Groups and kerning are left in the UFO.
pub fn load<T: AsRef<Path>>(path: T) -> Result<Font, FontmarksError> {
    let mut font = Font::new();
    let ufo = norad::Font::load(&path)?;
    load_glyphs(&mut font, &ufo);
    if let Some(v) = ufo.font_info.units_per_em {
        font.upm = v.as_f64() as u16;
    }
    font.features = Features::from_fea(&ufo.features);
    font.source = Some(path.as_ref().to_path_buf());
    Ok(font)
}

fn glyph_order(ufo: &norad::Font) -> Vec<String> {
    let glyphorder: Vec<String> = ufo
        .lib
        .get(GLYPH_ORDER_KEY)
        .and_then(|x| x.as_array())
        .map(|order| {
            order
                .iter()
                .flat_map(|x| x.as_string())
                .map(|x| x.to_string())
                .collect()
        })
        .unwrap_or_default();
    let mut order: Vec<String> = vec![];
    let mut ufo_names: Vec<String> = ufo.iter_names().map(|x| x.to_string()).collect();
    if ufo_names.iter().any(|x| x == ".notdef") {
        order.push(".notdef".to_string());
        ufo_names.retain(|x| x != ".notdef");
    }
    for name in glyphorder {
        if !ufo_names.contains(&name) {
            continue;
        }
        ufo_names.retain(|x| x != &name);
        order.push(name);
    }
    order.append(&mut ufo_names);
    order
}

fn load_glyphs(font: &mut Font, ufo: &norad::Font) {
    let categories = ufo.lib.get(CATEGORIES_KEY).and_then(|x| x.as_dictionary());
    for glyphname in glyph_order(ufo) {
        let Some(norad_glyph) = ufo.get_glyph(glyphname.as_str()) else {
            continue;
        };
        let mut glyph = Glyph::new(glyphname.as_str());
        glyph.category = categories
            .and_then(|cats| cats.get(&glyphname))
            .and_then(|x| x.as_string())
            .map(GlyphCategory::from_opentype_category)
            .unwrap_or_default();
        glyph.codepoints = norad_glyph.codepoints.iter().map(|c| c as u32).collect();
        glyph.anchors = norad_glyph.anchors.iter().map(Anchor::from).collect();
        glyph.components = norad_glyph.components.iter().map(load_component).collect();
        font.glyphs.push(glyph);
    }
}

fn load_component(c: &norad::Component) -> Component {
    let t = c.transform;
    Component::new(
        c.base.as_str(),
        kurbo::Affine::new([
            t.x_scale, t.xy_scale, t.yx_scale, t.y_scale, t.x_offset, t.y_offset,
        ]),
    )
}

fn save_component(c: &Component) -> Result<norad::Component, FontmarksError> {
    let t = c.transform.as_coeffs();
    Ok(norad::Component::new(
        norad::Name::new(c.reference.as_str())?,
        norad::AffineTransform {
            x_scale: t[0],
            xy_scale: t[1],
            yx_scale: t[2],
            y_scale: t[3],
            x_offset: t[4],
            y_offset: t[5],
        },
        None,
    ))
}

fn save_anchors(glyph: &Glyph) -> Result<Vec<norad::Anchor>, FontmarksError> {
    glyph
        .anchors
        .iter()
        .map(norad::Anchor::try_from)
        .collect()
}

fn new_norad_glyph(glyph: &Glyph) -> Result<norad::Glyph, FontmarksError> {
    let mut norad_glyph = norad::Glyph::new(glyph.name.as_str());
    norad_glyph.codepoints =
        norad::Codepoints::new(glyph.codepoints.iter().flat_map(|&x| char::from_u32(x)));
    norad_glyph.components = glyph
        .components
        .iter()
        .map(save_component)
        .collect::<Result<Vec<_>, _>>()?;
    norad_glyph.anchors = save_anchors(glyph)?;
    Ok(norad_glyph)
}

/// Glyph order and categories for a UFO which did not exist before
fn font_lib(font: &Font) -> Result<norad::Plist, FontmarksError> {
    let order = serde_json::Value::Array(
        font.glyphs
            .iter()
            .map(|g| serde_json::Value::String(g.name.to_string()))
            .collect(),
    );
    let categories: Vec<(String, serde_json::Value)> = font
        .glyphs
        .iter()
        .filter_map(|g| {
            g.category
                .as_opentype_category()
                .map(|c| (g.name.to_string(), serde_json::Value::String(c.to_string())))
        })
        .collect();
    let mut lib = vec![(GLYPH_ORDER_KEY.to_string(), order)];
    if !categories.is_empty() {
        lib.push((
            CATEGORIES_KEY.to_string(),
            categories.into_iter().collect::<serde_json::Value>(),
        ));
    }
    Ok(serde_json::from_value(
        lib.into_iter().collect::<serde_json::Value>(),
    )?)
}

/// Write the font as a UFO
///
/// If the font was loaded from a UFO, that UFO is the starting point: each glyph's
/// anchors and the feature code are replaced and everything else is kept.
pub(crate) fn save(font: &Font, path: &Path) -> Result<(), FontmarksError> {
    let source = font
        .source
        .as_ref()
        .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("ufo"));
    let mut ufo = match source {
        Some(source) => norad::Font::load(source)?,
        None => {
            let mut ufo = norad::Font::new();
            ufo.font_info.units_per_em = Some((font.upm as u32).into());
            for (key, value) in font_lib(font)? {
                ufo.lib.insert(key, value);
            }
            ufo
        }
    };
    let layer = ufo.default_layer_mut();
    for glyph in font.glyphs.iter() {
        match layer.get_glyph_mut(glyph.name.as_str()) {
            Some(existing) => existing.anchors = save_anchors(glyph)?,
            None => layer.insert_glyph(new_norad_glyph(glyph)?),
        }
    }
    ufo.features = font.features.to_fea();
    ufo.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = "resources/MarkTest.ufo";

    #[test]
    fn test_load() {
        let font = load(FIXTURE).unwrap();
        assert_eq!(font.upm, 1000);
        assert_eq!(
            font.glyph_names(),
            vec![".notdef", "a", "e", "dieresiscomb", "acutecomb", "adieresis", "f_f", "space"]
        );
        let a = font.glyphs.get("a").unwrap();
        assert_eq!(a.codepoints, vec![0x61]);
        assert_eq!(a.category, GlyphCategory::Base);
        assert_eq!(
            a.anchors,
            vec![Anchor::new("top", 250.0, 500.0), Anchor::new("bottom", 250.0, 0.0)]
        );
        let dieresis = font.glyphs.get("dieresiscomb").unwrap();
        assert_eq!(dieresis.category, GlyphCategory::Mark);
        let adieresis = font.glyphs.get("adieresis").unwrap();
        assert_eq!(adieresis.category, GlyphCategory::Unknown);
        assert_eq!(
            adieresis.components,
            vec![
                Component::new("a", kurbo::Affine::IDENTITY),
                Component::new("dieresiscomb", kurbo::Affine::translate((250.0, 0.0))),
            ]
        );
        assert_eq!(
            font.glyphs.get("f_f").unwrap().category,
            GlyphCategory::Ligature
        );
        assert!(font.features.to_fea().contains("languagesystem DFLT dflt;"));
    }

    #[test]
    fn test_new_ufo_lib() {
        let mut font = Font::new();
        let mut a = Glyph::new("a");
        a.category = GlyphCategory::Base;
        font.glyphs.push(a);
        font.glyphs.push(Glyph::new("b"));
        let lib = font_lib(&font).unwrap();
        let order: Vec<&str> = lib
            .get(GLYPH_ORDER_KEY)
            .and_then(|x| x.as_array())
            .unwrap()
            .iter()
            .flat_map(|x| x.as_string())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
        let categories = lib.get(CATEGORIES_KEY).and_then(|x| x.as_dictionary()).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories.get("a").and_then(|x| x.as_string()), Some("base"));
    }
}
