#![cfg(feature = "ufo")]
use fontmarks::{
    filters::{FontFilter, PropagateAnchors, WriteMarkFeatures},
    load, Anchor, FontmarksError,
};
use pretty_assertions::assert_eq;

const FIXTURE: &str = "resources/MarkTest.ufo";

#[test]
fn test_propagate_then_write() -> Result<(), FontmarksError> {
    let mut font = load(FIXTURE)?;

    let modified = PropagateAnchors::default().run(&mut font)?;
    assert_eq!(
        modified.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        vec!["adieresis"]
    );
    assert_eq!(
        font.glyphs.get("adieresis").unwrap().anchors,
        vec![
            Anchor::new("bottom", 250.0, 0.0),
            Anchor::new("top", 250.0, 700.0)
        ]
    );

    WriteMarkFeatures::default().apply(&mut font)?;
    let fea = font.features.to_fea();
    assert!(fea.starts_with("languagesystem DFLT dflt;\nlanguagesystem latn dflt;\n"));
    assert!(fea.contains("markClass dieresiscomb <anchor 0 500> @MC_top;"));
    assert!(fea.contains("markClass acutecomb <anchor 0 500> @MC_top;"));
    assert!(fea.contains("pos base adieresis\n        <anchor 250 700> mark @MC_top;"));
    assert!(fea.contains(
        "pos ligature f_f\n        \
             <anchor 150 700> mark @MC_top\n        \
             ligComponent\n        \
             <anchor 450 700> mark @MC_top;"
    ));
    assert!(fea.contains("pos mark dieresiscomb\n        <anchor 0 700> mark @MC_top;"));
    assert!(!fea.contains("MC_bottom"));
    Ok(())
}

#[test]
fn test_save_and_reload_ufo() -> Result<(), FontmarksError> {
    let mut font = load(FIXTURE)?;
    PropagateAnchors::default().apply(&mut font)?;
    WriteMarkFeatures::default().apply(&mut font)?;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("MarkTest-marks.ufo");
    font.save(&output)?;

    let mut reloaded = load(&output)?;
    assert_eq!(reloaded.glyph_names(), font.glyph_names());
    assert_eq!(
        reloaded.glyphs.get("adieresis").unwrap().anchors,
        font.glyphs.get("adieresis").unwrap().anchors
    );
    let fea = reloaded.features.to_fea();
    assert!(fea.contains("feature mark {"));
    assert!(fea.contains("feature mkmk {"));

    // Groups are left where they were
    let ufo = norad::Font::load(&output)?;
    assert_eq!(ufo.groups.len(), 1);
    assert!(!fea.contains("public.kern1"));

    // Running everything again changes nothing
    assert!(PropagateAnchors::default().run(&mut reloaded)?.is_empty());
    WriteMarkFeatures::default().apply(&mut reloaded)?;
    assert_eq!(reloaded.features.to_fea(), fea);
    Ok(())
}

#[test]
fn test_json_roundtrip() -> Result<(), FontmarksError> {
    let mut font = load(FIXTURE)?;
    PropagateAnchors::default().apply(&mut font)?;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("MarkTest.fontmarks");
    font.save(&output)?;
    let reloaded = load(&output)?;
    assert_eq!(reloaded.upm, 1000);
    assert_eq!(reloaded.glyph_names(), font.glyph_names());
    assert_eq!(
        reloaded.glyphs.get("adieresis").unwrap().components,
        font.glyphs.get("adieresis").unwrap().components
    );
    assert_eq!(
        reloaded.glyphs.get("f_f").unwrap().category,
        fontmarks::GlyphCategory::Ligature
    );
    Ok(())
}
