//! Unicode character property lookups
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_script::{Script, UnicodeScript};

/// Whether the codepoint has a general category which makes it an OpenType mark
///
/// Only nonspacing (`Mn`) and enclosing (`Me`) marks count; spacing marks (`Mc`)
/// should not be OpenType marks.
pub fn is_mark(codepoint: u32) -> bool {
    char::from_u32(codepoint).is_some_and(|c| {
        matches!(
            get_general_category(c),
            GeneralCategory::NonspacingMark | GeneralCategory::EnclosingMark
        )
    })
}

/// Resolve ISO 15924 short script names, warning about any which are unknown
pub fn scripts_from_short_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Script> {
    names
        .into_iter()
        .filter_map(|name| {
            let script = Script::from_short_name(name);
            if script.is_none() {
                log::warn!("Unknown script code {}; ignored", name);
            }
            script
        })
        .collect()
}

/// Whether the codepoint is used in any of the given scripts
///
/// Script extensions are consulted, so characters shared between scripts
/// (like the Devanagari danda used in Bengali) match all of them.
pub fn in_scripts(codepoint: u32, scripts: &[Script]) -> bool {
    char::from_u32(codepoint).is_some_and(|c| {
        let extension = c.script_extension();
        scripts.iter().any(|s| extension.contains_script(*s))
    })
}
