use std::{collections::HashMap, path::PathBuf};

use clap::{Args, Command, FromArgMatches};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use fontmarks::filters::FontFilter;

static SUPPORTED_EXTENSIONS: &[&str] = &[
    "json",
    "fontmarks",
    #[cfg(feature = "ufo")]
    "ufo",
];

fn fail(message: impl std::fmt::Display) -> ! {
    log::error!("{}", message);
    std::process::exit(1);
}

fn check_extension(path: &std::path::Path, role: &str) {
    let extension = path.extension().and_then(|x| x.to_str()).unwrap_or("");
    if !SUPPORTED_EXTENSIONS.contains(&extension) {
        fail(format!(
            "{} extension {:?} is not in the list of supported extensions: {}",
            role,
            extension,
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }
}

/// Collect the filters in the order they appear on the command line
///
/// Clap stores `--foo 1 --bar 2 --foo 3` as `"foo": ["1", "3"], "bar": ["2"]`,
/// but the raw occurrences of the "filters" group keep the original order.
fn filters_in_order(
    args: &clap::ArgMatches,
) -> Result<Vec<Box<dyn FontFilter>>, fontmarks::FontmarksError> {
    let mut filters: Vec<Box<dyn FontFilter>> = vec![];
    let Some(filter_group) = args.get_raw("filters") else {
        return Ok(filters);
    };
    let mut counter = HashMap::new();
    for filter in filter_group {
        let name = filter.to_string_lossy().to_string();
        let count = counter.entry(name.clone()).or_insert(0);
        let value = args
            .get_raw_occurrences(&name)
            .and_then(|mut occurrences| occurrences.nth(*count))
            .map(|values| {
                values
                    .map(|v| v.to_string_lossy().to_string())
                    .collect::<String>()
            })
            .unwrap_or_default();
        *count += 1;
        filters.push(fontmarks::filters::cli_to_filter(&name, &value)?);
    }
    Ok(filters)
}

fn main() {
    let command = Command::new("fontmarks")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Propagate anchors to composite glyphs and write mark positioning features")
        .arg(
            clap::Arg::new("font_path")
                .help("Path to the input font file")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("output")
                .help("Path to the output font file")
                .required(true)
                .index(2),
        );
    let command = Verbosity::<WarnLevel>::augment_args(command);
    // Extend with the font filter arguments
    let command = fontmarks::filters::filter_group(command);

    let args = command.get_matches();
    let verbosity = Verbosity::<WarnLevel>::from_arg_matches(&args).unwrap_or_else(|e| fail(e));
    env_logger::Builder::new()
        .filter_level(verbosity.log_level_filter())
        .init();

    let (Some(input_name), Some(output_name)) = (
        args.get_one::<String>("font_path").map(PathBuf::from),
        args.get_one::<String>("output").map(PathBuf::from),
    ) else {
        fail("Input and output paths are required");
    };
    check_extension(&input_name, "Input");
    check_extension(&output_name, "Output");

    let filters = filters_in_order(&args).unwrap_or_else(|e| fail(e));

    log::info!("Loading {}", input_name.display());
    let mut font = fontmarks::load(&input_name).unwrap_or_else(|e| fail(e));
    if !filters.is_empty() {
        log::info!("Applying filters...");
        let before_filters = std::time::Instant::now();
        for filter in filters {
            if let Err(e) = filter.apply(&mut font) {
                fail(format!("Failed to apply font filter: {}", e));
            }
        }
        log::info!("Applied filters in {:.2?}", before_filters.elapsed());
    }

    log::info!("Saving {}", output_name.display());
    if let Err(e) = font.save(&output_name) {
        fail(format!("Failed to save font: {}", e));
    }
}
