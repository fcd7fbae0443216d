//! The fixed remux request and the pure helpers around it.

/// Logical name the input payload is staged under inside the engine.
pub const INPUT_LOGICAL_NAME: &str = "input.webm";
/// Logical name the engine writes its result to.
pub const OUTPUT_LOGICAL_NAME: &str = "output.mp4";

const WEBM_EXTENSION: &str = ".webm";
const MP4_EXTENSION: &str = ".mp4";

/// Command line for a container-only conversion: the video stream is copied
/// unchanged into an MP4 container.
pub fn remux_args() -> Vec<String> {
    ["-i", INPUT_LOGICAL_NAME, "-c:v", "copy", OUTPUT_LOGICAL_NAME]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

/// `clip.webm` -> `clip.mp4`. Only a trailing `.webm` (any ASCII case) is
/// replaced; names without it get `.mp4` appended.
pub fn download_filename(input_name: &str) -> String {
    let base = webm_stem(input_name).unwrap_or(input_name);
    format!("{base}{MP4_EXTENSION}")
}

/// Filename filter applied when the user picks a file.
pub fn is_webm_name(name: &str) -> bool {
    webm_stem(name).is_some()
}

fn webm_stem(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(WEBM_EXTENSION.len())?;
    let suffix = name.get(split..)?;
    if suffix.eq_ignore_ascii_case(WEBM_EXTENSION) {
        name.get(..split)
    } else {
        None
    }
}

/// Maps an engine progress fraction to a whole percentage in `[0, 100]`.
pub fn percent_from_fraction(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
