use crate::params::GenerationParameters;
use std::ffi::OsString;
use std::path::Path;

impl GenerationParameters {
    /// Whether explicit dimensions override the named format.
    pub fn has_explicit_size(&self) -> bool {
        self.page_width > 0 && self.page_height > 0
    }

    /// The renderer's page-size argument: `"{w}{unit}*{h}{unit}"` for an
    /// explicit size, otherwise the format name.
    pub fn layout(&self) -> String {
        if self.has_explicit_size() {
            let unit = self.dimension_unit.suffix();
            format!("{}{unit}*{}{unit}", self.page_width, self.page_height)
        } else {
            self.format.as_str().to_string()
        }
    }
}

/// Positional arguments for the renderer executable:
/// `<script> <input> <output> <layout> <zoom> <orientation>`.
///
/// Every argument is handed to the process as its own argv entry, so paths
/// containing spaces need no quoting.
pub(crate) fn renderer_args(
    script: &str,
    input: &Path,
    output: &Path,
    params: &GenerationParameters,
) -> Vec<OsString> {
    vec![
        OsString::from(script),
        input.as_os_str().to_os_string(),
        output.as_os_str().to_os_string(),
        OsString::from(params.layout()),
        OsString::from(params.zoom_factor.to_string()),
        OsString::from(params.orientation.as_str()),
    ]
}
