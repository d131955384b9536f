//! Recognition of Loom source files by extension.

use std::path::Path;

/// Extensions recognized as Loom story sources when none are configured.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["loom"];

/// Returns `true` if `path` has one of the given extensions.
///
/// The comparison ignores ASCII case and a leading dot in the configured
/// extension, so `"loom"` and `".loom"` are equivalent.
pub fn is_source_path<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|candidate| candidate.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
}
