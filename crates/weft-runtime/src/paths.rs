//! Path conventions for the working filesystem.
//!
//! Caller-facing asset paths are rooted at `/` (`/index.js`); the working
//! filesystem mirrors them under [`APP_DIR`]. All paths here are
//! `/`-separated virtual paths, independent of the host platform.

/// Root the caller's assets are synchronized into.
pub const APP_DIR: &str = "/app";

/// Default output directory for bundles.
pub const DIST_DIR: &str = "/app/dist";

/// Default cache directory name, resolved against the project root.
pub const DEFAULT_CACHE_DIRNAME: &str = ".weft-cache";

/// Baseline engine configuration written on session start.
pub const BASELINE_CONFIG: &str = "/.weftrc";

/// Placeholder module written on session start.
pub const EMPTY_MODULE: &str = "/_empty.js";

/// Maps a caller-facing asset path into the working root.
///
/// ```
/// use weft_runtime::paths::from_asset_path;
///
/// assert_eq!(from_asset_path("/index.js"), "/app/index.js");
/// assert_eq!(from_asset_path("src/a.js"), "/app/src/a.js");
/// ```
#[must_use]
pub fn from_asset_path(path: &str) -> String {
    join(APP_DIR, path)
}

/// Maps a working-root path back to the caller-facing asset path.
///
/// Paths outside the working root are returned unchanged.
///
/// ```
/// use weft_runtime::paths::to_asset_path;
///
/// assert_eq!(to_asset_path("/app/dist/index.js"), "/dist/index.js");
/// assert_eq!(to_asset_path("/other/x.js"), "/other/x.js");
/// ```
#[must_use]
pub fn to_asset_path(path: &str) -> String {
    match path.strip_prefix(APP_DIR) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Joins `rel` onto `base`, normalizing `.` and `..` components.
///
/// An absolute `rel` is still interpreted relative to `base`.
#[must_use]
pub fn join(base: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = components(base).collect();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Resolves `path` against `base` unless it is already absolute.
#[must_use]
pub fn resolve(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else {
        join(base, path)
    }
}

/// Normalizes an absolute path.
#[must_use]
pub fn normalize(path: &str) -> String {
    join("/", path)
}

/// Returns the parent directory, or `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<String> {
    let normalized = normalize(path);
    if normalized == "/" {
        return None;
    }
    match normalized.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(normalized[..idx].to_string()),
        None => None,
    }
}

/// Returns the last component of `path`.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').find(|p| !p.is_empty()).unwrap_or("")
}

/// Iterates over the non-empty components of `path`.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|p| !p.is_empty() && *p != ".")
}

/// Returns `true` if `ancestor` equals `path` or contains it,
/// comparing whole components.
///
/// ```
/// use weft_runtime::paths::is_ancestor_or_self;
///
/// assert!(is_ancestor_or_self("/app/src", "/app/src/a.js"));
/// assert!(!is_ancestor_or_self("/app/sr", "/app/src/a.js"));
/// ```
#[must_use]
pub fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    let mut path_parts = components(path);
    components(ancestor).all(|a| path_parts.next() == Some(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_normalizes() {
        assert_eq!(join("/app", "./a/../b.js"), "/app/b.js");
        assert_eq!(join("/app", "/x"), "/app/x");
        assert_eq!(join("/", ""), "/");
        assert_eq!(join("/app", "../../.."), "/");
    }

    #[test]
    fn resolve_keeps_absolute() {
        assert_eq!(resolve("/app", "/tmp/cache"), "/tmp/cache");
        assert_eq!(resolve("/app", "cache"), "/app/cache");
    }

    #[test]
    fn parent_of_paths() {
        assert_eq!(parent("/app/a.js").as_deref(), Some("/app"));
        assert_eq!(parent("/app").as_deref(), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn file_name_of_paths() {
        assert_eq!(file_name("/app/src/a.js"), "a.js");
        assert_eq!(file_name("/app/src/"), "src");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn to_asset_path_requires_component_boundary() {
        assert_eq!(to_asset_path("/application/x"), "/application/x");
        assert_eq!(to_asset_path("/app"), "/app");
    }

    #[test]
    fn asset_path_roundtrip() {
        for asset in ["/index.js", "/src/a/b.ts", "/package.json"] {
            assert_eq!(to_asset_path(&from_asset_path(asset)), asset);
        }
    }

    #[test]
    fn ancestor_is_component_wise() {
        assert!(is_ancestor_or_self("/app", "/app"));
        assert!(is_ancestor_or_self("/", "/app/x"));
        assert!(!is_ancestor_or_self("/app/x", "/app"));
        assert!(!is_ancestor_or_self("/app/node", "/app/node_modules"));
    }
}
