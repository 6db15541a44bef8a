//! Project directory to asset list.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use weft_runtime::orchestrator::Asset;

/// Directories never collected as sources.
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist"];

/// Entry candidates tried, in order, when none is given.
const DEFAULT_ENTRIES: &[&str] = &["index.js", "index.ts", "index.jsx", "index.tsx", "index.mjs"];

/// Reads every source file under `dir` as an [`Asset`].
///
/// Hidden entries and [`SKIPPED_DIRS`] are skipped. Files that are not
/// UTF-8 are skipped with a warning. Entries are marked from `entries`
/// (paths relative to `dir`); when empty, the first existing
/// [`DEFAULT_ENTRIES`] candidate is used.
pub fn collect_assets(dir: &Path, entries: &[String]) -> Result<Vec<Asset>> {
    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort();

    let entries: Vec<String> = if entries.is_empty() {
        DEFAULT_ENTRIES
            .iter()
            .find(|name| files.iter().any(|(rel, _)| rel == *name))
            .map(|name| vec![(*name).to_string()])
            .unwrap_or_default()
    } else {
        entries
            .iter()
            .map(|e| e.trim_start_matches("./").trim_start_matches('/').to_string())
            .collect()
    };

    Ok(files
        .into_iter()
        .map(|(rel, content)| {
            let name = format!("/{rel}");
            if entries.contains(&rel) {
                Asset::entry(name, content)
            } else {
                Asset::new(name, content)
            }
        })
        .collect())
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) -> Result<()> {
    let read = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in read {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if !SKIPPED_DIRS.contains(&name.as_str()) {
                walk(root, &path, out)?;
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(path = %path.display(), "skipping non-UTF-8 file");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        out.push((relative(root, &path), content));
    }
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Host path a bundle named `/dist/...` is written to under `out_dir`.
pub fn output_path(out_dir: &Path, bundle_name: &str) -> PathBuf {
    let rest = bundle_name
        .strip_prefix("/dist/")
        .unwrap_or_else(|| bundle_name.trim_start_matches('/'));
    rest.split('/').fold(out_dir.to_path_buf(), |p, part| p.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn collects_sources_and_defaults_entry() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "index.js", "a();");
        write(temp.path(), "lib/util.js", "b();");
        write(temp.path(), "node_modules/x/index.js", "skip");
        write(temp.path(), ".weft/work/app/index.js", "skip");

        let assets = collect_assets(temp.path(), &[]).unwrap();
        let names: Vec<_> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["/index.js", "/lib/util.js"]);
        assert!(assets[0].is_entry);
        assert!(!assets[1].is_entry);
    }

    #[test]
    fn explicit_entries_replace_default() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "index.js", "a();");
        write(temp.path(), "src/main.ts", "b();");

        let assets = collect_assets(temp.path(), &["./src/main.ts".to_string()]).unwrap();
        let entries: Vec<_> = assets
            .iter()
            .filter(|a| a.is_entry)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(entries, vec!["/src/main.ts"]);
    }

    #[test]
    fn output_path_strips_dist() {
        let out = Path::new("/tmp/out");
        assert_eq!(output_path(out, "/dist/index.js"), Path::new("/tmp/out/index.js"));
        assert_eq!(output_path(out, "/dist/a/b.js"), Path::new("/tmp/out/a/b.js"));
    }
}
