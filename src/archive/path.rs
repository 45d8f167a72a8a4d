use std::path::{Component, Path, PathBuf};

/// Turns a raw archive entry name into a path relative to the extraction root.
///
/// Rejects anything that could land outside that root.
pub(crate) fn sanitize_entry_path(raw: &str) -> Result<PathBuf, &'static str> {
    let normalized = raw.replace('\\', "/");
    let path = Path::new(&normalized);

    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) => return Err("entry has a drive prefix"),
            Component::RootDir => return Err("entry path is absolute"),
            Component::ParentDir => return Err("entry escapes target directory"),
            Component::CurDir => {}
            Component::Normal(part) => cleaned.push(part),
        }
    }
    if cleaned.as_os_str().is_empty() {
        return Err("entry has an empty path");
    }
    Ok(cleaned)
}
