use log::debug;
use std::path::{Component, Path, PathBuf};

/// Joins a client supplied path onto the session root.
///
/// Leading slashes are relative to the root. Any `..` or drive prefix is
/// refused outright rather than normalized away. Symlinks are followed and
/// the result must still sit under the root: an existing target is
/// canonicalized whole, a new one through its parent directory.
pub fn resolve_path(base_path: &Path, arg: &str) -> Option<PathBuf> {
    let mut resolved = base_path.to_path_buf();
    let mut pushed = false;

    for component in Path::new(arg.trim()).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                pushed = true;
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                debug!("Refusing path outside of the root: {}", arg);
                return None;
            }
        }
    }

    if !pushed {
        return None;
    }

    let root = base_path.canonicalize().ok()?;
    let real = match resolved.symlink_metadata() {
        Ok(_) => resolved.canonicalize().ok()?,
        Err(_) => {
            let parent = resolved.parent()?.canonicalize().ok()?;
            parent.join(resolved.file_name()?)
        }
    };

    if !real.starts_with(&root) || real == root {
        debug!("Refusing path resolving outside of the root: {}", arg);
        return None;
    }

    Some(real)
}
