//! Tar packing for the Engine API archive endpoints

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Pack a host directory so that it extracts as `name/...`
///
/// # Errors
/// Returns an I/O error if the directory cannot be read
pub fn pack_directory(source: &Path, name: &str) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all(name, source)?;
    builder.into_inner()
}

/// Pack raw file bytes as a single entry called `name`
///
/// # Errors
/// Returns an I/O error if the entry cannot be written
pub fn pack_file(contents: &[u8], name: &str, mode: u32) -> io::Result<Vec<u8>> {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(mode);
    header.set_mtime(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    );

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, name, contents)?;
    builder.into_inner()
}

/// Unpack an archive fetched from a container path.
///
/// Archives are rooted at the basename of the container path. When `dest` is an
/// existing directory the entry lands inside it under that name; otherwise the
/// root component is replaced by `dest`.
///
/// Container contents are untrusted: no write goes through a symlink below
/// `dest`, symlink entries must stay relative and inside the tree, and hard links
/// may only point at regular paths already unpacked under `dest`.
///
/// # Errors
/// Returns an I/O error on malformed archives, entries escaping `dest`, or write failures
pub fn unpack(archive: &[u8], dest: &Path) -> io::Result<()> {
    let into_dir = dest.is_dir();
    let mut reader = tar::Archive::new(archive);
    reader.set_preserve_permissions(true);

    for entry in reader.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let rel = relative_target(&path, into_dir)?;
        let kind = entry.header().entry_type();

        if rel.as_os_str().is_empty() {
            if kind.is_dir() {
                fs::create_dir_all(dest)?;
                continue;
            }
            if kind.is_symlink() || kind.is_hard_link() {
                return Err(escape(&path));
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_symlink(dest)?;
            entry.unpack(dest)?;
            continue;
        }

        prepare_parents(dest, &rel)?;
        let target = dest.join(&rel);
        remove_symlink(&target)?;

        if kind.is_symlink() {
            let link = entry.link_name()?.ok_or_else(|| escape(&path))?.into_owned();
            if link.is_absolute()
                || link
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
            {
                return Err(escape(&path));
            }
            entry.unpack(&target)?;
        } else if kind.is_hard_link() {
            let link = entry.link_name()?.ok_or_else(|| escape(&path))?.into_owned();
            let source = relative_target(&link, into_dir)?;
            reject_symlinks(dest, &source)?;
            fs::hard_link(dest.join(source), &target)?;
        } else {
            entry.unpack(&target)?;
        }
    }

    Ok(())
}

fn escape(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("archive entry escapes destination: {}", path.display()),
    )
}

/// Entry path relative to `dest`, with the archive root stripped unless unpacking into a directory
fn relative_target(path: &Path, into_dir: bool) -> io::Result<PathBuf> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => return Err(escape(path)),
        }
    }
    let skip = usize::from(!into_dir);
    Ok(parts.into_iter().skip(skip).collect())
}

/// Create the directories above `rel`, refusing to pass through a symlink
fn prepare_parents(root: &Path, rel: &Path) -> io::Result<()> {
    fs::create_dir_all(root)?;
    let Some(parent) = rel.parent() else {
        return Ok(());
    };

    let mut current = root.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Err(escape(rel)),
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("not a directory: {}", current.display()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir(&current)?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Fail if any component of `rel` below `root` is a symlink
fn reject_symlinks(root: &Path, rel: &Path) -> io::Result<()> {
    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        if fs::symlink_metadata(&current)?.file_type().is_symlink() {
            return Err(escape(rel));
        }
    }
    Ok(())
}

/// Drop a pre-existing symlink at `path` so the write lands on a fresh file
fn remove_symlink(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        _ => Ok(()),
    }
}
