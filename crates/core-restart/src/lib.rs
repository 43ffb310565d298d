//! Restart rotation: rename a freshly written file into indexed slot 0,
//! shifting older indexed files outward and dropping those past the
//! retention horizon.
//!
//! Templates are paths whose final component contains exactly one contiguous
//! run of `#` characters; the run length is the minimum zero-padded field
//! width, widened to the decimal width of `keep` when that is larger (so
//! `chk#` with `keep = 1000` produces `chk0000`).
//!
//! Rotation walks existing matches in descending index order. A match whose
//! shifted index would land at or past `keep` is dropped from the rotation
//! but deliberately *not* unlinked; when a younger neighbor shifts into its
//! slot the old file is overwritten by the rename, otherwise it simply
//! stays. Nothing else on disk is touched.

mod template;

pub use template::next_index;

use std::path::Path;

use core_error::{Error, ErrorCode};
use tracing::{debug, info};

use crate::template::{parse_basename, vercmp};

type Result<T> = std::result::Result<T, Error>;

fn decimal_width(keep: usize) -> usize {
    keep.ilog10() as usize + 1
}

/// Rotate `src_path` into slot 0 of `dst_template`, retaining at most `keep`
/// indexed files.
pub fn restart_rename(
    src_path: impl AsRef<Path>,
    dst_template: impl AsRef<Path>,
    keep: usize,
) -> Result<()> {
    let src = src_path.as_ref();
    let template = dst_template.as_ref();
    if keep < 1 {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!("retention count {keep} must be at least 1"),
        ));
    }
    // Stat the source up front so "source missing" is distinguishable from a
    // rename failure later in the walk.
    std::fs::metadata(src).map_err(|e| {
        Error::new(
            ErrorCode::Failed,
            format!("restart source {}: {e}", src.display()),
        )
    })?;

    let basename = template
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::new(
                ErrorCode::Invalid,
                format!("template {} has no usable final component", template.display()),
            )
        })?;
    let parsed = parse_basename(basename)?;
    let dir = match template.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let width = parsed.width.max(decimal_width(keep));

    // Scan the template directory for current members of the sequence.
    let mut matches: Vec<(u64, String)> = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::new(
            ErrorCode::Failed,
            format!("scanning {}: {e}", dir.display()),
        )
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::new(ErrorCode::Failed, format!("scanning {}: {e}", dir.display()))
        })?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(next) = next_index(basename, &name)? {
            matches.push((next - 1, name));
        }
    }
    matches.sort_by(|x, y| vercmp(&x.1, &y.1));

    for (index, name) in matches.iter().rev() {
        let target = index + 1;
        if target as usize >= keep {
            debug!(target: "restart", name, index, "restart_retired");
            continue;
        }
        let to = dir.join(format!(
            "{}{:0width$}{}",
            parsed.prefix, target, parsed.suffix
        ));
        std::fs::rename(dir.join(name), &to).map_err(|e| {
            Error::new(
                ErrorCode::Failed,
                format!("rename {name} -> {}: {e}", to.display()),
            )
        })?;
    }

    let slot0 = dir.join(format!("{}{:0width$}{}", parsed.prefix, 0, parsed.suffix));
    std::fs::rename(src, &slot0).map_err(|e| {
        Error::new(
            ErrorCode::Failed,
            format!("rename {} -> {}: {e}", src.display(), slot0.display()),
        )
    })?;
    info!(
        target: "restart",
        src = %src.display(),
        slot0 = %slot0.display(),
        keep,
        rotated = matches.len(),
        "restart_rotated"
    );
    Ok(())
}
