//! Template parsing and index extraction.
//!
//! A template basename splits into prefix, one contiguous `#` run, and
//! suffix. `next_index` matches a candidate name forward through the prefix
//! and backward through the suffix; whatever meets in the middle must be a
//! decimal string, whose value + 1 is returned. A non-matching name is not
//! an error (directory scans lean on that), while a malformed template or
//! an index overflow is.

use core_error::{Error, ErrorCode};
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Template {
    pub prefix: String,
    pub suffix: String,
    pub width: usize,
}

/// Split a template basename around its `#` run. Exactly one contiguous run
/// is legal; none, or a second run in the suffix, is a malformed template.
pub(crate) fn parse_basename(basename: &str) -> Result<Template> {
    let Some(run_start) = basename.find('#') else {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!("template '{basename}' contains no '#' run"),
        ));
    };
    let tail = &basename[run_start..];
    let width = tail.bytes().take_while(|&b| b == b'#').count();
    let suffix = &tail[width..];
    if suffix.contains('#') {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!("template '{basename}' contains more than one '#' run"),
        ));
    }
    Ok(Template {
        prefix: basename[..run_start].to_string(),
        suffix: suffix.to_string(),
        width,
    })
}

/// Index of `name` under `template`, plus one. `Ok(None)` when `name` does
/// not belong to the sequence; `Err` on a malformed template or when the
/// successor does not fit the index type.
pub fn next_index(template: &str, name: &str) -> Result<Option<u64>> {
    let t = parse_basename(template)?;
    if name.len() <= t.prefix.len() + t.suffix.len() {
        return Ok(None);
    }
    if !name.starts_with(&t.prefix) || !name.ends_with(&t.suffix) {
        return Ok(None);
    }
    let middle = &name[t.prefix.len()..name.len() - t.suffix.len()];
    if !middle.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let value: u64 = middle.parse().map_err(|_| {
        Error::new(
            ErrorCode::Invalid,
            format!("index '{middle}' overflows the sequence counter"),
        )
    })?;
    value
        .checked_add(1)
        .map(Some)
        .ok_or_else(|| {
            Error::new(
                ErrorCode::Invalid,
                format!("index {value} has no successor in the sequence counter"),
            )
        })
}

/// Version-aware name comparison: embedded digit runs compare by numeric
/// value, with heavier zero-padding ordered first among equal values.
pub(crate) fn vercmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let ia = i + a[i..].iter().take_while(|c| c.is_ascii_digit()).count();
            let jb = j + b[j..].iter().take_while(|c| c.is_ascii_digit()).count();
            let ra = strip_zeros(&a[i..ia]);
            let rb = strip_zeros(&b[j..jb]);
            let numeric = ra.len().cmp(&rb.len()).then_with(|| ra.cmp(rb));
            if numeric != Ordering::Equal {
                return numeric;
            }
            let padding = (jb - j).cmp(&(ia - i));
            if padding != Ordering::Equal {
                return padding;
            }
            i = ia;
            j = jb;
        } else if a[i] == b[j] {
            i += 1;
            j += 1;
        } else {
            return a[i].cmp(&b[j]);
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

fn strip_zeros(run: &[u8]) -> &[u8] {
    let zeros = run.iter().take_while(|&&b| b == b'0').count();
    if zeros == run.len() {
        &run[run.len() - 1..]
    } else {
        &run[zeros..]
    }
}
