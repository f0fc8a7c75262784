//! Escaped-text domain names.
//!
//! Names move through this crate as escaped text in fully-qualified form
//! with a trailing dot (`"foo.example."`; the root is `"."`). A label byte
//! is printed literally when it falls in the visible ASCII range, `.` and
//! `\` are backslash-escaped, and everything else becomes a three-digit
//! decimal escape (`\032` for space). This keeps arbitrary binary labels
//! (DNS-SD instance names) representable without losing information.
//!
//! Comparison and compression-dictionary lookups go through [`canonical`],
//! which unescapes, ASCII-lowercases and re-escapes each label, so they are
//! insensitive to case and to how a caller chose to escape a byte.

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use compact_str::CompactString;
use smallvec::SmallVec;

/// The ACE prefix marking an IDNA A-label (RFC 5890).
const ACE_PREFIX: &[u8] = b"xn--";

/// Returns true if `name` is the root domain.
#[inline]
pub fn is_root(name: &str) -> bool {
    name.is_empty() || name == "."
}

/// Pops one label off the front of `name`, writing the unescaped bytes to
/// `out` and consuming the separating dot.
///
/// Returns the label length in bytes. An empty label anywhere but the very
/// end of the name is rejected.
pub fn unescape_label(name: &mut &str, out: &mut [u8; MAX_LABEL_LENGTH + 1]) -> Result<usize> {
    let bytes = name.as_bytes();
    let mut i = 0;
    let mut n = 0;

    loop {
        match bytes.get(i) {
            None => break,
            Some(b'.') => {
                i += 1;
                break;
            }
            Some(&c) => {
                if n >= MAX_LABEL_LENGTH {
                    return Err(Error::LabelTooLong { length: n + 1 });
                }

                if c == b'\\' {
                    i += 1;
                    match bytes.get(i) {
                        None => return Err(Error::malformed(0, "trailing backslash in name")),
                        Some(d @ b'0'..=b'9') => {
                            let (d2, d3) = match (bytes.get(i + 1), bytes.get(i + 2)) {
                                (Some(x @ b'0'..=b'9'), Some(y @ b'0'..=b'9')) => (*x, *y),
                                _ => return Err(Error::malformed(0, "incomplete decimal escape")),
                            };
                            let v = u32::from(d - b'0') * 100
                                + u32::from(d2 - b'0') * 10
                                + u32::from(d3 - b'0');
                            if v > 255 {
                                return Err(Error::malformed(0, "decimal escape out of range"));
                            }
                            out[n] = v as u8;
                            i += 3;
                        }
                        Some(&d) => {
                            out[n] = d;
                            i += 1;
                        }
                    }
                } else {
                    out[n] = c;
                    i += 1;
                }
                n += 1;
            }
        }
    }

    // An empty label is only the trailing dot of a fully-qualified name.
    if n == 0 && i != bytes.len() {
        return Err(Error::malformed(0, "empty label in name"));
    }

    *name = &name[i..];
    Ok(n)
}

/// Appends the escaped text form of one label to `out`.
pub fn escape_label(label: &[u8], out: &mut String) {
    for &c in label {
        match c {
            b'.' | b'\\' => {
                out.push('\\');
                out.push(c as char);
            }
            b'!'..=b'~' => out.push(c as char),
            _ => {
                out.push('\\');
                out.push((b'0' + c / 100) as char);
                out.push((b'0' + (c / 10) % 10) as char);
                out.push((b'0' + c % 10) as char);
            }
        }
    }
}

/// Returns the canonical escaped form of a name: every label unescaped,
/// ASCII-lowercased, re-escaped, joined with dots and terminated with a
/// trailing dot. The root is `"."`.
pub fn canonical(name: &str) -> Result<CompactString> {
    if is_root(name) {
        return Ok(CompactString::const_new("."));
    }

    let mut rest = name;
    let mut label = [0u8; MAX_LABEL_LENGTH + 1];
    let mut out = String::with_capacity(name.len() + 1);
    let mut wire_len = 0;

    while !rest.is_empty() {
        let n = unescape_label(&mut rest, &mut label)?;
        if n == 0 {
            break;
        }

        wire_len += 1 + n;
        if wire_len > MAX_NAME_LENGTH - 1 {
            return Err(Error::NameTooLong { length: wire_len + 1 });
        }

        label[..n].make_ascii_lowercase();
        escape_label(&label[..n], &mut out);
        out.push('.');
    }

    Ok(CompactString::from(out))
}

/// Compares two names for equality, insensitive to ASCII case and to the
/// escape form chosen. Malformed names compare unequal.
pub fn equal(a: &str, b: &str) -> bool {
    match (canonical(a), canonical(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Converts a U-label to its A-label form for the classic DNS wire
/// (RFC 5891 ToASCII). Returns `None` when the label is plain ASCII and
/// goes out unchanged.
pub(crate) fn apply_idna(label: &[u8]) -> Result<Option<SmallVec<[u8; 64]>>> {
    if label.is_ascii() || label.contains(&b'.') {
        return Ok(None);
    }

    let s = std::str::from_utf8(label)
        .map_err(|_| Error::malformed(0, "non-ASCII label is not valid UTF-8"))?;
    let ace = idna::domain_to_ascii(s).map_err(|_| Error::malformed(0, "label failed IDNA"))?;

    if ace.is_empty() {
        return Err(Error::malformed(0, "label failed IDNA"));
    }
    if ace.len() > MAX_LABEL_LENGTH {
        return Err(Error::LabelTooLong { length: ace.len() });
    }

    Ok(Some(SmallVec::from_slice(ace.as_bytes())))
}

/// Converts an A-label back to its U-label form for mDNS and LLMNR, which
/// carry names in UTF-8 on the wire. Labels that are not ACE, or that do
/// not decode cleanly, go out unchanged.
pub(crate) fn undo_idna(label: &[u8]) -> Option<SmallVec<[u8; 64]>> {
    if label.len() < ACE_PREFIX.len()
        || !label[..ACE_PREFIX.len()].eq_ignore_ascii_case(ACE_PREFIX)
        || !label.is_ascii()
    {
        return None;
    }

    let s = std::str::from_utf8(label).ok()?;
    let (decoded, result) = idna::domain_to_unicode(s);
    result.ok()?;

    if decoded.is_empty() || decoded.len() > MAX_LABEL_LENGTH || decoded.contains('.') {
        return None;
    }

    Some(SmallVec::from_slice(decoded.as_bytes()))
}
