use std::borrow::Cow;

/// Marker appended to text that had to be shortened.
pub const ELLIPSIS: &str = "…";

/// Clamp `s` to at most `max` Unicode scalar values.
///
/// Text that fits within `max - len(trailing)` is returned as is; anything
/// longer keeps its first `max - len(trailing)` scalars followed by
/// `trailing`. When `trailing` alone exceeds `max` it is clipped too.
pub fn truncate<'a>(s: &'a str, max: usize, trailing: &str) -> Cow<'a, str> {
    let trailing_len = trailing.chars().count();
    let keep = max.saturating_sub(trailing_len);

    match s.char_indices().nth(keep) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + trailing.len());
            out.push_str(&s[..cut]);
            out.extend(trailing.chars().take(max - keep));
            Cow::Owned(out)
        }
    }
}
