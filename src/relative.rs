//! Relative `/`-separated paths computed by string manipulation alone.

/// Path segment separator.
const SEPARATOR: &str = "/";

/// Path to `dst` relative to the directory `src`.
///
/// Both paths are `/`-separated and either both relative or both absolute.
/// A trailing separator on `src` is ignored. Never touches the filesystem.
pub fn path(src: &str, dst: &str) -> String {
    let src = src.strip_suffix(SEPARATOR).unwrap_or(src);

    let src_parts = split(src);
    let dst_parts = split(dst);
    let common = src_parts
        .iter()
        .zip(&dst_parts)
        .take_while(|(a, b)| return a == b)
        .count();

    let mut parts: Vec<&str> = src_parts.iter().skip(common).map(|_| return "..").collect();
    parts.extend(dst_parts.iter().skip(common).copied());
    return parts.join(SEPARATOR);
}

/// Whether `child` is `parent` or lies somewhere beneath it.
pub fn descends(parent: &str, child: &str) -> bool {
    let parent = parent.strip_suffix(SEPARATOR).unwrap_or(parent);
    if parent.is_empty() {
        return true;
    }
    let Some(rest) = child.strip_prefix(parent) else {
        return false;
    };
    return rest.is_empty() || rest.starts_with(SEPARATOR);
}

/// Split a path into segments; the empty path has none.
fn split(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    return path.split(SEPARATOR).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths() {
        let cases = [
            ("", "", ""),
            ("", "foo", "foo"),
            ("foo", "", ".."),
            ("foo", "foo", ""),
            ("foo", "foo/bar", "bar"),
            ("foo/", "foo/bar", "bar"),
            ("foo/bar", "foo/baz", "../baz"),
            ("example.com/foo", "example.com/bar", "../bar"),
            ("a/b/c", "a/d/e", "../../d/e"),
            ("a/b", "x", "../../x"),
            ("/a/b", "/a/c", "../c"),
        ];
        for (src, dst, want) in cases {
            assert_eq!(path(src, dst), want, "path({src:?}, {dst:?})");
        }
    }

    #[test]
    fn descends_is_segment_wise() {
        assert!(descends("foo", "foo"));
        assert!(descends("foo", "foo/bar"));
        assert!(descends("foo/", "foo/bar"));
        assert!(descends("", "anything"));
        assert!(!descends("foo", "foobar"));
        assert!(!descends("foo/bar", "foo"));
    }
}
