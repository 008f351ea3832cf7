//! Build constraints: `//go:build` lines, legacy `// +build` lines, and
//! `_GOOS`/`_GOARCH` file name suffixes, evaluated for one target.

use std::collections::HashSet;
use std::path::Path;

/// Operating systems the Go toolchain recognizes in file name suffixes.
const KNOWN_OS: [&str; 18] = [
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Architectures the Go toolchain recognizes in file name suffixes.
const KNOWN_ARCH: [&str; 24] = [
    "386", "amd64", "amd64p32", "arm", "arm64", "arm64be", "armbe", "loong64", "mips", "mips64",
    "mips64le", "mips64p32", "mips64p32le", "mipsle", "ppc", "ppc64", "ppc64le", "riscv", "riscv64",
    "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Operating systems satisfying the `unix` tag.
const UNIX_OS: [&str; 12] = [
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux", "netbsd",
    "openbsd", "solaris",
];

/// Newest `go1.N` release tag that is satisfied.
const GO_MINOR: u32 = 24;

/// The target files are selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// `GOARCH` value.
    arch: String,
    /// `GOOS` value.
    os: String,
    /// Extra tags, as given to `-tags`.
    tags: HashSet<String>,
}

/// A token of a `//go:build` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// `&&`.
    And,
    /// `)`.
    Close,
    /// `!`.
    Not,
    /// `(`.
    Open,
    /// `||`.
    Or,
    /// A build tag.
    Tag(String),
}

/// Recursive-descent evaluator over [`Token`]s.
struct Evaluator<'a> {
    /// Target the tags are checked against.
    context: &'a BuildContext,
    /// Index of the next token.
    pos: usize,
    /// The expression.
    tokens: Vec<Token>,
}

impl BuildContext {
    /// Target from `GOOS`/`GOARCH` in the environment, falling back to the
    /// host, plus `tags`.
    pub fn host(tags: &[String]) -> Self {
        let env = |name: &str| return std::env::var(name).ok().filter(|v| return !v.is_empty());
        let os = env("GOOS").unwrap_or_else(|| return host_os().to_owned());
        let arch = env("GOARCH").unwrap_or_else(|| return host_arch().to_owned());
        return Self::new(&os, &arch, tags);
    }

    /// Whether `path` belongs in the build: its name and its header
    /// constraints both allow it. Unreadable files are kept so that loading
    /// them reports the problem.
    pub fn matches_file(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| return n.to_string_lossy()).unwrap_or_default();
        if !self.matches_name(&name) {
            return false;
        }
        return match std::fs::read_to_string(path) {
            Ok(source) => self.matches_source(&source),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Cannot read build constraints"
                );
                true
            },
        };
    }

    /// Whether a file name's `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix
    /// matches. Names without a known suffix always match.
    pub fn matches_name(&self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        let Some(underscore) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem.get(underscore..).unwrap_or("").split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        let last = parts.last().copied().unwrap_or("");
        let before_last = parts.len().checked_sub(2).and_then(|i| return parts.get(i).copied());
        if let Some(os) = before_last {
            if KNOWN_OS.contains(&os) && KNOWN_ARCH.contains(&last) {
                return self.matches_tag(os) && self.matches_tag(last);
            }
        }
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.matches_tag(last);
        }
        return true;
    }

    /// Whether the constraints in a file's header are satisfied.
    ///
    /// A `//go:build` line wins over `// +build` lines. A malformed
    /// expression is never satisfied.
    pub fn matches_source(&self, source: &str) -> bool {
        let (go_build, plus_build) = header_constraints(source);
        if let Some(expr) = go_build {
            return match self.evaluate(expr) {
                Some(result) => result,
                None => {
                    tracing::warn!(constraint = expr, "Malformed //go:build line; excluding file");
                    false
                },
            };
        }
        return plus_build.iter().all(|line| return self.matches_plus_build(line));
    }

    /// Target `os`/`arch` with extra `tags`.
    pub fn new(os: &str, arch: &str, tags: &[String]) -> Self {
        return Self {
            arch: arch.to_owned(),
            os: os.to_owned(),
            tags: tags
                .iter()
                .map(|t| return t.trim().to_owned())
                .filter(|t| return !t.is_empty())
                .collect(),
        };
    }

    /// Evaluate a `//go:build` expression. `None` if it does not parse.
    fn evaluate(&self, expr: &str) -> Option<bool> {
        let mut evaluator = Evaluator {
            context: self,
            pos: 0,
            tokens: tokenize(expr)?,
        };
        let result = evaluator.or()?;
        if evaluator.pos != evaluator.tokens.len() {
            return None;
        }
        return Some(result);
    }

    /// Evaluate one `// +build` line: space-separated alternatives of
    /// comma-separated terms.
    fn matches_plus_build(&self, line: &str) -> bool {
        return line.split_whitespace().any(|alternative| {
            return alternative.split(',').all(|term| {
                return match term.strip_prefix('!') {
                    Some(tag) => !self.matches_tag(tag),
                    None => self.matches_tag(term),
                };
            });
        });
    }

    /// Whether a single tag is satisfied.
    fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.os || tag == self.arch || tag == "gc" || self.tags.contains(tag) {
            return true;
        }
        let os = self.os.as_str();
        let implied = match tag {
            "unix" => UNIX_OS.contains(&os),
            "linux" => os == "android",
            "darwin" => os == "ios",
            "solaris" => os == "illumos",
            _ => false,
        };
        if implied {
            return true;
        }
        return tag
            .strip_prefix("go1.")
            .and_then(|minor| return minor.parse::<u32>().ok())
            .is_some_and(|minor| return minor <= GO_MINOR);
    }
}

impl Evaluator<'_> {
    /// `not ('&&' not)*`.
    fn and(&mut self) -> Option<bool> {
        let mut value = self.not()?;
        while self.eat(&Token::And) {
            let rhs = self.not()?;
            value = value && rhs;
        }
        return Some(value);
    }

    /// Consume the next token if it is `want`.
    fn eat(&mut self, want: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(want) {
            self.pos = self.pos.saturating_add(1);
            return true;
        }
        return false;
    }

    /// `'!' not | '(' or ')' | tag`.
    fn not(&mut self) -> Option<bool> {
        if self.eat(&Token::Not) {
            return self.not().map(|v| return !v);
        }
        if self.eat(&Token::Open) {
            let value = self.or()?;
            return self.eat(&Token::Close).then_some(value);
        }
        let Some(Token::Tag(tag)) = self.tokens.get(self.pos) else {
            return None;
        };
        let value = self.context.matches_tag(tag);
        self.pos = self.pos.saturating_add(1);
        return Some(value);
    }

    /// `and ('||' and)*`.
    fn or(&mut self) -> Option<bool> {
        let mut value = self.and()?;
        while self.eat(&Token::Or) {
            let rhs = self.and()?;
            value = value || rhs;
        }
        return Some(value);
    }
}

/// Constraint lines from the comment header before the package clause:
/// the `//go:build` expression, if any, and each `// +build` line.
fn header_constraints(source: &str) -> (Option<&str>, Vec<&str>) {
    let mut go_build = None;
    let mut plus_build = Vec::new();
    let mut in_block = false;

    for line in source.lines() {
        let line = line.trim();
        if in_block {
            in_block = !line.contains("*/");
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix("//") {
            if let Some(expr) = comment.strip_prefix("go:build") {
                if expr.is_empty() || expr.starts_with([' ', '\t']) {
                    go_build = go_build.or(Some(expr.trim()));
                }
            } else if let Some(terms) = comment.trim_start().strip_prefix("+build") {
                plus_build.push(terms.trim());
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("/*") {
            in_block = !rest.contains("*/");
            continue;
        }
        break;
    }
    return (go_build, plus_build);
}

/// GOARCH for the running host.
fn host_arch() -> &'static str {
    let little = cfg!(target_endian = "little");
    return match std::env::consts::ARCH {
        "x86" => "386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if little => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if little => "mipsle",
        "mips64" if little => "mips64le",
        "wasm32" => "wasm",
        other => other,
    };
}

/// GOOS for the running host.
fn host_os() -> &'static str {
    return match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
}

/// Split a `//go:build` expression into tokens. `None` on a stray
/// character.
fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            ' ' | '\t' => {},
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '!' => tokens.push(Token::Not),
            '&' | '|' => {
                if chars.next().map(|(_, next)| return next) != Some(c) {
                    return None;
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            },
            _ if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = start.saturating_add(c.len_utf8());
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '.') {
                        break;
                    }
                    end = i.saturating_add(next.len_utf8());
                    chars.next();
                }
                tokens.push(Token::Tag(expr.get(start..end)?.to_owned()));
            },
            _ => return None,
        }
    }
    return Some(tokens);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux(tags: &[&str]) -> BuildContext {
        let tags: Vec<String> = tags.iter().map(|t| (*t).to_owned()).collect();
        BuildContext::new("linux", "amd64", &tags)
    }

    #[test]
    fn go_build_expressions() {
        let context = linux(&["netgo"]);
        let cases = [
            ("linux", true),
            ("windows", false),
            ("ignore", false),
            ("!windows", true),
            ("linux && amd64", true),
            ("linux && arm64", false),
            ("darwin || linux", true),
            ("unix && !(darwin || windows)", true),
            ("netgo", true),
            ("go1.18", true),
            ("go1.99", false),
            ("gc && !gccgo", true),
            ("linux &&", false),
            ("(linux", false),
            ("linux & amd64", false),
        ];
        for (expr, want) in cases {
            assert_eq!(context.evaluate(expr).unwrap_or(false), want, "{expr}");
        }
    }

    #[test]
    fn implied_tags() {
        assert!(BuildContext::new("android", "arm64", &[]).matches_tag("linux"));
        assert!(BuildContext::new("ios", "arm64", &[]).matches_tag("darwin"));
        assert!(BuildContext::new("darwin", "arm64", &[]).matches_tag("unix"));
        assert!(!BuildContext::new("windows", "amd64", &[]).matches_tag("unix"));
    }

    #[test]
    fn file_name_suffixes() {
        let context = linux(&[]);
        let cases = [
            ("open.go", true),
            ("open_linux.go", true),
            ("open_windows.go", false),
            ("open_amd64.go", true),
            ("open_arm64.go", false),
            ("open_linux_amd64.go", true),
            ("open_linux_arm64.go", false),
            ("open_windows_test.go", false),
            ("linux.go", true),
            ("open_unix.go", true),
            ("zsyscall_freebsd_386.go", false),
        ];
        for (name, want) in cases {
            assert_eq!(context.matches_name(name), want, "{name}");
        }
    }

    #[test]
    fn header_lines() {
        let context = linux(&[]);
        let cases = [
            ("//go:build ignore\n\npackage main\n", false),
            ("// Copyright.\n\n//go:build linux\n\npackage p\n", true),
            ("//go:build windows\n// +build linux\n\npackage p\n", false),
            ("// +build linux darwin\n// +build amd64\n\npackage p\n", true),
            ("// +build !linux\n\npackage p\n", false),
            ("/* header\n*/\n//go:build windows\n\npackage p\n", false),
            ("package p\n\n//go:build ignore\n", true),
            ("//go:buildignore\npackage p\n", true),
            ("//go:build linux &&& amd64\n\npackage p\n", false),
        ];
        for (source, want) in cases {
            assert_eq!(context.matches_source(source), want, "{source:?}");
        }
    }

    #[test]
    fn extra_tags_enable_files() {
        let source = "//go:build integration\n\npackage p\n";
        assert!(!linux(&[]).matches_source(source));
        assert!(linux(&["integration"]).matches_source(source));
    }
}
