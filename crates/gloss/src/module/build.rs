//! Which files belong to the configured build.

use gloss_parser::build_constraint::Constraint;

use crate::config::BuildTarget;

/// Operating systems the Go toolchain knows, for file name suffixes.
const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux", "nacl",
    "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Systems that satisfy the `unix` tag.
const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux", "netbsd",
    "openbsd", "solaris",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle", "mips64",
    "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv", "riscv64", "s390", "s390x",
    "sparc", "sparc64", "wasm",
];

/// Whether build tag `tag` holds for `target`.
///
/// The compiler is taken to be `gc` at the newest Go release, without cgo.
pub fn tag_holds(target: &BuildTarget, tag: &str) -> bool {
    let goos = target.goos();
    tag == goos
        || tag == target.goarch()
        || tag == "gc"
        || (tag == "unix" && UNIX_OS.contains(&goos))
        || (tag == "linux" && goos == "android")
        || (tag == "solaris" && goos == "illumos")
        || (tag == "darwin" && goos == "ios")
        || is_release_tag(tag)
        || target.tags().iter().any(|extra| extra == tag)
}

/// `go1.N` tags, all of which hold.
fn is_release_tag(tag: &str) -> bool {
    tag.strip_prefix("go1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether a `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix of `file_name`
/// allows `target`. Names without such a suffix always do.
pub fn name_allows(target: &BuildTarget, file_name: &str) -> bool {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    // Everything before the first `_` is the name proper, never a suffix
    let Some(position) = stem.find('_') else {
        return true;
    };
    let mut parts: Vec<&str> = stem[position..].split('_').collect();
    if parts.last() == Some(&"test") {
        parts.pop();
    }

    let n = parts.len();
    if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
        return tag_holds(target, parts[n - 2]) && tag_holds(target, parts[n - 1]);
    }
    match parts.last() {
        Some(last) if KNOWN_OS.contains(last) || KNOWN_ARCH.contains(last) => tag_holds(target, last),
        _ => true,
    }
}

/// Whether a header constraint allows `target`.
pub fn constraint_allows(target: &BuildTarget, constraint: &Constraint) -> bool {
    constraint.eval(&|tag| tag_holds(target, tag))
}
