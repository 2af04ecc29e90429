//! Predeclared Go type names.

/// Predeclared scalar types. References to them are never followed, and a
/// named type whose underlying type is one of them may own a constant group.
pub const SCALARS: &[&str] = &[
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "bool",
    "string",
    "byte",
    "rune",
    "any",
];

/// Predeclared types that are not scalars but are not declared in any file
/// either.
pub const PREDECLARED: &[&str] = &["error", "comparable"];

/// Returns `true` when `name` is a predeclared scalar type.
pub fn is_builtin_scalar(name: &str) -> bool {
    SCALARS.contains(&name)
}

/// Returns `true` when `name` is any predeclared type.
pub fn is_predeclared(name: &str) -> bool {
    is_builtin_scalar(name) || PREDECLARED.contains(&name)
}
