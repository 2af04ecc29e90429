//! Interned identifiers for Go symbols.
//!
//! Every identifier the parser sees (type names, package aliases, constant
//! names) is stored once in a process-wide interner and handled as a small
//! copyable [`Id`].

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for identifier storage.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Interned identifier.
///
/// # Examples
///
/// ```
/// use gloss_core::identifier::Id;
///
/// let user = Id::new("User");
/// assert_eq!(user, "User");
/// assert_eq!(user.to_string(), "User");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Returns `true` for the blank identifier `_`.
    pub fn is_blank(&self) -> bool {
        *self == "_"
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{value}")
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        let interner = interner();
        interner
            .resolve(self.0)
            .is_some_and(|value| value == other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("Config");
        let id2 = Id::new("Config");
        let id3 = Id::new("Options");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Config");
    }

    #[test]
    fn test_is_blank() {
        assert!(Id::new("_").is_blank());
        assert!(!Id::new("_x").is_blank());
    }

    proptest! {
        #[test]
        fn interning_is_stable(name in "[A-Za-z_][A-Za-z0-9_]{0,16}") {
            let first = Id::new(&name);
            let second = Id::from(name.as_str());
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.to_string(), name);
        }
    }
}
