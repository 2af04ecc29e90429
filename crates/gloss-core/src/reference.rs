//! Pending symbol lookups discovered while formatting types.

use std::fmt;

use crate::identifier::Id;

/// A discovered but not yet resolved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A bare name, looked up in the current package.
    Local(Id),
    /// An `alias.Name` selector, looked up through the import table.
    Qualified { alias: Id, symbol: Id },
}

impl Reference {
    /// The symbol being looked up, without any alias.
    pub fn symbol(&self) -> Id {
        match self {
            Self::Local(symbol) | Self::Qualified { symbol, .. } => *symbol,
        }
    }

    /// The import alias, for qualified references.
    pub fn alias(&self) -> Option<Id> {
        match self {
            Self::Local(_) => None,
            Self::Qualified { alias, .. } => Some(*alias),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(symbol) => write!(f, "{symbol}"),
            Self::Qualified { alias, symbol } => write!(f, "{alias}.{symbol}"),
        }
    }
}
