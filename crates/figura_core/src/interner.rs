//! Global channel-name interner.
//!
//! Channel names are looked up on every frame for every figure, so they are
//! interned once into compact [`Symbol`]s that hash and compare in O(1).

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact identifier of an interned channel name.
pub type Symbol = Spur;

/// Interns `name`, returning the existing symbol when already present.
#[inline]
pub fn intern(name: &str) -> Symbol {
    INTERNER.get_or_intern(name)
}

/// Looks up an already interned name without allocating.
#[inline]
#[must_use]
pub fn get(name: &str) -> Option<Symbol> {
    INTERNER.get(name)
}

/// Resolves a symbol back into its name.
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}
