//! Project-local names for the fast, non-cryptographic hasher used throughout
//! the analyser for scratch maps and sets (usage tables, visited markers,
//! the method-type clone cache).

pub use rustc_hash::{FxHashMap, FxHashSet};
