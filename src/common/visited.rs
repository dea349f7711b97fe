//! RAII cycle-breaking guard for recursive walks over structures that can
//! contain back-edges (`Phi` loops in a graph, in principle self-referential
//! initializers). Marks a key visited for the lifetime of the guard and
//! unmarks it on drop -- including on an unwinding panic -- so a walk that
//! revisits an ancestor on its own call stack terminates instead of looping,
//! while still allowing an unrelated, later walk to visit the same key.

use crate::common::fx_hash::FxHashSet;

pub struct VisitedGuard<'a, T: std::hash::Hash + Eq> {
    set: &'a mut FxHashSet<T>,
    key: T,
}

impl<'a, T: std::hash::Hash + Eq + Copy> VisitedGuard<'a, T> {
    /// Marks `key` as currently being visited. Returns `None` if `key` is
    /// already on the current call stack -- the caller should treat that as
    /// "nothing new to contribute" and stop recursing.
    pub fn enter(set: &'a mut FxHashSet<T>, key: T) -> Option<Self> {
        if !set.insert(key) {
            return None;
        }
        Some(Self { set, key })
    }

    /// Reborrow the guarded set so a recursive call can reuse it without
    /// moving the guard itself (which would drop it -- and unmark `key` --
    /// before the recursive call returns).
    pub fn set(&mut self) -> &mut FxHashSet<T> {
        self.set
    }
}

impl<'a, T: std::hash::Hash + Eq> Drop for VisitedGuard<'a, T> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}
