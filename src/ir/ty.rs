//! Type constructors needed by the oracle's type-based pruning block and by
//! entity/field layout. Deliberately smaller than a real compiler's type
//! system (see `common::types::CType` in the teacher repo for the fuller
//! C-type lattice this is distilled from) -- it carries exactly the
//! distinctions §4.C step 13 inspects: size, pointer-ness, primitive
//! arithmetic kind, class-hierarchy membership, and union-vs-struct.

use crate::ir::mode::Mode;

pub type TypeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldId(pub usize);

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub bitfield_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MethodType {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub variadic: bool,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub enum Ty {
    Primitive(Mode),
    Pointer(TypeId),
    /// A class type participating in single-rooted subclassing, used only
    /// by the entity-type pruning sub-rule (§4.C step 13).
    Class {
        name: String,
        supers: Vec<TypeId>,
    },
    Struct(Vec<Field>),
    Union(Vec<Field>),
    Method(MethodType),
}

/// Owns all `Ty` values referenced by `TypeId`. Types are never mutated in
/// place once interned (method-type cloning creates a *new* `TypeId`; see
/// `ana::private`).
#[derive(Debug, Default)]
pub struct TypePool {
    types: Vec<Ty>,
}

impl TypePool {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    pub fn intern(&mut self, ty: Ty) -> TypeId {
        self.types.push(ty);
        self.types.len() - 1
    }

    pub fn get(&self, id: TypeId) -> &Ty {
        &self.types[id]
    }

    pub fn size_bytes(&self, id: TypeId) -> usize {
        match self.get(id) {
            Ty::Primitive(mode) => mode.size_bytes(),
            Ty::Pointer(_) => 8,
            Ty::Class { .. } => 8,
            Ty::Struct(fields) => fields.iter().map(|f| self.size_bytes(f.ty)).sum(),
            Ty::Union(fields) => fields.iter().map(|f| self.size_bytes(f.ty)).max().unwrap_or(0),
            Ty::Method(_) => 0,
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id), Ty::Pointer(_))
    }

    pub fn is_union(&self, id: TypeId) -> bool {
        matches!(self.get(id), Ty::Union(_))
    }

    pub fn is_class(&self, id: TypeId) -> bool {
        matches!(self.get(id), Ty::Class { .. })
    }

    pub fn is_primitive(&self, id: TypeId) -> bool {
        matches!(self.get(id), Ty::Primitive(_))
    }

    pub fn mode(&self, id: TypeId) -> Option<Mode> {
        match self.get(id) {
            Ty::Primitive(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Dereference a pointer-type envelope, if any.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            Ty::Pointer(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Same top-level type constructor (ignoring payload details other than
    /// what §4.C step 13's "type constructors differ" check inspects).
    pub fn same_constructor(&self, a: TypeId, b: TypeId) -> bool {
        matches!(
            (self.get(a), self.get(b)),
            (Ty::Primitive(_), Ty::Primitive(_))
                | (Ty::Pointer(_), Ty::Pointer(_))
                | (Ty::Class { .. }, Ty::Class { .. })
                | (Ty::Struct(_), Ty::Struct(_))
                | (Ty::Union(_), Ty::Union(_))
                | (Ty::Method(_), Ty::Method(_))
        )
    }

    /// Is `sub` a (reflexive, transitive) subclass of `sup`?
    pub fn is_subclass_of(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        if let Ty::Class { supers, .. } = self.get(sub) {
            supers.iter().any(|&s| self.is_subclass_of(s, sup))
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::mode::I32;

    #[test]
    fn struct_size_sums_fields_union_takes_max() {
        let mut pool = TypePool::new();
        let i32_ty = pool.intern(Ty::Primitive(I32));
        let s = pool.intern(Ty::Struct(vec![
            Field { name: "a".into(), ty: i32_ty, bitfield_size: None },
            Field { name: "b".into(), ty: i32_ty, bitfield_size: None },
        ]));
        let u = pool.intern(Ty::Union(vec![
            Field { name: "a".into(), ty: i32_ty, bitfield_size: None },
            Field { name: "b".into(), ty: i32_ty, bitfield_size: None },
        ]));
        assert_eq!(pool.size_bytes(s), 8);
        assert_eq!(pool.size_bytes(u), 4);
    }

    #[test]
    fn subclass_walks_transitively() {
        let mut pool = TypePool::new();
        let base = pool.intern(Ty::Class { name: "Base".into(), supers: vec![] });
        let mid = pool.intern(Ty::Class { name: "Mid".into(), supers: vec![base] });
        let leaf = pool.intern(Ty::Class { name: "Leaf".into(), supers: vec![mid] });
        assert!(pool.is_subclass_of(leaf, base));
        assert!(!pool.is_subclass_of(base, leaf));
    }
}
