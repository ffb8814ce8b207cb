//! Typed literal values (§3 "Atom"). Immutable once created; duplicated into
//! the owning query's arena before being attached to an expression, mirroring
//! `atom_dup` in the original compiler.

use crate::subtype::Subtype;
use educe::Educe;

#[derive(Clone, Debug, Educe, serde::Serialize, serde::Deserialize)]
#[educe(PartialEq, Eq, Hash)]
pub enum AtomValue {
    Null,
    Bool(bool),
    Int(i64),
    #[educe(PartialEq(method(float_eq)), Hash(method(float_hash)))]
    Float(f64),
    /// Fixed-point DECIMAL stored as an unscaled integer; `Subtype::scale`
    /// on the owning [`Atom`] gives the implied decimal point.
    Decimal(i128),
    Str(String),
    Date(i32),
    Time(i64),
    Timestamp(i64),
}

fn float_eq(a: &f64, b: &f64) -> bool {
    a.to_bits() == b.to_bits()
}

fn float_hash<H: std::hash::Hasher>(v: &f64, state: &mut H) {
    std::hash::Hash::hash(&v.to_bits(), state)
}

/// A typed literal: subtype + value. `spec.md` §3.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Atom {
    pub subtype: Subtype,
    pub value: AtomValue,
}

impl Atom {
    pub fn new(subtype: Subtype, value: AtomValue) -> Self {
        Atom { subtype, value }
    }

    pub fn null(subtype: Subtype) -> Self {
        Atom::new(subtype, AtomValue::Null)
    }

    pub fn int(v: i64) -> Self {
        Atom::new(Subtype::int(), AtomValue::Int(v))
    }

    pub fn boolean(v: bool) -> Self {
        Atom::new(Subtype::boolean(), AtomValue::Bool(v))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, AtomValue::Null)
    }

    /// Duplicate the atom into the caller's arena. Our arena is just
    /// ownership-by-value, so this is a plain clone — but the method exists
    /// as the named seam the lowering rules call, matching `atom_dup`.
    pub fn duplicate(&self) -> Atom {
        self.clone()
    }
}
