//! Type descriptors carried by every expression and statement column (§3
//! "Subtype").

use std::fmt;

/// The base scalar kinds the planner reasons about. The executor's richer
/// type catalog (`sys.types`) is out of scope; this is the subset the
/// lowering rules dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BaseType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Real,
    Double,
    Char,
    Varchar,
    Date,
    Time,
    Timestamp,
    Interval,
    Blob,
    Oid,
    /// The synthetic table-id column type used for `%TID%`.
    Tid,
}

/// A reference to a type descriptor plus `digits`/`scale`, as used for
/// DECIMAL, INTERVAL and CHAR (§3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Subtype {
    pub base: BaseType,
    pub digits: u32,
    pub scale: u32,
}

impl Subtype {
    pub fn new(base: BaseType, digits: u32, scale: u32) -> Self {
        Subtype { base, digits, scale }
    }

    pub fn simple(base: BaseType) -> Self {
        Subtype { base, digits: 0, scale: 0 }
    }

    pub fn boolean() -> Self {
        Subtype::simple(BaseType::Boolean)
    }

    pub fn int() -> Self {
        Subtype::simple(BaseType::Int)
    }

    pub fn oid() -> Self {
        Subtype::simple(BaseType::Oid)
    }

    pub fn tid() -> Self {
        Subtype::simple(BaseType::Tid)
    }

    pub fn decimal(digits: u32, scale: u32) -> Self {
        Subtype::new(BaseType::Decimal, digits, scale)
    }

    pub fn is_decimal(&self) -> bool {
        self.base == BaseType::Decimal
    }

    /// Combine two DECIMAL scales the way arithmetic-result inference does:
    /// the result scale is the max of the two operand scales, and digits
    /// grow to keep the integral part representable. This is scale
    /// arithmetic in the sense of `spec.md` §2 item 6 ("performance burden:
    /// ... scale arithmetic on DECIMAL").
    pub fn combine_decimal_scale(a: &Subtype, b: &Subtype) -> Subtype {
        debug_assert!(a.is_decimal() && b.is_decimal());
        let scale = a.scale.max(b.scale);
        let whole_a = a.digits.saturating_sub(a.scale);
        let whole_b = b.digits.saturating_sub(b.scale);
        let digits = whole_a.max(whole_b) + scale;
        Subtype::decimal(digits, scale)
    }

    /// Rescale factor (as a power of ten) needed to align `from` to `to`'s
    /// scale; used by the DECIMAL cast/convert lowering. Positive when
    /// widening (multiply), negative when narrowing (divide).
    pub fn scale_factor(from: &Subtype, to: &Subtype) -> i64 {
        let diff = to.scale as i64 - from.scale as i64;
        let magnitude = 10i64.pow(diff.unsigned_abs() as u32);
        if diff >= 0 {
            magnitude
        } else {
            -magnitude
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            BaseType::Decimal => write!(f, "DECIMAL({},{})", self.digits, self.scale),
            BaseType::Char | BaseType::Varchar if self.digits > 0 => {
                write!(f, "{:?}({})", self.base, self.digits)
            }
            _ => write!(f, "{:?}", self.base),
        }
    }
}
