//! Scalar kinds and typed in-memory columns.
//!
//! A branch is loaded into a [`Column`], a homogeneous vector tagged by its
//! stored [`ScalarKind`]. Conversions between kinds go through [`Wide`] and
//! follow C-style numeric cast rules: float to integer truncates toward zero
//! (saturating at the target bounds), integer to integer keeps the low bits,
//! and anything to `bool` means "not equal to zero".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Native scalar kinds a branch may store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// 32-bit signed integer (`Int_t`).
    I32,
    /// 32-bit unsigned integer (`UInt_t`).
    U32,
    /// 64-bit signed integer (`Long64_t`).
    I64,
    /// 64-bit unsigned integer (`ULong64_t`).
    U64,
    /// Single precision float (`Float_t`).
    F32,
    /// Double precision float (`Double_t`).
    F64,
    /// Boolean (`Bool_t`).
    Bool,
    /// 8-bit signed character (`Char_t`).
    Char,
}

impl ScalarKind {
    /// All supported kinds.
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::I32,
        ScalarKind::U32,
        ScalarKind::I64,
        ScalarKind::U64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Bool,
        ScalarKind::Char,
    ];

    /// Short lowercase name (`"f32"`, `"bool"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Bool => "bool",
            ScalarKind::Char => "char",
        }
    }

    /// Integral kinds compare exactly; this includes `bool` and `char`.
    pub fn is_integral(self) -> bool {
        !self.is_float()
    }

    /// Floating point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Size in bytes of one stored value.
    pub fn byte_size(self) -> usize {
        match self {
            ScalarKind::F64 | ScalarKind::I64 | ScalarKind::U64 => 8,
            ScalarKind::F32 | ScalarKind::I32 | ScalarKind::U32 => 4,
            ScalarKind::Bool | ScalarKind::Char => 1,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScalarKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::Validation(format!("unknown scalar kind '{}'", s)))
    }
}

/// Widened intermediate used for cross-kind conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wide {
    /// Any integral value (bools map to 0/1).
    Int(i128),
    /// Any floating point value.
    Float(f64),
}

/// A Rust type that can be stored in a [`Column`].
pub trait Scalar: Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Matching column kind.
    const KIND: ScalarKind;

    /// Widen for conversion.
    fn to_wide(self) -> Wide;

    /// Narrow from a widened value with C-style cast semantics.
    fn from_wide(w: Wide) -> Self;

    /// Value as `f64` (histogram filling).
    fn to_f64(self) -> f64;

    /// Whether the value equals zero of its type.
    fn is_zero(self) -> bool;

    /// Take the vector out of a column of the same kind; hands the column back otherwise.
    fn from_column(col: Column) -> std::result::Result<Vec<Self>, Column>;

    /// Wrap values into a column.
    fn into_column(values: Vec<Self>) -> Column;

    /// Convert from another scalar type.
    fn cast_from<S: Scalar>(value: S) -> Self {
        Self::from_wide(value.to_wide())
    }

    /// Text used in diagnostics.
    fn format_value(self) -> String {
        self.to_string()
    }

    /// `other - self` computed in this type's arithmetic, as text.
    fn format_diff(self, other: Self) -> String;
}

macro_rules! impl_int_scalar {
    ($t:ty, $kind:ident) => {
        impl Scalar for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            #[inline]
            fn to_wide(self) -> Wide {
                Wide::Int(self as i128)
            }

            #[inline]
            fn from_wide(w: Wide) -> Self {
                match w {
                    Wide::Int(v) => v as $t,
                    Wide::Float(v) => v as $t,
                }
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn is_zero(self) -> bool {
                self == 0
            }

            fn from_column(col: Column) -> std::result::Result<Vec<Self>, Column> {
                match col {
                    Column::$kind(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn into_column(values: Vec<Self>) -> Column {
                Column::$kind(values)
            }

            fn format_diff(self, other: Self) -> String {
                (other as i128 - self as i128).to_string()
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($t:ty, $kind:ident) => {
        impl Scalar for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            #[inline]
            fn to_wide(self) -> Wide {
                Wide::Float(self as f64)
            }

            #[inline]
            fn from_wide(w: Wide) -> Self {
                match w {
                    Wide::Int(v) => v as $t,
                    Wide::Float(v) => v as $t,
                }
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn is_zero(self) -> bool {
                self == 0.0
            }

            fn from_column(col: Column) -> std::result::Result<Vec<Self>, Column> {
                match col {
                    Column::$kind(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn into_column(values: Vec<Self>) -> Column {
                Column::$kind(values)
            }

            fn format_diff(self, other: Self) -> String {
                (other - self).to_string()
            }
        }
    };
}

impl_int_scalar!(i32, I32);
impl_int_scalar!(u32, U32);
impl_int_scalar!(i64, I64);
impl_int_scalar!(u64, U64);
impl_int_scalar!(i8, Char);
impl_float_scalar!(f32, F32);
impl_float_scalar!(f64, F64);

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    #[inline]
    fn to_wide(self) -> Wide {
        Wide::Int(self as i128)
    }

    #[inline]
    fn from_wide(w: Wide) -> Self {
        match w {
            Wide::Int(v) => v != 0,
            Wide::Float(v) => v != 0.0,
        }
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    #[inline]
    fn is_zero(self) -> bool {
        !self
    }

    fn from_column(col: Column) -> std::result::Result<Vec<Self>, Column> {
        match col {
            Column::Bool(v) => Ok(v),
            other => Err(other),
        }
    }

    fn into_column(values: Vec<Self>) -> Column {
        Column::Bool(values)
    }

    fn format_value(self) -> String {
        u8::from(self).to_string()
    }

    fn format_diff(self, other: Self) -> String {
        (i32::from(other) - i32::from(self)).to_string()
    }
}

/// A fully loaded branch: one value per row, homogeneous kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// `i32` values.
    I32(Vec<i32>),
    /// `u32` values.
    U32(Vec<u32>),
    /// `i64` values.
    I64(Vec<i64>),
    /// `u64` values.
    U64(Vec<u64>),
    /// `f32` values.
    F32(Vec<f32>),
    /// `f64` values.
    F64(Vec<f64>),
    /// `bool` values.
    Bool(Vec<bool>),
    /// `char` (i8) values.
    Char(Vec<i8>),
}

macro_rules! with_column {
    ($col:expr, $v:ident => $body:expr) => {
        match $col {
            Column::I32($v) => $body,
            Column::U32($v) => $body,
            Column::I64($v) => $body,
            Column::U64($v) => $body,
            Column::F32($v) => $body,
            Column::F64($v) => $body,
            Column::Bool($v) => $body,
            Column::Char($v) => $body,
        }
    };
}

fn pick_rows<T: Scalar>(values: &[T], rows: &[usize]) -> Column {
    T::into_column(rows.iter().map(|&r| values[r]).collect())
}

impl Column {
    /// Empty column of the given kind.
    pub fn empty(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::I32 => Column::I32(Vec::new()),
            ScalarKind::U32 => Column::U32(Vec::new()),
            ScalarKind::I64 => Column::I64(Vec::new()),
            ScalarKind::U64 => Column::U64(Vec::new()),
            ScalarKind::F32 => Column::F32(Vec::new()),
            ScalarKind::F64 => Column::F64(Vec::new()),
            ScalarKind::Bool => Column::Bool(Vec::new()),
            ScalarKind::Char => Column::Char(Vec::new()),
        }
    }

    /// Stored kind.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Column::I32(_) => ScalarKind::I32,
            Column::U32(_) => ScalarKind::U32,
            Column::I64(_) => ScalarKind::I64,
            Column::U64(_) => ScalarKind::U64,
            Column::F32(_) => ScalarKind::F32,
            Column::F64(_) => ScalarKind::F64,
            Column::Bool(_) => ScalarKind::Bool,
            Column::Char(_) => ScalarKind::Char,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        with_column!(self, v => v.len())
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every value into `T`; a no-op move when the kinds already match.
    pub fn cast<T: Scalar>(self) -> Vec<T> {
        match T::from_column(self) {
            Ok(values) => values,
            Err(col) => with_column!(col, v => v.into_iter().map(T::cast_from).collect()),
        }
    }

    /// Values as `f64`, leaving the column intact.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_column!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// New column holding only `rows`, in the given order.
    ///
    /// Panics if a row index is out of range.
    pub fn take_rows(&self, rows: &[usize]) -> Column {
        with_column!(self, v => pick_rows(v, rows))
    }

    /// Truncate to at most `n` rows.
    pub fn truncate(&mut self, n: usize) {
        with_column!(self, v => v.truncate(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ScalarKind::ALL {
            assert_eq!(kind.name().parse::<ScalarKind>().unwrap(), kind);
        }
        assert!("i16".parse::<ScalarKind>().is_err());
    }

    #[test]
    fn integral_classification() {
        assert!(ScalarKind::Bool.is_integral());
        assert!(ScalarKind::Char.is_integral());
        assert!(ScalarKind::U64.is_integral());
        assert!(ScalarKind::F32.is_float());
        assert!(!ScalarKind::F64.is_integral());
    }

    #[test]
    fn cast_follows_c_rules() {
        let col = Column::F64(vec![2.9, -2.9, 0.0, 1e20]);
        assert_eq!(col.clone().cast::<i32>(), vec![2, -2, 0, i32::MAX]);
        assert_eq!(col.cast::<bool>(), vec![true, true, false, true]);

        let col = Column::I32(vec![-1, 7]);
        assert_eq!(col.clone().cast::<u32>(), vec![u32::MAX, 7]);
        assert_eq!(col.cast::<f32>(), vec![-1.0, 7.0]);

        let col = Column::Bool(vec![true, false]);
        assert_eq!(col.cast::<u64>(), vec![1, 0]);

        let col = Column::Char(vec![-3, 65]);
        assert_eq!(col.cast::<i64>(), vec![-3, 65]);
    }

    #[test]
    fn same_kind_cast_is_identity() {
        let values = vec![1u64, u64::MAX, 42];
        let col = Column::U64(values.clone());
        assert_eq!(col.cast::<u64>(), values);
    }

    #[test]
    fn take_rows_keeps_kind_and_order() {
        let col = Column::F32(vec![0.5, 1.5, 2.5, 3.5]);
        let picked = col.take_rows(&[3, 1]);
        assert_eq!(picked, Column::F32(vec![3.5, 1.5]));
        assert_eq!(picked.kind(), ScalarKind::F32);
    }

    #[test]
    fn diff_formatting_uses_own_arithmetic() {
        assert_eq!(5i32.format_diff(7), "2");
        assert_eq!(7u32.format_diff(5), "-2");
        assert_eq!(true.format_diff(false), "-1");
        assert_eq!(true.format_value(), "1");
        assert_eq!(1.5f64.format_diff(2.0), "0.5");
    }
}
