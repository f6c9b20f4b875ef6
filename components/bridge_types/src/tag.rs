//! Value tags as laid out by the native ABI.

use std::fmt;

/// Discriminant of a boundary value.
///
/// The numeric values match the C enumeration used by the embedded runtime
/// (`UNDEFINED = 0` through `UNKNOWN = 10`), which is a 4-byte `int` on every
/// supported platform.
///
/// # Examples
///
/// ```
/// use bridge_types::ValueTag;
///
/// assert_eq!(ValueTag::from_raw(3), ValueTag::Number);
/// assert_eq!(ValueTag::from_raw(99), ValueTag::Unknown);
/// assert_eq!(ValueTag::BigInt.as_raw(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ValueTag {
    /// JavaScript `undefined`
    Undefined = 0,
    /// JavaScript `null`
    Null = 1,
    /// `true` or `false`
    Boolean = 2,
    /// IEEE 754 double
    Number = 3,
    /// UTF-8 string
    String = 4,
    /// Symbol (opaque to the host)
    Symbol = 5,
    /// Runtime-resident function
    Function = 6,
    /// Ordered sequence of values
    Array = 7,
    /// Arbitrary precision integer carried as decimal text
    BigInt = 8,
    /// String-keyed mapping
    Object = 9,
    /// Anything the runtime could not classify
    Unknown = 10,
}

impl ValueTag {
    /// Maps a raw ABI discriminant to a tag.
    ///
    /// Discriminants the bridge does not know collapse to [`ValueTag::Unknown`];
    /// use [`ValueTag::try_from_raw`] where that must be detected.
    pub fn from_raw(raw: i32) -> Self {
        Self::try_from_raw(raw).unwrap_or(ValueTag::Unknown)
    }

    /// Maps a raw ABI discriminant to a tag, returning `None` when the value
    /// is outside the known range.
    pub fn try_from_raw(raw: i32) -> Option<Self> {
        let tag = match raw {
            0 => ValueTag::Undefined,
            1 => ValueTag::Null,
            2 => ValueTag::Boolean,
            3 => ValueTag::Number,
            4 => ValueTag::String,
            5 => ValueTag::Symbol,
            6 => ValueTag::Function,
            7 => ValueTag::Array,
            8 => ValueTag::BigInt,
            9 => ValueTag::Object,
            10 => ValueTag::Unknown,
            _ => return None,
        };
        Some(tag)
    }

    /// Returns the raw ABI discriminant.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Whether a value carrying this tag owns natively allocated memory
    /// that must be released exactly once.
    pub fn owns_heap(self) -> bool {
        matches!(
            self,
            ValueTag::String
                | ValueTag::Symbol
                | ValueTag::Function
                | ValueTag::Array
                | ValueTag::BigInt
                | ValueTag::Object
        )
    }

    /// Lower-case name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueTag::Undefined => "undefined",
            ValueTag::Null => "null",
            ValueTag::Boolean => "boolean",
            ValueTag::Number => "number",
            ValueTag::String => "string",
            ValueTag::Symbol => "symbol",
            ValueTag::Function => "function",
            ValueTag::Array => "array",
            ValueTag::BigInt => "bigint",
            ValueTag::Object => "object",
            ValueTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
