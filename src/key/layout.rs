//! Key layout discriminants.

/// Kind of a single key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Text.
    Str,
    /// Signed 32-bit integer.
    N32,
    /// Signed 64-bit integer.
    N64,
    /// Raw bytes.
    Bin,
}

impl Component {
    /// Fixed encoded width, or `None` for variable-width components.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Component::N32 => Some(4),
            Component::N64 => Some(8),
            Component::Str | Component::Bin => None,
        }
    }
}

/// How many components a layout carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One component.
    Single(Component),
    /// Two components.
    Pair(Component, Component),
    /// Up to 255 self-described components.
    Multi,
    /// Verbatim bytes.
    Free,
}

/// The 21 supported key layouts.
///
/// The discriminant is part of the wire format (it is stored in two-key
/// values) and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum KeyLayout {
    /// Single string.
    Str = 0,
    /// Single int32.
    N32 = 1,
    /// Single int64.
    N64 = 2,
    /// String, string.
    StrStr = 3,
    /// String, int32.
    StrN32 = 4,
    /// String, int64.
    StrN64 = 5,
    /// Int32, string.
    N32Str = 6,
    /// Int32, int32.
    N32N32 = 7,
    /// Int32, int64.
    N32N64 = 8,
    /// Int64, string.
    N64Str = 9,
    /// Int64, int32.
    N64N32 = 10,
    /// Int64, int64.
    N64N64 = 11,
    /// String, binary.
    StrBin = 12,
    /// Int32, binary.
    N32Bin = 13,
    /// Int64, binary.
    N64Bin = 14,
    /// Binary, string.
    BinStr = 15,
    /// Binary, int32.
    BinN32 = 16,
    /// Binary, int64.
    BinN64 = 17,
    /// Binary, binary.
    BinBin = 18,
    /// Variable-arity key.
    Multi = 19,
    /// Opaque bytes.
    Free = 20,
}

impl KeyLayout {
    /// Every layout in discriminant order.
    pub const ALL: [KeyLayout; 21] = [
        KeyLayout::Str,
        KeyLayout::N32,
        KeyLayout::N64,
        KeyLayout::StrStr,
        KeyLayout::StrN32,
        KeyLayout::StrN64,
        KeyLayout::N32Str,
        KeyLayout::N32N32,
        KeyLayout::N32N64,
        KeyLayout::N64Str,
        KeyLayout::N64N32,
        KeyLayout::N64N64,
        KeyLayout::StrBin,
        KeyLayout::N32Bin,
        KeyLayout::N64Bin,
        KeyLayout::BinStr,
        KeyLayout::BinN32,
        KeyLayout::BinN64,
        KeyLayout::BinBin,
        KeyLayout::Multi,
        KeyLayout::Free,
    ];

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Convert to u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Component structure of this layout.
    pub fn shape(self) -> Shape {
        use Component::*;
        match self {
            KeyLayout::Str => Shape::Single(Str),
            KeyLayout::N32 => Shape::Single(N32),
            KeyLayout::N64 => Shape::Single(N64),
            KeyLayout::StrStr => Shape::Pair(Str, Str),
            KeyLayout::StrN32 => Shape::Pair(Str, N32),
            KeyLayout::StrN64 => Shape::Pair(Str, N64),
            KeyLayout::N32Str => Shape::Pair(N32, Str),
            KeyLayout::N32N32 => Shape::Pair(N32, N32),
            KeyLayout::N32N64 => Shape::Pair(N32, N64),
            KeyLayout::N64Str => Shape::Pair(N64, Str),
            KeyLayout::N64N32 => Shape::Pair(N64, N32),
            KeyLayout::N64N64 => Shape::Pair(N64, N64),
            KeyLayout::StrBin => Shape::Pair(Str, Bin),
            KeyLayout::N32Bin => Shape::Pair(N32, Bin),
            KeyLayout::N64Bin => Shape::Pair(N64, Bin),
            KeyLayout::BinStr => Shape::Pair(Bin, Str),
            KeyLayout::BinN32 => Shape::Pair(Bin, N32),
            KeyLayout::BinN64 => Shape::Pair(Bin, N64),
            KeyLayout::BinBin => Shape::Pair(Bin, Bin),
            KeyLayout::Multi => Shape::Multi,
            KeyLayout::Free => Shape::Free,
        }
    }

    /// Returns true for the two-component layouts.
    pub fn is_two_key(self) -> bool {
        matches!(self.shape(), Shape::Pair(..))
    }
}

impl TryFrom<u8> for KeyLayout {
    type Error = crate::Error;

    fn try_from(value: u8) -> crate::Result<Self> {
        KeyLayout::from_u8(value)
            .ok_or_else(|| crate::Error::malformed(format!("unknown key layout {}", value)))
    }
}
