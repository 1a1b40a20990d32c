use serde::{Deserialize, Serialize};
use std::fmt;

/// Extent of a 3-D frame stream: `(frames, slow, fast)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape3 {
    pub frames: usize,
    pub slow: usize,
    pub fast: usize,
}

impl Shape3 {
    pub const fn new(frames: usize, slow: usize, fast: usize) -> Self {
        Self { frames, slow, fast }
    }

    /// Pixels in a single frame.
    #[inline]
    pub fn frame_pixels(&self) -> usize {
        self.slow * self.fast
    }

    #[inline]
    pub fn frame_bytes(&self, dtype: Dtype) -> usize {
        self.frame_pixels() * dtype.size()
    }

    /// Same shape with the frame axis dropped from the comparison.
    #[inline]
    pub fn same_frame_extent(&self, other: &Shape3) -> bool {
        self.slow == other.slow && self.fast == other.fast
    }
}

impl fmt::Display for Shape3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.frames, self.slow, self.fast)
    }
}

/// Integer pixel types a stream may carry. Storage is little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    U8,
    U16,
    U32,
    I16,
    I32,
}

impl Dtype {
    /// Bytes per pixel.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 => 4,
        }
    }

    /// Decode one little-endian pixel. `bytes` must hold exactly `size()` bytes.
    pub fn decode(self, bytes: &[u8]) -> i64 {
        match self {
            Dtype::U8 => bytes[0] as i64,
            Dtype::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as i64,
            Dtype::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as i64,
            Dtype::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64,
            Dtype::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64,
        }
    }

    /// Encode `value` into `out`, truncating to the pixel width. A fill value
    /// of `-1` therefore becomes all-ones for unsigned types.
    pub fn encode(self, value: i64, out: &mut [u8]) {
        match self {
            Dtype::U8 => out[0] = value as u8,
            Dtype::U16 => out.copy_from_slice(&(value as u16).to_le_bytes()),
            Dtype::I16 => out.copy_from_slice(&(value as i16).to_le_bytes()),
            Dtype::U32 => out.copy_from_slice(&(value as u32).to_le_bytes()),
            Dtype::I32 => out.copy_from_slice(&(value as i32).to_le_bytes()),
        }
    }

    /// Smallest and largest representable value.
    pub fn range(self) -> (i64, i64) {
        match self {
            Dtype::U8 => (0, u8::MAX as i64),
            Dtype::U16 => (0, u16::MAX as i64),
            Dtype::U32 => (0, u32::MAX as i64),
            Dtype::I16 => (i16::MIN as i64, i16::MAX as i64),
            Dtype::I32 => (i32::MIN as i64, i32::MAX as i64),
        }
    }

    /// Clamp `value` into this type's range, the way an HDF5 integer
    /// conversion clips overflowing values.
    pub fn saturate(self, value: i64) -> i64 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }

    /// Canonical decoded form of `value` for this type, i.e. what a read of a
    /// pixel encoded from `value` returns.
    pub fn normalize(self, value: i64) -> i64 {
        let mut buf = [0u8; 4];
        let out = &mut buf[..self.size()];
        self.encode(value, out);
        self.decode(out)
    }
}

/// Rust scalar backing a [`Dtype`], used for typed reads and writes.
pub trait Pixel: Copy + Send + Sync + 'static {
    const DTYPE: Dtype;

    fn from_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_pixel {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Pixel for $ty {
                const DTYPE: Dtype = Dtype::$dtype;

                #[inline]
                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_pixel!(u8 => U8, u16 => U16, u32 => U32, i16 => I16, i32 => I32);

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dtype::U8 => "u8",
            Dtype::U16 => "u16",
            Dtype::U32 => "u32",
            Dtype::I16 => "i16",
            Dtype::I32 => "i32",
        };
        f.write_str(name)
    }
}
