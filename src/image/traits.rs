use crate::types::Dtype;

/// Row access to a 2-D frame of raw little-endian pixels.
///
/// Rows are byte slices of `width() * dtype().size()` bytes; pixel values are
/// only decoded on demand so copies stay byte-for-byte.
pub trait PixelRows {
    fn dtype(&self) -> Dtype;

    /// Extent along the fast axis, in pixels.
    fn width(&self) -> usize;

    /// Extent along the slow axis, in pixels.
    fn height(&self) -> usize;

    fn row(&self, y: usize) -> &[u8];

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { image: self, y: 0 }
    }

    /// Decoded pixel at row `y`, column `x`.
    fn pixel(&self, y: usize, x: usize) -> i64 {
        let size = self.dtype().size();
        let row = self.row(y);
        self.dtype().decode(&row[x * size..(x + 1) * size])
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        None
    }
}

pub struct Rows<'a, I: ?Sized + PixelRows> {
    image: &'a I,
    y: usize,
}

impl<'a, I: PixelRows> Iterator for Rows<'a, I> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.image.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.image.row(y))
    }
}
