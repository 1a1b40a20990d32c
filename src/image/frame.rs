//! Frame buffers in row-major layout (slow rows of fast-contiguous pixels).
//!
//! `FrameBuf` owns its bytes and is what the blit engine assembles group slabs
//! into; `FrameView` borrows any byte slice of the right length.
use super::traits::PixelRows;
use crate::geometry::Rect;
use crate::types::Dtype;

#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub dtype: Dtype,
    pub slow: usize,
    pub fast: usize,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(dtype: Dtype, slow: usize, fast: usize, data: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), slow * fast * dtype.size());
        Self {
            dtype,
            slow,
            fast,
            data,
        }
    }
}

impl PixelRows for FrameView<'_> {
    #[inline]
    fn dtype(&self) -> Dtype {
        self.dtype
    }
    #[inline]
    fn width(&self) -> usize {
        self.fast
    }
    #[inline]
    fn height(&self) -> usize {
        self.slow
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let len = self.fast * self.dtype.size();
        &self.data[y * len..(y + 1) * len]
    }
    #[inline]
    fn as_bytes(&self) -> Option<&[u8]> {
        Some(self.data)
    }
}

/// Owned frame, zero-initialised unless built with [`FrameBuf::filled`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuf {
    pub dtype: Dtype,
    pub slow: usize,
    pub fast: usize,
    pub data: Vec<u8>,
}

impl FrameBuf {
    pub fn new(dtype: Dtype, slow: usize, fast: usize) -> Self {
        Self {
            dtype,
            slow,
            fast,
            data: vec![0; slow * fast * dtype.size()],
        }
    }

    /// Frame with every pixel set to `value` (encoded for `dtype`).
    pub fn filled(dtype: Dtype, slow: usize, fast: usize, value: i64) -> Self {
        let mut frame = Self::new(dtype, slow, fast);
        frame.fill(value);
        frame
    }

    pub fn fill(&mut self, value: i64) {
        let size = self.dtype.size();
        let mut px = [0u8; 4];
        self.dtype.encode(value, &mut px[..size]);
        for chunk in self.data.chunks_exact_mut(size) {
            chunk.copy_from_slice(&px[..size]);
        }
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(self.dtype, self.slow, self.fast, &self.data)
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let len = self.fast * self.dtype.size();
        &mut self.data[y * len..(y + 1) * len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, value: i64) {
        let size = self.dtype.size();
        let dtype = self.dtype;
        let row = self.row_mut(y);
        dtype.encode(value, &mut row[x * size..(x + 1) * size]);
    }

    /// Copy `src_rect` of `src` so that its top-left lands on
    /// `(dst_slow, dst_fast)`. A source of another dtype is converted pixel by
    /// pixel, saturating at the bounds of this frame's dtype.
    pub fn copy_rect_from<I: PixelRows + ?Sized>(
        &mut self,
        src: &I,
        src_rect: Rect,
        dst_slow: usize,
        dst_fast: usize,
    ) {
        let (src_dtype, dst_dtype) = (src.dtype(), self.dtype);
        let (src_size, dst_size) = (src_dtype.size(), dst_dtype.size());
        let (f0, f1) = (src_rect.fast0 * src_size, src_rect.fast1 * src_size);
        let d0 = dst_fast * dst_size;
        for r in 0..src_rect.height() {
            let src_row = &src.row(src_rect.slow0 + r)[f0..f1];
            let dst_row = self.row_mut(dst_slow + r);
            if src_dtype == dst_dtype {
                dst_row[d0..d0 + src_row.len()].copy_from_slice(src_row);
                continue;
            }
            let dst_px = dst_row[d0..].chunks_exact_mut(dst_size);
            for (s, d) in src_row.chunks_exact(src_size).zip(dst_px) {
                dst_dtype.encode(dst_dtype.saturate(src_dtype.decode(s)), d);
            }
        }
    }
}

impl PixelRows for FrameBuf {
    #[inline]
    fn dtype(&self) -> Dtype {
        self.dtype
    }
    #[inline]
    fn width(&self) -> usize {
        self.fast
    }
    #[inline]
    fn height(&self) -> usize {
        self.slow
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let len = self.fast * self.dtype.size();
        &self.data[y * len..(y + 1) * len]
    }
    #[inline]
    fn as_bytes(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}
