use module_retile::geometry::DetectorGeometry;
use module_retile::image::FrameBuf;
use module_retile::storage::{Compression, DatasetSpec, FrameSink, H5Writer};
use module_retile::types::{Dtype, Shape3};
use std::path::Path;

/// Deterministic pixel value, non-negative and below 30_000 so it fits every
/// supported dtype. Gap pixels get values too; the composite must hide them.
pub fn pixel_value(frame: usize, slow: usize, fast: usize) -> i64 {
    ((frame * 7919 + slow * 131 + fast) % 30_000) as i64
}

pub fn synthetic_frame(shape: Shape3, dtype: Dtype, frame: usize) -> FrameBuf {
    let mut buf = FrameBuf::new(dtype, shape.slow, shape.fast);
    for y in 0..shape.slow {
        for x in 0..shape.fast {
            buf.set(y, x, pixel_value(frame, y, x));
        }
    }
    buf
}

/// Write a full global stream for `geometry` to an HDF5 file at `path`.
pub fn write_stream(
    path: &Path,
    geometry: &DetectorGeometry,
    frames: usize,
    dtype: Dtype,
    attributes: &[(&str, i32)],
) -> Shape3 {
    let shape = geometry.global_shape(frames);
    let mut writer = H5Writer::create(
        path,
        DatasetSpec {
            name: "data".to_string(),
            shape,
            dtype,
            compression: Compression::default(),
        },
    )
    .expect("create source file");
    for frame in 0..frames {
        let buf = synthetic_frame(shape, dtype, frame);
        writer.write_frame(frame, &buf.data).expect("write source frame");
    }
    for (name, value) in attributes {
        writer.attributes_mut().set(*name, *value);
    }
    writer.finish().expect("finish source file");
    shape
}
