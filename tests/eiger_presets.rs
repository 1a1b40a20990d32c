//! Full-size Eiger2 geometries. Frame counts stay small: a 9M frame is
//! 3262 x 3108 pixels.
mod common;

use common::init_logging;
use common::synthetic_stream::{pixel_value, write_stream};
use module_retile::geometry::{DetectorGeometry, DetectorPreset};
use module_retile::image::PixelRows;
use module_retile::layout::VirtualDataset;
use module_retile::pipeline::{artifact_path, split, SplitOptions};
use module_retile::storage::{FrameSource, H5Reader};
use module_retile::types::{Dtype, Shape3};

#[test]
fn nine_megapixel_splits_into_eighteen_modules() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eiger9m.h5");
    let output = dir.path().join("eiger9m_split.h5");
    let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
    let attributes = [("image_nr_low", 1), ("image_nr_high", 2)];
    let shape = write_stream(&input, &geometry, 2, Dtype::U32, &attributes);
    assert_eq!(shape, Shape3::new(2, 3262, 3108));

    let report = split(&input, &output, &geometry, &SplitOptions::default()).unwrap();
    assert_eq!(report.artifacts.len(), 18);
    for (i, artifact) in report.artifacts.iter().enumerate() {
        assert_eq!(artifact.shape, Shape3::new(2, 512, 1028));
        assert_eq!(artifact.path, artifact_path(&output, i));
        assert_eq!(artifact.modules, vec![i]);
    }

    let mut composite = VirtualDataset::open(&output).unwrap();
    assert_eq!(composite.shape(), shape);
    assert_eq!(composite.dtype(), Dtype::I32);
    assert_eq!(composite.read_pixel(0, 0, 0).unwrap(), pixel_value(0, 0, 0));
    // First row of the horizontal gap below module row 0.
    assert_eq!(composite.read_pixel(0, 512, 0).unwrap(), -1);
    // First column of the vertical gap right of module 0.
    assert_eq!(composite.read_pixel(1, 100, 1028).unwrap(), -1);
    // Module 4 (grid row 1, column 1) starts at (550, 1040).
    assert_eq!(composite.read_pixel(1, 550, 1040).unwrap(), pixel_value(1, 550, 1040));
    assert_eq!(composite.attributes().get("image_nr_high"), Some(2));

    let mut module4 = H5Reader::open(&artifact_path(&output, 4)).unwrap();
    assert_eq!(module4.dtype(), Dtype::U32);
    assert_eq!(module4.chunk_shape(), Some(vec![1, 512, 1028]));
    let frame = module4.read_frame_buf(1).unwrap();
    assert_eq!(frame.pixel(0, 0), pixel_value(1, 550, 1040));
    assert_eq!(frame.pixel(511, 1027), pixel_value(1, 550 + 511, 1040 + 1027));
}

#[test]
fn sixteen_megapixel_quads_stack_along_slow() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eiger16m.h5");
    let output = dir.path().join("eiger16m_quads.h5");
    let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_16mQuad);
    let shape = write_stream(&input, &geometry, 1, Dtype::U16, &[]);
    assert_eq!(shape, Shape3::new(1, 4362, 4148));

    let report = split(&input, &output, &geometry, &SplitOptions::default()).unwrap();
    assert_eq!(report.artifacts.len(), 8);
    assert!(report
        .artifacts
        .iter()
        .all(|a| a.shape == Shape3::new(1, 2048, 1028)));
    assert_eq!(report.artifacts[1].modules, vec![2, 3, 6, 7]);

    // Module 5 occupies global rows 550..1062, columns 1040..2068 and is the
    // fourth slab (rows 1536..2048) of artifact 0.
    let mut quad0 = H5Reader::open(&artifact_path(&output, 0)).unwrap();
    let frame = quad0.read_frame_buf(0).unwrap();
    for (y, x) in [(0, 0), (17, 900), (511, 1027)] {
        assert_eq!(frame.pixel(1536 + y, x), pixel_value(0, 550 + y, 1040 + x));
    }
    // Module 1 is the second slab.
    assert_eq!(frame.pixel(512, 0), pixel_value(0, 0, 1040));

    let mut composite = VirtualDataset::open(&output).unwrap();
    assert_eq!(composite.read_pixel(0, 600, 1100).unwrap(), pixel_value(0, 600, 1100));
    assert_eq!(composite.read_pixel(0, 530, 0).unwrap(), -1);
}
