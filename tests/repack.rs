mod common;

use common::init_logging;
use common::synthetic_stream::{synthetic_frame, write_stream};
use module_retile::geometry::{DetectorGeometry, GroupMap};
use module_retile::pipeline::{repack, split, SplitOptions};
use module_retile::storage::{Compression, FrameSource, H5Reader};
use module_retile::types::Dtype;
use module_retile::RetileError;

fn geometry() -> DetectorGeometry {
    DetectorGeometry {
        module_fast: 16,
        module_slow: 8,
        gap_fast: 2,
        gap_slow: 3,
        grid_fast: 2,
        grid_slow: 2,
        group_map: GroupMap::PerModule,
    }
}

#[test]
fn repack_preserves_frames_and_provenance() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.h5");
    let output = dir.path().join("packed.h5");
    let shape = write_stream(
        &input,
        &geometry(),
        3,
        Dtype::U32,
        &[("image_nr_low", 10), ("image_nr_high", 12)],
    );

    let options = SplitOptions {
        compression: Compression::none(),
        ..SplitOptions::default()
    };
    let report = repack(&input, &output, &options).unwrap();
    assert_eq!(report.shape, shape);
    assert_eq!(report.bytes_in, (3 * shape.frame_bytes(Dtype::U32)) as u64);
    assert_eq!(report.attributes_copied, 2);

    let mut packed = H5Reader::open(&output).unwrap();
    assert_eq!(packed.chunk_shape(), Some(vec![1, shape.slow, shape.fast]));
    assert_eq!(packed.attributes().get("image_nr_low"), Some(10));
    for frame in 0..3 {
        assert_eq!(
            packed.read_frame_buf(frame).unwrap(),
            synthetic_frame(shape, Dtype::U32, frame)
        );
    }

    let err = repack(&input, &output, &options).unwrap_err();
    assert!(matches!(err, RetileError::ArtifactExists(_)));
}

#[test]
fn repack_of_a_composite_materialises_the_gaps() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.h5");
    let composite = dir.path().join("split.h5");
    let flat = dir.path().join("flat.h5");
    let geometry = geometry();
    write_stream(&input, &geometry, 1, Dtype::U16, &[]);
    split(&input, &composite, &geometry, &SplitOptions::default()).unwrap();

    let report = repack(&composite, &flat, &SplitOptions::default()).unwrap();
    assert!(report.bytes_out > 0);
    assert_eq!(report.bytes_in, report.shape.frame_bytes(Dtype::I32) as u64);

    let mut packed = H5Reader::open(&flat).unwrap();
    assert_eq!(packed.dtype(), Dtype::I32);
    let frame = packed.read_frame_buf(0).unwrap();
    let expected = synthetic_frame(geometry.global_shape(1), Dtype::I32, 0);
    let mut copy = expected.clone();
    // Gap rows 8..11 and gap columns 16..18 hold the signed fill value.
    for y in 0..geometry.global_slow() {
        for x in 0..geometry.global_fast() {
            if (8..11).contains(&y) || (16..18).contains(&x) {
                copy.set(y, x, -1);
            }
        }
    }
    assert_eq!(frame, copy);
}
