use burn_ndarray::NdArray;
use proptest::prelude::*;
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};

type Backend = NdArray<f32>;

proptest! {
    #[test]
    fn test_zeros_like_keeps_shape_and_geometry(
        nz in 1usize..5, ny in 1usize..5, nx in 1usize..5,
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
    ) {
        let device = Default::default();
        let metadata = ImageMetadata::new(
            Point::<3>::new([ox, oy, oz]),
            Spacing::<3>::new([sx, sy, sz]),
            Direction::<3>::identity(),
        );
        let samples: Vec<f32> = (0..nz * ny * nx).map(|v| v as f32).collect();
        let image = Image::<Backend, 3>::from_samples(samples, [nz, ny, nx], &metadata, &device).unwrap();
        let allocated = image.zeros_like();

        prop_assert_eq!(allocated.shape(), [nz, ny, nx]);
        prop_assert!(allocated.has_same_geometry(&image));
        prop_assert_eq!(allocated.metadata(), metadata);
    }
}
