use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use nalgebra::{Rotation3, Vector3};
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};
use std::f64::consts::PI;

type Backend = NdArray<f32>;
type Point3 = Point<3>;
type Spacing3 = Spacing<3>;
type Direction3 = Direction<3>;

#[test]
fn test_rotated_geometry_is_propagated_by_allocation() {
    let device = Default::default();
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
    let direction = Direction(rotation.into_inner());

    let data = Tensor::<Backend, 3>::ones([3, 4, 5], &device);
    let source = Image::new(data, Point3::new([12.0, -3.0, 40.0]), Spacing3::new([0.8, 0.8, 1.6]), direction);
    let output = source.zeros_like();

    assert_eq!(output.shape(), [3, 4, 5]);
    assert_eq!(output.origin(), source.origin());
    assert_eq!(output.spacing(), source.spacing());
    assert_eq!(output.direction(), source.direction());
    assert!(output.has_same_geometry(&source));
}

#[test]
fn test_with_metadata_matches_explicit_constructor() {
    let device = Default::default();
    let metadata = ImageMetadata::new(
        Point3::new([1.0, 2.0, 3.0]),
        Spacing3::uniform(2.0),
        Direction3::identity(),
    );
    let a = Image::with_metadata(Tensor::<Backend, 3>::zeros([2, 2, 2], &device), &metadata);
    let b = Image::new(
        Tensor::<Backend, 3>::zeros([2, 2, 2], &device),
        *metadata.origin(),
        *metadata.spacing(),
        *metadata.direction(),
    );
    assert!(a.has_same_geometry(&b));
}
