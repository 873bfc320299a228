use std::collections::BTreeSet;

use super::{
    Coord3D, FigureKind, Geometry, MAX_RANGE_PLANES, ModelError, Point2, Roi, RoiId,
    ShapeAnnotations, parse_selector,
};

#[test]
fn coord_identity_ignores_channel() {
    let a = Coord3D::with_channel(2, 3, 0);
    let b = Coord3D::with_channel(2, 3, 4);
    let c = Coord3D::new(2, 3);
    assert_eq!(a, b);
    assert_eq!(a, c);
    let set = [a, b, c].into_iter().collect::<BTreeSet<_>>();
    assert_eq!(set.len(), 1);
}

#[test]
fn coord_orders_by_z_then_t() {
    let mut coords = vec![Coord3D::new(1, 0), Coord3D::new(0, 5), Coord3D::new(0, 1)];
    coords.sort();
    assert_eq!(
        coords,
        vec![Coord3D::new(0, 1), Coord3D::new(0, 5), Coord3D::new(1, 0)]
    );
}

#[test]
fn coord_range_spans_rectangle_in_either_direction() {
    let forward = Coord3D::range(Coord3D::new(0, 1), Coord3D::new(2, 2)).expect("forward");
    let backward = Coord3D::range(Coord3D::new(2, 2), Coord3D::new(0, 1)).expect("backward");
    assert_eq!(forward.len(), 6);
    assert_eq!(
        forward.iter().collect::<BTreeSet<_>>(),
        backward.iter().collect::<BTreeSet<_>>()
    );
    let single = Coord3D::range(Coord3D::new(4, 4), Coord3D::new(4, 4)).expect("single");
    assert_eq!(single.len(), 1);
}

#[test]
fn coord_range_refuses_oversized_rectangles() {
    let origin = Coord3D::new(0, 0);
    assert_eq!(Coord3D::plane_count(origin, Coord3D::new(usize::MAX, 0)), None);
    assert_eq!(Coord3D::plane_count(origin, Coord3D::new(2, 3)), Some(12));
    assert!(Coord3D::range(origin, Coord3D::new(usize::MAX, 0)).is_none());
    assert!(Coord3D::range(origin, Coord3D::new(100_000, 100_000)).is_none());
    assert_eq!(
        Coord3D::plane_count(origin, Coord3D::new(0, MAX_RANGE_PLANES - 1)),
        Some(MAX_RANGE_PLANES)
    );
    assert!(Coord3D::range(origin, Coord3D::new(0, MAX_RANGE_PLANES)).is_none());
}

#[test]
fn coord_and_selector_parsing() {
    assert_eq!(Coord3D::parse("3, 4").expect("coord"), Coord3D::new(3, 4));
    assert_eq!(
        Coord3D::parse("3,4,1").expect("coord").channel,
        Some(1)
    );
    assert!(Coord3D::parse("3").is_err());
    assert!(Coord3D::parse("a,b").is_err());

    let (roi, coord) = parse_selector("-2:1,0").expect("selector");
    assert_eq!(roi, RoiId(-2));
    assert_eq!(coord, Coord3D::new(1, 0));
    assert!(parse_selector("1,0").is_err());
}

#[test]
fn open_path_classification() {
    let line = Geometry::line(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0));
    let degenerate = Geometry::line(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0));
    let polyline = Geometry::polyline(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
    ]);
    let looped = Geometry::polyline(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 0.0),
    ]);
    let polygon = Geometry::polygon(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
    ]);

    assert!(line.is_open_path());
    assert!(!degenerate.is_open_path());
    assert!(polyline.is_open_path());
    assert!(!looped.is_open_path());
    assert!(!polygon.is_open_path());
    assert!(polygon.is_area());
    assert!(!Geometry::point(1.0, 1.0).is_open_path());
    assert!(!Geometry::rectangle(0.0, 0.0, 2.0, 2.0).is_open_path());
    assert_eq!(polygon.kind(), FigureKind::Polygon);
    assert_eq!(polyline.kind(), FigureKind::Polyline);
}

#[test]
fn measurements_follow_geometry() {
    let rect = Geometry::rectangle(1.0, 1.0, 4.0, 2.0);
    assert_eq!(rect.area(), Some(8.0));
    assert_eq!(rect.perimeter(), Some(12.0));
    assert_eq!(rect.centroid(), Some(Point2::new(3.0, 2.0)));
    assert_eq!(rect.length(), None);

    let line = Geometry::line(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0));
    assert_eq!(line.length(), Some(5.0));
    assert_eq!(line.area(), None);

    let square = Geometry::polygon(vec![
        Point2::new(0.0, 0.0),
        Point2::new(2.0, 0.0),
        Point2::new(2.0, 2.0),
        Point2::new(0.0, 2.0),
    ]);
    assert_eq!(square.area(), Some(4.0));
    assert_eq!(square.perimeter(), Some(8.0));
    let centroid = square.centroid().expect("centroid");
    assert!((centroid.x - 1.0).abs() < 1e-9);
    assert!((centroid.y - 1.0).abs() < 1e-9);

    let circle = Geometry::ellipse(0.0, 0.0, 1.0, 1.0);
    let perimeter = circle.perimeter().expect("perimeter");
    assert!((perimeter - 2.0 * std::f64::consts::PI).abs() < 1e-9);
}

#[test]
fn mask_measurements_and_containment() {
    let mask = Geometry::Mask {
        origin: Point2::new(10.0, 10.0),
        width: 2,
        height: 2,
        bits: vec![true, true, false, true],
    };
    assert!(mask.validate().is_ok());
    assert_eq!(mask.area(), Some(3.0));
    assert_eq!(mask.perimeter(), Some(8.0));
    assert!(mask.contains(Point2::new(10.5, 10.5)));
    assert!(!mask.contains(Point2::new(10.5, 11.5)));
    assert!(!mask.contains(Point2::new(9.5, 10.5)));

    let broken = Geometry::Mask {
        origin: Point2::new(0.0, 0.0),
        width: 3,
        height: 1,
        bits: vec![true],
    };
    assert!(broken.validate().is_err());
}

#[test]
fn geometry_validation_rejects_short_polylines() {
    assert!(Geometry::polyline(vec![Point2::new(0.0, 0.0)]).validate().is_err());
    assert!(
        Geometry::polygon(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)])
            .validate()
            .is_err()
    );
    assert!(Geometry::rectangle(0.0, 0.0, -1.0, 1.0).validate().is_err());
    assert!(Geometry::point(f64::NAN, 0.0).validate().is_err());
}

#[test]
fn geometry_validation_rejects_unbounded_figures() {
    let oversized = Geometry::Mask {
        origin: Point2::new(0.0, 0.0),
        width: 1 << 33,
        height: 1 << 33,
        bits: vec![],
    };
    assert!(matches!(
        oversized.validate(),
        Err(ModelError::InvalidGeometry(_))
    ));
    let drifting_mask = Geometry::Mask {
        origin: Point2::new(f64::INFINITY, 0.0),
        width: 1,
        height: 1,
        bits: vec![true],
    };
    assert!(drifting_mask.validate().is_err());
    assert!(Geometry::ellipse(f64::NAN, 0.0, 1.0, 1.0).validate().is_err());
    assert!(Geometry::ellipse(0.0, 0.0, f64::INFINITY, 1.0).validate().is_err());
    assert!(Geometry::rectangle(0.0, f64::NEG_INFINITY, 1.0, 1.0).validate().is_err());
    assert!(Geometry::rectangle(0.0, 0.0, 2.0, 3.0).validate().is_ok());
}

#[test]
fn geometry_json_is_tagged() {
    let geometry = Geometry::ellipse(5.0, 6.0, 2.0, 3.0);
    let json = serde_json::to_value(&geometry).expect("serialize");
    assert_eq!(json["kind"], "ellipse");
    let restored: Geometry = serde_json::from_value(json).expect("deserialize");
    assert_eq!(restored, geometry);
}

#[test]
fn annotations_refresh_keeps_flags() {
    let mut annotations = ShapeAnnotations::measured(&Geometry::rectangle(0.0, 0.0, 1.0, 1.0));
    annotations.read_only = true;
    annotations.text = Some("nucleus".into());
    annotations.refresh_measurements(&Geometry::rectangle(0.0, 0.0, 3.0, 3.0));
    assert_eq!(annotations.area, Some(9.0));
    assert!(annotations.read_only);
    assert_eq!(annotations.text.as_deref(), Some("nucleus"));
}

#[test]
fn cloned_roi_metadata_starts_empty_and_client_side() {
    let mut roi = Roi::new(RoiId(42), "openmicroscopy.org/measurement");
    roi.owner_id = Some(7);
    roi.deletable = false;
    let copy = roi.clone_metadata(RoiId(-1));
    assert_eq!(copy.owner_id, Some(7));
    assert!(!copy.deletable);
    assert!(copy.client_side);
    assert!(copy.is_empty());
    assert_eq!(copy.namespace, roi.namespace);
}
