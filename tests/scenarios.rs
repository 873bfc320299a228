use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use roi_rs::config::SessionConfig;
use roi_rs::index::{IdPolicy, IndexError, RoiComponent};
use roi_rs::model::{Coord3D, Geometry, RoiShape, ShapeId};
use roi_rs::planes::{merge, propagate, split};
use roi_rs::sampling::{ChannelSamples, PixelSampler, PlaneStack, Result as SampleResult};
use roi_rs::session::{Session, SessionError, SessionState};
use roi_rs::stats::aggregate;

const WAIT: Duration = Duration::from_secs(10);

fn rectangle() -> Geometry {
    Geometry::rectangle(1.0, 1.0, 2.0, 2.0)
}

fn shape_id(index: &RoiComponent, roi: roi_rs::model::RoiId, coord: Coord3D) -> ShapeId {
    index.get_shape(roi, coord).expect("shape").id
}

#[test]
fn scenario_a_propagation_fills_the_range() {
    let mut index = RoiComponent::default();
    let roi = index
        .create_roi(rectangle(), Coord3D::new(0, 0), IdPolicy::ClientSide)
        .expect("roi");
    let source = shape_id(&index, roi, Coord3D::new(0, 0));

    propagate(&mut index, source, Coord3D::new(0, 0), Coord3D::new(2, 0)).expect("propagate");

    let shapes = index.shapes_of(roi).expect("shapes");
    let planes = shapes.iter().map(|shape| shape.coord).collect::<Vec<_>>();
    assert_eq!(
        planes,
        vec![Coord3D::new(0, 0), Coord3D::new(1, 0), Coord3D::new(2, 0)]
    );
    assert_eq!(shapes[0].id, source);
    assert!(shapes.iter().all(|shape| shape.geometry == rectangle()));
    index.check_invariants().expect("invariants");
}

#[test]
fn propagation_is_idempotent() {
    let mut index = RoiComponent::default();
    let roi = index
        .create_roi(rectangle(), Coord3D::new(1, 1), IdPolicy::ClientSide)
        .expect("roi");
    let source = shape_id(&index, roi, Coord3D::new(1, 1));
    propagate(&mut index, source, Coord3D::new(0, 0), Coord3D::new(2, 2)).expect("once");
    let once = index
        .shapes_of(roi)
        .expect("shapes")
        .iter()
        .map(|shape| (shape.coord, shape.geometry.clone()))
        .collect::<Vec<_>>();
    propagate(&mut index, source, Coord3D::new(0, 0), Coord3D::new(2, 2)).expect("twice");
    let twice = index
        .shapes_of(roi)
        .expect("shapes")
        .iter()
        .map(|shape| (shape.coord, shape.geometry.clone()))
        .collect::<Vec<_>>();
    assert_eq!(once.len(), 8);
    assert_eq!(once, twice);
}

#[test]
fn scenario_b_merge_consumes_emptied_rois() {
    let mut index = RoiComponent::default();
    let first = index
        .create_roi(rectangle(), Coord3D::new(0, 0), IdPolicy::ClientSide)
        .expect("first");
    let second = index
        .create_roi(rectangle(), Coord3D::new(1, 0), IdPolicy::ClientSide)
        .expect("second");
    let shapes = [
        shape_id(&index, first, Coord3D::new(0, 0)),
        shape_id(&index, second, Coord3D::new(1, 0)),
    ];

    let (merged, _) = merge(&mut index, &shapes).expect("merge");

    assert!(index.roi(first).is_none());
    assert!(index.roi(second).is_none());
    let planes = index
        .shapes_of(merged)
        .expect("merged")
        .iter()
        .map(|shape| shape.coord)
        .collect::<Vec<_>>();
    assert_eq!(planes, vec![Coord3D::new(0, 0), Coord3D::new(1, 0)]);
    assert_eq!(index.len(), 1);

    let moved = index
        .shapes_of(merged)
        .expect("merged")
        .iter()
        .map(|shape| shape.id)
        .collect::<Vec<_>>();
    let (restored, _) = split(&mut index, merged, &moved).expect("split");
    let planes = index
        .shapes_of(restored)
        .expect("restored")
        .iter()
        .map(|shape| shape.coord)
        .collect::<Vec<_>>();
    assert_eq!(planes, vec![Coord3D::new(0, 0), Coord3D::new(1, 0)]);
}

#[test]
fn scenario_c_overlapping_merge_changes_nothing() {
    let mut index = RoiComponent::default();
    let first = index
        .create_roi(rectangle(), Coord3D::new(0, 0), IdPolicy::ClientSide)
        .expect("first");
    let second = index
        .create_roi(Geometry::point(2.0, 2.0), Coord3D::new(0, 0), IdPolicy::ClientSide)
        .expect("second");
    let shapes = [
        shape_id(&index, first, Coord3D::new(0, 0)),
        shape_id(&index, second, Coord3D::new(0, 0)),
    ];
    let snapshot = index.clone();

    let error = merge(&mut index, &shapes).expect_err("overlap");
    assert!(matches!(error, IndexError::OverlappingPlanes { .. }));
    assert_eq!(index, snapshot);
}

#[test]
fn statistics_of_one_to_four() {
    let values = aggregate(&[1.0, 2.0, 3.0, 4.0], false).expect("aggregate");
    assert_eq!((values.min, values.max, values.sum, values.mean), (1.0, 4.0, 10.0, 2.5));
    assert!((values.stddev - 1.25_f64.sqrt()).abs() < 1e-12);
}

fn image() -> Arc<PlaneStack> {
    Arc::new(PlaneStack::from_fn((1, 1, 1, 8, 8), |(_, _, _, y, x)| (y * 8 + x) as f32))
}

#[test]
fn scenario_d_statistics_refused_while_loading() {
    let mut session = Session::new(SessionConfig::default(), image());
    session.finish_loading().expect("ready");
    let roi = session
        .create_roi(rectangle(), Coord3D::new(0, 0))
        .expect("roi");
    let shape = shape_id(session.index(), roi, Coord3D::new(0, 0));
    session.request_statistics(&[shape]).expect("request");
    session.wait_statistics(WAIT).expect("report");
    let cached = session.engine().records().cloned().collect::<Vec<_>>();
    assert_eq!(cached.len(), 1);

    session.begin_loading_rois().expect("loading");
    assert!(matches!(
        session.request_statistics(&[shape]),
        Err(SessionError::IllegalState {
            state: SessionState::LoadingRoi,
            ..
        })
    ));
    assert_eq!(
        session.engine().records().cloned().collect::<Vec<_>>(),
        cached
    );
}

/// Blocks sampling until released; every call reports its own ordinal.
#[derive(Default)]
struct Latch {
    state: Mutex<(bool, usize)>,
    released: Condvar,
}

impl Latch {
    fn release(&self) {
        self.state.lock().0 = true;
        self.released.notify_all();
    }
}

impl PixelSampler for Latch {
    fn sample(&self, _shape: &RoiShape, channels: &[usize]) -> SampleResult<ChannelSamples> {
        let mut state = self.state.lock();
        while !state.0 {
            self.released.wait(&mut state);
        }
        state.1 += 1;
        let value = state.1 as f64;
        Ok(channels.iter().map(|channel| (*channel, vec![value])).collect())
    }
}

#[test]
fn scenario_e_cancelled_request_leaves_newer_result() {
    let latch = Arc::new(Latch::default());
    let mut session = Session::new(SessionConfig::default(), latch.clone());
    session.finish_loading().expect("ready");
    let roi = session
        .create_roi(rectangle(), Coord3D::new(0, 0))
        .expect("roi");
    let shape = shape_id(session.index(), roi, Coord3D::new(0, 0));

    let first = session.request_statistics(&[shape]).expect("first");
    session.cancel_statistics().expect("cancel");
    assert_eq!(session.state(), SessionState::Ready);
    let second = session.request_statistics(&[shape]).expect("second");
    latch.release();

    let report = session.wait_statistics(WAIT).expect("report");
    assert_eq!(report.request, second);
    let record = session.engine().record(shape, 0).expect("record");
    assert_eq!(record.request, second);
    assert!(record.request > first);
    assert_eq!(session.engine().len(), 1);
}
