use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::config::SessionConfig;
use crate::events::{CoreEvent, EventLog};
use crate::index::IndexError;
use crate::model::{Coord3D, Geometry, Point2, RoiId, RoiShape};
use crate::persistence::{RoiRecord, ShapeRecord};
use crate::sampling::{ChannelSamples, PixelSampler, PlaneStack};
use crate::stats::{ChannelInfo, RequestId};

use super::{Session, SessionError, SessionState, StateMachine, StatisticsReport};

const WAIT: Duration = Duration::from_secs(10);

/// Sampler that blocks every call until opened, then reports `[1, 2]`.
#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }
}

impl PixelSampler for Gate {
    fn sample(
        &self,
        _shape: &RoiShape,
        channels: &[usize],
    ) -> crate::sampling::Result<ChannelSamples> {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
        Ok(channels
            .iter()
            .map(|channel| (*channel, vec![1.0, 2.0]))
            .collect())
    }
}

/// One timepoint, two sections, two channels of 4x4 pixels.
fn stack() -> Arc<PlaneStack> {
    Arc::new(PlaneStack::from_fn((1, 2, 2, 4, 4), |(_, z, c, y, x)| {
        (z * 1000 + c * 100 + y * 10 + x) as f32
    }))
}

fn config() -> SessionConfig {
    SessionConfig {
        active_channels: vec![0, 1],
        channels: vec![
            ChannelInfo::new(0, "DAPI", 0.0, 255.0),
            ChannelInfo::new(1, "GFP", 10.0, 4095.0),
        ],
        ..SessionConfig::default()
    }
}

fn ready(sampler: Arc<dyn PixelSampler>) -> (Session, EventLog) {
    let mut session = Session::new(config(), sampler);
    let log = EventLog::new();
    session.subscribe(log.clone());
    session.finish_loading().expect("ready");
    log.take();
    (session, log)
}

fn square_roi(session: &mut Session) -> (RoiId, crate::model::ShapeId) {
    let roi = session
        .create_roi(Geometry::rectangle(0.0, 0.0, 2.0, 2.0), Coord3D::new(0, 0))
        .expect("roi");
    let shape = session
        .index()
        .get_shape(roi, Coord3D::new(0, 0))
        .expect("shape")
        .id;
    (roi, shape)
}

#[test]
fn state_machine_resumes_after_adjusting() {
    let mut machine = StateMachine::new();
    machine.transition(SessionState::Ready).expect("ready");
    machine.begin_adjusting().expect("adjust");
    assert_eq!(machine.resume_target(), Some(SessionState::Ready));
    assert_eq!(machine.end_adjusting().expect("resume"), SessionState::Ready);

    assert!(matches!(
        machine.transition(SessionState::New),
        Err(SessionError::InvalidTransition { .. })
    ));
    machine.transition(SessionState::Discarded).expect("discard");
    assert!(!SessionState::Discarded.can_move_to(SessionState::Ready));
}

#[test]
fn edits_wait_for_ready() {
    let mut session = Session::new(config(), stack());
    let error = session
        .create_roi(Geometry::point(1.0, 1.0), Coord3D::new(0, 0))
        .expect_err("new session");
    assert!(error.is_illegal_state());
    session.begin_loading_rois().expect("loading");
    assert!(
        session
            .create_roi(Geometry::point(1.0, 1.0), Coord3D::new(0, 0))
            .expect_err("loading")
            .is_illegal_state()
    );
    assert!(session.index().is_empty());
}

#[test]
fn loading_publishes_lifecycle_events() {
    let mut session = Session::new(config(), stack());
    let log = EventLog::new();
    session.subscribe(log.clone());
    session.begin_loading_data().expect("data");
    session.begin_loading_rois().expect("rois");
    let loaded = session
        .load_records(vec![RoiRecord {
            id: RoiId(11),
            owner_id: Some(2),
            client_side: false,
            deletable: true,
            namespace: None,
            folders: Vec::new(),
            shapes: vec![ShapeRecord {
                coord: Coord3D::new(1, 0),
                geometry: Geometry::point(2.0, 2.0),
                annotations: Default::default(),
            }],
        }])
        .expect("load");
    session.finish_loading().expect("finish");

    assert_eq!(loaded, vec![RoiId(11)]);
    assert_eq!(
        log.events(),
        vec![
            CoreEvent::StateChanged {
                from: SessionState::New,
                to: SessionState::LoadingData
            },
            CoreEvent::StateChanged {
                from: SessionState::LoadingData,
                to: SessionState::LoadingRoi
            },
            CoreEvent::IndexLoaded {
                rois: vec![RoiId(11)]
            },
            CoreEvent::StateChanged {
                from: SessionState::LoadingRoi,
                to: SessionState::Ready
            },
        ]
    );
}

#[test]
fn statistics_flow_through_the_worker() {
    let (mut session, log) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    let request = session.request_statistics(&[shape]).expect("request");
    assert_eq!(session.state(), SessionState::AnalyseShape);

    let report = session.wait_statistics(WAIT).expect("report");
    assert_eq!(report.request, request);
    assert_eq!(report.records.len(), 2);
    assert_eq!(session.state(), SessionState::Ready);
    let dapi = session.engine().record(shape, 0).expect("channel 0");
    assert_eq!(dapi.values.mean, 5.5);
    assert_eq!(dapi.values.pixel_count, 4);
    assert_eq!(session.engine().record(shape, 1).expect("channel 1").values.min, 100.0);
    assert!(
        log.events()
            .iter()
            .any(|event| matches!(event, CoreEvent::StatisticsUpdated { .. }))
    );
    assert_eq!(session.result_rows().len(), 2);
}

#[test]
fn unbounded_wait_still_delivers_the_report() {
    let (mut session, _) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    let request = session.request_statistics(&[shape]).expect("request");
    let report = session.wait_statistics(Duration::MAX).expect("report");
    assert_eq!(report.request, request);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn edits_drop_cached_statistics() {
    let (mut session, log) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    session.request_statistics(&[shape]).expect("request");
    session.wait_statistics(WAIT).expect("report");
    log.take();

    session
        .update_geometry(shape, Geometry::rectangle(1.0, 1.0, 1.0, 1.0))
        .expect("edit");
    assert!(session.engine().records_for(shape).is_empty());
    assert!(log.events().contains(&CoreEvent::StatisticsInvalidated {
        shapes: vec![shape]
    }));
}

#[test]
fn statistics_refused_while_loading_rois() {
    let (mut session, _log) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    session.request_statistics(&[shape]).expect("request");
    session.wait_statistics(WAIT).expect("report");
    let cached = session.engine().records().cloned().collect::<Vec<_>>();

    session.begin_loading_rois().expect("loading");
    let error = session.request_statistics(&[shape]).expect_err("loading");
    assert!(matches!(
        error,
        SessionError::IllegalState {
            state: SessionState::LoadingRoi,
            ..
        }
    ));
    assert_eq!(session.engine().records().cloned().collect::<Vec<_>>(), cached);
    assert_eq!(session.outstanding_request(), None);
}

#[test]
fn cancelled_request_never_overwrites_the_next_one() {
    let gate = Arc::new(Gate::default());
    let (mut session, _log) = ready(gate.clone());
    let (_, shape) = square_roi(&mut session);

    let first = session.request_statistics(&[shape]).expect("first");
    assert_eq!(session.cancel_statistics().expect("cancel"), Some(first));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.engine().is_empty());

    let second = session.request_statistics(&[shape]).expect("second");
    assert!(second > first);
    gate.open();
    let report = session.wait_statistics(WAIT).expect("report");
    assert_eq!(report.request, second);
    for channel in [0, 1] {
        let record = session.engine().record(shape, channel).expect("record");
        assert_eq!(record.request, second);
    }
    assert!(session.poll_statistics().expect("poll").is_none());
}

#[test]
fn new_request_replaces_the_outstanding_one() {
    let gate = Arc::new(Gate::default());
    let (mut session, _log) = ready(gate.clone());
    let (_, shape) = square_roi(&mut session);

    let first = session.request_statistics(&[shape]).expect("first");
    let second = session.request_statistics(&[shape]).expect("second");
    assert_ne!(first, second);
    assert_eq!(session.outstanding_request(), Some(second));
    gate.open();
    assert_eq!(session.wait_statistics(WAIT).expect("report").request, second);
}

#[test]
fn stale_reports_are_discarded() {
    let (mut session, log) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    let mut stale = StatisticsReport::new(RequestId(42));
    stale.records = crate::stats::summarize(
        shape,
        &Geometry::point(0.0, 0.0),
        RequestId(42),
        &BTreeMap::from([(0, vec![9.0])]),
    );
    log.take();
    assert!(session.accept(stale).is_none());
    assert!(session.engine().is_empty());
    assert!(log.is_empty());
}

#[test]
fn sampler_failures_leave_no_record() {
    let (mut session, log) = ready(stack());
    let roi = session
        .create_roi(Geometry::rectangle(0.0, 0.0, 2.0, 2.0), Coord3D::new(5, 0))
        .expect("roi");
    let shape = session
        .index()
        .get_shape(roi, Coord3D::new(5, 0))
        .expect("shape")
        .id;
    session.request_statistics(&[shape]).expect("request");
    let report = session.wait_statistics(WAIT).expect("report");
    assert!(report.records.is_empty());
    assert_eq!(report.unavailable.len(), 1);
    assert_eq!(report.unavailable[0].shape, shape);
    assert_eq!(session.state(), SessionState::Ready);
    assert!(
        log.events()
            .iter()
            .any(|event| matches!(event, CoreEvent::StatisticsUnavailable { .. }))
    );
}

#[test]
fn profiles_can_be_dropped() {
    let mut config = config();
    config.retain_profiles = false;
    let mut session = Session::new(config, stack());
    session.finish_loading().expect("ready");
    let line = Geometry::line(Point2::new(0.5, 0.5), Point2::new(3.5, 0.5));
    let roi = session.create_roi(line, Coord3D::new(0, 0)).expect("roi");
    let shape = session.index().shapes_of(roi).expect("shapes")[0].id;
    session.request_statistics(&[shape]).expect("request");
    session.wait_statistics(WAIT).expect("report");
    let record = session.engine().record(shape, 0).expect("record");
    assert_eq!(record.values.pixel_count, 4);
    assert!(record.values.ordered_samples.is_empty());
}

#[test]
fn save_cycle_exports_records() {
    let (mut session, _log) = ready(stack());
    square_roi(&mut session);
    assert!(session.export_records().expect_err("ready").is_illegal_state());
    session.begin_save().expect("save");
    let records = session.export_records().expect("export");
    assert_eq!(records.len(), 1);
    assert!(records[0].client_side);
    session.finish_save().expect("done");
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn analysis_finishing_during_adjustment_resumes_ready() {
    let gate = Arc::new(Gate::default());
    let (mut session, _log) = ready(gate.clone());
    let (_, shape) = square_roi(&mut session);
    session.request_statistics(&[shape]).expect("request");
    session.begin_adjusting().expect("adjust");
    gate.open();
    session.wait_statistics(WAIT).expect("report");
    assert_eq!(session.state(), SessionState::ValueAdjusting);
    session.end_adjusting().expect("resume");
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn channel_change_keeps_active_records() {
    let (mut session, log) = ready(stack());
    let (_, shape) = square_roi(&mut session);
    session.request_statistics(&[shape]).expect("request");
    session.wait_statistics(WAIT).expect("report");
    assert_eq!(session.global_bounds(), Some((0.0, 4095.0)));

    assert_eq!(session.set_active_channels(&[0]).expect("channels"), 1);
    assert!(session.engine().record(shape, 0).is_some());
    assert!(session.engine().record(shape, 1).is_none());
    assert_eq!(session.global_bounds(), Some((0.0, 255.0)));
    assert!(
        log.events()
            .contains(&CoreEvent::ChannelsChanged { active: vec![0] })
    );
}

#[test]
fn discarded_session_is_terminal() {
    let (mut session, _log) = ready(stack());
    square_roi(&mut session);
    session.discard().expect("discard");
    assert!(session.index().is_empty());
    assert!(
        session
            .create_roi(Geometry::point(0.0, 0.0), Coord3D::new(0, 0))
            .expect_err("discarded")
            .is_illegal_state()
    );
    assert!(session.begin_loading_data().is_err());
    assert!(matches!(
        session.discard(),
        Err(SessionError::InvalidTransition { .. })
    ));
}

#[test]
fn empty_or_unknown_selection_is_rejected() {
    let (mut session, _log) = ready(stack());
    assert!(matches!(
        session.request_statistics(&[]),
        Err(SessionError::Index(IndexError::EmptySelection))
    ));
    assert!(matches!(
        session.request_statistics(&[crate::model::ShapeId(77)]),
        Err(SessionError::Index(IndexError::ShapeNotFound(_)))
    ));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(matches!(
        session.wait_statistics(WAIT),
        Err(SessionError::NoRequest)
    ));
}
