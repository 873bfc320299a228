use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::events::{CoreEvent, PresentationSink};
use crate::index::{IdPolicy, IndexError, PlaneEdit, RoiComponent};
use crate::model::{Coord3D, Geometry, Roi, RoiId, ShapeAnnotations, ShapeId};
use crate::persistence::{RoiRecord, export_records, import_records};
use crate::planes;
use crate::sampling::PixelSampler;
use crate::stats::{ChannelInfo, RequestId, ResultRow, StatisticsEngine, result_rows};

use super::worker::{self, StatisticsJob};
use super::{Result, SessionError, SessionState, StateMachine, StatisticsReport};

use SessionState::{AnalyseShape, LoadingData, LoadingRoi, New, Ready, SavingRoi, ValueAdjusting};

struct Outstanding {
    request: RequestId,
    cancel: Arc<AtomicBool>,
}

/// Owns the ROI index and statistics cache of one image and gates every
/// operation on the session state.
///
/// Mutations run synchronously on the caller's thread. Statistics requests
/// run on a worker thread and are collected with [`Session::poll_statistics`]
/// or [`Session::wait_statistics`]; at most one request is outstanding and a
/// report from any other request is discarded on arrival.
pub struct Session {
    index: RoiComponent,
    engine: StatisticsEngine,
    machine: StateMachine,
    config: SessionConfig,
    sampler: Arc<dyn PixelSampler>,
    sinks: Vec<Box<dyn PresentationSink>>,
    generation: u64,
    outstanding: Option<Outstanding>,
    sender: Sender<StatisticsReport>,
    reports: Receiver<StatisticsReport>,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("state", &self.machine.state())
            .field("rois", &self.index.len())
            .field("records", &self.engine.len())
            .field("generation", &self.generation)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Session {
    pub fn new(config: SessionConfig, sampler: Arc<dyn PixelSampler>) -> Self {
        let (sender, reports) = mpsc::channel();
        Self {
            index: RoiComponent::new(config.namespace.clone()),
            engine: StatisticsEngine::new(config.active_channels.iter().copied()),
            machine: StateMachine::new(),
            config,
            sampler,
            sinks: Vec::new(),
            generation: 0,
            outstanding: None,
            sender,
            reports,
        }
    }

    pub fn subscribe(&mut self, sink: impl PresentationSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn index(&self) -> &RoiComponent {
        &self.index
    }

    pub fn engine(&self) -> &StatisticsEngine {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn channels(&self) -> &[ChannelInfo] {
        &self.config.channels
    }

    pub fn outstanding_request(&self) -> Option<RequestId> {
        self.outstanding.as_ref().map(|outstanding| outstanding.request)
    }

    fn publish(&self, event: CoreEvent) {
        for sink in &self.sinks {
            sink.publish(&event);
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        let from = self.machine.transition(next)?;
        info!(%from, to = %next, "session state changed");
        self.publish(CoreEvent::StateChanged { from, to: next });
        Ok(())
    }

    fn require_ready(&self, operation: &'static str) -> Result<()> {
        self.machine.require(operation, &[Ready])
    }

    /// Drops statistics of every shape the edit touched and tells the sinks.
    fn commit(&mut self, edit: &PlaneEdit) {
        if edit.is_empty() && edit.touched_rois.is_empty() {
            return;
        }
        let stale = edit.stale_shapes().collect::<Vec<_>>();
        let dropped = self.engine.invalidate(stale.iter().copied());
        self.publish(CoreEvent::RoisChanged {
            touched: edit.touched_rois.iter().copied().collect(),
            deleted: edit.deleted_rois.iter().copied().collect(),
        });
        self.publish(CoreEvent::ShapesChanged {
            written: edit.written.clone(),
            removed: edit.removed.clone(),
            moved: edit.moved.clone(),
        });
        if dropped > 0 {
            self.publish(CoreEvent::StatisticsInvalidated { shapes: stale });
        }
    }

    pub fn create_roi(&mut self, geometry: Geometry, coord: Coord3D) -> Result<RoiId> {
        self.require_ready("create_roi")?;
        let id = self
            .index
            .create_roi(geometry, coord, IdPolicy::ClientSide)?;
        let mut edit = PlaneEdit::for_target(id);
        edit.written
            .extend(self.index.roi(id).into_iter().flat_map(Roi::shape_ids));
        self.commit(&edit);
        Ok(id)
    }

    pub fn add_shape(&mut self, roi: RoiId, geometry: Geometry, coord: Coord3D) -> Result<ShapeId> {
        self.require_ready("add_shape")?;
        let shape = self.index.add_shape(roi, geometry, coord)?;
        let mut edit = PlaneEdit::for_target(roi);
        edit.written.push(shape);
        self.commit(&edit);
        Ok(shape)
    }

    pub fn delete_roi(&mut self, roi: RoiId) -> Result<PlaneEdit> {
        self.require_ready("delete_roi")?;
        let edit = self.index.delete_roi(roi)?;
        self.commit(&edit);
        Ok(edit)
    }

    pub fn delete_shape(&mut self, roi: RoiId, coord: Coord3D) -> Result<PlaneEdit> {
        self.require_ready("delete_shape")?;
        let edit = self.index.delete_shape(roi, coord)?;
        self.commit(&edit);
        Ok(edit)
    }

    pub fn update_geometry(&mut self, shape: ShapeId, geometry: Geometry) -> Result<PlaneEdit> {
        self.require_ready("update_geometry")?;
        let edit = self.index.update_geometry(shape, geometry)?;
        self.commit(&edit);
        Ok(edit)
    }

    /// Replaces a shape's annotations. Cached statistics stay valid.
    pub fn set_annotations(&mut self, shape: ShapeId, annotations: ShapeAnnotations) -> Result<()> {
        self.require_ready("set_annotations")?;
        self.index.set_annotations(shape, annotations)?;
        if let Some(roi) = self.index.shape(shape).map(|shape| shape.roi) {
            self.publish(CoreEvent::RoisChanged {
                touched: vec![roi],
                deleted: Vec::new(),
            });
        }
        Ok(())
    }

    pub fn propagate(&mut self, shape: ShapeId, from: Coord3D, to: Coord3D) -> Result<PlaneEdit> {
        self.require_ready("propagate")?;
        let edit = planes::propagate(&mut self.index, shape, from, to)?;
        self.commit(&edit);
        Ok(edit)
    }

    pub fn delete_range(&mut self, shape: ShapeId, from: Coord3D, to: Coord3D) -> Result<PlaneEdit> {
        self.require_ready("delete_range")?;
        let edit = planes::delete_range(&mut self.index, shape, from, to)?;
        self.commit(&edit);
        Ok(edit)
    }

    pub fn merge(&mut self, shapes: &[ShapeId]) -> Result<(RoiId, PlaneEdit)> {
        self.require_ready("merge")?;
        let (target, edit) = planes::merge(&mut self.index, shapes)?;
        self.commit(&edit);
        Ok((target, edit))
    }

    pub fn split(&mut self, roi: RoiId, shapes: &[ShapeId]) -> Result<(RoiId, PlaneEdit)> {
        self.require_ready("split")?;
        let (target, edit) = planes::split(&mut self.index, roi, shapes)?;
        self.commit(&edit);
        Ok((target, edit))
    }

    pub fn duplicate(&mut self, roi: RoiId, shapes: &[ShapeId]) -> Result<(RoiId, PlaneEdit)> {
        self.require_ready("duplicate")?;
        let (target, edit) = planes::duplicate(&mut self.index, roi, shapes)?;
        self.commit(&edit);
        Ok((target, edit))
    }

    /// Starts sampling and aggregating `shapes` on the active channels.
    ///
    /// Legal in `Ready` and `AnalyseShape`; a request made while another is
    /// outstanding cancels the older one first. The shapes are snapshotted, so
    /// the worker never observes later edits.
    pub fn request_statistics(&mut self, shapes: &[ShapeId]) -> Result<RequestId> {
        self.machine
            .require("request_statistics", &[Ready, AnalyseShape])?;
        if shapes.is_empty() {
            return Err(IndexError::EmptySelection.into());
        }
        let snapshot = shapes
            .iter()
            .map(|id| {
                self.index
                    .shape(*id)
                    .cloned()
                    .ok_or(IndexError::ShapeNotFound(*id))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if self.state() == AnalyseShape {
            self.cancel_statistics()?;
        }

        self.generation += 1;
        let request = RequestId(self.generation);
        let cancel = Arc::new(AtomicBool::new(false));
        worker::spawn(
            StatisticsJob {
                request,
                shapes: snapshot,
                channels: self.engine.active_channels(),
                retain_profiles: self.config.retain_profiles,
                cancel: Arc::clone(&cancel),
                sampler: Arc::clone(&self.sampler),
            },
            self.sender.clone(),
        )?;
        self.outstanding = Some(Outstanding { request, cancel });
        info!(%request, shapes = shapes.len(), "statistics requested");
        self.transition(AnalyseShape)?;
        Ok(request)
    }

    /// Drops the outstanding request, if any, and returns to `Ready`. The
    /// statistics cache is left as it was.
    pub fn cancel_statistics(&mut self) -> Result<Option<RequestId>> {
        match self.state() {
            AnalyseShape => {}
            Ready => return Ok(None),
            state => {
                return Err(SessionError::IllegalState {
                    operation: "cancel_statistics",
                    state,
                });
            }
        }
        let cancelled = self.outstanding.take().map(|outstanding| {
            outstanding.cancel.store(true, Ordering::SeqCst);
            outstanding.request
        });
        if let Some(request) = cancelled {
            info!(%request, "statistics request cancelled");
        }
        self.transition(Ready)?;
        Ok(cancelled)
    }

    /// Handles every report that already arrived. Returns the report of the
    /// outstanding request once it is in.
    pub fn poll_statistics(&mut self) -> Result<Option<StatisticsReport>> {
        while let Ok(report) = self.reports.try_recv() {
            if let Some(accepted) = self.accept(report) {
                return Ok(Some(accepted));
            }
        }
        Ok(None)
    }

    /// Blocks until the outstanding request reports or `timeout` elapses.
    pub fn wait_statistics(&mut self, timeout: Duration) -> Result<StatisticsReport> {
        let request = self.outstanding_request().ok_or(SessionError::NoRequest)?;
        // A timeout past the clock's range waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let received = match deadline {
                Some(deadline) => self
                    .reports
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self.reports.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(report) => {
                    if let Some(accepted) = self.accept(report) {
                        return Ok(accepted);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return Err(SessionError::Timeout(request));
                }
            }
        }
    }

    /// Ingests the report of the outstanding request; anything else is stale.
    pub(super) fn accept(&mut self, report: StatisticsReport) -> Option<StatisticsReport> {
        if self.outstanding_request() != Some(report.request) {
            warn!(request = %report.request, "discarded stale statistics");
            return None;
        }
        self.outstanding = None;
        let stored = self.engine.store(report.records);
        for missing in &report.unavailable {
            self.publish(CoreEvent::StatisticsUnavailable {
                request: report.request,
                shape: missing.shape,
                reason: missing.reason.clone(),
            });
        }
        if !stored.is_empty() {
            self.publish(CoreEvent::StatisticsUpdated {
                request: report.request,
                records: stored.clone(),
            });
        }
        if let Some((from, to)) = self.machine.settle_analysis() {
            info!(%from, %to, "session state changed");
            self.publish(CoreEvent::StateChanged { from, to });
        }
        Some(StatisticsReport {
            request: report.request,
            records: stored,
            unavailable: report.unavailable,
        })
    }

    pub fn begin_loading_data(&mut self) -> Result<()> {
        self.machine.require("begin_loading_data", &[New, Ready])?;
        self.transition(LoadingData)
    }

    pub fn begin_loading_rois(&mut self) -> Result<()> {
        self.machine
            .require("begin_loading_rois", &[New, LoadingData, Ready])?;
        self.transition(LoadingRoi)
    }

    /// Adds persisted ROIs to the index; all or nothing.
    pub fn load_records(&mut self, records: Vec<RoiRecord>) -> Result<Vec<RoiId>> {
        self.machine.require("load_records", &[LoadingRoi])?;
        let rois = import_records(&mut self.index, records)?;
        info!(rois = rois.len(), "loaded ROI records");
        self.publish(CoreEvent::IndexLoaded { rois: rois.clone() });
        Ok(rois)
    }

    pub fn finish_loading(&mut self) -> Result<()> {
        self.machine
            .require("finish_loading", &[New, LoadingData, LoadingRoi])?;
        self.transition(Ready)
    }

    /// Drops every ROI and cached statistic. Id counters keep running.
    pub fn reset(&mut self) -> Result<()> {
        self.machine.require("reset", &[Ready, LoadingRoi])?;
        self.index.reset();
        self.engine.clear();
        self.publish(CoreEvent::IndexReset);
        Ok(())
    }

    /// Enters `SavingRoi`, cancelling a running analysis first.
    pub fn begin_save(&mut self) -> Result<()> {
        self.machine.require("begin_save", &[Ready, AnalyseShape])?;
        if self.state() == AnalyseShape {
            self.cancel_statistics()?;
        }
        self.transition(SavingRoi)
    }

    pub fn export_records(&self) -> Result<Vec<RoiRecord>> {
        self.machine.require("export_records", &[SavingRoi])?;
        Ok(export_records(&self.index))
    }

    pub fn finish_save(&mut self) -> Result<()> {
        self.machine.require("finish_save", &[SavingRoi])?;
        self.transition(Ready)
    }

    pub fn begin_adjusting(&mut self) -> Result<()> {
        let from = self.machine.begin_adjusting()?;
        self.publish(CoreEvent::StateChanged {
            from,
            to: ValueAdjusting,
        });
        Ok(())
    }

    pub fn end_adjusting(&mut self) -> Result<()> {
        let to = self.machine.end_adjusting()?;
        self.publish(CoreEvent::StateChanged {
            from: ValueAdjusting,
            to,
        });
        Ok(())
    }

    /// Ends the session. Nothing can be edited or analysed afterwards.
    pub fn discard(&mut self) -> Result<()> {
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.cancel.store(true, Ordering::SeqCst);
        }
        self.transition(SessionState::Discarded)?;
        self.index.reset();
        self.engine.clear();
        Ok(())
    }

    /// Changes the active channels. Records of channels that stay active are
    /// kept; the shared intensity bounds are recomputed on next use.
    pub fn set_active_channels(&mut self, channels: &[usize]) -> Result<usize> {
        self.machine.require(
            "set_active_channels",
            &[New, LoadingData, LoadingRoi, Ready, AnalyseShape, ValueAdjusting],
        )?;
        let dropped = self.engine.set_active_channels(channels.iter().copied());
        self.config.active_channels = self.engine.active_channels();
        self.publish(CoreEvent::ChannelsChanged {
            active: self.engine.active_channels(),
        });
        Ok(dropped)
    }

    /// Shared intensity axis of the active channels.
    pub fn global_bounds(&mut self) -> Option<(f64, f64)> {
        self.engine.global_bounds(&self.config.channels)
    }

    pub fn result_rows(&self) -> Vec<ResultRow> {
        result_rows(&self.index, &self.engine, &self.config.channels)
    }
}
