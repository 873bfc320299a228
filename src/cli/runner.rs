use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::config::{SessionConfig, load_config};
use crate::index::PlaneEdit;
use crate::model::{Coord3D, RoiId, ShapeId, parse_selector};
use crate::persistence::{RoiDocument, load_document, load_sample_table, save_document};
use crate::sampling::{PixelSampler, SampleTable};
use crate::session::Session;

use super::types::{
    Cli, Commands, DocumentInfo, EditSummary, OutputArgs, RangeArgs, RoiSelection, RoiSummary,
    StatsOutput,
};

pub fn run_cli() -> Result<(), String> {
    run(Cli::parse())
}

pub(super) fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => load_config(path).map_err(|error| error.to_string())?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Info { document } => {
            let (session, document) = open(&document, &config, no_samples())?;
            print_json(&describe(&session, document.image))?;
        }
        Commands::Validate { document } => {
            let (session, _) = open(&document, &config, no_samples())?;
            session
                .index()
                .check_invariants()
                .map_err(|error| error.to_string())?;
            println!(
                "{}",
                json!({
                    "status": "ok",
                    "rois": session.index().len(),
                    "shapes": session.index().shape_count(),
                })
            );
        }
        Commands::Propagate { target, output } => {
            let (mut session, document, shape, from, to) = open_range(&target, &config)?;
            let edit = session
                .propagate(shape, from, to)
                .map_err(|error| error.to_string())?;
            finish(session, document, edit, output)?;
        }
        Commands::DeleteRange { target, output } => {
            let (mut session, document, shape, from, to) = open_range(&target, &config)?;
            let edit = session
                .delete_range(shape, from, to)
                .map_err(|error| error.to_string())?;
            finish(session, document, edit, output)?;
        }
        Commands::Merge {
            document,
            shapes,
            output,
        } => {
            let (mut session, document) = open(&document, &config, no_samples())?;
            let shapes = shapes
                .iter()
                .map(|selector| resolve(&session, selector))
                .collect::<Result<Vec<_>, _>>()?;
            let (_, edit) = session.merge(&shapes).map_err(|error| error.to_string())?;
            finish(session, document, edit, output)?;
        }
        Commands::Split { selection, output } => {
            let (mut session, document, roi, shapes) = open_selection(&selection, &config)?;
            let (_, edit) = session
                .split(roi, &shapes)
                .map_err(|error| error.to_string())?;
            finish(session, document, edit, output)?;
        }
        Commands::Duplicate { selection, output } => {
            let (mut session, document, roi, shapes) = open_selection(&selection, &config)?;
            let (_, edit) = session
                .duplicate(roi, &shapes)
                .map_err(|error| error.to_string())?;
            finish(session, document, edit, output)?;
        }
        Commands::Stats {
            document,
            samples,
            shapes,
        } => {
            let table = load_sample_table(&samples).map_err(|error| error.to_string())?;
            let (mut session, _) = open(&document, &config, Arc::new(table))?;
            let shapes = if shapes.is_empty() {
                session
                    .index()
                    .rois()
                    .flat_map(|roi| roi.shape_ids())
                    .collect::<Vec<_>>()
            } else {
                shapes
                    .iter()
                    .map(|selector| resolve(&session, selector))
                    .collect::<Result<Vec<_>, _>>()?
            };
            let unavailable = if shapes.is_empty() {
                Vec::new()
            } else {
                session
                    .request_statistics(&shapes)
                    .map_err(|error| error.to_string())?;
                session
                    .wait_statistics(config.stats_timeout())
                    .map_err(|error| error.to_string())?
                    .unavailable
            };
            print_json(&StatsOutput {
                rows: session.result_rows(),
                unavailable,
            })?;
        }
    }

    Ok(())
}

fn no_samples() -> Arc<dyn PixelSampler> {
    Arc::new(SampleTable::default())
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())?
    );
    Ok(())
}

/// Loads a document into a fresh session; the returned document keeps only
/// its header.
fn open(
    path: &Path,
    config: &SessionConfig,
    sampler: Arc<dyn PixelSampler>,
) -> Result<(Session, RoiDocument), String> {
    let mut document = load_document(path).map_err(|error| error.to_string())?;
    let mut session = Session::new(config.clone(), sampler);
    session
        .begin_loading_rois()
        .map_err(|error| error.to_string())?;
    session
        .load_records(std::mem::take(&mut document.rois))
        .map_err(|error| error.to_string())?;
    session.finish_loading().map_err(|error| error.to_string())?;
    info!(
        path = %path.display(),
        rois = session.index().len(),
        "opened ROI document"
    );
    Ok((session, document))
}

fn open_range(
    target: &RangeArgs,
    config: &SessionConfig,
) -> Result<(Session, RoiDocument, ShapeId, Coord3D, Coord3D), String> {
    let from = Coord3D::parse(&target.from).map_err(|error| error.to_string())?;
    let to = Coord3D::parse(&target.to).map_err(|error| error.to_string())?;
    let (session, document) = open(&target.document, config, no_samples())?;
    let shape = resolve(&session, &target.shape)?;
    Ok((session, document, shape, from, to))
}

fn open_selection(
    selection: &RoiSelection,
    config: &SessionConfig,
) -> Result<(Session, RoiDocument, RoiId, Vec<ShapeId>), String> {
    let roi = RoiId(selection.roi);
    let (session, document) = open(&selection.document, config, no_samples())?;
    let shapes = selection
        .planes
        .iter()
        .map(|plane| {
            let coord = Coord3D::parse(plane).map_err(|error| error.to_string())?;
            shape_at(&session, roi, coord)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((session, document, roi, shapes))
}

fn resolve(session: &Session, selector: &str) -> Result<ShapeId, String> {
    let (roi, coord) = parse_selector(selector).map_err(|error| error.to_string())?;
    shape_at(session, roi, coord)
}

fn shape_at(session: &Session, roi: RoiId, coord: Coord3D) -> Result<ShapeId, String> {
    session
        .index()
        .get_shape(roi, coord)
        .map(|shape| shape.id)
        .ok_or_else(|| format!("{roi} has no shape at {coord}"))
}

fn describe(session: &Session, image: Option<String>) -> DocumentInfo {
    let index = session.index();
    DocumentInfo {
        image,
        rois: index.len(),
        shapes: index.shape_count(),
        entries: index
            .rois()
            .map(|roi| {
                let shapes = roi
                    .shape_ids()
                    .filter_map(|id| index.shape(id))
                    .collect::<Vec<_>>();
                RoiSummary {
                    id: roi.id,
                    client_side: roi.client_side,
                    planes: shapes.iter().map(|shape| shape.coord).collect(),
                    figures: shapes.iter().map(|shape| shape.geometry.kind()).collect(),
                }
            })
            .collect(),
    }
}

/// Saves the edited index, or prints it when no output path was given.
fn finish(
    mut session: Session,
    document: RoiDocument,
    edit: PlaneEdit,
    output: OutputArgs,
) -> Result<(), String> {
    session.begin_save().map_err(|error| error.to_string())?;
    let records = session
        .export_records()
        .map_err(|error| error.to_string())?;
    session.finish_save().map_err(|error| error.to_string())?;
    let edited = RoiDocument::new(document.image, records);

    match output.output {
        Some(path) => {
            save_document(&path, &edited).map_err(|error| error.to_string())?;
            print_json(&summarize_edit(&edit, path))?;
        }
        None => print_json(&edited)?,
    }
    Ok(())
}

fn summarize_edit(edit: &PlaneEdit, output: PathBuf) -> EditSummary {
    EditSummary {
        target: edit.target,
        written: edit.written.len(),
        removed: edit.removed.len(),
        moved: edit.moved.len(),
        deleted_rois: edit.deleted_rois.iter().copied().collect(),
        output,
    }
}
