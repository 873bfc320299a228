use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::model::{Coord3D, FigureKind, RoiId};
use crate::session::Unavailable;
use crate::stats::ResultRow;

#[derive(Debug, Parser)]
#[command(
    name = "roi",
    version,
    about = "Edit multi-plane ROI sets and summarize their intensities"
)]
pub(super) struct Cli {
    /// Session settings (YAML or JSON).
    #[arg(long, global = true)]
    pub(super) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Summarizes the ROIs of a document.
    Info { document: PathBuf },
    /// Loads a document and checks the index invariants.
    Validate { document: PathBuf },
    /// Copies one shape onto every plane between two coordinates.
    Propagate {
        #[command(flatten)]
        target: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Deletes one ROI's shapes between two coordinates.
    DeleteRange {
        #[command(flatten)]
        target: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Moves shapes of any ROIs into one new ROI.
    Merge {
        document: PathBuf,
        /// Shape selector `roi:z,t`; repeat for each shape.
        #[arg(long = "shape", required = true, allow_hyphen_values = true)]
        shapes: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Moves shapes of one ROI into a new ROI.
    Split {
        #[command(flatten)]
        selection: RoiSelection,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Copies shapes of one ROI into a new ROI.
    Duplicate {
        #[command(flatten)]
        selection: RoiSelection,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Computes statistics from pre-recorded samples.
    Stats {
        document: PathBuf,
        #[arg(long)]
        samples: PathBuf,
        /// Restrict to these shapes; all shapes by default.
        #[arg(long = "shape", allow_hyphen_values = true)]
        shapes: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub(super) struct RangeArgs {
    pub(super) document: PathBuf,
    /// Shape selector `roi:z,t`.
    #[arg(long, allow_hyphen_values = true)]
    pub(super) shape: String,
    /// First plane `z,t`.
    #[arg(long)]
    pub(super) from: String,
    /// Last plane `z,t`.
    #[arg(long)]
    pub(super) to: String,
}

#[derive(Debug, Args)]
pub(super) struct RoiSelection {
    pub(super) document: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    pub(super) roi: i64,
    /// Plane `z,t` of a shape of `--roi`; repeat for each shape.
    #[arg(long = "plane", required = true)]
    pub(super) planes: Vec<String>,
}

#[derive(Debug, Args)]
pub(super) struct OutputArgs {
    /// Where to write the edited document; printed to stdout otherwise.
    #[arg(long)]
    pub(super) output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(super) struct DocumentInfo {
    pub(super) image: Option<String>,
    pub(super) rois: usize,
    pub(super) shapes: usize,
    pub(super) entries: Vec<RoiSummary>,
}

#[derive(Debug, Serialize)]
pub(super) struct RoiSummary {
    pub(super) id: RoiId,
    pub(super) client_side: bool,
    pub(super) planes: Vec<Coord3D>,
    pub(super) figures: Vec<FigureKind>,
}

#[derive(Debug, Serialize)]
pub(super) struct EditSummary {
    pub(super) target: Option<RoiId>,
    pub(super) written: usize,
    pub(super) removed: usize,
    pub(super) moved: usize,
    pub(super) deleted_rois: Vec<RoiId>,
    pub(super) output: PathBuf,
}

#[derive(Debug, Serialize)]
pub(super) struct StatsOutput {
    pub(super) rows: Vec<ResultRow>,
    pub(super) unavailable: Vec<Unavailable>,
}
