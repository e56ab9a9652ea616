//! Per-frame state and statistics

use std::collections::HashSet;

use crate::foundation::math::Mat4;
use crate::gpu::ProgramId;
use crate::lighting::ViewSpaceLights;

/// Where the engine is in the frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Between frames; only `begin_frame` is accepted
    Idle,
    /// Inside a frame; passes and nodes may be rendered
    Recording,
}

/// Counters collected over one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 0
    pub frame_index: u64,
    /// Node visits over all passes
    pub nodes_visited: usize,
    /// Successful draws
    pub nodes_drawn: usize,
    /// Visits without a technique or render module for the pass
    pub nodes_skipped: usize,
    /// Draws the backend rejected
    pub draw_failures: usize,
    /// Compute dispatches (the overlay blend)
    pub compute_dispatches: usize,
    /// Light uploads (one per lit program)
    pub light_uploads: usize,
    /// Resources freed at frame start
    pub resources_released: usize,
    /// Active point lights that did not fit
    pub truncated_point_lights: usize,
    /// Active spot lights that did not fit
    pub truncated_spot_lights: usize,
}

/// State that only exists while a frame is recording
#[derive(Debug)]
pub(crate) struct FrameState {
    pub(crate) view: Mat4,
    pub(crate) projection: Mat4,
    pub(crate) lights: ViewSpaceLights,
    pub(crate) lit_programs: HashSet<ProgramId>,
    pub(crate) stats: FrameStats,
}

impl FrameState {
    pub(crate) fn new(view: Mat4, projection: Mat4, lights: ViewSpaceLights, stats: FrameStats) -> Self {
        Self {
            view,
            projection,
            lights,
            lit_programs: HashSet::new(),
            stats,
        }
    }
}
