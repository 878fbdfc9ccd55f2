//! Renderer without a display: runs the force layout, tracks the camera and
//! records every camera command.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::camera::{BoundingBox3D, Camera3D};
use crate::config::LayoutConfig;
use crate::graph_state::{GraphViewState, Position, PositionWriter};
use crate::host::Renderer;
use crate::layout::{ForceLayout, LayoutSignals};

/// Padding around the graph when fitting everything
const FIT_PADDING: f32 = 10.0;

/// A camera command issued during playback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraCommand {
    MoveTo {
        position: Position,
        look_at: Position,
        transition_ms: u64,
    },
    FitAll {
        transition_ms: u64,
    },
}

struct RunningLayout {
    handle: JoinHandle<()>,
    signals: LayoutSignals,
}

#[derive(Default)]
struct HeadlessState {
    view: Option<GraphViewState>,
    layout: Option<RunningLayout>,
    camera: Camera3D,
    commands: Vec<CameraCommand>,
    frames: u64,
}

/// Headless [`Renderer`] backed by [`ForceLayout`]
pub struct HeadlessRenderer {
    layout_config: LayoutConfig,
    state: Mutex<HeadlessState>,
}

impl HeadlessRenderer {
    pub fn new(layout_config: LayoutConfig) -> Self {
        Self {
            layout_config,
            state: Mutex::new(HeadlessState::default()),
        }
    }

    pub fn commands(&self) -> Vec<CameraCommand> {
        self.state.lock().commands.clone()
    }

    /// Number of repaints requested so far
    pub fn frames(&self) -> u64 {
        self.state.lock().frames
    }

    pub fn camera(&self) -> Camera3D {
        self.state.lock().camera.clone()
    }
}

impl Renderer for HeadlessRenderer {
    /// Must be called inside a tokio runtime when the graph is non-empty.
    fn bind(&self, view: GraphViewState, positions: PositionWriter) {
        let mut state = self.state.lock();
        if let Some(old) = state.layout.take() {
            old.handle.abort();
        }

        if !view.is_empty() {
            let signals = LayoutSignals::new();
            let layout = ForceLayout::new(&view, self.layout_config.clone());
            let handle = layout.spawn(positions, signals.clone());
            state.layout = Some(RunningLayout { handle, signals });
            debug!(nodes = view.len(), "layout started");
        }
        state.view = Some(view);
        state.camera = Camera3D::new();
    }

    fn refresh(&self) {
        let mut state = self.state.lock();
        state.frames += 1;

        // An idle engine with nothing placed has stalled; kick it
        if let (Some(view), Some(layout)) = (&state.view, &state.layout) {
            if layout.signals.is_idle() && view.positioned_count() == 0 {
                debug!("layout idle with no positions, reheating");
                layout.signals.request_reheat();
            }
        }
    }

    fn camera_position(&self, position: Position, look_at: Position, transition: Duration) {
        let mut state = self.state.lock();
        state.camera.move_to(position, look_at);
        info!(?position, ?look_at, "camera move");
        state.commands.push(CameraCommand::MoveTo {
            position,
            look_at,
            transition_ms: transition.as_millis() as u64,
        });
    }

    fn zoom_to_fit(&self, transition: Duration) {
        let mut state = self.state.lock();
        let points = state
            .view
            .as_ref()
            .map(GraphViewState::all_laid_out)
            .unwrap_or_default();
        let bounds = BoundingBox3D::from_points(&points);
        state.camera.fit_to_bounds(&bounds, FIT_PADDING);
        info!(positioned = points.len(), "camera fit all");
        state.commands.push(CameraCommand::FitAll {
            transition_ms: transition.as_millis() as u64,
        });
    }

    fn is_layout_idle(&self) -> bool {
        self.state
            .lock()
            .layout
            .as_ref()
            .is_none_or(|layout| layout.signals.is_idle())
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        if let Some(layout) = self.state.get_mut().layout.take() {
            layout.handle.abort();
        }
    }
}
