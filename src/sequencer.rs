//! Shared playback machinery
//!
//! [`Scene`] bundles everything a sequence touches: the loaded graph, the
//! display writer, the renderer, the observer and the pacer.
//! [`AnimationSequencer`] is the capability set both playback strategies
//! build on (color lookup, camera framing with retry, sparkle, reset).

use std::collections::BTreeSet;

use tracing::{debug, info, trace, warn};

use crate::camera::{BoundingBox3D, centroid};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlaybackResult};
use crate::graph_state::{DisplayWriter, GraphViewState, Position};
use crate::host::{PlaybackObserver, Renderer};
use crate::model::{GraphSnapshot, NodeId};
use crate::palette::{self, Color, colors};
use crate::timing::{CancellationToken, Pacer};

/// Loaded graph plus the collaborators a sequence drives
pub struct Scene<R, O> {
    view: GraphViewState,
    display: DisplayWriter,
    renderer: R,
    observer: O,
    pacer: Pacer,
    config: PlaybackConfig,
}

impl<R: Renderer, O: PlaybackObserver> Scene<R, O> {
    /// Create a scene with an empty graph bound to the renderer
    pub fn new(renderer: R, observer: O, config: PlaybackConfig) -> Self {
        let (view, positions, display) = GraphViewState::load(&GraphSnapshot::default());
        renderer.bind(view.clone(), positions);
        let pacer = Pacer::new(config.time_scale, CancellationToken::new());
        Self {
            view,
            display,
            renderer,
            observer,
            pacer,
            config,
        }
    }

    /// Replace the graph wholesale. Display state starts neutral.
    pub fn load(&mut self, snapshot: &GraphSnapshot) {
        let (view, positions, display) = GraphViewState::load(snapshot);
        info!(
            nodes = view.len(),
            links = view.links().len(),
            "graph loaded"
        );
        self.renderer.bind(view.clone(), positions);
        self.view = view;
        self.display = display;
    }

    pub fn view(&self) -> &GraphViewState {
        &self.view
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn into_parts(self) -> (R, O) {
        (self.renderer, self.observer)
    }

    /// Color the given nodes, optionally tagging them with an algorithm.
    /// Ids missing from the graph are skipped. Returns how many were painted.
    pub fn paint<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a NodeId>,
        color: Color,
        algorithm: Option<&str>,
    ) -> usize {
        let indices = self.view.resolve(ids);
        self.display.paint(&indices, color);
        if algorithm.is_some() {
            self.display.tag(&indices, algorithm);
        }
        indices.len()
    }

    /// Publish and display the highlighted set, then repaint
    pub fn highlight(&mut self, ids: &BTreeSet<NodeId>) {
        self.observer.set_highlighted_nodes(ids);
        let indices = self.view.resolve(ids);
        self.display.set_highlighted(&indices);
        self.renderer.refresh();
    }

    /// Clear every published set and return all nodes to neutral.
    ///
    /// Idempotent.
    pub fn reset_visual_state(&mut self) {
        let empty = BTreeSet::new();
        self.observer.set_highlighted_nodes(&empty);
        self.observer.set_current_stage(None);
        self.observer.set_activated_nodes(&empty);
        self.observer.set_current_seed_size(None);
        self.observer.set_seed_nodes(&empty);
        self.display.reset();
        self.renderer.refresh();
    }
}

/// Where the camera should go
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Framing {
    /// Look at `center` from `distance` along +z
    Focus { center: Position, distance: f32 },
    /// Nothing could be positioned; frame the whole graph
    FitAll,
}

/// Framing for a set of laid-out positions.
///
/// The distance never drops below `requested`, and grows with the cluster
/// so the whole cluster stays in view.
pub fn frame_positions(positions: &[Position], requested: f32, spread_scale: f32) -> Option<Framing> {
    let center = centroid(positions)?;
    let spread = BoundingBox3D::from_points(positions).max_extent();
    Some(Framing::Focus {
        center,
        distance: requested.max(spread * spread_scale),
    })
}

/// Why a sequence did not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The run data has no results for this algorithm
    UnknownAlgorithm(String),
    /// None of the saved run's seeds exist in the current graph
    NoValidSeeds,
    /// Replay was requested with no saved run loaded
    NoSavedRun,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownAlgorithm(a) => write!(f, "no results for algorithm `{a}`"),
            SkipReason::NoValidSeeds => f.write_str("no valid seed nodes in current graph"),
            SkipReason::NoSavedRun => f.write_str("no saved run loaded"),
        }
    }
}

/// How a playback request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Skipped(SkipReason),
}

/// Capabilities shared by the live and replay strategies
#[allow(async_fn_in_trait)]
pub trait AnimationSequencer {
    type Renderer: Renderer;
    type Observer: PlaybackObserver;

    fn scene(&self) -> &Scene<Self::Renderer, Self::Observer>;
    fn scene_mut(&mut self) -> &mut Scene<Self::Renderer, Self::Observer>;

    /// Fixed algorithm color, `None` for unknown algorithms
    fn color_for(&self, algorithm: &str) -> Option<Color> {
        palette::color_for(algorithm)
    }

    /// Algorithm color with the neutral color as fallback
    fn display_color(&self, algorithm: &str) -> Color {
        self.color_for(algorithm).unwrap_or(colors::NEUTRAL)
    }

    /// Wait for the layout to position at least one of `ids`, then frame them.
    ///
    /// Positions are polled on the configured retry schedule, with a repaint
    /// nudge at the checkpoint attempt. If nothing is ever positioned the
    /// result is [`Framing::FitAll`]; the only error is cancellation.
    async fn compute_framing(&self, ids: &[NodeId], distance: f32) -> PlaybackResult<Framing> {
        let scene = self.scene();
        let framing = &scene.config.framing;
        let indices = scene.view.resolve(ids);

        for attempt in 1..=framing.max_attempts {
            let wait = if attempt == 1 {
                framing.first_attempt_ms
            } else {
                framing.retry_ms
            };
            scene.pacer.pause(wait).await?;

            let positions = scene.view.laid_out_positions(&indices);
            if let Some(found) = frame_positions(&positions, distance, framing.spread_scale) {
                debug!(attempt, positioned = positions.len(), "framing resolved");
                return Ok(found);
            }
            if attempt == framing.refresh_attempt && attempt < framing.max_attempts {
                debug!(attempt, "no positioned nodes yet, refreshing renderer");
                scene.renderer.refresh();
            }
        }

        warn!(
            requested = ids.len(),
            attempts = framing.max_attempts,
            "no positioned nodes to frame, fitting whole graph"
        );
        Ok(Framing::FitAll)
    }

    /// Issue the camera command for a framing
    fn apply_framing(&self, framing: Framing) {
        let scene = self.scene();
        let timing = &scene.config.framing;
        match framing {
            Framing::Focus { center, distance } => {
                let eye = [center[0], center[1], center[2] + distance];
                scene
                    .renderer
                    .camera_position(eye, center, scene.pacer.duration(timing.transition_ms));
            }
            Framing::FitAll => {
                scene
                    .renderer
                    .zoom_to_fit(scene.pacer.duration(timing.fit_all_transition_ms));
            }
        }
    }

    /// Frame `ids` while the settle interval runs.
    ///
    /// The camera moves as soon as framing resolves; this returns once both
    /// the settle interval has elapsed and framing has resolved.
    async fn frame_nodes(&self, ids: &[NodeId], distance: f32, settle_ms: u64) -> PlaybackResult<()> {
        let (framed, settled) = tokio::join!(
            async {
                let framing = self.compute_framing(ids, distance).await?;
                self.apply_framing(framing);
                Ok::<_, PlaybackError>(())
            },
            self.scene().pacer.pause(settle_ms),
        );
        framed?;
        settled
    }

    /// Pulse nodes between full and dim `color`, ending on exactly `color`.
    ///
    /// Performs `total_ms / step_ms` toggles and returns that count.
    async fn sparkle(&mut self, ids: &[NodeId], color: Color, total_ms: u64) -> PlaybackResult<u64> {
        let scene = self.scene_mut();
        let step_ms = scene.config.sparkle.step_ms;
        let steps = total_ms.checked_div(step_ms).unwrap_or(0);
        let indices = scene.view.resolve(ids);

        for step in 0..steps {
            let alpha = if step % 2 == 0 {
                1.0
            } else {
                colors::SPARKLE_DIM_ALPHA
            };
            scene.display.paint(&indices, palette::with_alpha(color, alpha));
            scene.renderer.refresh();
            trace!(step, color = %palette::to_css(palette::with_alpha(color, alpha)), "sparkle");
            scene.pacer.pause(step_ms).await?;
        }

        scene.display.paint(&indices, color);
        scene.renderer.refresh();
        Ok(steps)
    }

    /// Clear published state and return every node to neutral
    fn reset_animation_state(&mut self) {
        self.scene_mut().reset_visual_state();
    }
}
