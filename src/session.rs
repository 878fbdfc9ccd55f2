//! Playback orchestration
//!
//! A [`PlaybackSession`] owns the scene, remembers the base graph and the
//! saved run on screen, and dispatches playback strategies. Every entry
//! point takes `&mut self`, so at most one sequence runs per session.

use tracing::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlaybackResult};
use crate::graph_state::GraphViewState;
use crate::host::{PlaybackObserver, Renderer};
use crate::live::LiveRunAnimator;
use crate::model::{GraphSnapshot, LiveRunData, SavedRun, SavedRunPayload};
use crate::replay::ReplayAnimator;
use crate::sequencer::{PlaybackOutcome, Scene, SkipReason};
use crate::timing::CancellationToken;

/// Which playback to run
#[derive(Debug, Clone, Copy)]
pub enum PlaybackStrategy<'a> {
    /// Every seed size of one algorithm from a freshly computed run
    LiveRun {
        algorithm: &'a str,
        data: &'a LiveRunData,
    },
    /// A single saved run against the current graph
    Replay(&'a SavedRun),
}

pub struct PlaybackSession<R, O> {
    scene: Scene<R, O>,
    base_graph: GraphSnapshot,
    saved_run: Option<SavedRun>,
}

impl<R: Renderer, O: PlaybackObserver> PlaybackSession<R, O> {
    /// Fails with `InvalidConfig` before anything is bound to the renderer
    pub fn new(renderer: R, observer: O, config: PlaybackConfig) -> PlaybackResult<Self> {
        config.validate()?;
        Ok(Self {
            scene: Scene::new(renderer, observer, config),
            base_graph: GraphSnapshot::default(),
            saved_run: None,
        })
    }

    pub fn scene(&self) -> &Scene<R, O> {
        &self.scene
    }

    pub fn view(&self) -> &GraphViewState {
        self.scene.view()
    }

    pub fn renderer(&self) -> &R {
        self.scene.renderer()
    }

    pub fn observer(&self) -> &O {
        self.scene.observer()
    }

    /// The saved run currently on screen, if any
    pub fn saved_run(&self) -> Option<&SavedRun> {
        self.saved_run.as_ref()
    }

    pub fn into_parts(self) -> (R, O) {
        self.scene.into_parts()
    }

    /// Token that interrupts the running sequence at its next wait
    pub fn cancellation(&self) -> CancellationToken {
        self.scene.pacer().token().clone()
    }

    /// Load new base graph data and forget any saved run
    pub fn load_graph(&mut self, snapshot: GraphSnapshot) {
        self.scene.load(&snapshot);
        self.scene.reset_visual_state();
        self.base_graph = snapshot;
        self.saved_run = None;
    }

    /// Go back to the base graph, all nodes neutral
    pub fn restore_original_graph(&mut self) {
        info!(nodes = self.base_graph.nodes.len(), "restoring original graph");
        self.scene.load(&self.base_graph);
        self.scene.reset_visual_state();
        self.saved_run = None;
    }

    /// Validate a saved run, show its graph, wait for the layout, then
    /// replay it. Validation errors are returned before anything changes.
    pub async fn load_saved_run(&mut self, payload: SavedRunPayload) -> PlaybackResult<PlaybackOutcome> {
        let run = SavedRun::try_from(payload)?;
        self.begin();
        info!(
            algorithm = %run.algorithm,
            nodes = run.graph.nodes.len(),
            "loading saved run"
        );
        self.scene.load(&run.graph);
        self.scene.reset_visual_state();
        self.saved_run = Some(run);

        let result = self.settle_and_replay().await;
        self.finish(result)
    }

    /// Replay the saved run already on screen
    pub async fn replay_current(&mut self) -> PlaybackResult<PlaybackOutcome> {
        self.begin();
        let result = self.replay_loaded().await;
        self.finish(result)
    }

    /// Play one algorithm's live results, returning to the base graph first
    /// if a saved run is on screen
    pub async fn play_live(&mut self, algorithm: &str, data: &LiveRunData) -> PlaybackResult<PlaybackOutcome> {
        self.begin();
        let result = self.restore_and_play(algorithm, data).await;
        self.finish(result)
    }

    pub async fn play(&mut self, strategy: PlaybackStrategy<'_>) -> PlaybackResult<PlaybackOutcome> {
        match strategy {
            PlaybackStrategy::LiveRun { algorithm, data } => self.play_live(algorithm, data).await,
            PlaybackStrategy::Replay(run) => {
                self.begin();
                let result = ReplayAnimator::new(&mut self.scene).start(run).await;
                self.finish(result)
            }
        }
    }

    fn begin(&self) {
        self.scene.pacer().token().reset();
    }

    /// Clear visual state after a cancelled sequence
    fn finish(&mut self, result: PlaybackResult<PlaybackOutcome>) -> PlaybackResult<PlaybackOutcome> {
        if let Err(PlaybackError::Cancelled) = result {
            info!("playback cancelled");
            self.scene.reset_visual_state();
            self.scene.observer_mut().set_is_animating(false);
        }
        result
    }

    async fn settle_and_replay(&mut self) -> PlaybackResult<PlaybackOutcome> {
        let timings = self.scene.config().session.clone();
        self.scene.pacer().pause(timings.graph_load_ms).await?;
        self.scene.renderer().refresh();
        self.wait_for_layout(timings.layout_wait_ms, timings.layout_poll_ms)
            .await?;
        self.replay_loaded().await
    }

    /// Poll the layout idle signal, giving up after `limit_ms`
    async fn wait_for_layout(&self, limit_ms: u64, poll_ms: u64) -> PlaybackResult<()> {
        let poll_ms = poll_ms.max(1);
        let mut waited = 0;
        while !self.scene.renderer().is_layout_idle() {
            if waited >= limit_ms {
                debug!(waited_ms = waited, "layout still moving, continuing");
                return Ok(());
            }
            self.scene.pacer().pause(poll_ms).await?;
            waited += poll_ms;
        }
        debug!(waited_ms = waited, "layout idle");
        Ok(())
    }

    async fn replay_loaded(&mut self) -> PlaybackResult<PlaybackOutcome> {
        match self.saved_run.as_ref() {
            Some(run) => ReplayAnimator::new(&mut self.scene).start(run).await,
            None => {
                warn!("replay requested with no saved run loaded");
                Ok(PlaybackOutcome::Skipped(SkipReason::NoSavedRun))
            }
        }
    }

    async fn restore_and_play(&mut self, algorithm: &str, data: &LiveRunData) -> PlaybackResult<PlaybackOutcome> {
        if self.saved_run.is_some() {
            self.restore_original_graph();
            let restore_ms = self.scene.config().session.restore_ms;
            self.scene.pacer().pause(restore_ms).await?;
        }
        LiveRunAnimator::new(&mut self.scene)
            .start(algorithm, data)
            .await
    }
}
