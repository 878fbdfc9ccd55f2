//! Replay of a single saved run against the currently loaded graph

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::{PlaybackError, PlaybackResult};
use crate::graph_state::GraphViewState;
use crate::host::{PlaybackObserver, Renderer};
use crate::model::{CurrentStage, NodeId, SavedRun, SavedRunPayload};
use crate::palette::colors;
use crate::sequencer::{AnimationSequencer, PlaybackOutcome, Scene, SkipReason};

impl TryFrom<SavedRunPayload> for SavedRun {
    type Error = PlaybackError;

    /// Reject payloads missing any field replay needs
    fn try_from(payload: SavedRunPayload) -> PlaybackResult<Self> {
        let algorithm = payload
            .algorithm
            .filter(|a| !a.is_empty())
            .ok_or(PlaybackError::MissingField("algorithm"))?;
        let stages = payload
            .stages
            .ok_or(PlaybackError::MissingField("stages"))?
            .decode("stages")?;
        let seed_nodes = payload
            .seed_nodes
            .ok_or(PlaybackError::MissingField("seed_nodes"))?
            .decode("seed_nodes")?;
        let graph = payload
            .graph_data
            .ok_or(PlaybackError::MissingField("graph_data"))?;

        Ok(SavedRun {
            algorithm,
            stages,
            seed_nodes,
            graph,
        })
    }
}

/// Distinct seeds of `run` that exist in `view`
pub fn valid_seed_nodes(run: &SavedRun, view: &GraphViewState) -> BTreeSet<NodeId> {
    run.seed_nodes
        .iter()
        .filter(|id| view.contains(id))
        .cloned()
        .collect()
}

/// Drives a saved run through the scene
pub struct ReplayAnimator<'s, R, O> {
    scene: &'s mut Scene<R, O>,
}

impl<R: Renderer, O: PlaybackObserver> AnimationSequencer for ReplayAnimator<'_, R, O> {
    type Renderer = R;
    type Observer = O;

    fn scene(&self) -> &Scene<R, O> {
        &*self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene<R, O> {
        &mut *self.scene
    }
}

impl<'s, R: Renderer, O: PlaybackObserver> ReplayAnimator<'s, R, O> {
    pub fn new(scene: &'s mut Scene<R, O>) -> Self {
        Self { scene }
    }

    /// Replay every stage of `run`. Stages are played as stored, without
    /// trimming repeated trailing stages.
    pub async fn start(&mut self, run: &SavedRun) -> PlaybackResult<PlaybackOutcome> {
        let algorithm = run.algorithm.as_str();
        info!(algorithm, stages = run.stages.len(), "starting saved-run replay");

        self.reset_animation_state();
        let observer = self.scene.observer_mut();
        observer.set_active_algorithm(Some(algorithm));
        observer.set_is_animating(true);
        observer.set_current_seed_size(Some(run.effective_seeds().len()));

        let seeds = valid_seed_nodes(run, self.scene.view());
        if seeds.is_empty() {
            warn!(algorithm, "no valid seed nodes in current graph");
            self.scene.observer_mut().set_is_animating(false);
            return Ok(PlaybackOutcome::Skipped(SkipReason::NoValidSeeds));
        }

        let color = self.display_color(algorithm);
        self.scene.paint(&seeds, color, Some(algorithm));
        self.scene.highlight(&seeds);
        let observer = self.scene.observer_mut();
        observer.set_seed_nodes(&seeds);
        observer.set_activated_nodes(&seeds);

        let timings = self.scene.config().replay.clone();
        let sparkle = self.scene.config().sparkle.clone();

        // A whole new graph was just loaded; give the layout time
        self.scene.pacer().pause(timings.settle_ms).await?;
        if self.scene.view().positioned_count() == 0 {
            warn!("no nodes positioned after settle, fitting whole graph");
            let transition = self
                .scene
                .pacer()
                .duration(self.scene.config().framing.fit_all_transition_ms);
            self.scene.renderer().zoom_to_fit(transition);
            self.scene.pacer().pause(timings.fit_all_wait_ms).await?;
        }

        let seed_ids: Vec<NodeId> = seeds.iter().cloned().collect();
        self.frame_nodes(&seed_ids, timings.seed_zoom_distance, timings.seed_focus_ms)
            .await?;
        self.sparkle(&seed_ids, color, sparkle.seed_ms).await?;
        self.scene.highlight(&seeds);
        self.scene.pacer().pause(timings.seed_hold_ms).await?;

        let mut activated = seeds.clone();
        for (position, stage) in run.stages.iter().enumerate() {
            self.scene
                .observer_mut()
                .set_current_stage(Some(CurrentStage::new(algorithm, position, stage)));

            let view = self.scene.view();
            let fresh: BTreeSet<NodeId> = stage
                .propagated_nodes
                .iter()
                .filter(|id| view.contains(id) && !seeds.contains(*id))
                .cloned()
                .collect();

            if !fresh.is_empty() {
                activated.extend(fresh.iter().cloned());
                self.scene.observer_mut().set_activated_nodes(&activated);

                let framed: Vec<NodeId> = activated.iter().cloned().collect();
                self.frame_nodes(
                    &framed,
                    timings.propagation_zoom_distance,
                    timings.propagation_focus_ms,
                )
                .await?;

                let fresh_ids: Vec<NodeId> = fresh.into_iter().collect();
                self.sparkle(&fresh_ids, colors::PROPAGATED, sparkle.propagation_ms)
                    .await?;
                self.scene.pacer().pause(timings.propagation_hold_ms).await?;
            }

            self.scene.pacer().pause(timings.stage_gap_ms).await?;
        }

        let observer = self.scene.observer_mut();
        observer.set_is_animating(false);
        observer.set_current_seed_size(None);
        info!(algorithm, "saved-run replay finished");
        Ok(PlaybackOutcome::Completed)
    }
}
