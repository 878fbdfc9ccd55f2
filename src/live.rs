//! Playback of a freshly computed run: every seed size, every unique stage

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::LiveTimings;
use crate::error::PlaybackResult;
use crate::host::{PlaybackObserver, Renderer};
use crate::model::{CurrentStage, LiveRunData, NodeId, Stage};
use crate::palette::colors;
use crate::sequencer::{AnimationSequencer, PlaybackOutcome, Scene, SkipReason};

/// Index of the last stage whose seed/propagation sets differ from the stage
/// before it. Everything after it repeats it verbatim (early-stopping padding).
///
/// `None` for an empty list.
pub fn last_unique_stage_index(stages: &[Stage]) -> Option<usize> {
    if stages.is_empty() {
        return None;
    }
    let last = stages
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| !pair[1].same_activity(&pair[0]))
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0);
    Some(last)
}

/// Drives one algorithm's live results through the scene
pub struct LiveRunAnimator<'s, R, O> {
    scene: &'s mut Scene<R, O>,
}

impl<R: Renderer, O: PlaybackObserver> AnimationSequencer for LiveRunAnimator<'_, R, O> {
    type Renderer = R;
    type Observer = O;

    fn scene(&self) -> &Scene<R, O> {
        &*self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene<R, O> {
        &mut *self.scene
    }
}

impl<'s, R: Renderer, O: PlaybackObserver> LiveRunAnimator<'s, R, O> {
    pub fn new(scene: &'s mut Scene<R, O>) -> Self {
        Self { scene }
    }

    /// Play every seed size of `algorithm`, ascending.
    ///
    /// Missing results are a logged no-op. Final colors stay on screen.
    pub async fn start(&mut self, algorithm: &str, data: &LiveRunData) -> PlaybackResult<PlaybackOutcome> {
        let Some(result) = data.result_for(algorithm) else {
            warn!(algorithm, "no results for algorithm in run data");
            return Ok(PlaybackOutcome::Skipped(SkipReason::UnknownAlgorithm(
                algorithm.to_string(),
            )));
        };

        info!(
            algorithm,
            seed_sizes = result.stages_by_seed.len(),
            "starting live playback"
        );
        self.reset_animation_state();
        let observer = self.scene.observer_mut();
        observer.set_active_algorithm(Some(algorithm));
        observer.set_is_animating(true);

        let timings = self.scene.config().live.clone();
        self.scene.pacer().pause(timings.warmup_ms).await?;

        for (&seed_size, stages) in &result.stages_by_seed {
            self.play_seed_size(algorithm, seed_size, stages, &timings)
                .await?;
        }

        self.scene.pacer().pause(timings.finale_ms).await?;
        let observer = self.scene.observer_mut();
        observer.set_is_animating(false);
        observer.set_current_seed_size(None);
        if let Some(record) = result.comparison_record(algorithm) {
            observer.upsert_comparison(record);
        }

        info!(algorithm, "live playback finished");
        Ok(PlaybackOutcome::Completed)
    }

    async fn play_seed_size(
        &mut self,
        algorithm: &str,
        seed_size: u32,
        stages: &[Stage],
        timings: &LiveTimings,
    ) -> PlaybackResult<()> {
        // Seed-size boundaries are hard resets
        self.reset_animation_state();
        self.scene
            .observer_mut()
            .set_current_seed_size(Some(seed_size as usize));
        self.scene.pacer().pause(timings.seed_size_settle_ms).await?;

        let Some(last_unique) = last_unique_stage_index(stages) else {
            warn!(algorithm, seed_size, "no stages for seed size");
            return Ok(());
        };
        let unique = &stages[..=last_unique];
        debug!(
            seed_size,
            animating = unique.len(),
            total = stages.len(),
            "skipping repeated trailing stages"
        );

        let color = self.display_color(algorithm);
        let seed_set: BTreeSet<NodeId> = unique
            .iter()
            .flat_map(|stage| stage.selected_nodes.iter().cloned())
            .collect();
        let mut activated = BTreeSet::new();

        if !seed_set.is_empty() {
            self.scene.paint(&seed_set, color, Some(algorithm));
            self.scene.renderer().refresh();
            activated.extend(seed_set.iter().cloned());
            let observer = self.scene.observer_mut();
            observer.set_seed_nodes(&seed_set);
            observer.set_activated_nodes(&activated);
            self.scene.pacer().pause(timings.seed_reveal_ms).await?;
        }

        // Seeds plus everything propagated so far, for framing
        let mut framed = seed_set.clone();
        let sparkle_ms = self.scene.config().sparkle.seed_ms;

        for (position, stage) in unique.iter().enumerate() {
            self.scene
                .observer_mut()
                .set_current_stage(Some(CurrentStage::new(algorithm, position, stage)));

            let stage_seeds: BTreeSet<NodeId> = stage.selected_nodes.iter().cloned().collect();
            if !stage_seeds.is_empty() {
                let ids: Vec<NodeId> = stage_seeds.iter().cloned().collect();
                self.frame_nodes(&ids, timings.seed_zoom_distance, timings.seed_focus_ms)
                    .await?;
                self.sparkle(&ids, color, sparkle_ms).await?;
                self.scene.highlight(&stage_seeds);
                self.scene.pacer().pause(timings.seed_hold_ms).await?;
            }

            let propagated: BTreeSet<NodeId> = stage
                .propagated_nodes
                .iter()
                .filter(|id| !seed_set.contains(*id))
                .cloned()
                .collect();
            if !propagated.is_empty() {
                framed.extend(propagated.iter().cloned());
                let ids: Vec<NodeId> = framed.iter().cloned().collect();
                self.frame_nodes(
                    &ids,
                    timings.propagation_zoom_distance,
                    timings.propagation_focus_ms,
                )
                .await?;

                self.scene.highlight(&propagated);
                self.scene
                    .paint(&propagated, colors::PROPAGATED, Some(algorithm));
                self.scene.renderer().refresh();
                self.scene.pacer().pause(timings.propagation_paint_ms).await?;

                activated.extend(propagated);
                self.scene.observer_mut().set_activated_nodes(&activated);
                self.scene.pacer().pause(timings.propagation_hold_ms).await?;
            }
        }

        self.scene.pacer().pause(timings.seed_size_gap_ms).await
    }
}
