mod support;

use std::sync::Arc;
use std::time::Duration;

use influence_playback::config::PlaybackConfig;
use influence_playback::live::LiveRunAnimator;
use influence_playback::model::{LiveRunData, NodeId};
use influence_playback::palette::colors;
use influence_playback::sequencer::{
    AnimationSequencer, Framing, PlaybackOutcome, Scene, SkipReason,
};
use tokio::time::Instant;

use support::{EventLog, RecordingRenderer, RenderCall, graph, ids, set};

const TWO_STAGE_RUN: &str = r#"{
    "nodes": [1, 2, 3, 4, 5, 6],
    "edges": [[1, 2], [2, 3], [3, 4]],
    "algorithm_results": {
        "celf": {
            "stages_by_seed": {
                "2": [
                    {"stage": 1, "selected_nodes": [1], "propagated_nodes": [3]},
                    {"stage": 2, "selected_nodes": [2], "propagated_nodes": [4, 1]}
                ]
            },
            "metrics": {"spread": 4, "runtime": 20, "seed_nodes": [1, 2]}
        }
    }
}"#;

fn data(json: &str) -> LiveRunData {
    LiveRunData::from_json(json).unwrap()
}

async fn play(renderer: &Arc<RecordingRenderer>, run: &LiveRunData, algorithm: &str) -> (support::TestSession, PlaybackOutcome) {
    let mut session = support::session(renderer);
    session.load_graph(run.graph());
    let outcome = session.play_live(algorithm, run).await.unwrap();
    (session, outcome)
}

#[tokio::test(start_paused = true)]
async fn seed_sizes_play_in_ascending_order() {
    let run = data(
        r#"{
            "nodes": [1, 2],
            "algorithm_results": {
                "degree_heuristic": {
                    "stages_by_seed": {
                        "5": [{"selected_nodes": [1]}],
                        "10": [{"selected_nodes": [2]}],
                        "3": [{"selected_nodes": [1]}]
                    }
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let (session, outcome) = play(&renderer, &run, "degree_heuristic").await;

    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(session.observer().seed_sizes(), vec![3, 5, 10]);
}

#[tokio::test(start_paused = true)]
async fn repeated_trailing_stages_are_skipped() {
    let run = data(
        r#"{
            "nodes": [1, 2, 3, 4],
            "algorithm_results": {
                "classic_greedy": {
                    "stages_by_seed": {
                        "2": [
                            {"stage": 1, "selected_nodes": [1], "propagated_nodes": [3]},
                            {"stage": 2, "selected_nodes": [1, 2], "propagated_nodes": [4]},
                            {"stage": 3, "selected_nodes": [2, 1], "propagated_nodes": [4]},
                            {"stage": 4, "selected_nodes": [1, 2], "propagated_nodes": [4]}
                        ]
                    }
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let (session, _) = play(&renderer, &run, "classic_greedy").await;

    let labels: Vec<String> = session
        .observer()
        .stages()
        .into_iter()
        .map(|s| s.label)
        .collect();
    assert_eq!(labels, vec!["Stage 1", "Stage 2"]);
}

#[tokio::test(start_paused = true)]
async fn seed_size_without_stages_is_skipped() {
    let run = data(
        r#"{
            "nodes": [1, 2],
            "algorithm_results": {
                "celf": {
                    "stages_by_seed": {
                        "1": [],
                        "2": [{"selected_nodes": [1, 2]}]
                    }
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let (session, outcome) = play(&renderer, &run, "celf").await;

    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(session.observer().seed_sizes(), vec![1, 2]);
    assert_eq!(session.observer().stages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn null_stage_list_skips_only_that_seed_size() {
    let run = data(
        r#"{
            "nodes": [1, 2],
            "algorithm_results": {
                "celf": {
                    "stages_by_seed": {
                        "1": null,
                        "2": [{"selected_nodes": [1], "propagated_nodes": [2]}]
                    }
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let (session, outcome) = play(&renderer, &run, "celf").await;

    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(session.observer().seed_sizes(), vec![1, 2]);
    assert_eq!(session.observer().stages().len(), 1);
    assert_eq!(session.view().color_of(&NodeId::from("2")), Some(colors::PROPAGATED));
}

#[tokio::test(start_paused = true)]
async fn unknown_algorithm_is_a_logged_no_op() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    let mut session = support::session(&renderer);
    session.load_graph(run.graph());
    let events_before = session.observer().events.len();
    let calls_before = renderer.calls().len();

    let outcome = session.play_live("pagerank", &run).await.unwrap();

    assert_eq!(
        outcome,
        PlaybackOutcome::Skipped(SkipReason::UnknownAlgorithm("pagerank".into()))
    );
    assert_eq!(session.observer().events.len(), events_before);
    assert_eq!(renderer.calls().len(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn seeds_take_the_algorithm_color_and_cascade_turns_red() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    let (session, _) = play(&renderer, &run, "celf").await;
    let view = session.view();

    for seed in ["1", "2"] {
        assert_eq!(view.color_of(&NodeId::from(seed)), Some(colors::CELF));
    }
    for activated in ["3", "4"] {
        assert_eq!(view.color_of(&NodeId::from(activated)), Some(colors::PROPAGATED));
    }
    for untouched in ["5", "6"] {
        assert_eq!(view.color_of(&NodeId::from(untouched)), Some(colors::NEUTRAL));
    }

    let tagged = view.display(view.index_of(&NodeId::from("3")).unwrap()).unwrap();
    assert_eq!(tagged.algorithm.as_deref(), Some("celf"));
}

#[tokio::test(start_paused = true)]
async fn propagation_never_includes_seed_nodes() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    let (session, _) = play(&renderer, &run, "celf").await;
    let log = session.observer();

    // Stage 2 lists node 1 as propagated, but 1 is a seed of this pass
    let growth: Vec<_> = log.activated().into_iter().filter(|s| !s.is_empty()).collect();
    assert_eq!(
        growth,
        vec![set(&["1", "2"]), set(&["1", "2", "3"]), set(&["1", "2", "3", "4"])]
    );
    assert_eq!(log.state.highlighted_nodes, set(&["4"]));
    assert_eq!(log.state.seed_nodes, set(&["1", "2"]));
}

#[tokio::test(start_paused = true)]
async fn camera_frames_the_centroid_of_positioned_nodes() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    play(&renderer, &run, "celf").await;

    // Node i sits at x = 10 * (i + 1); seed zoom 120, propagation zoom 200
    assert_eq!(
        renderer.camera_moves(),
        vec![
            ([10.0, 0.0, 120.0], [10.0, 0.0, 0.0]),
            ([20.0, 0.0, 200.0], [20.0, 0.0, 0.0]),
            ([20.0, 0.0, 120.0], [20.0, 0.0, 0.0]),
            ([25.0, 0.0, 200.0], [25.0, 0.0, 0.0]),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn framing_distance_grows_to_fit_a_wide_cluster() {
    let run = data(
        r#"{
            "nodes": ["a", "b"],
            "algorithm_results": {"celf": {"stages_by_seed": {"2": [{"selected_nodes": ["a", "b"]}]}}}
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let mut session = support::session(&renderer);
    session.load_graph(run.graph());
    renderer.place("a", [-100.0, 0.0, 0.0]);
    renderer.place("b", [100.0, 0.0, 0.0]);

    session.play_live("celf", &run).await.unwrap();

    assert_eq!(renderer.camera_moves()[0], ([0.0, 0.0, 400.0], [0.0, 0.0, 0.0]));
}

#[tokio::test(start_paused = true)]
async fn is_animating_brackets_the_sequence() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    let (session, _) = play(&renderer, &run, "celf").await;
    let log = session.observer();

    assert_eq!(log.animating(), vec![true, false]);
    assert_eq!(log.state.active_algorithm.as_deref(), Some("celf"));
    assert_eq!(log.state.current_seed_size, None);
}

#[tokio::test(start_paused = true)]
async fn sequence_follows_the_stock_timings() {
    let run = data(TWO_STAGE_RUN);
    let renderer = RecordingRenderer::laid_out();
    let mut session = support::session(&renderer);
    session.load_graph(run.graph());

    let start = Instant::now();
    session.play_live("celf", &run).await.unwrap();
    let elapsed = start.elapsed();

    // warmup 500, settle 1000, reveal 500, two stages of 7700, gap 1500, finale 1000
    assert!(elapsed >= Duration::from_millis(19_900), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(20_100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn comparison_record_is_upserted_per_algorithm() {
    let run = data(
        r#"{
            "nodes": [1, 2, 3],
            "algorithm_results": {
                "celf": {
                    "stages_by_seed": {
                        "1": [{"selected_nodes": [2]}],
                        "2": [{"selected_nodes": [2]}, {"selected_nodes": [3]}]
                    },
                    "metrics": {"spread": 9, "runtime": 3, "seed_nodes": [2, 3]}
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let mut session = support::session(&renderer);
    session.load_graph(run.graph());

    session.play_live("celf", &run).await.unwrap();
    session.play_live("celf", &run).await.unwrap();

    let rows = &session.observer().state.comparison_results;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].algorithm, "celf");
    assert_eq!(rows[0].seed_nodes, ids(&["2", "3"]));
    assert_eq!(rows[0].efficiency(), Some(3.0));
}

#[tokio::test(start_paused = true)]
async fn missing_nodes_are_skipped_silently() {
    let run = data(
        r#"{
            "nodes": [1, 2],
            "algorithm_results": {
                "celf": {
                    "stages_by_seed": {
                        "2": [{"selected_nodes": [1, 999], "propagated_nodes": [998, 2]}]
                    }
                }
            }
        }"#,
    );
    let renderer = RecordingRenderer::laid_out();
    let (session, outcome) = play(&renderer, &run, "celf").await;

    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(session.view().color_of(&NodeId::from("1")), Some(colors::CELF));
    assert_eq!(session.view().color_of(&NodeId::from("2")), Some(colors::PROPAGATED));
}

#[tokio::test(start_paused = true)]
async fn sparkle_toggles_and_ends_on_the_exact_color() {
    let renderer = RecordingRenderer::laid_out();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    scene.load(&graph(&["a", "b"]));
    let mut animator = LiveRunAnimator::new(&mut scene);

    let start = Instant::now();
    let toggles = animator.sparkle(&ids(&["a"]), colors::CELF, 1500).await.unwrap();

    assert_eq!(toggles, 7);
    assert!(start.elapsed() >= Duration::from_millis(1400));

    let frames = renderer.frames_of("a");
    let alphas: Vec<f32> = frames.iter().map(|c| c[3]).collect();
    assert_eq!(alphas, vec![1.0, 0.3, 1.0, 0.3, 1.0, 0.3, 1.0, 1.0]);
    assert_eq!(*frames.last().unwrap(), colors::CELF);
    assert!(renderer.frames_of("b").iter().all(|c| *c == colors::NEUTRAL));
}

#[tokio::test(start_paused = true)]
async fn framing_without_positions_falls_back_to_fit_all() {
    let renderer = RecordingRenderer::unpositioned();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    scene.load(&graph(&["a", "b"]));
    let animator = LiveRunAnimator::new(&mut scene);

    let start = Instant::now();
    let framing = animator.compute_framing(&[], 120.0).await.unwrap();

    assert_eq!(framing, Framing::FitAll);
    // 500 ms, then 14 retries a second apart
    assert!(start.elapsed() >= Duration::from_millis(14_500));
    // One nudge at the refresh checkpoint
    assert_eq!(renderer.calls(), vec![RenderCall::Refresh]);
}

#[tokio::test(start_paused = true)]
async fn lagging_layout_holds_the_step_until_the_retry_budget_runs_out() {
    let renderer = RecordingRenderer::unpositioned();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    scene.load(&graph(&["a", "b"]));
    let animator = LiveRunAnimator::new(&mut scene);

    let start = Instant::now();
    animator.frame_nodes(&ids(&["a"]), 120.0, 1500).await.unwrap();
    let elapsed = start.elapsed();

    // Bounded by the framing schedule, not stretched past it
    assert!(elapsed >= Duration::from_millis(14_500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(14_600), "{elapsed:?}");
    assert_eq!(renderer.fit_all_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn framing_retries_until_the_layout_places_nodes() {
    let renderer = RecordingRenderer::unpositioned();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    scene.load(&graph(&["a", "b"]));
    let animator = LiveRunAnimator::new(&mut scene);

    let start = Instant::now();
    let focus_ids = ids(&["a"]);
    let (framing, ()) = tokio::join!(animator.compute_framing(&focus_ids, 120.0), async {
        tokio::time::sleep(Duration::from_millis(2200)).await;
        renderer.place("a", [5.0, 5.0, 5.0]);
    });

    assert_eq!(
        framing.unwrap(),
        Framing::Focus {
            center: [5.0, 5.0, 5.0],
            distance: 120.0
        }
    );
    // Attempts at 500, 1500 and 2500 ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2600), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn apply_framing_issues_camera_commands() {
    let renderer = RecordingRenderer::laid_out();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    let animator = LiveRunAnimator::new(&mut scene);

    animator.apply_framing(Framing::Focus {
        center: [1.0, 2.0, 3.0],
        distance: 50.0,
    });
    animator.apply_framing(Framing::FitAll);

    assert_eq!(
        renderer.calls(),
        vec![
            RenderCall::Camera {
                position: [1.0, 2.0, 53.0],
                look_at: [1.0, 2.0, 3.0],
                transition: Duration::from_millis(1500),
            },
            RenderCall::FitAll(Duration::from_millis(2000)),
        ]
    );
}

#[test]
fn color_lookup_is_fixed() {
    let renderer = RecordingRenderer::laid_out();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    let animator = LiveRunAnimator::new(&mut scene);

    assert_eq!(animator.color_for("celf"), Some(colors::CELF));
    assert_eq!(animator.color_for("pagerank"), None);
    assert_eq!(animator.display_color("pagerank"), colors::NEUTRAL);
}

#[test]
fn reset_is_idempotent() {
    let renderer = RecordingRenderer::laid_out();
    let mut scene = Scene::new(Arc::clone(&renderer), EventLog::default(), PlaybackConfig::default());
    scene.load(&graph(&["a", "b"]));
    scene.paint(&ids(&["a"]), colors::CELF, Some("celf"));

    let mut animator = LiveRunAnimator::new(&mut scene);
    animator.reset_animation_state();
    let once = animator.scene().observer().state.clone();
    let colors_once = animator.scene().view().colors();
    animator.reset_animation_state();

    assert_eq!(animator.scene().observer().state, once);
    assert_eq!(animator.scene().view().colors(), colors_once);
    assert!(colors_once.iter().all(|c| *c == colors::NEUTRAL));
}
