//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use influence_playback::config::PlaybackConfig;
use influence_playback::graph_state::{GraphViewState, Position, PositionWriter};
use influence_playback::host::{PlaybackObserver, PublishedState, Renderer};
use influence_playback::model::{
    ComparisonRecord, CurrentStage, GraphSnapshot, NodeId, Stage,
};
use influence_playback::palette::Color;
use influence_playback::session::PlaybackSession;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Refresh,
    Camera {
        position: Position,
        look_at: Position,
        transition: Duration,
    },
    FitAll(Duration),
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<RenderCall>,
    view: Option<GraphViewState>,
    positions: Option<PositionWriter>,
    /// Color of every node at each refresh
    frames: Vec<Vec<Color>>,
}

/// Renderer that records every call. With `auto_layout` it places every node
/// as soon as a graph is bound, standing in for a layout that has converged.
#[derive(Default)]
pub struct RecordingRenderer {
    auto_layout: bool,
    state: Mutex<RecorderState>,
}

impl RecordingRenderer {
    pub fn laid_out() -> Arc<Self> {
        Arc::new(Self {
            auto_layout: true,
            ..Default::default()
        })
    }

    pub fn unpositioned() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn place(&self, id: &str, position: Position) {
        let state = self.state.lock();
        let writer = state.positions.as_ref().expect("no graph bound");
        assert!(writer.set_by_id(&NodeId::from(id), position), "unknown node {id}");
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.state.lock().calls.clone()
    }

    pub fn camera_moves(&self) -> Vec<(Position, Position)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::Camera {
                    position, look_at, ..
                } => Some((position, look_at)),
                _ => None,
            })
            .collect()
    }

    pub fn fit_all_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RenderCall::FitAll(_)))
            .count()
    }

    pub fn refresh_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RenderCall::Refresh))
            .count()
    }

    /// Colors one node showed at each refresh
    pub fn frames_of(&self, id: &str) -> Vec<Color> {
        let state = self.state.lock();
        let Some(index) = state.view.as_ref().and_then(|v| v.index_of(&NodeId::from(id))) else {
            return Vec::new();
        };
        state.frames.iter().filter_map(|frame| frame.get(index).copied()).collect()
    }
}

/// Position node `i` at `(10 * (i + 1), 0, 0)`
fn spread_along_x(writer: &PositionWriter) {
    writer.publish((0..writer.len()).map(|i| [10.0 * (i + 1) as f32, 0.0, 0.0]));
}

impl Renderer for RecordingRenderer {
    fn bind(&self, view: GraphViewState, positions: PositionWriter) {
        let mut state = self.state.lock();
        if self.auto_layout {
            spread_along_x(&positions);
        }
        state.view = Some(view);
        state.positions = Some(positions);
    }

    fn refresh(&self) {
        let mut state = self.state.lock();
        state.calls.push(RenderCall::Refresh);
        let frame = state.view.as_ref().map(|v| v.colors()).unwrap_or_default();
        state.frames.push(frame);
    }

    fn camera_position(&self, position: Position, look_at: Position, transition: Duration) {
        self.state.lock().calls.push(RenderCall::Camera {
            position,
            look_at,
            transition,
        });
    }

    fn zoom_to_fit(&self, transition: Duration) {
        self.state.lock().calls.push(RenderCall::FitAll(transition));
    }

    fn is_layout_idle(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stage(Option<CurrentStage>),
    Animating(bool),
    Highlighted(BTreeSet<NodeId>),
    Algorithm(Option<String>),
    Comparison(ComparisonRecord),
    Seeds(BTreeSet<NodeId>),
    Activated(BTreeSet<NodeId>),
    SeedSize(Option<usize>),
}

/// Observer keeping every published value in order plus the latest state
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
    pub state: PublishedState,
}

impl EventLog {
    pub fn seed_sizes(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::SeedSize(Some(n)) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn stages(&self) -> Vec<CurrentStage> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Stage(Some(stage)) => Some(stage.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn animating(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Animating(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn activated(&self) -> Vec<BTreeSet<NodeId>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Activated(set) => Some(set.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PlaybackObserver for EventLog {
    fn set_current_stage(&mut self, stage: Option<CurrentStage>) {
        self.events.push(Event::Stage(stage.clone()));
        self.state.set_current_stage(stage);
    }

    fn set_is_animating(&mut self, animating: bool) {
        self.events.push(Event::Animating(animating));
        self.state.set_is_animating(animating);
    }

    fn set_highlighted_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.events.push(Event::Highlighted(nodes.clone()));
        self.state.set_highlighted_nodes(nodes);
    }

    fn set_active_algorithm(&mut self, algorithm: Option<&str>) {
        self.events
            .push(Event::Algorithm(algorithm.map(str::to_string)));
        self.state.set_active_algorithm(algorithm);
    }

    fn upsert_comparison(&mut self, record: ComparisonRecord) {
        self.events.push(Event::Comparison(record.clone()));
        self.state.upsert_comparison(record);
    }

    fn set_seed_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.events.push(Event::Seeds(nodes.clone()));
        self.state.set_seed_nodes(nodes);
    }

    fn set_activated_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.events.push(Event::Activated(nodes.clone()));
        self.state.set_activated_nodes(nodes);
    }

    fn set_current_seed_size(&mut self, size: Option<usize>) {
        self.events.push(Event::SeedSize(size));
        self.state.set_current_seed_size(size);
    }
}

pub type TestSession = PlaybackSession<Arc<RecordingRenderer>, EventLog>;

pub fn session(renderer: &Arc<RecordingRenderer>) -> TestSession {
    PlaybackSession::new(Arc::clone(renderer), EventLog::default(), PlaybackConfig::default())
        .expect("default config is valid")
}

pub fn ids(raw: &[&str]) -> Vec<NodeId> {
    raw.iter().map(|s| NodeId::from(*s)).collect()
}

pub fn set(raw: &[&str]) -> BTreeSet<NodeId> {
    raw.iter().map(|s| NodeId::from(*s)).collect()
}

pub fn stage(selected: &[&str], propagated: &[&str]) -> Stage {
    Stage {
        selected_nodes: ids(selected),
        propagated_nodes: ids(propagated),
        ..Default::default()
    }
}

pub fn graph(nodes: &[&str]) -> GraphSnapshot {
    GraphSnapshot {
        nodes: ids(nodes),
        edges: nodes
            .windows(2)
            .map(|pair| (NodeId::from(pair[0]), NodeId::from(pair[1])))
            .collect(),
    }
}
