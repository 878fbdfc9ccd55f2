//! Data contracts consumed from the simulation service
//!
//! Everything here is produced upstream and read-only to the sequencers.
//! Node ids arrive as JSON numbers or strings; they are normalized to a single
//! string form at deserialization so every comparison downstream is exact.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PlaybackError, PlaybackResult};

/// A graph node identifier, normalized to its string form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawNodeId")]
pub struct NodeId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<RawNodeId> for NodeId {
    fn from(raw: RawNodeId) -> Self {
        match raw {
            RawNodeId::Integer(n) => NodeId(n.to_string()),
            // Integral floats drop the fraction: 1.0 becomes "1"
            RawNodeId::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                NodeId((f as i64).to_string())
            }
            RawNodeId::Float(f) => NodeId(f.to_string()),
            RawNodeId::Text(s) => NodeId(s),
        }
    }
}

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl From<u64> for NodeId {
    fn from(n: u64) -> Self {
        NodeId(n.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Treat an explicit `null` the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Seed-size map whose stage lists may individually be `null`
fn stage_lists<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Vec<Stage>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<u32, Option<Vec<Stage>>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(seed_size, stages)| (seed_size, stages.unwrap_or_default()))
        .collect())
}

/// One discrete step of seed selection and cascade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage number as reported upstream (may be absent or zero)
    #[serde(default)]
    pub stage: Option<u64>,
    /// Seeds picked at this stage
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_nodes: Vec<NodeId>,
    /// Nodes newly activated by the cascade at this stage
    #[serde(default, deserialize_with = "null_as_default")]
    pub propagated_nodes: Vec<NodeId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_activated: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub marginal_gain: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evaluations: u64,
}

impl Stage {
    pub fn selected_set(&self) -> HashSet<&NodeId> {
        self.selected_nodes.iter().collect()
    }

    pub fn propagated_set(&self) -> HashSet<&NodeId> {
        self.propagated_nodes.iter().collect()
    }

    /// Whether two stages carry the same seed and propagation sets.
    ///
    /// Order and duplicates inside the lists are ignored.
    pub fn same_activity(&self, other: &Stage) -> bool {
        self.selected_set() == other.selected_set()
            && self.propagated_set() == other.propagated_set()
    }

    /// Display label, `"Stage N"`, falling back to the 1-based position
    pub fn label(&self, position: usize) -> String {
        match self.stage {
            Some(n) if n != 0 => format!("Stage {n}"),
            _ => format!("Stage {}", position + 1),
        }
    }
}

/// Headline metrics reported for one algorithm run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    #[serde(default)]
    pub spread: Option<f64>,
    /// Runtime in milliseconds
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seed_nodes: Vec<NodeId>,
}

/// Results of one algorithm across every requested seed size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Keyed numerically, so iteration is ascending by seed size.
    /// A `null` stage list reads as empty and is skipped during playback.
    #[serde(default, deserialize_with = "stage_lists")]
    pub stages_by_seed: BTreeMap<u32, Vec<Stage>>,
    #[serde(default)]
    pub metrics: Option<RunMetrics>,
}

impl AlgorithmResult {
    /// Union of selected nodes over every seed size and stage, first-seen order
    pub fn selected_union(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.stages_by_seed
            .values()
            .flatten()
            .flat_map(|stage| stage.selected_nodes.iter())
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Comparison record for this run, whenever metrics were reported
    pub fn comparison_record(&self, algorithm: &str) -> Option<ComparisonRecord> {
        let metrics = self.metrics.as_ref()?;
        Some(ComparisonRecord {
            algorithm: algorithm.to_string(),
            spread: metrics.spread,
            runtime: metrics.runtime,
            seed_nodes: self.selected_union(),
        })
    }
}

/// Node and edge lists of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<(NodeId, NodeId)>,
}

/// Payload of a freshly computed run: the base graph plus per-algorithm results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveRunData {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    pub algorithm_results: BTreeMap<String, AlgorithmResult>,
}

impl LiveRunData {
    pub fn graph(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn result_for(&self, algorithm: &str) -> Option<&AlgorithmResult> {
        self.algorithm_results.get(algorithm)
    }

    pub fn from_json(json: &str) -> PlaybackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A value that may arrive inline or as a JSON-encoded string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Encoded<T> {
    Inline(T),
    Text(String),
}

impl<T: DeserializeOwned> Encoded<T> {
    pub fn decode(self, field: &'static str) -> PlaybackResult<T> {
        match self {
            Encoded::Inline(value) => Ok(value),
            Encoded::Text(text) => serde_json::from_str(&text)
                .map_err(|source| PlaybackError::MalformedField { field, source }),
        }
    }
}

/// A saved run as returned by the persistence service, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedRunPayload {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub stages: Option<Encoded<Vec<Stage>>>,
    #[serde(default)]
    pub seed_nodes: Option<Encoded<Vec<NodeId>>>,
    #[serde(default)]
    pub graph_data: Option<GraphSnapshot>,
}

impl SavedRunPayload {
    pub fn from_json(json: &str) -> PlaybackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A validated saved run: one algorithm, one seed size
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRun {
    pub algorithm: String,
    pub stages: Vec<Stage>,
    /// May contain duplicates
    pub seed_nodes: Vec<NodeId>,
    pub graph: GraphSnapshot,
}

impl SavedRun {
    pub fn effective_seeds(&self) -> BTreeSet<NodeId> {
        self.seed_nodes.iter().cloned().collect()
    }

    pub fn from_json(json: &str) -> PlaybackResult<Self> {
        SavedRunPayload::from_json(json)?.try_into()
    }
}

/// One row of the algorithm comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub algorithm: String,
    pub spread: Option<f64>,
    /// Milliseconds
    pub runtime: Option<f64>,
    pub seed_nodes: Vec<NodeId>,
}

impl ComparisonRecord {
    /// Spread per millisecond of runtime; needs both, and a positive runtime
    pub fn efficiency(&self) -> Option<f64> {
        let (spread, runtime) = (self.spread?, self.runtime?);
        (runtime > 0.0).then(|| spread / runtime)
    }
}

/// The stage currently on screen, as published to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStage {
    pub algorithm: String,
    /// Position in the stage list
    pub position: usize,
    pub label: String,
    #[serde(flatten)]
    pub stage: Stage,
}

impl CurrentStage {
    pub fn new(algorithm: &str, position: usize, stage: &Stage) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            position,
            label: stage.label(position),
            stage: stage.clone(),
        }
    }
}
