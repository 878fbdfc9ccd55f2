//! 3D force-directed layout engine
//!
//! Many-body repulsion, link springs and a centering force, cooled by a
//! decaying alpha. [`ForceLayout::spawn`] runs it on a tokio task that
//! publishes positions through the graph's [`PositionWriter`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::graph_state::{GraphViewState, Link, Position, PositionWriter};

/// A node with position and velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode {
    pub position: Position,
    pub velocity: Position,
}

impl LayoutNode {
    /// Place node `index` of `total` on a Fibonacci sphere
    pub fn on_sphere(index: usize, total: usize, radius: f32) -> Self {
        let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let i = index as f32;
        let n = total as f32;

        let theta = 2.0 * std::f32::consts::PI * i / golden_ratio;
        let phi = (1.0 - 2.0 * (i + 0.5) / n).acos();

        Self {
            position: [
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            ],
            velocity: [0.0; 3],
        }
    }
}

/// Signals shared between a running layout task and its owner
#[derive(Clone, Default)]
pub struct LayoutSignals {
    inner: Arc<SignalState>,
}

#[derive(Default)]
struct SignalState {
    idle: AtomicBool,
    reheat: Notify,
}

impl LayoutSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the layout has cooled below `alpha_min`
    pub fn is_idle(&self) -> bool {
        self.inner.idle.load(Ordering::Acquire)
    }

    /// Ask an idle layout to start moving again
    pub fn request_reheat(&self) {
        self.inner.reheat.notify_one();
    }

    fn set_idle(&self, idle: bool) {
        self.inner.idle.store(idle, Ordering::Release);
    }
}

/// CPU force simulation over the loaded graph
pub struct ForceLayout {
    nodes: Vec<LayoutNode>,
    links: Vec<Link>,
    config: LayoutConfig,
    /// Current simulation temperature
    alpha: f32,
}

impl ForceLayout {
    pub fn new(view: &GraphViewState, config: LayoutConfig) -> Self {
        let total = view.len();
        let nodes = (0..total)
            .map(|i| LayoutNode::on_sphere(i, total, config.initial_radius))
            .collect();
        Self {
            nodes,
            links: view.links().to_vec(),
            config,
            alpha: 1.0,
        }
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// False once alpha has cooled below `alpha_min`
    pub fn is_running(&self) -> bool {
        self.alpha > self.config.alpha_min
    }

    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    /// Advance one step: apply forces, integrate, cool
    pub fn tick(&mut self) {
        if !self.is_running() || self.nodes.is_empty() {
            return;
        }

        self.apply_many_body_force();
        self.apply_link_force();
        self.apply_center_force();

        for node in &mut self.nodes {
            for axis in 0..3 {
                node.velocity[axis] *= self.config.velocity_decay;
                node.position[axis] += node.velocity[axis] * self.alpha;
            }
        }

        self.alpha += (self.config.alpha_decay - 1.0) * self.alpha;
    }

    fn apply_many_body_force(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = sub(self.nodes[j].position, self.nodes[i].position);
                let dist_sq = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).max(1.0);
                let dist = dist_sq.sqrt();

                // Coulomb's law: F = k / r^2
                let force = self.config.charge / dist_sq;
                for axis in 0..3 {
                    let f = force * d[axis] / dist;
                    self.nodes[i].velocity[axis] -= f;
                    self.nodes[j].velocity[axis] += f;
                }
            }
        }
    }

    fn apply_link_force(&mut self) {
        for link in &self.links {
            let (source, target) = (link.source, link.target);
            if source == target {
                continue;
            }
            let d = sub(self.nodes[target].position, self.nodes[source].position);
            let dist = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt().max(1.0);

            // Spring toward the rest length
            let stretch = dist - self.config.link_distance;
            let force = self.config.link_strength * stretch / dist;
            for axis in 0..3 {
                self.nodes[source].velocity[axis] += force * d[axis];
                self.nodes[target].velocity[axis] -= force * d[axis];
            }
        }
    }

    fn apply_center_force(&mut self) {
        for node in &mut self.nodes {
            for axis in 0..3 {
                node.velocity[axis] -= node.position[axis] * self.config.center_strength;
            }
        }
    }

    /// Tick until cool or `max_iterations`; returns the ticks run
    pub fn run_to_convergence(&mut self, max_iterations: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_iterations && self.is_running() {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.nodes.iter().map(|n| n.position)
    }

    /// Run on a tokio task, publishing positions every
    /// `publish_every` ticks and once more on convergence.
    ///
    /// An idle layout sleeps until [`LayoutSignals::request_reheat`].
    pub fn spawn(mut self, writer: PositionWriter, signals: LayoutSignals) -> JoinHandle<()> {
        let tick = Duration::from_millis(self.config.tick_ms.max(1));
        let publish_every = self.config.publish_every.max(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                if !self.is_running() {
                    writer.publish(self.positions());
                    signals.set_idle(true);
                    debug!(nodes = self.nodes.len(), ticks, "layout converged");
                    signals.inner.reheat.notified().await;
                    debug!("layout reheated");
                    self.reheat();
                    signals.set_idle(false);
                    interval.reset();
                }

                interval.tick().await;
                self.tick();
                ticks = ticks.wrapping_add(1);
                if ticks % publish_every == 0 {
                    writer.publish(self.positions());
                }
            }
        })
    }
}

fn sub(a: Position, b: Position) -> Position {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
