//! Dependency graph linearization
//!
//! Orders bean providers so that every provider is constructed after the
//! providers it references. Cycles through a normal-scoped bean are broken by
//! lazy references; any other cycle is fatal.

use crate::bean::{BeanId, BeanInfo};
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::interception::InterceptionModel;
use crate::resolver::Resolutions;
use ahash::{AHashMap, AHashSet};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Provider references between active beans
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<BeanId>,
    edges: AHashMap<BeanId, Vec<BeanId>>,
}

impl DependencyGraph {
    /// Collect the edges of every active bean: resolved injection points
    /// (disposer parameters included), the declaring bean of a producer and
    /// the interceptors of the bean
    pub fn build(deployment: &BeanDeployment, resolutions: &Resolutions, interception: &InterceptionModel) -> Self {
        let mut graph = Self::default();
        for bean in deployment.active_beans() {
            graph.nodes.push(bean.id());
            let mut targets = resolutions.bean_targets(bean.injection_points());
            if let Some(disposer) = bean.disposer() {
                targets.extend(resolutions.bean_targets(deployment.disposer(disposer).injection().injection_points()));
            }
            targets.extend(bean.declaring_bean());
            targets.extend(interception.interceptors_of(bean.id()));

            let mut seen = AHashSet::new();
            targets.retain(|t| seen.insert(*t));
            graph.edges.insert(bean.id(), targets);
        }
        graph
    }

    /// Nodes in discovery order
    pub fn nodes(&self) -> &[BeanId] {
        &self.nodes
    }

    pub fn dependencies(&self, bean: BeanId) -> &[BeanId] {
        self.edges.get(&bean).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Strongly connected components with more than one node, or a
    /// self-reference, in Tarjan order
    pub fn cycles(&self) -> Vec<Vec<BeanId>> {
        let mut tarjan = Tarjan::new(self);
        for node in &self.nodes {
            if !tarjan.indices.contains_key(node) {
                tarjan.visit(*node);
            }
        }
        tarjan
            .components
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.dependencies(*single).contains(single),
                _ => true,
            })
            .collect()
    }
}

/// Tarjan strongly connected components
struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    next: usize,
    indices: AHashMap<BeanId, usize>,
    lowlinks: AHashMap<BeanId, usize>,
    stack: Vec<BeanId>,
    on_stack: AHashSet<BeanId>,
    components: Vec<Vec<BeanId>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            next: 0,
            indices: AHashMap::new(),
            lowlinks: AHashMap::new(),
            stack: Vec::new(),
            on_stack: AHashSet::new(),
            components: Vec::new(),
        }
    }

    /// Depth-first walk from `root` on an explicit stack of
    /// `(node, next edge)` frames
    fn visit(&mut self, root: BeanId) {
        let graph = self.graph;
        let mut work = vec![(root, 0usize)];
        self.enter(root);

        while let Some((node, edge)) = work.last_mut() {
            let node = *node;
            if let Some(&dependency) = graph.dependencies(node).get(*edge) {
                *edge += 1;
                if !graph.edges.contains_key(&dependency) {
                    continue;
                }
                if !self.indices.contains_key(&dependency) {
                    self.enter(dependency);
                    work.push((dependency, 0));
                } else if self.on_stack.contains(&dependency) {
                    let low = self.lowlinks[&node].min(self.indices[&dependency]);
                    self.lowlinks.insert(node, low);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                let low = self.lowlinks[&parent].min(self.lowlinks[&node]);
                self.lowlinks.insert(parent, low);
            }
            if self.lowlinks[&node] == self.indices[&node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.reverse();
                self.components.push(component);
            }
        }
    }

    fn enter(&mut self, node: BeanId) {
        self.indices.insert(node, self.next);
        self.lowlinks.insert(node, self.next);
        self.next += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
    }
}

/// Construction order of the bean providers
#[derive(Debug, Clone, Default)]
pub struct Linearization {
    order: Vec<BeanId>,
    lazy_edges: AHashSet<(BeanId, BeanId)>,
}

impl Linearization {
    /// Beans in construction order
    pub fn order(&self) -> &[BeanId] {
        &self.order
    }

    /// True if `from` references `to` through a lazy reference
    pub fn is_lazy(&self, from: BeanId, to: BeanId) -> bool {
        self.lazy_edges.contains(&(from, to))
    }

    pub fn lazy_edge_count(&self) -> usize {
        self.lazy_edges.len()
    }

    /// Position of a bean in the construction order
    pub fn position(&self, bean: BeanId) -> Option<usize> {
        self.order.iter().position(|b| *b == bean)
    }
}

/// Order the active beans of the deployment
pub fn linearize(deployment: &BeanDeployment, resolutions: &Resolutions, interception: &InterceptionModel) -> Result<Linearization> {
    let graph = DependencyGraph::build(deployment, resolutions, interception);
    let mut lazy_edges = AHashSet::new();

    let (order, remaining) = extract(&graph, &lazy_edges);
    if remaining.is_empty() {
        #[cfg(feature = "logging")]
        debug!(target: "bean_processor", beans = order.len(), "Beans linearized");
        return Ok(Linearization { order, lazy_edges });
    }

    for component in graph.cycles() {
        let members: AHashSet<BeanId> = component.iter().copied().collect();
        for &from in &component {
            for &to in graph.dependencies(from) {
                if members.contains(&to) && deployment.bean(to).scope().is_normal() {
                    #[cfg(feature = "logging")]
                    trace!(target: "bean_processor", from = %from, to = %to, "Lazy reference");
                    lazy_edges.insert((from, to));
                }
            }
        }
    }

    let (order, remaining) = extract(&graph, &lazy_edges);
    if !remaining.is_empty() {
        let path = cycle_path(deployment, &graph, &remaining, &lazy_edges);
        return Err(DeploymentError::CircularDependency { path });
    }
    #[cfg(feature = "logging")]
    debug!(
        target: "bean_processor",
        beans = order.len(),
        lazy_edges = lazy_edges.len(),
        "Beans linearized"
    );
    Ok(Linearization { order, lazy_edges })
}

/// Kahn-style extraction in discovery order, ignoring `lazy` edges.
///
/// Returns the emitted order and the beans left over.
fn extract(graph: &DependencyGraph, lazy: &AHashSet<(BeanId, BeanId)>) -> (Vec<BeanId>, Vec<BeanId>) {
    let mut emitted: AHashSet<BeanId> = AHashSet::with_capacity(graph.nodes.len());
    let mut order = Vec::with_capacity(graph.nodes.len());
    let mut remaining: Vec<BeanId> = graph.nodes.clone();
    loop {
        let before = remaining.len();
        remaining.retain(|&bean| {
            let ready = graph
                .dependencies(bean)
                .iter()
                .all(|&dep| lazy.contains(&(bean, dep)) || emitted.contains(&dep) || !graph.edges.contains_key(&dep));
            if ready {
                emitted.insert(bean);
                order.push(bean);
            }
            !ready
        });
        if remaining.is_empty() || remaining.len() == before {
            return (order, remaining);
        }
    }
}

/// Describe one cycle among the beans that could not be emitted
fn cycle_path(
    deployment: &BeanDeployment,
    graph: &DependencyGraph,
    remaining: &[BeanId],
    lazy: &AHashSet<(BeanId, BeanId)>,
) -> String {
    let stuck: AHashSet<BeanId> = remaining.iter().copied().collect();
    let Some(&start) = remaining.first() else {
        return String::new();
    };
    // Every stuck bean has a stuck dependency; walk until a bean repeats.
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = graph
            .dependencies(current)
            .iter()
            .copied()
            .find(|dep| stuck.contains(dep) && !lazy.contains(&(current, *dep)));
        let Some(next) = next else {
            break;
        };
        if let Some(pos) = path.iter().position(|b| *b == next) {
            path.drain(..pos);
            path.push(next);
            break;
        }
        path.push(next);
        current = next;
    }
    path.iter()
        .map(|id| describe(deployment.bean(*id)))
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn describe(bean: &BeanInfo) -> String {
    format!("{} ({})", bean.bean_class(), bean.kind().label())
}
