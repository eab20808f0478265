//! Generic shortest-path searches over weighted graphs.
//!
//! Two searches share one min-heap frontier:
//! - [`AStar`] finds a single path between two nodes.
//! - [`Dijkstra`] floods outward from a start node and reports the cheapest
//!   cost to every node it reaches, optionally stopping at a cost budget.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

/// A trait for graphs that can be searched.
///
/// `Node`: The type of node identifiers (e.g., a tile coordinate).
/// `Ctx`: A context object passed to cost calculations (e.g., the movement type).
pub trait Graph<Node, Ctx> {
    /// Return the nodes reachable in one step from `node`.
    fn neighbors(&self, node: Node, context: &Ctx) -> Vec<Node>;

    /// Calculate the cost to move from `from` to `to`.
    fn cost(&self, from: Node, to: Node, context: &Ctx) -> u32;

    /// Estimated cost from `from` to `target`.
    /// For A*, this must be admissible (never overestimate).
    fn heuristic(&self, from: Node, target: Node, context: &Ctx) -> u32;
}

/// A generic A* pathfinder.
pub struct AStar;

impl AStar {
    /// Find the shortest path from `start` to `goal`.
    ///
    /// Returns the node sequence (start and goal included) and its total cost,
    /// or `None` when the goal is unreachable.
    pub fn find_path<Node, Ctx, G>(
        graph: &G,
        start: Node,
        goal: Node,
        context: &Ctx,
    ) -> Option<(Vec<Node>, u32)>
    where
        Node: Copy + Eq + Hash + std::fmt::Debug,
        G: Graph<Node, Ctx>,
    {
        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<Node, Node> = HashMap::new();
        let mut g_score: HashMap<Node, u32> = HashMap::new();
        let mut closed_set: HashSet<Node> = HashSet::new();

        g_score.insert(start, 0);
        open_set.push(Frontier {
            node: start,
            cost: 0,
            priority: graph.heuristic(start, goal, context),
        });

        while let Some(Frontier { node: current, cost: current_g, .. }) = open_set.pop() {
            if !closed_set.insert(current) {
                continue;
            }

            if current == goal {
                return Some((reconstruct(&came_from, current), current_g));
            }

            for neighbor in graph.neighbors(current, context) {
                if closed_set.contains(&neighbor) {
                    continue;
                }

                let tentative_g = current_g.saturating_add(graph.cost(current, neighbor, context));
                if tentative_g < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    open_set.push(Frontier {
                        node: neighbor,
                        cost: tentative_g,
                        priority: tentative_g
                            .saturating_add(graph.heuristic(neighbor, goal, context)),
                    });
                }
            }
        }

        None
    }
}

/// Cost-limited uniform-cost flood.
pub struct Dijkstra;

impl Dijkstra {
    /// Cheapest cost from `start` to every node whose cost does not exceed
    /// `max_cost`. The start node is always present with cost 0.
    ///
    /// Pass `u32::MAX` for an unlimited flood.
    pub fn costs_within<Node, Ctx, G>(
        graph: &G,
        start: Node,
        max_cost: u32,
        context: &Ctx,
    ) -> HashMap<Node, u32>
    where
        Node: Copy + Eq + Hash,
        G: Graph<Node, Ctx>,
    {
        let mut open_set = BinaryHeap::new();
        let mut best: HashMap<Node, u32> = HashMap::new();
        let mut settled: HashSet<Node> = HashSet::new();

        best.insert(start, 0);
        open_set.push(Frontier {
            node: start,
            cost: 0,
            priority: 0,
        });

        while let Some(Frontier { node, cost, .. }) = open_set.pop() {
            if !settled.insert(node) {
                continue;
            }

            for neighbor in graph.neighbors(node, context) {
                if settled.contains(&neighbor) {
                    continue;
                }
                let next = cost.saturating_add(graph.cost(node, neighbor, context));
                if next > max_cost {
                    continue;
                }
                if next < best.get(&neighbor).copied().unwrap_or(u32::MAX) {
                    best.insert(neighbor, next);
                    open_set.push(Frontier {
                        node: neighbor,
                        cost: next,
                        priority: next,
                    });
                }
            }
        }

        best
    }
}

fn reconstruct<Node: Copy + Eq + Hash>(came_from: &HashMap<Node, Node>, end: Node) -> Vec<Node> {
    let mut path = vec![end];
    let mut curr = end;
    while let Some(&prev) = came_from.get(&curr) {
        path.push(prev);
        curr = prev;
    }
    path.reverse();
    path
}

/// Heap entry shared by both searches.
#[derive(Copy, Clone, Eq, PartialEq)]
struct Frontier<Node> {
    node: Node,
    cost: u32,     // Actual cost from start (g_score)
    priority: u32, // Estimated total cost (f_score = g + h)
}

// BinaryHeap is a max-heap, so the ordering is flipped to pop the cheapest entry first.
impl<Node: Eq> Ord for Frontier<Node> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.cost.cmp(&self.cost))
    }
}

impl<Node: Eq> PartialOrd for Frontier<Node> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
