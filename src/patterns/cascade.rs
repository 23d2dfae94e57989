//! Cascade Discovery
//!
//! Walks the correlation graph for multi-hop chains that cross categories,
//! e.g. caffeine → sleep quality → next-day mood.

use crate::correlation::{CorrelationEdge, CorrelationType};
use crate::records::{AlignedData, Category};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Cascade search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Longest path, in edges
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Cascades returned
    #[serde(default = "default_max_cascades")]
    pub max_cascades: usize,
}

fn default_max_hops() -> usize {
    3
}

fn default_max_cascades() -> usize {
    10
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            max_cascades: default_max_cascades(),
        }
    }
}

/// One metric along a cascade path
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CascadeStep {
    pub metric: String,
    pub category: Category,
    /// Correlation of the edge leading into this metric (`None` for the origin)
    pub correlation: Option<f64>,
    /// Lag of the edge leading into this metric
    pub lag: usize,
}

/// A multi-hop chain of correlated metrics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Cascade {
    pub path: Vec<CascadeStep>,
    /// Number of edges in the path
    pub steps: usize,
    /// Number of edges whose endpoints are in different categories
    pub cross_category_count: usize,
    /// Mean |r| across the path's edges
    pub mean_correlation: f64,
    pub description: String,
}

/// Outgoing edge in the adjacency map
#[derive(Debug, Clone)]
struct Link {
    target: String,
    correlation: f64,
    lag: usize,
    category: Category,
}

/// Directed adjacency: same-day edges both ways, lagged edges leader → follower
fn build_adjacency(edges: &[CorrelationEdge]) -> BTreeMap<String, (Category, Vec<Link>)> {
    let mut adjacency: BTreeMap<String, (Category, Vec<Link>)> = BTreeMap::new();

    let mut add = |from: &str, from_cat: Category, to: &str, to_cat: Category, edge: &CorrelationEdge| {
        adjacency
            .entry(from.to_string())
            .or_insert_with(|| (from_cat, Vec::new()))
            .1
            .push(Link {
                target: to.to_string(),
                correlation: edge.correlation,
                lag: edge.lag,
                category: to_cat,
            });
    };

    for edge in edges {
        if edge.metric1 == edge.metric2 {
            continue;
        }
        add(&edge.metric1, edge.category1, &edge.metric2, edge.category2, edge);
        if edge.correlation_type == CorrelationType::SameDay {
            add(&edge.metric2, edge.category2, &edge.metric1, edge.category1, edge);
        }
    }

    for (_, links) in adjacency.values_mut() {
        links.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.target.cmp(&b.target))
        });
    }

    adjacency
}

/// Discover cascades from correlation edges
///
/// Paths have 2..=max_hops edges, never revisit a metric and span at least
/// two categories. Ranked by mean |r|, deduplicated by description.
pub fn discover_cascades(
    data: &AlignedData,
    edges: &[CorrelationEdge],
    config: &CascadeConfig,
) -> Vec<Cascade> {
    let adjacency = build_adjacency(edges);
    let mut found = Vec::new();

    for (origin, (category, _)) in &adjacency {
        let mut path = vec![CascadeStep {
            metric: origin.clone(),
            category: *category,
            correlation: None,
            lag: 0,
        }];
        let mut visited: HashSet<String> = HashSet::from([origin.clone()]);
        walk(&adjacency, &mut path, &mut visited, config.max_hops, data, &mut found);
    }

    found.sort_by(|a: &Cascade, b: &Cascade| {
        b.mean_correlation
            .partial_cmp(&a.mean_correlation)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.cross_category_count.cmp(&a.cross_category_count))
            .then_with(|| a.steps.cmp(&b.steps))
            .then_with(|| a.description.cmp(&b.description))
    });

    let total = found.len();
    let mut seen: HashSet<String> = HashSet::new();
    let cascades: Vec<Cascade> = found
        .into_iter()
        .filter(|c| seen.insert(c.description.clone()))
        .take(config.max_cascades)
        .collect();

    tracing::debug!(
        nodes = adjacency.len(),
        paths = total,
        reported = cascades.len(),
        "Discovered cascades"
    );

    cascades
}

fn walk(
    adjacency: &BTreeMap<String, (Category, Vec<Link>)>,
    path: &mut Vec<CascadeStep>,
    visited: &mut HashSet<String>,
    max_hops: usize,
    data: &AlignedData,
    found: &mut Vec<Cascade>,
) {
    let hops = path.len() - 1;

    if hops >= 2 {
        let categories: BTreeSet<Category> = path.iter().map(|s| s.category).collect();
        if categories.len() >= 2 {
            found.push(build_cascade(path, data));
        }
    }

    if hops >= max_hops {
        return;
    }

    let Some(current) = path.last().map(|s| s.metric.clone()) else {
        return;
    };
    let Some((_, links)) = adjacency.get(&current) else {
        return;
    };

    for link in links {
        if visited.contains(&link.target) {
            continue;
        }
        visited.insert(link.target.clone());
        path.push(CascadeStep {
            metric: link.target.clone(),
            category: link.category,
            correlation: Some(link.correlation),
            lag: link.lag,
        });

        walk(adjacency, path, visited, max_hops, data, found);

        path.pop();
        visited.remove(&link.target);
    }
}

fn build_cascade(path: &[CascadeStep], data: &AlignedData) -> Cascade {
    let correlations: Vec<f64> = path.iter().filter_map(|s| s.correlation).collect();
    let mean_correlation =
        correlations.iter().map(|r| r.abs()).sum::<f64>() / correlations.len().max(1) as f64;

    let cross_category_count = path
        .windows(2)
        .filter(|w| w[0].category != w[1].category)
        .count();

    let description = path
        .iter()
        .map(|s| {
            data.metric(&s.metric)
                .map(|m| m.label.clone())
                .unwrap_or_else(|| s.metric.clone())
        })
        .collect::<Vec<String>>()
        .join(" → ");

    Cascade {
        path: path.to_vec(),
        steps: path.len() - 1,
        cross_category_count,
        mean_correlation,
        description,
    }
}
