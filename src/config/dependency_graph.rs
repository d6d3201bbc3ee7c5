// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::JobId;
use crate::errors::ConfigurationError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Job → declared dependencies, in the order jobs were added.
///
/// Built and thrown away for every pipeline construction. Insertion order
/// drives traversal order, so linearization is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    vertices: Vec<JobId>,
    edges: Vec<Vec<JobId>>,
    index: HashMap<JobId, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job and the jobs it depends on. Re-adding a job replaces its edges.
    pub fn add_dependency(&mut self, job: JobId, dependencies: Vec<JobId>) {
        match self.index.get(&job) {
            Some(&vertex) => self.edges[vertex] = dependencies,
            None => {
                self.index.insert(job.clone(), self.vertices.len());
                self.vertices.push(job);
                self.edges.push(dependencies);
            }
        }
    }

    pub fn dependencies(&self, job: &str) -> Option<&[JobId]> {
        self.index.get(job).map(|&vertex| self.edges[vertex].as_slice())
    }

    pub fn contains(&self, job: &str) -> bool {
        self.index.contains_key(job)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Order jobs so that every job comes after all of its dependencies.
    ///
    /// One three-color depth-first pass both detects cycles and produces the
    /// order (post-order). A cycle is reported as the closed walk from the
    /// back-edge target along the current path, e.g. `a -> c -> b -> a`.
    pub fn linearize(&self) -> Result<Vec<JobId>, ConfigurationError> {
        let mut color = vec![Color::White; self.vertices.len()];
        let mut order = Vec::with_capacity(self.vertices.len());
        // (vertex, next edge to follow); doubles as the current DFS path
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.vertices.len() {
            if color[root] != Color::White {
                continue;
            }
            color[root] = Color::Grey;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (vertex, next) = *frame;
                let Some(dependency) = self.edges[vertex].get(next) else {
                    color[vertex] = Color::Black;
                    order.push(self.vertices[vertex].clone());
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let target = self.index.get(dependency).copied().ok_or_else(|| {
                    ConfigurationError::JobNotFound {
                        job: dependency.clone(),
                        required_by: Some(self.vertices[vertex].clone()),
                    }
                })?;

                match color[target] {
                    Color::White => {
                        color[target] = Color::Grey;
                        stack.push((target, 0));
                    }
                    Color::Grey => {
                        return Err(ConfigurationError::CycleDependency {
                            path: self.cycle_path(&stack, target),
                        })
                    }
                    Color::Black => {}
                }
            }
        }

        Ok(order)
    }

    fn cycle_path(&self, stack: &[(usize, usize)], target: usize) -> Vec<JobId> {
        let start = stack
            .iter()
            .position(|&(vertex, _)| vertex == target)
            .unwrap_or(0);
        stack[start..]
            .iter()
            .map(|&(vertex, _)| self.vertices[vertex].clone())
            .chain(std::iter::once(self.vertices[target].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (job, deps) in edges {
            graph.add_dependency(
                JobId::from(*job),
                deps.iter().map(|d| JobId::from(*d)).collect(),
            );
        }
        graph
    }

    fn position(order: &[JobId], job: &str) -> usize {
        order.iter().position(|id| id.as_str() == job).unwrap()
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let g = graph(&[
            ("report", &["score", "dates"]),
            ("score", &["sku"]),
            ("dates", &[]),
            ("sku", &[]),
        ]);
        let order = g.linearize().unwrap();

        assert_eq!(order.len(), 4);
        for (job, deps) in [("report", vec!["score", "dates"]), ("score", vec!["sku"])] {
            for dep in deps {
                assert!(position(&order, dep) < position(&order, job));
            }
        }
    }

    #[test]
    fn test_diamond_visits_shared_dependency_once() {
        let g = graph(&[
            ("d", &["b", "c"]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("a", &[]),
        ]);
        let order = g.linearize().unwrap();
        assert_eq!(order.iter().filter(|id| id.as_str() == "a").count(), 1);
        assert_eq!(order.first().map(JobId::as_str), Some("a"));
        assert_eq!(order.last().map(JobId::as_str), Some("d"));
    }

    #[test]
    fn test_three_job_cycle_reports_closed_walk() {
        let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);
        let err = g.linearize().unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::CycleDependency {
                path: vec!["a".into(), "c".into(), "b".into(), "a".into()],
            }
        );
        assert_eq!(
            err.to_string(),
            "cyclic job dependency detected: a -> c -> b -> a"
        );
    }

    #[test]
    fn test_cycle_below_acyclic_prefix() {
        let g = graph(&[("top", &["x"]), ("x", &["y"]), ("y", &["x"])]);
        match g.linearize().unwrap_err() {
            ConfigurationError::CycleDependency { path } => {
                let path: Vec<&str> = path.iter().map(JobId::as_str).collect();
                assert_eq!(path, vec!["x", "y", "x"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_dependency_names_parent() {
        let g = graph(&[("a", &["ghost"])]);
        assert_eq!(
            g.linearize().unwrap_err(),
            ConfigurationError::JobNotFound {
                job: "ghost".into(),
                required_by: Some("a".into()),
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        let g = DependencyGraph::new();
        assert!(g.is_empty());
        assert!(g.linearize().unwrap().is_empty());
    }
}
