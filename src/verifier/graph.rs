//! Event routing graph with iterative cycle detection

use std::collections::BTreeMap;

/// Directed graph over object ids, stored as an index arena.
/// Node indices follow first appearance, so traversal order is stable.
#[derive(Debug, Default)]
pub(super) struct RouteGraph<'a> {
    index: BTreeMap<&'a str, usize>,
    names: Vec<&'a str>,
    edges: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

impl<'a> RouteGraph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &'a str) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.names.len();
        self.index.insert(id, i);
        self.names.push(id);
        self.edges.push(Vec::new());
        i
    }

    pub fn add_edge(&mut self, from: &'a str, to: &'a str) {
        let from = self.node(from);
        let to = self.node(to);
        self.edges[from].push(to);
    }

    /// First node found on a cycle, if any
    pub fn find_cycle(&self) -> Option<&'a str> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        // (node, next edge to follow)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.names.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnPath;
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let (node, next) = *top;
                match self.edges[node].get(next) {
                    Some(&child) => {
                        top.1 += 1;
                        match marks[child] {
                            Mark::OnPath => return Some(self.names[child]),
                            Mark::Unvisited => {
                                marks[child] = Mark::OnPath;
                                stack.push((child, 0));
                            }
                            Mark::Done => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        None
    }
}
