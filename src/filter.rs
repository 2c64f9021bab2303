//! Filter builder: a degenerate 0/1 tree built from threshold cuts, meant
//! to be prepended to a forest with weight 0 (§4.7).

use crate::errors::ClassifierError;
use crate::forest::{EvaluationNode, WeightedTree};
use crate::table::TrainingContext;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq)]
enum CutOp {
    Less,
    GreaterOrEqual,
}

/// Accumulates cuts and produces the degenerate filter tree. Each
/// surviving path continues via the "pass" child; the other child is
/// immediately a reject leaf (purity 0). The path that survives every cut
/// ends in an accept leaf (purity 1) once `close()` is called.
pub struct FilterBuilder<'a> {
    ctx: &'a mut TrainingContext,
    nodes: Vec<(u64, i64, f64)>,
    open_id: u64,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(ctx: &'a mut TrainingContext) -> Self {
        Self {
            ctx,
            nodes: Vec::new(),
            open_id: 0,
        }
    }

    /// Add one cut: `name <op> value` with `op` in `{"<", ">="}`.
    pub fn add_cut(&mut self, name: &str, op: &str, value: f64) -> Result<(), ClassifierError> {
        let op = match op {
            ">=" => CutOp::GreaterOrEqual,
            "<" => CutOp::Less,
            other => {
                return Err(ClassifierError::InvalidInput(format!(
                    "Filter: only allow '<' and '>=', found {}",
                    other
                )))
            }
        };

        if self.open_id == 0 {
            self.open_id = 1;
        }

        let index = self.ctx.resolve_or_append(name);
        let left_rejects = op == CutOp::GreaterOrEqual;
        let id = self.open_id;

        self.nodes.push((id, index as i64, value));

        let reject_id = if left_rejects { 2 * id } else { 2 * id + 1 };
        let continue_id = if left_rejects { 2 * id + 1 } else { 2 * id };
        self.nodes.push((reject_id, -1, 0.0));
        self.open_id = continue_id;

        Ok(())
    }

    /// Close the filter: the last surviving path gets an accept leaf
    /// (purity 1). Produces a `WeightedTree` with weight 0, ready to
    /// prepend to a forest. With no cuts added, the filter is the trivial
    /// accept-everything leaf.
    pub fn close(self) -> WeightedTree {
        if self.open_id == 0 {
            return WeightedTree::new(0.0, EvaluationNode::leaf(1.0));
        }
        let mut nodes = self.nodes;
        nodes.push((self.open_id, -1, 1.0));
        let root = build_from_triples(&nodes, 1);
        WeightedTree::new(0.0, root)
    }

    /// Read cuts from a file: `<name> <op> <value>` lines, `#` comments,
    /// blank lines ignored, `@<path>` includes another file resolved
    /// relative to this file's directory.
    pub fn add_cuts_from_file(&mut self, path: &Path) -> Result<(), ClassifierError> {
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.add_cuts_from_str(&text, dir)
    }

    fn add_cuts_from_str(&mut self, text: &str, dir: &Path) -> Result<(), ClassifierError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('@') {
                let included: PathBuf = dir.join(rest.trim());
                self.add_cuts_from_file(&included)?;
                continue;
            }
            let mut parts = line.split_whitespace();
            let name = parts.next().ok_or_else(|| {
                ClassifierError::InvalidInput(format!("malformed cut line: '{}'", line))
            })?;
            let op = parts.next().ok_or_else(|| {
                ClassifierError::InvalidInput(format!("malformed cut line: '{}'", line))
            })?;
            let value: f64 = parts
                .next()
                .ok_or_else(|| {
                    ClassifierError::InvalidInput(format!("malformed cut line: '{}'", line))
                })?
                .parse()
                .map_err(|_| {
                    ClassifierError::InvalidInput(format!("non-numeric cut value in: '{}'", line))
                })?;
            self.add_cut(name, op, value)?;
        }
        Ok(())
    }
}

fn build_from_triples(nodes: &[(u64, i64, f64)], id: u64) -> EvaluationNode {
    let &(_, index, value) = nodes
        .iter()
        .find(|&&(node_id, _, _)| node_id == id)
        .expect("filter builder only emits reachable ids");
    if index == -1 {
        return EvaluationNode::leaf(value);
    }
    let left = build_from_triples(nodes, 2 * id);
    let right = build_from_triples(nodes, 2 * id + 1);
    EvaluationNode::branch(index as usize, value, left, right)
}
