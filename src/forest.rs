//! Forest representation, evaluation, and the line-oriented text
//! serialization format (including read-support for the legacy
//! weight-carrier revision).

use crate::errors::ClassifierError;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// A node in a frozen, evaluation-only tree. Owns only its children; no
/// back-references, no sharing.
#[derive(Clone, Debug, PartialEq)]
pub enum EvaluationNode {
    Leaf {
        purity: f64,
    },
    Branch {
        feature_index: usize,
        threshold: f64,
        left: Box<EvaluationNode>,
        right: Box<EvaluationNode>,
    },
}

impl EvaluationNode {
    pub fn leaf(purity: f64) -> Self {
        EvaluationNode::Leaf { purity }
    }

    pub fn branch(feature_index: usize, threshold: f64, left: Self, right: Self) -> Self {
        EvaluationNode::Branch {
            feature_index,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, EvaluationNode::Leaf { .. })
    }

    /// Descend from this node to a leaf for the given feature row, per the
    /// branch rule `row[feature_index] < threshold ⇒ left`.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        match self {
            EvaluationNode::Leaf { purity } => *purity,
            EvaluationNode::Branch {
                feature_index,
                threshold,
                left,
                right,
            } => {
                if row[*feature_index] < *threshold {
                    left.evaluate(row)
                } else {
                    right.evaluate(row)
                }
            }
        }
    }

    /// Pre-order walk: self, right, left. Matches the reference print order.
    fn for_each_pre_order<F: FnMut(u64, &EvaluationNode)>(&self, id: u64, f: &mut F) {
        f(id, self);
        if let EvaluationNode::Branch { left, right, .. } = self {
            right.for_each_pre_order(2 * id + 1, f);
            left.for_each_pre_order(2 * id, f);
        }
    }

}

/// One (weight, root) pair. `weight > 0` votes; `weight <= 0` filters.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedTree {
    pub weight: f64,
    pub root: EvaluationNode,
}

impl WeightedTree {
    pub fn new(weight: f64, root: EvaluationNode) -> Self {
        Self { weight, root }
    }

    pub fn is_filter(&self) -> bool {
        self.weight <= 0.0
    }
}

/// An ordered sequence of weighted trees sharing one title (the schema
/// label carried on the first line of the serialized form).
#[derive(Clone, Debug, Default)]
pub struct Forest {
    title: String,
    trees: Vec<WeightedTree>,
}

impl Forest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            trees: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn trees(&self) -> &[WeightedTree] {
        &self.trees
    }

    pub fn push(&mut self, tree: WeightedTree) {
        self.trees.push(tree);
    }

    pub fn prepend(&mut self, tree: WeightedTree) {
        self.trees.insert(0, tree);
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Merge another forest's trees into this one; both must share a title.
    pub fn append_forest(&mut self, other: Forest) -> Result<(), ClassifierError> {
        if self.title != other.title {
            return Err(ClassifierError::InvalidInput(format!(
                "merging trees of different flavours: '{}' vs '{}'",
                self.title, other.title
            )));
        }
        self.trees.extend(other.trees);
        Ok(())
    }

    /// Evaluate the forest on one feature row, per §4.2.
    pub fn evaluate(&self, row: &[f64]) -> Result<f64, ClassifierError> {
        let mut sum_of_weights = 0.0;
        let mut weighted_sum = 0.0;
        for tree in &self.trees {
            let value = tree.root.evaluate(row);
            if tree.weight <= 0.0 {
                if value == 0.0 {
                    return Ok(0.0);
                }
                if value != 1.0 {
                    return Err(ClassifierError::InvalidForest(
                        "filter tree evaluated to a value other than 0 or 1".to_string(),
                    ));
                }
                continue;
            }
            sum_of_weights += tree.weight;
            weighted_sum += tree.weight * value;
        }
        Ok(if sum_of_weights != 0.0 {
            weighted_sum / sum_of_weights
        } else {
            1.0
        })
    }

    /// Write the §4.3 text format: title line, then `<id> <index> <value>`
    /// triples per tree, always in the modern (id 0, index −10) shape.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), ClassifierError> {
        writeln!(w, "{}", self.title)?;
        for tree in &self.trees {
            writeln!(w, "\t0\t-10\t{}", tree.weight)?;
            let mut error = None;
            tree.root.for_each_pre_order(1, &mut |id, node| {
                if error.is_some() {
                    return;
                }
                let (index, value) = match node {
                    EvaluationNode::Leaf { purity } => (-1i64, *purity),
                    EvaluationNode::Branch {
                        feature_index,
                        threshold,
                        ..
                    } => (*feature_index as i64, *threshold),
                };
                if let Err(e) = writeln!(w, "\t{}\t{}\t{}", id, index, value) {
                    error = Some(e);
                }
            });
            if let Some(e) = error {
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub fn to_text(&self) -> Result<String, ClassifierError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8(buf).expect("serialized forest is valid UTF-8"))
    }

    /// Parse the §4.3 text format, accepting both the modern (id 0) and
    /// legacy (weight-carrier node with index −10 at a non-zero id)
    /// revisions on read.
    pub fn read_from<R: BufRead>(mut r: R) -> Result<Self, ClassifierError> {
        let mut title = String::new();
        r.read_line(&mut title)?;
        let title = title.trim_end_matches(['\r', '\n']).to_string();

        let mut trees = Vec::new();
        let mut pending_weight: Option<f64> = None;
        let mut current: HashMap<u64, (i64, f64)> = HashMap::new();
        let mut saw_any_node = false;

        let flush = |pending_weight: &mut Option<f64>,
                     current: &mut HashMap<u64, (i64, f64)>,
                     trees: &mut Vec<WeightedTree>|
         -> Result<(), ClassifierError> {
            if let Some(weight) = pending_weight.take() {
                if current.contains_key(&1) {
                    let root = build_node(current, 1)?;
                    trees.push(WeightedTree::new(weight, root));
                }
            }
            current.clear();
            Ok(())
        };

        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let id: i64 = parts
                .next()
                .ok_or_else(|| ClassifierError::InvalidForest("missing id field".to_string()))?
                .parse()
                .map_err(|_| ClassifierError::InvalidForest("non-integer id".to_string()))?;
            if id < 0 {
                break;
            }
            let index: i64 = parts
                .next()
                .ok_or_else(|| ClassifierError::InvalidForest("missing index field".to_string()))?
                .parse()
                .map_err(|_| ClassifierError::InvalidForest("non-integer index".to_string()))?;
            let value: f64 = parts
                .next()
                .ok_or_else(|| ClassifierError::InvalidForest("missing value field".to_string()))?
                .parse()
                .map_err(|_| ClassifierError::InvalidForest("non-numeric value".to_string()))?;

            if index == -10 {
                // Tree-metadata marker: modern form uses id 0, the legacy
                // revision places this node directly above the root at
                // whatever id preceded it. Either way it starts a new tree.
                flush(&mut pending_weight, &mut current, &mut trees)?;
                pending_weight = Some(value);
                continue;
            }

            if id == 1 && pending_weight.is_none() && !saw_any_node {
                // Implicit weight-1.0 tree with no preceding id=0 line.
                pending_weight = Some(1.0);
            }
            saw_any_node = true;
            current.insert(id as u64, (index, value));
        }
        flush(&mut pending_weight, &mut current, &mut trees)?;

        Ok(Forest { title, trees })
    }

    pub fn from_text(text: &str) -> Result<Self, ClassifierError> {
        Self::read_from(std::io::Cursor::new(text.as_bytes()))
    }
}

fn build_node(
    nodes: &HashMap<u64, (i64, f64)>,
    id: u64,
) -> Result<EvaluationNode, ClassifierError> {
    let (index, value) = *nodes
        .get(&id)
        .ok_or_else(|| ClassifierError::InvalidForest(format!("node {} not found", id)))?;
    if index == -1 {
        return Ok(EvaluationNode::leaf(value));
    }
    let left = build_node(nodes, 2 * id)?;
    let right = build_node(nodes, 2 * id + 1)?;
    Ok(EvaluationNode::branch(index as usize, value, left, right))
}
