//! XML-import adapter (§6): reconstructs a forest from a PMML-like
//! analytic-workflow document via a streaming pull parser, never
//! materializing a full DOM.

use crate::errors::ClassifierError;
use crate::forest::{EvaluationNode, Forest, WeightedTree};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Imports a forest from one `PredictEngineNode`/`TreeList`/`TreeModel`
/// document. `specified_category` names which `yprob` index the caller
/// wants interpreted as "signal".
pub struct XmlImporter {
    specified_category: usize,
}

#[derive(Default)]
struct NodeBuild {
    field: Option<String>,
    op: Option<String>,
    value: Option<f64>,
    yprob: Option<Vec<f64>>,
    score: Option<f64>,
}

/// Attaches a finished child node to whatever is on top of the stack, or
/// records it as the tree root if the stack is empty.
fn push_child(
    stack: &mut [(NodeBuild, Vec<EvaluationNode>)],
    next_tree_root: &mut Option<EvaluationNode>,
    node: EvaluationNode,
) {
    if let Some((_, children)) = stack.last_mut() {
        children.push(node);
    } else {
        *next_tree_root = Some(node);
    }
}

impl XmlImporter {
    pub fn new(specified_category: usize) -> Self {
        Self { specified_category }
    }

    pub fn import(&self, xml: &str) -> Result<Forest, ClassifierError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = true;
        reader.config_mut().trim_text_end = true;

        let mut buf = Vec::new();
        let mut in_engine = false;
        let mut in_tree_list = false;
        let mut trees: Vec<EvaluationNode> = Vec::new();

        // Stack of (NodeBuild, finished children collected so far, in
        // document order).
        let mut stack: Vec<(NodeBuild, Vec<EvaluationNode>)> = Vec::new();
        let mut next_tree_root: Option<EvaluationNode> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ClassifierError::InvalidXml(format!("xml parse error: {}", e)))?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "PredictEngineNode" {
                        let has_engine_class = e
                            .attributes()
                            .flatten()
                            .any(|a| a.key.as_ref() == b"engineClass");
                        if has_engine_class {
                            in_engine = true;
                        }
                        continue;
                    }
                    if !in_engine {
                        continue;
                    }
                    if name == "TreeList" {
                        in_tree_list = true;
                        continue;
                    }
                    if !in_tree_list {
                        continue;
                    }
                    if name == "TreeModel" {
                        stack.clear();
                        next_tree_root = None;
                        continue;
                    }
                    if name == "Node" {
                        let mut build = NodeBuild::default();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"yprob" => {
                                    let text = String::from_utf8_lossy(&attr.value).to_string();
                                    let parsed: Result<Vec<f64>, _> =
                                        text.split(',').map(|s| s.trim().parse()).collect();
                                    build.yprob = parsed.ok();
                                }
                                b"score" => {
                                    build.score =
                                        String::from_utf8_lossy(&attr.value).parse().ok();
                                }
                                _ => {}
                            }
                        }
                        if is_empty {
                            let node = self.finish_node(build, Vec::new())?;
                            push_child(&mut stack, &mut next_tree_root, node);
                        } else {
                            stack.push((build, Vec::new()));
                        }
                        continue;
                    }
                    if name == "SimplePredicate" {
                        let mut field = None;
                        let mut operator = None;
                        let mut value = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"field" => {
                                    field = Some(
                                        String::from_utf8_lossy(&attr.value).to_string(),
                                    )
                                }
                                b"operator" => {
                                    operator = Some(
                                        String::from_utf8_lossy(&attr.value).to_string(),
                                    )
                                }
                                b"value" => {
                                    value = String::from_utf8_lossy(&attr.value)
                                        .parse::<f64>()
                                        .ok()
                                }
                                _ => {}
                            }
                        }
                        let (field, operator, value) = match (field, operator, value) {
                            (Some(f), Some(o), Some(v)) => (f, o, v),
                            _ => {
                                return Err(ClassifierError::InvalidXml(
                                    "SimplePredicate missing field, operator, or value"
                                        .to_string(),
                                ))
                            }
                        };
                        if let Some((build, _)) = stack.last_mut() {
                            build.field = Some(field);
                            build.op = Some(operator);
                            build.value = Some(value);
                        }
                        continue;
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "PredictEngineNode" => in_engine = false,
                        "TreeList" => in_tree_list = false,
                        "TreeModel" => {
                            if let Some(root) = next_tree_root.take() {
                                trees.push(root);
                            }
                        }
                        "Node" => {
                            if let Some((build, children)) = stack.pop() {
                                let node = self.finish_node(build, children)?;
                                push_child(&mut stack, &mut next_tree_root, node);
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        if trees.is_empty() {
            return Err(ClassifierError::InvalidXml(
                "no PredictEngineNode/TreeList/TreeModel found".to_string(),
            ));
        }

        let weight = 1.0 / trees.len() as f64;
        let mut forest = Forest::new("imported");
        for root in trees {
            forest.push(WeightedTree::new(weight, root));
        }
        Ok(forest)
    }

    fn finish_node(
        &self,
        build: NodeBuild,
        mut children: Vec<EvaluationNode>,
    ) -> Result<EvaluationNode, ClassifierError> {
        if children.is_empty() {
            if let Some(yprob) = build.yprob {
                let purity = yprob.get(self.specified_category).copied().ok_or_else(|| {
                    ClassifierError::InvalidXml(
                        "specifiedCategory index out of range for yprob".to_string(),
                    )
                })?;
                return Ok(EvaluationNode::leaf(purity));
            }
            if let Some(score) = build.score {
                return Ok(EvaluationNode::leaf(score));
            }
            return Err(ClassifierError::InvalidXml(
                "leaf Node missing yprob and score".to_string(),
            ));
        }
        if children.len() != 2 {
            return Err(ClassifierError::InvalidXml(
                "expected exactly two children under a SimplePredicate branch".to_string(),
            ));
        }

        let field = build.field.ok_or_else(|| {
            ClassifierError::InvalidXml("branch Node missing SimplePredicate".to_string())
        })?;
        let operator = build.op.unwrap_or_default();
        let value = build.value.unwrap_or(0.0);

        // Document order is "predicate true" then "predicate false"; ids
        // are reassigned fresh as 2*parent/2*parent+1 regardless of the
        // source document (§6), so only the lessThan/greaterOrEqual sense
        // matters here, not any id the source carried.
        let true_branch = children.remove(0);
        let false_branch = children.remove(0);
        let (left, right) = match operator.as_str() {
            "lessThan" => (true_branch, false_branch),
            "greaterOrEqual" => (false_branch, true_branch),
            other => {
                return Err(ClassifierError::InvalidXml(format!(
                    "unsupported predicate operator '{}'",
                    other
                )))
            }
        };

        let feature_index: usize = field
            .parse()
            .map_err(|_| ClassifierError::InvalidXml(format!("non-numeric field '{}'", field)))?;

        Ok(EvaluationNode::branch(feature_index, value, left, right))
    }
}
