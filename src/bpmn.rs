//! Structural checks for generated BPMN 2.0 XML.

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// BPMN 2.0 model namespace.
pub const BPMN_MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

const TASK_ELEMENTS: &[&str] = &[
    "task",
    "userTask",
    "serviceTask",
    "manualTask",
    "scriptTask",
    "sendTask",
    "receiveTask",
    "businessRuleTask",
];

/// Element counts of a diagram that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BpmnSummary {
    pub tasks: usize,
    pub gateways: usize,
    pub lanes: usize,
    pub flows: usize,
}

impl BpmnSummary {
    pub fn message(&self) -> String {
        format!(
            "Valid BPMN XML - {} tasks, {} gateways, {} lanes, {} flows",
            self.tasks, self.gateways, self.lanes, self.flows
        )
    }
}

/// Check that `xml` is a well-formed BPMN 2.0 document with a process, at
/// least one start event and at least one end event.
///
/// The error is a human-readable diagnostic.
pub fn validate_bpmn(xml: &str) -> Result<BpmnSummary, String> {
    let doc = Document::parse(xml).map_err(|e| format!("XML parsing error: {}", e))?;
    let root = doc.root_element();

    if root.tag_name().namespace() != Some(BPMN_MODEL_NS) {
        return Err(format!(
            "Invalid BPMN namespace. Root tag: {}",
            qualified_name(&root)
        ));
    }

    let count = |names: &[&str]| {
        root.descendants()
            .filter(|n| n.is_element() && names.iter().any(|name| n.has_tag_name((BPMN_MODEL_NS, *name))))
            .count()
    };

    if count(&["process"]) == 0 {
        return Err("No process element found".to_string());
    }
    if count(&["startEvent"]) == 0 {
        return Err("No start event found".to_string());
    }
    if count(&["endEvent"]) == 0 {
        return Err("No end event found".to_string());
    }

    Ok(BpmnSummary {
        tasks: count(TASK_ELEMENTS),
        gateways: count(&["exclusiveGateway"]),
        lanes: count(&["lane"]),
        flows: count(&["sequenceFlow"]),
    })
}

fn qualified_name(node: &Node) -> String {
    match node.tag_name().namespace() {
        Some(ns) => format!("{{{}}}{}", ns, node.tag_name().name()),
        None => node.tag_name().name().to_string(),
    }
}
