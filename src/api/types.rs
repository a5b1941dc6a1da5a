//! Wire types shared by the tree, quiz and ask endpoints.
//!
//! JSON uses camelCase keys. Every optional field defaults when absent, since
//! the server omits back-references (a node's `parentId`) on some endpoints.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Node Types
// ============================================================================

/// Opaque identifier of a knowledge-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NodeId)
    }
}

/// One entry of the server-held knowledge tree.
///
/// `child_ids` only hints that children exist; the child nodes themselves are
/// fetched lazily and cached by the tree model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub child_ids: Option<Vec<NodeId>>,
    #[serde(default)]
    pub node_order: Option<i32>,
    #[serde(default)]
    pub level: Option<i32>,
}

impl Node {
    /// Minimal node with only identity and name set.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            content: None,
            examples: None,
            references: None,
            parent_id: None,
            child_ids: None,
            node_order: None,
            level: None,
        }
    }

    /// True when the server reported at least one child.
    pub fn has_children(&self) -> bool {
        self.child_ids.as_ref().is_some_and(|ids| !ids.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The editable text fields of this node.
    pub fn fields(&self) -> NodeFields {
        NodeFields {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            content: self.content.clone().unwrap_or_default(),
            examples: self.examples.clone().unwrap_or_default(),
            references: self.references.clone().unwrap_or_default(),
        }
    }
}

/// User-editable text of a node. Empty strings are sent as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFields {
    pub name: String,
    pub description: String,
    pub content: String,
    pub examples: String,
    pub references: String,
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Body of `PUT /{id}`: the full node as the server should store it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    pub parent_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

impl NodeUpdate {
    /// Update that keeps the node where it is and replaces its text fields.
    pub fn from_fields(node: &Node, fields: &NodeFields) -> Self {
        Self {
            name: fields.name.trim().to_string(),
            description: non_empty(&fields.description),
            content: non_empty(&fields.content),
            examples: non_empty(&fields.examples),
            references: non_empty(&fields.references),
            parent_id: node.parent_id,
            node_order: node.node_order,
            level: node.level,
        }
    }

    /// Update that keeps the node's text and moves it under `parent_id` at `order`.
    pub fn relocate(node: &Node, parent_id: Option<NodeId>, order: i32) -> Self {
        Self {
            name: node.name.clone(),
            description: node.description.clone(),
            content: node.content.clone(),
            examples: node.examples.clone(),
            references: node.references.clone(),
            parent_id,
            node_order: Some(order),
            level: None,
        }
    }
}

/// Reference to a parent in a create request: `{"id": 7}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: NodeId,
}

/// Body of `POST /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl NewNode {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(|id| ParentRef { id }),
        }
    }
}

// ============================================================================
// Quiz Types
// ============================================================================

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Response of `generate-quiz`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// Body of `submit-quiz`. Answers are keyed by question index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
    pub user_answers: BTreeMap<usize, String>,
}

/// Response of `submit-quiz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEvaluation {
    pub score: f64,
    #[serde(default)]
    pub correct_answers: usize,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default)]
    pub previous_best_score: Option<f64>,
}

/// One row of quiz history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: i64,
    pub topic: String,
    pub score: f64,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuizRequest<'a> {
    pub topic: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AskResponse {
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_deserializes_camel_case() {
        let json = r#"{
            "id": 12,
            "name": "Network Protocols",
            "description": "TCP/IP and friends",
            "parentId": 3,
            "childIds": [40, 41],
            "nodeOrder": 2,
            "level": 2
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, NodeId(12));
        assert_eq!(node.parent_id, Some(NodeId(3)));
        assert_eq!(node.child_ids, Some(vec![NodeId(40), NodeId(41)]));
        assert_eq!(node.node_order, Some(2));
        assert!(node.has_children());
        assert!(!node.is_root());
    }

    #[test]
    fn test_node_missing_optionals_default() {
        let node: Node = serde_json::from_str(r#"{"id": 1, "name": "Root"}"#).unwrap();
        assert!(node.is_root());
        assert!(!node.has_children());
        assert_eq!(node.description, None);
    }

    #[test]
    fn test_empty_child_ids_means_leaf() {
        let node: Node =
            serde_json::from_str(r#"{"id": 1, "name": "Leaf", "childIds": []}"#).unwrap();
        assert!(!node.has_children());
    }

    #[test]
    fn test_new_node_serializes_parent_ref() {
        let body = serde_json::to_value(NewNode::new("Rust", Some(NodeId(5)))).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Rust", "parent": {"id": 5}}));

        let root = serde_json::to_value(NewNode::new("Top", None)).unwrap();
        assert_eq!(root, serde_json::json!({"name": "Top"}));
    }

    #[test]
    fn test_update_from_fields_drops_blank_text() {
        let mut node = Node::new(NodeId(3), "Old");
        node.parent_id = Some(NodeId(1));
        node.node_order = Some(4);
        let fields = NodeFields {
            name: "  New  ".to_string(),
            description: "   ".to_string(),
            content: "Body".to_string(),
            ..NodeFields::default()
        };

        let update = NodeUpdate::from_fields(&node, &fields);
        assert_eq!(update.name, "New");
        assert_eq!(update.description, None);
        assert_eq!(update.content.as_deref(), Some("Body"));
        assert_eq!(update.parent_id, Some(NodeId(1)));
        assert_eq!(update.node_order, Some(4));
    }

    #[test]
    fn test_relocate_serializes_null_parent_for_root() {
        let node = Node::new(NodeId(3), "Moved");
        let value = serde_json::to_value(NodeUpdate::relocate(&node, None, 0)).unwrap();
        assert_eq!(value["parentId"], serde_json::Value::Null);
        assert_eq!(value["nodeOrder"], 0);
    }

    #[test]
    fn test_quiz_result_parses_server_timestamp() {
        let json = r#"{"id": 1, "topic": "Rust", "score": 80.0,
                       "createdAt": "2024-03-01T10:15:30", "username": "guest"}"#;
        let result: QuizResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.topic, "Rust");
        assert_eq!(result.created_at.to_string(), "2024-03-01 10:15:30");
    }

    #[test]
    fn test_submission_keys_answers_by_index() {
        let mut answers = BTreeMap::new();
        answers.insert(0, "A".to_string());
        let submission = QuizSubmission {
            topic: "Rust".to_string(),
            questions: vec![],
            user_answers: answers,
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["userAnswers"]["0"], "A");
    }

    #[test]
    fn test_node_id_parses_from_str() {
        assert_eq!(" 42 ".parse::<NodeId>().unwrap(), NodeId(42));
        assert!("abc".parse::<NodeId>().is_err());
    }
}
