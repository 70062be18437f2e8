//! Inter-agent message types.
//!
//! [`AgentMessage`] is the unit of communication on the broker. The wire
//! shape is `{agent_id, timestamp, message_type, content, target_agents}`
//! with an ISO-8601 timestamp; `target_agents` is either an explicit list
//! of agent ids or the single wildcard `"*"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a message's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Output of an analysis step.
    Analysis,
    /// A debate argument (supporting, opposing, or rebuttal).
    Argument,
    /// A final or intermediate verdict announcement.
    Decision,
    /// Feedback from meta-evaluation or correction.
    Feedback,
    /// A request for work.
    Request,
    /// A response to a request.
    Response,
}

/// Recipients of a message.
///
/// The two supported forms are wildcard-only (`["*"]` on the wire) and an
/// explicit id list. A mixed list containing the wildcard alongside ids is
/// normalized to [`Targets::All`] rather than guessing at extra semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Targets {
    /// Every currently subscribed agent.
    All,
    /// An explicit, possibly empty, list of agent ids.
    Agents(Vec<String>),
}

/// The wildcard target value.
pub const WILDCARD: &str = "*";

impl Targets {
    /// Construct an explicit target list from anything string-like.
    /// Lists containing the wildcard normalize to [`Targets::All`].
    pub fn agents<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from(ids.into_iter().map(Into::into).collect::<Vec<String>>())
    }

    /// Whether a message with these targets should be delivered to `id`.
    pub fn includes(&self, id: &str) -> bool {
        match self {
            Targets::All => true,
            Targets::Agents(ids) => ids.iter().any(|t| t == id),
        }
    }
}

impl From<Vec<String>> for Targets {
    fn from(ids: Vec<String>) -> Self {
        if ids.iter().any(|t| t == WILDCARD) {
            Targets::All
        } else {
            Targets::Agents(ids)
        }
    }
}

impl From<Targets> for Vec<String> {
    fn from(targets: Targets) -> Self {
        match targets {
            Targets::All => vec![WILDCARD.to_string()],
            Targets::Agents(ids) => ids,
        }
    }
}

/// A message exchanged between agents via the broker.
///
/// Immutable once published; the broker retains a bounded history of
/// published messages for introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Agent id of the sender.
    pub agent_id: String,

    /// Creation time, stamped by the constructing broker.
    pub timestamp: DateTime<Utc>,

    /// Message classification.
    #[serde(rename = "message_type")]
    pub kind: MessageKind,

    /// Arbitrary JSON payload.
    pub content: Value,

    /// Intended recipients.
    #[serde(rename = "target_agents")]
    pub targets: Targets,
}

impl AgentMessage {
    /// Create a message stamped with the current time.
    pub fn new(
        agent_id: impl Into<String>,
        kind: MessageKind,
        content: Value,
        targets: Targets,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            kind,
            content,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_field_names() {
        let msg = AgentMessage::new(
            "JA",
            MessageKind::Decision,
            json!({"verdict": "REAL"}),
            Targets::agents(["MEA", "COA"]),
        );
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["agent_id"], "JA");
        assert_eq!(v["message_type"], "decision");
        assert_eq!(v["content"]["verdict"], "REAL");
        assert_eq!(v["target_agents"], json!(["MEA", "COA"]));
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn wildcard_serializes_as_star() {
        let msg = AgentMessage::new("COA", MessageKind::Feedback, json!({}), Targets::All);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["target_agents"], json!(["*"]));
    }

    #[test]
    fn mixed_target_list_normalizes_to_all() {
        let targets = Targets::from(vec!["TCA".to_string(), "*".to_string()]);
        assert_eq!(targets, Targets::All);

        let json = r#"{"agent_id":"a","timestamp":"2026-01-01T00:00:00Z","message_type":"analysis","content":{},"target_agents":["JA","*","VVA"]}"#;
        let msg: AgentMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.targets, Targets::All);
    }

    #[test]
    fn targets_includes() {
        let explicit = Targets::agents(["JA", "MEA"]);
        assert!(explicit.includes("JA"));
        assert!(!explicit.includes("TCA"));
        assert!(Targets::All.includes("anything"));
    }

    #[test]
    fn empty_target_list_reaches_nobody() {
        let targets = Targets::from(Vec::<String>::new());
        assert!(!targets.includes("JA"));
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = AgentMessage::new(
            "STA",
            MessageKind::Analysis,
            json!({"type": "source_analysis"}),
            Targets::agents(["PP-A", "TCA", "JA"]),
        );
        let json = serde_json::to_string(&msg).unwrap();
        let restored: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, msg);
    }

    #[test]
    fn message_kind_wire_form() {
        assert_eq!(
            serde_json::to_string(&MessageKind::Analysis).unwrap(),
            "\"analysis\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::Decision).unwrap(),
            "\"decision\""
        );
    }
}
