//! Inbound payload validation
//!
//! Each inbound event has a typed request built by a validating constructor.
//! Constructors are pure: they either return the typed request or a
//! [`Rejection`] describing why the payload was refused.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

use crate::constants::{MAX_CHAT_MESSAGE_LENGTH, MAX_ROOM_ID_LENGTH};

/// Reason a payload was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    MissingField(&'static str),
    EmptyField(&'static str),
    InvalidRoomId,
    InvalidDescriptionType,
    InvalidCandidate,
    MessageLength(usize),
    UnsafeContent,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "payload must be a JSON object"),
            Self::MissingField(field) => write!(f, "'{}' must be a string", field),
            Self::EmptyField(field) => write!(f, "'{}' must not be empty", field),
            Self::InvalidRoomId => write!(
                f,
                "room names are 1-{} letters, numbers, hyphens or underscores",
                MAX_ROOM_ID_LENGTH
            ),
            Self::InvalidDescriptionType => {
                write!(f, "description must have type 'offer' or 'answer' and a non-empty sdp")
            }
            Self::InvalidCandidate => write!(f, "candidate must be an object or null"),
            Self::MessageLength(len) => write!(
                f,
                "message must be 1-{} characters, got {}",
                MAX_CHAT_MESSAGE_LENGTH, len
            ),
            Self::UnsafeContent => write!(f, "message contains disallowed markup"),
        }
    }
}

/// Patterns that look like script injection
fn injection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<script|javascript:|on\w+=").expect("injection pattern is a valid regex")
    })
}

/// Check if content contains markup or script-injection patterns
pub fn contains_injection(content: &str) -> bool {
    injection_pattern().is_match(content)
}

/// Room identifiers are 1-100 characters of `[a-zA-Z0-9_-]`
pub fn is_valid_room_id(room: &str) -> bool {
    !room.is_empty()
        && room.len() <= MAX_ROOM_ID_LENGTH
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn as_object(data: &Value) -> Result<&Map<String, Value>, Rejection> {
    data.as_object().ok_or(Rejection::NotAnObject)
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, Rejection> {
    match obj.get(field) {
        Some(Value::String(s)) if s.is_empty() => Err(Rejection::EmptyField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(Rejection::MissingField(field)),
    }
}

/// Validated `subscribe` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: String,
    /// Participant identifier the connection becomes addressable under
    pub participant_id: String,
}

impl JoinRequest {
    pub fn from_value(data: &Value) -> Result<Self, Rejection> {
        let obj = as_object(data)?;
        let room = match obj.get("room") {
            Some(Value::String(room)) if is_valid_room_id(room) => room.clone(),
            Some(Value::String(_)) => return Err(Rejection::InvalidRoomId),
            _ => return Err(Rejection::MissingField("room")),
        };
        let participant_id = required_str(obj, "socketId")?;
        Ok(Self {
            room,
            participant_id,
        })
    }
}

/// Validated `newUserStart` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub to: String,
    pub sender: String,
}

impl StartRequest {
    pub fn from_value(data: &Value) -> Result<Self, Rejection> {
        let obj = as_object(data)?;
        Ok(Self {
            to: required_str(obj, "to")?,
            sender: required_str(obj, "sender")?,
        })
    }
}

/// Kind of session description carried by an `sdp` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionKind {
    Offer,
    Answer,
}

/// Validated `sdp` payload. The description is kept verbatim for relaying.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDescription {
    pub to: String,
    pub sender: String,
    pub kind: DescriptionKind,
    pub description: Value,
}

impl SessionDescription {
    pub fn from_value(data: &Value) -> Result<Self, Rejection> {
        let obj = as_object(data)?;
        let to = required_str(obj, "to")?;
        let sender = required_str(obj, "sender")?;

        let description = obj
            .get("description")
            .filter(|d| d.is_object())
            .ok_or(Rejection::MissingField("description"))?;

        let kind = match description.get("type").and_then(Value::as_str) {
            Some("offer") => DescriptionKind::Offer,
            Some("answer") => DescriptionKind::Answer,
            _ => return Err(Rejection::InvalidDescriptionType),
        };
        match description.get("sdp").and_then(Value::as_str) {
            Some(sdp) if !sdp.is_empty() => {}
            _ => return Err(Rejection::InvalidDescriptionType),
        }

        Ok(Self {
            to,
            sender,
            kind,
            description: description.clone(),
        })
    }
}

/// Connectivity candidate, or the end-of-candidates marker (`null` on the wire)
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    EndOfCandidates,
    Candidate(Map<String, Value>),
}

impl Candidate {
    pub fn into_value(self) -> Value {
        match self {
            Candidate::EndOfCandidates => Value::Null,
            Candidate::Candidate(obj) => Value::Object(obj),
        }
    }
}

/// Validated `ice candidates` payload
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRequest {
    pub to: String,
    pub sender: String,
    pub candidate: Candidate,
}

impl CandidateRequest {
    pub fn from_value(data: &Value) -> Result<Self, Rejection> {
        let obj = as_object(data)?;
        let to = required_str(obj, "to")?;
        let sender = required_str(obj, "sender")?;

        // An explicit null is distinct from a missing field
        let candidate = match obj.get("candidate") {
            Some(Value::Null) => Candidate::EndOfCandidates,
            Some(Value::Object(candidate)) => Candidate::Candidate(candidate.clone()),
            _ => return Err(Rejection::InvalidCandidate),
        };

        Ok(Self {
            to,
            sender,
            candidate,
        })
    }
}

/// Validated `chat` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub room: String,
    pub sender: String,
    pub msg: String,
}

impl ChatRequest {
    pub fn from_value(data: &Value) -> Result<Self, Rejection> {
        let obj = as_object(data)?;
        let room = required_str(obj, "room")?;
        let sender = required_str(obj, "sender")?;

        let msg = match obj.get("msg") {
            Some(Value::String(msg)) => msg.clone(),
            _ => return Err(Rejection::MissingField("msg")),
        };
        let len = msg.chars().count();
        if len == 0 || len > MAX_CHAT_MESSAGE_LENGTH {
            return Err(Rejection::MessageLength(len));
        }
        if contains_injection(&msg) {
            return Err(Rejection::UnsafeContent);
        }

        Ok(Self { room, sender, msg })
    }
}

/// `leaveRoom` payload; a missing room makes the event a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub room: Option<String>,
}

impl LeaveRequest {
    pub fn from_value(data: &Value) -> Self {
        let room = data
            .get("room")
            .and_then(Value::as_str)
            .filter(|room| !room.is_empty())
            .map(str::to_string);
        Self { room }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request() {
        let req = JoinRequest::from_value(&json!({"room": "r1", "socketId": "A"})).unwrap();
        assert_eq!(req.room, "r1");
        assert_eq!(req.participant_id, "A");

        assert_eq!(
            JoinRequest::from_value(&json!({"room": "bad room", "socketId": "A"})),
            Err(Rejection::InvalidRoomId)
        );
        assert_eq!(
            JoinRequest::from_value(&json!({"room": "", "socketId": "A"})),
            Err(Rejection::InvalidRoomId)
        );
        assert_eq!(
            JoinRequest::from_value(&json!({"room": "r1", "socketId": ""})),
            Err(Rejection::EmptyField("socketId"))
        );
        assert_eq!(
            JoinRequest::from_value(&json!({"room": 5, "socketId": "A"})),
            Err(Rejection::MissingField("room"))
        );
        assert_eq!(JoinRequest::from_value(&json!("r1")), Err(Rejection::NotAnObject));
    }

    #[test]
    fn test_room_id_length_limit() {
        let max = "a".repeat(MAX_ROOM_ID_LENGTH);
        let too_long = "a".repeat(MAX_ROOM_ID_LENGTH + 1);
        assert!(is_valid_room_id(&max));
        assert!(!is_valid_room_id(&too_long));
        assert!(is_valid_room_id("Room_1-b"));
        assert!(!is_valid_room_id("room.1"));
        assert!(!is_valid_room_id("salle-é"));
    }

    #[test]
    fn test_session_description() {
        let data = json!({
            "to": "B",
            "sender": "A",
            "description": {"type": "offer", "sdp": "v=0\r\n"}
        });
        let req = SessionDescription::from_value(&data).unwrap();
        assert_eq!(req.kind, DescriptionKind::Offer);
        assert_eq!(req.description, data["description"]);

        let pranswer = json!({
            "to": "B",
            "sender": "A",
            "description": {"type": "pranswer", "sdp": "v=0"}
        });
        assert_eq!(
            SessionDescription::from_value(&pranswer),
            Err(Rejection::InvalidDescriptionType)
        );

        let empty_sdp = json!({
            "to": "B",
            "sender": "A",
            "description": {"type": "answer", "sdp": ""}
        });
        assert!(SessionDescription::from_value(&empty_sdp).is_err());

        let no_description = json!({"to": "B", "sender": "A"});
        assert_eq!(
            SessionDescription::from_value(&no_description),
            Err(Rejection::MissingField("description"))
        );
    }

    #[test]
    fn test_candidate_null_is_end_of_candidates() {
        let req =
            CandidateRequest::from_value(&json!({"to": "B", "sender": "A", "candidate": null}))
                .unwrap();
        assert_eq!(req.candidate, Candidate::EndOfCandidates);
        assert_eq!(req.candidate.into_value(), Value::Null);
    }

    #[test]
    fn test_candidate_shapes() {
        let ok = CandidateRequest::from_value(&json!({
            "to": "B",
            "sender": "A",
            "candidate": {
                "candidate": "candidate:1 1 udp 2122260223 10.0.0.1 5000 typ host",
                "sdpMid": "0"
            }
        }));
        assert!(matches!(ok.unwrap().candidate, Candidate::Candidate(_)));

        let missing = CandidateRequest::from_value(&json!({"to": "B", "sender": "A"}));
        assert_eq!(missing, Err(Rejection::InvalidCandidate));

        let string =
            CandidateRequest::from_value(&json!({"to": "B", "sender": "A", "candidate": "x"}));
        assert_eq!(string, Err(Rejection::InvalidCandidate));
    }

    #[test]
    fn test_chat_request() {
        let req =
            ChatRequest::from_value(&json!({"room": "r1", "sender": "A", "msg": "hi"})).unwrap();
        assert_eq!(req.msg, "hi");

        let long = "x".repeat(MAX_CHAT_MESSAGE_LENGTH + 1);
        assert_eq!(
            ChatRequest::from_value(&json!({"room": "r1", "sender": "A", "msg": long})),
            Err(Rejection::MessageLength(MAX_CHAT_MESSAGE_LENGTH + 1))
        );
        assert_eq!(
            ChatRequest::from_value(&json!({"room": "r1", "sender": "A", "msg": ""})),
            Err(Rejection::MessageLength(0))
        );
    }

    #[test]
    fn test_chat_injection_patterns() {
        assert!(contains_injection("<script>alert(1)</script>"));
        assert!(contains_injection("<SCRIPT src=x>"));
        assert!(contains_injection("javascript:void(0)"));
        assert!(contains_injection("<img src=x onerror=alert(1)>"));
        assert!(!contains_injection("see you on monday"));
        assert!(!contains_injection("2 < 3 and 4 > 1"));

        assert_eq!(
            ChatRequest::from_value(
                &json!({"room": "r1", "sender": "A", "msg": "<script>alert(1)</script>"})
            ),
            Err(Rejection::UnsafeContent)
        );
    }

    #[test]
    fn test_leave_request() {
        assert_eq!(
            LeaveRequest::from_value(&json!({"room": "r1"})).room.as_deref(),
            Some("r1")
        );
        assert_eq!(LeaveRequest::from_value(&json!({})).room, None);
        assert_eq!(LeaveRequest::from_value(&Value::Null).room, None);
    }
}
