use cp_core::ids::RequestId;
use serde::{Deserialize, Serialize};

/// Backend-originated frame: `{type, request_id, ...payload}`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub request_id: RequestId,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

/// Extension-originated frame: either a correlated response or an
/// unsolicited alert. Responses are distinguished by carrying a
/// `request_id`; anything else is treated as an alert, matching the wire
/// model's "else treat as alert" fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Response {
        request_id: RequestId,
        #[serde(flatten)]
        payload: serde_json::Value,
    },
    Alert(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_frame_parses_by_request_id_presence() {
        let request_id = RequestId::new();
        let json = serde_json::json!({ "request_id": request_id.to_string(), "ok": true });
        let frame: InboundFrame = serde_json::from_value(json).unwrap();
        match frame {
            InboundFrame::Response { request_id: rid, .. } => assert_eq!(rid, request_id),
            InboundFrame::Alert(_) => panic!("expected a response frame"),
        }
    }

    #[test]
    fn frame_without_request_id_is_an_alert() {
        let json = serde_json::json!({ "type": "alert", "message": "engagement captured" });
        let frame: InboundFrame = serde_json::from_value(json).unwrap();
        assert!(matches!(frame, InboundFrame::Alert(_)));
    }
}
