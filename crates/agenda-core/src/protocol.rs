use crate::AgendaError;
use serde::{Deserialize, Serialize};

/// Messages the view sends to the scheduling application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ClientRequest {
    GetAgenda,
}

impl ClientRequest {
    pub fn encode(&self) -> Result<String, AgendaError> {
        serde_json::to_string(self).map_err(AgendaError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_agenda_wire_format() {
        let encoded = ClientRequest::GetAgenda.encode().expect("encode");
        assert_eq!(encoded, r#"{"command":"get-agenda"}"#);
        let decoded: ClientRequest = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, ClientRequest::GetAgenda);
    }
}
