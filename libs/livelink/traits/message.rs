/// A data frame exchanged over the link
///
/// Control frames (ping, pong, close) never surface as `WsMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    pub fn text(text: impl Into<String>) -> Self {
        WsMessage::Text(text.into())
    }

    /// Text content, decoding binary frames lossily
    pub fn to_text_lossy(&self) -> String {
        match self {
            WsMessage::Text(s) => s.clone(),
            WsMessage::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}
