use async_trait::async_trait;
use std::collections::HashMap;

/// HTTP headers sent with the WebSocket handshake
pub type Headers = HashMap<String, String>;

/// Trait for providing handshake headers
///
/// Called on every connect attempt, including reconnects, so a provider
/// backed by a session store can hand out a refreshed credential.
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Generate headers for the next handshake
    async fn get_headers(&self) -> Headers;
}

/// Static `Authorization: Bearer <token>` header
#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl HeaderProvider for BearerToken {
    async fn get_headers(&self) -> Headers {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bearer_token_header() {
        let headers = BearerToken::new("abc").get_headers().await;
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
    }

    #[test]
    fn test_bearer_token_debug_redacts() {
        let debug = format!("{:?}", BearerToken::new("secret"));
        assert!(!debug.contains("secret"));
    }
}
