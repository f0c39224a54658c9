use rand::seq::IndexedRandom;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use super::{NotificationEvent, Notifier};

/// Author icon shown next to every embed
pub const DEFAULT_AVATAR_URL: &str =
    "https://pbs.twimg.com/profile_images/450879240657850368/g0VNhtll_400x400.png";

/// Accent colours, one picked at random per message
pub const EMBED_COLORS: [u32; 16] = [
    0xFFE4E1, 0x00FF7F, 0xD8BFD8, 0xDC143C, 0xFF4500, 0xDEB887, 0xADFF2F, 0x800000, 0x4682B4,
    0x006400, 0x808080, 0xA0522D, 0xF08080, 0xC71585, 0xFFB6C1, 0x00CED1,
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    author: EmbedAuthor<'a>,
    fields: [EmbedField; 1],
}

#[derive(Debug, Serialize)]
struct EmbedAuthor<'a> {
    name: &'a str,
    url: &'a str,
    icon_url: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
}

/// Render `ts` as an absolute and a relative Discord timestamp.
fn seen_field(ts: i64) -> String {
    format!("<t:{ts}:F> (<t:{ts}:R>)")
}

fn build_payload<'a>(
    event: &'a NotificationEvent,
    avatar_url: &'a str,
    color: u32,
) -> WebhookPayload<'a> {
    WebhookPayload {
        embeds: [Embed {
            title: &event.target_url,
            description: &event.body,
            color,
            author: EmbedAuthor {
                name: "",
                url: &event.target_url,
                icon_url: avatar_url,
            },
            fields: [EmbedField {
                name: "Seen",
                value: seen_field(event.observed_at),
            }],
        }],
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Posts embeds to a Discord-compatible webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: SecretString,
    avatar_url: String,
}

/// Mask the webhook url; it embeds the posting token.
impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("webhook_url", &"[REDACTED]")
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

impl WebhookNotifier {
    pub fn new(
        client: reqwest::Client,
        webhook_url: SecretString,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            webhook_url,
            avatar_url: avatar_url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotificationEvent) -> bool {
        let color = EMBED_COLORS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(EMBED_COLORS[0]);
        let payload = build_payload(event, &self.avatar_url, color);

        let result = self
            .client
            .post(self.webhook_url.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 || status == 204 {
                    tracing::debug!(url = %event.target_url, status, "Webhook accepted notification");
                    true
                } else {
                    tracing::warn!(url = %event.target_url, status, "Webhook rejected notification");
                    false
                }
            }
            Err(e) => {
                // Drop the request url from the error, it carries the webhook token
                tracing::warn!(url = %event.target_url, error = %e.without_url(), "Webhook request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> NotificationEvent {
        NotificationEvent {
            target_url: "https://www.example.com/node/42".to_string(),
            body: "Half price widgets".to_string(),
            observed_at: 1_700_000_000,
        }
    }

    fn notifier_for(server: &MockServer) -> WebhookNotifier {
        WebhookNotifier::new(
            reqwest::Client::new(),
            SecretString::from(format!("{}/api/webhooks/1/token", server.uri())),
            DEFAULT_AVATAR_URL,
        )
    }

    #[test]
    fn test_payload_shape() {
        let event = event();
        let payload = build_payload(&event, DEFAULT_AVATAR_URL, 0x00CED1);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "embeds": [{
                    "title": "https://www.example.com/node/42",
                    "description": "Half price widgets",
                    "color": 0x00CED1,
                    "author": {
                        "name": "",
                        "url": "https://www.example.com/node/42",
                        "icon_url": DEFAULT_AVATAR_URL,
                    },
                    "fields": [{
                        "name": "Seen",
                        "value": "<t:1700000000:F> (<t:1700000000:R>)",
                    }],
                }]
            })
        );
    }

    #[test]
    fn test_debug_masks_webhook_url() {
        let notifier = WebhookNotifier::new(
            reqwest::Client::new(),
            SecretString::from("https://discord.example/api/webhooks/1/secret-token".to_string()),
            DEFAULT_AVATAR_URL,
        );
        let debug_output = format!("{:?}", notifier);
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_notify_204_is_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .and(body_partial_json(serde_json::json!({
                "embeds": [{ "title": "https://www.example.com/node/42" }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert!(notifier_for(&mock_server).notify(&event()).await);
    }

    #[tokio::test]
    async fn test_notify_200_is_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        assert!(notifier_for(&mock_server).notify(&event()).await);
    }

    #[tokio::test]
    async fn test_notify_other_success_codes_are_failures() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&mock_server)
            .await;

        assert!(!notifier_for(&mock_server).notify(&event()).await);
    }

    #[tokio::test]
    async fn test_notify_rate_limited_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        assert!(!notifier_for(&mock_server).notify(&event()).await);
    }

    #[tokio::test]
    async fn test_notify_unreachable_is_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = WebhookNotifier::new(
            reqwest::Client::new(),
            SecretString::from(format!("http://{}/hook", addr)),
            DEFAULT_AVATAR_URL,
        );
        assert!(!notifier.notify(&event()).await);
    }

    #[test]
    fn test_seen_field_format() {
        assert_eq!(seen_field(5), "<t:5:F> (<t:5:R>)");
    }
}
