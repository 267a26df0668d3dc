//! Outbound notifications about new cards.
//!
//! Delivery never blocks or fails the request that triggered it: the
//! Telegram call runs on a spawned task and failures end up in the log.

use domains::{CardCreated, Notifier};
use tracing::info;

/// Telegram "Markdown" message body for a new card.
pub fn format_card_created(event: &CardCreated) -> String {
    format!(
        "*New card created, id:* {}\n*Author:* {}\n*Category:* {}\n*Question:* {}",
        event.card_id,
        escape_markdown(event.author.as_deref().unwrap_or("anonymous")),
        escape_markdown(&event.category),
        escape_markdown(&event.question),
    )
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Writes notifications to the log. Used when Telegram is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn card_created(&self, event: CardCreated) {
        info!(
            card_id = event.card_id,
            author = event.author.as_deref().unwrap_or("anonymous"),
            category = %event.category,
            "card created"
        );
    }
}

#[cfg(feature = "notify-telegram")]
mod telegram {
    use std::time::Duration;

    use domains::{CardCreated, Notifier};
    use serde::Serialize;
    use tracing::{debug, warn};

    use super::format_card_created;

    #[derive(Serialize)]
    struct SendMessage<'a> {
        chat_id: &'a str,
        text: &'a str,
        parse_mode: &'static str,
    }

    /// Sends `sendMessage` requests to the Bot API.
    #[derive(Clone)]
    pub struct TelegramNotifier {
        client: reqwest::Client,
        /// Contains the bot token; never logged.
        endpoint: String,
        chat_id: String,
    }

    impl TelegramNotifier {
        pub fn new(
            api_base: &str,
            bot_token: &str,
            chat_id: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self {
                client,
                endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
                chat_id: chat_id.into(),
            })
        }

        async fn send(&self, text: &str) -> Result<(), reqwest::Error> {
            self.client
                .post(&self.endpoint)
                .json(&SendMessage {
                    chat_id: &self.chat_id,
                    text,
                    parse_mode: "Markdown",
                })
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }
    }

    impl Notifier for TelegramNotifier {
        fn card_created(&self, event: CardCreated) {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(card_id = event.card_id, "no runtime, telegram notification dropped");
                return;
            };
            let notifier = self.clone();
            runtime.spawn(async move {
                let text = format_card_created(&event);
                match notifier.send(&text).await {
                    Ok(()) => debug!(card_id = event.card_id, "telegram notification sent"),
                    Err(err) => warn!(
                        card_id = event.card_id,
                        error = %err.without_url(),
                        "telegram notification failed"
                    ),
                }
            });
        }
    }

}

#[cfg(feature = "notify-telegram")]
pub use telegram::TelegramNotifier;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_id_author_category_and_question() {
        let text = format_card_created(&CardCreated {
            card_id: 17,
            author: Some("alice".into()),
            category: "Rust".into(),
            question: "What is a *smart* pointer?".into(),
        });
        assert!(text.contains("id:* 17"));
        assert!(text.contains("*Author:* alice"));
        assert!(text.contains("*Category:* Rust"));
        assert!(text.contains("What is a \\*smart\\* pointer?"));
    }

    #[test]
    fn missing_author_is_anonymous() {
        let text = format_card_created(&CardCreated {
            card_id: 1,
            author: None,
            category: "SQL".into(),
            question: "q".into(),
        });
        assert!(text.contains("*Author:* anonymous"));
    }
}
