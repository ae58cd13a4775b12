// src/services/notify.rs

//! Notification fan-out.
//!
//! Every event goes to every target exactly once. Targets are independent:
//! a failed delivery is logged and never retried, and it does not stop the
//! other deliveries or the cycle.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::{Event, MessagesConfig, NotifyConfig};
use crate::services::Notifier;
use crate::utils::http;

/// Outcome of delivering one event to all targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Targets whose delivery failed
    pub failed: Vec<String>,
}

/// Formats events and sends them to every configured target.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    targets: Vec<String>,
    messages: MessagesConfig,
}

impl Dispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        targets: Vec<String>,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            notifier,
            targets,
            messages,
        }
    }

    /// Human-readable message for an event.
    pub fn render(&self, event: &Event) -> String {
        let template = match event {
            Event::Added { .. } => &self.messages.added,
            Event::Removed { .. } => &self.messages.removed,
        };
        event.item().format(template)
    }

    /// Deliver an event to all targets concurrently and wait for every attempt.
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        let message = self.render(event);
        let message = message.as_str();

        let attempts = self.targets.iter().map(|target| async move {
            let result = self.notifier.send(target, message).await;
            (target, result)
        });

        let mut report = DispatchReport::default();
        for (target, result) in join_all(attempts).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::error!(
                        "Delivery of {} to {} failed: {}",
                        event.fingerprint().short(),
                        target,
                        e
                    );
                    report.failed.push(target.clone());
                }
            }
        }
        report
    }
}

/// Telegram Bot API notifier. Targets are chat ids.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    parse_mode: String,
}

impl TelegramNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let client = http::create_client("boostwatch", config.timeout_secs)?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );
        Ok(Self {
            client,
            endpoint,
            parse_mode: config.parse_mode.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        let form = [
            ("chat_id", target.trim()),
            ("text", message),
            ("parse_mode", self.parse_mode.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::notification(target, e))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(AppError::notification(target, format!("status {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fingerprint, Item};
    use crate::testing::RecordingNotifier;

    fn item() -> Item {
        Item {
            category: "Soccer".into(),
            market: "Winner".into(),
            details: "Boost".into(),
            subject: "A vs B".into(),
            old_value: "1,50".into(),
            new_value: "1,80".into(),
            observed_at: "2026-01-01 10:00:00".into(),
        }
    }

    fn added() -> Event {
        Event::Added {
            fingerprint: Fingerprint::from_hex("f1"),
            item: item(),
        }
    }

    fn removed() -> Event {
        Event::Removed {
            fingerprint: Fingerprint::from_hex("f1"),
            item: item(),
        }
    }

    fn dispatcher(notifier: Arc<RecordingNotifier>, targets: &[&str]) -> Dispatcher {
        Dispatcher::new(
            notifier,
            targets.iter().map(|t| t.to_string()).collect(),
            MessagesConfig {
                added: "NEW {subject} {new_value}".into(),
                removed: "ENDED {subject}".into(),
            },
        )
    }

    #[test]
    fn test_distinct_templates() {
        let d = dispatcher(Arc::new(RecordingNotifier::default()), &["1"]);
        assert_eq!(d.render(&added()), "NEW A vs B 1,80");
        assert_eq!(d.render(&removed()), "ENDED A vs B");
    }

    #[test]
    fn test_default_templates_mention_offer() {
        let d = Dispatcher::new(
            Arc::new(RecordingNotifier::default()),
            vec!["1".into()],
            MessagesConfig::default(),
        );
        let text = d.render(&added());
        assert!(text.contains("NEW SUPERQUOTE"));
        assert!(text.contains("A vs B"));
        assert!(text.contains("*1,80*"));
        assert!(d.render(&removed()).contains("SUPERQUOTE ENDED"));
    }

    #[tokio::test]
    async fn test_every_target_receives_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let d = dispatcher(notifier.clone(), &["1", "2", "3"]);

        let report = d.dispatch(&added()).await;
        assert_eq!(report.delivered, 3);
        assert!(report.failed.is_empty());

        let mut targets: Vec<_> = notifier.sent().into_iter().map(|(t, _)| t).collect();
        targets.sort();
        assert_eq!(targets, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failing_target_does_not_block_others() {
        let notifier = Arc::new(RecordingNotifier::failing_for(&["2"]));
        let d = dispatcher(notifier.clone(), &["1", "2", "3"]);

        let report = d.dispatch(&added()).await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec!["2".to_string()]);
        assert_eq!(notifier.attempts(), 3);
    }
}
