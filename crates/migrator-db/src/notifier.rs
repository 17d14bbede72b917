//! Webhook notifications for completed applies.
//!
//! Fire-and-forget: failures are logged and discarded, and a missing
//! webhook URL disables the notifier entirely.

use std::sync::Arc;

use migrator_core::{Config, MigrationResults};

pub struct Notifier {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: Arc<Config>) -> Notifier {
        Notifier {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// POST the results summary to the configured webhook.
    pub async fn notify(&self, results: &MigrationResults) {
        if self.config.web_hook_url.is_empty() {
            return;
        }

        let mut request = self.client.post(&self.config.web_hook_url).json(results);
        for header in &self.config.web_hook_headers {
            match parse_header(header) {
                Some((name, value)) => request = request.header(name, value),
                None => tracing::warn!(header = %header, "skipping malformed webhook header"),
            }
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(url = %self.config.web_hook_url, "webhook notification sent");
            }
            Ok(response) => {
                tracing::warn!(
                    url = %self.config.web_hook_url,
                    status = %response.status(),
                    "webhook returned non-success status"
                );
            }
            Err(e) => {
                tracing::warn!(
                    url = %self.config.web_hook_url,
                    error = %e,
                    "webhook notification failed"
                );
            }
        }
    }
}

/// Split a configured `Name: value` header line.
fn parse_header(header: &str) -> Option<(&str, &str)> {
    let (name, value) = header.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_name_value_headers() {
        assert_eq!(
            parse_header("Authorization: Basic abc"),
            Some(("Authorization", "Basic abc"))
        );
        assert_eq!(
            parse_header("X-Token:value:with:colons"),
            Some(("X-Token", "value:with:colons"))
        );
        assert_eq!(parse_header("no-colon-here"), None);
        assert_eq!(parse_header(": value-only"), None);
    }

    #[tokio::test]
    async fn missing_url_disables_the_notifier() {
        let config = Config::from_str("baseDir: x\ndriver: postgres\ndataSource: y\n").unwrap();
        let notifier = Notifier::new(Arc::new(config));

        // must return without performing any I/O
        notifier.notify(&MigrationResults::new(Utc::now())).await;
    }
}
