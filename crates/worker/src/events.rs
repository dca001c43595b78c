//! Inbound events and the dispatcher that maps them to worker operations.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;

use offcache_client::{Request, resolve};
use offcache_core::Error;

use crate::clients::OutboundMessage;
use crate::handlers::{Served, Source};
use crate::messages::{ControlMessage, NotificationSpec, PushPayload};
use crate::strategy::Strategy;
use crate::worker::{Worker, build_request};

/// Sync tag that triggers a data flush broadcast.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Install,
    Activate,
    Fetch {
        url: String,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        accept: Option<String>,
    },
    Message {
        data: Value,
    },
    Sync {
        tag: String,
    },
    Push {
        #[serde(default)]
        data: Option<Value>,
    },
    NotificationClick {
        #[serde(default)]
        action: Option<String>,
    },
}

/// A served response flattened for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchReport {
    pub url: String,
    pub status: u16,
    pub source: Source,
    pub strategy: Option<Strategy>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

impl From<&Served> for FetchReport {
    fn from(served: &Served) -> Self {
        let response = &served.response;
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            source: served.source,
            strategy: served.strategy,
            headers,
            body: response.text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Installed { generation: String, assets: usize },
    Activated { deleted: Vec<String>, claimed: usize },
    Fetched(FetchReport),
    MetricsLogged,
    Preloaded { stored: usize, failed: usize },
    Synced { notified: usize },
    Notify(NotificationSpec),
    OpenWindow { url: String },
    NotificationClosed,
    Ignored { reason: String },
}

impl Outcome {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored { reason: reason.into() }
    }
}

impl Worker {
    /// Run the operation an event names.
    pub async fn dispatch(&self, event: Event) -> Result<Outcome, Error> {
        match event {
            Event::Install => {
                let assets = self.install().await?;
                Ok(Outcome::Installed { generation: self.static_generation(), assets })
            }
            Event::Activate => {
                let report = self.activate().await?;
                Ok(Outcome::Activated { deleted: report.deleted, claimed: report.claimed })
            }
            Event::Fetch { url, method, accept } => {
                let request = build_request(self.origin(), &url, method.as_deref(), accept.as_deref())?;
                let served = self.handle_fetch(&request).await?;
                Ok(Outcome::Fetched(FetchReport::from(&served)))
            }
            Event::Message { data } => Ok(self.on_message(&data).await),
            Event::Sync { tag } => Ok(self.on_sync(&tag).await),
            Event::Push { data } => Ok(on_push(data)),
            Event::NotificationClick { action } => Ok(on_notification_click(action.as_deref())),
        }
    }

    async fn on_message(&self, data: &Value) -> Outcome {
        match ControlMessage::parse(data) {
            Some(ControlMessage::PerformanceMetrics { metrics }) => {
                tracing::info!(%metrics, "performance metrics");
                Outcome::MetricsLogged
            }
            Some(ControlMessage::PreloadResources { resources }) => {
                let (stored, failed) = self.preload(&resources).await;
                Outcome::Preloaded { stored, failed }
            }
            None => {
                tracing::debug!(%data, "ignoring unknown message");
                Outcome::ignored("unknown message type")
            }
        }
    }

    /// Fetch each URL and store 2xx answers in the dynamic generation.
    /// Returns `(stored, failed)`.
    pub async fn preload(&self, resources: &[String]) -> (usize, usize) {
        let mut tasks = JoinSet::new();
        let mut failed = 0;

        for resource in resources {
            let url = match resolve(self.origin(), resource) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(%resource, error = %e, "skipping preload");
                    failed += 1;
                    continue;
                }
            };
            let ctx = self.context().clone();
            tasks.spawn(async move {
                let request = Request::get(url);
                let response = ctx.network.fetch(&request).await?;
                if !response.is_success() {
                    return Err(Error::Network(format!("{} returned {}", request.url, response.status)));
                }
                ctx.store.put_entry(&ctx.dynamic, &response.to_cached(&request)).await
            });
        }

        let mut stored = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => stored += 1,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "preload failed");
                    failed += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "preload task failed");
                    failed += 1;
                }
            }
        }
        (stored, failed)
    }

    async fn on_sync(&self, tag: &str) -> Outcome {
        if tag != BACKGROUND_SYNC_TAG {
            return Outcome::ignored(format!("unhandled sync tag {tag}"));
        }

        let timestamp = Utc::now().timestamp_millis();
        let notified = self.clients().broadcast(OutboundMessage::SyncData { timestamp }).await;
        tracing::info!(notified, "background sync broadcast");
        Outcome::Synced { notified }
    }
}

fn on_push(data: Option<Value>) -> Outcome {
    let Some(data) = data else {
        return Outcome::ignored("push without payload");
    };

    match serde_json::from_value::<PushPayload>(data) {
        Ok(payload) => Outcome::Notify(NotificationSpec::from(payload)),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable push payload");
            Outcome::ignored(format!("unreadable push payload: {e}"))
        }
    }
}

fn on_notification_click(action: Option<&str>) -> Outcome {
    match action {
        Some("open") => Outcome::OpenWindow { url: "/".to_string() },
        _ => Outcome::NotificationClosed,
    }
}
