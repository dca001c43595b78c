//! Install and activate, and the registration that swaps worker versions.
//!
//! A worker moves `Parsed -> Installing -> Waiting -> Activating -> Activated`
//! and ends `Redundant` once a newer version takes over or its own install
//! fails. Waiting is skipped: activation follows install immediately.

use std::sync::Arc;

use offcache_client::{Network, Request, Url, resolve};
use offcache_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::events::{Event, FetchReport, Outcome};
use crate::handlers::{Served, Source};
use crate::worker::{Worker, build_request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    /// Installed; waiting to activate.
    Waiting,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    /// Generations removed because they belong to no current version.
    pub deleted: Vec<String>,
    /// Clients now controlled by this version.
    pub claimed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegisterReport {
    pub version: String,
    /// Static assets stored at install.
    pub assets: usize,
    pub deleted: Vec<String>,
    pub claimed: usize,
}

impl Worker {
    /// Pre-populate the static generation from the manifest.
    ///
    /// Every manifest URL must answer 2xx. Entries are written in a single
    /// transaction, so a failed install leaves no static entries behind.
    pub async fn install(&self) -> Result<usize, Error> {
        self.transition(&[LifecycleState::Parsed], LifecycleState::Installing).await?;

        match self.populate_static().await {
            Ok(assets) => {
                tracing::info!(version = %self.version(), assets, "install complete; skipping waiting");
                self.set_state(LifecycleState::Waiting).await;
                Ok(assets)
            }
            Err(e) => {
                tracing::error!(version = %self.version(), error = %e, "install failed");
                self.set_state(LifecycleState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn populate_static(&self) -> Result<usize, Error> {
        let generation = self.static_generation();
        let mut tasks = JoinSet::new();

        for (index, path) in self.manifest().iter().enumerate() {
            let url = resolve(self.origin(), path).map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            let request = Request::get(url);
            let network = self.context().network.clone();
            tasks.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut entries = vec![None; self.manifest().len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::InstallFailed(format!("fetch task: {e}")))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{} returned {}", request.url, response.status)));
            }
            entries[index] = Some(response.to_cached(&request));
        }

        let entries: Vec<_> = entries.into_iter().flatten().collect();
        let assets = entries.len();
        self.store()
            .put_entries(&generation, entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("writing {generation}: {e}")))?;
        Ok(assets)
    }

    /// Delete every generation this version does not own, then claim all clients.
    ///
    /// A generation that fails to delete is logged and left for the next activation.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[LifecycleState::Waiting], LifecycleState::Activating).await?;

        let keep = [self.static_generation(), self.dynamic_generation().to_string()];
        let generations = match self.store().list_generations().await {
            Ok(generations) => generations,
            Err(e) => {
                self.set_state(LifecycleState::Waiting).await;
                return Err(e);
            }
        };

        let mut deleted = Vec::new();
        for name in generations.into_iter().filter(|name| !keep.contains(name)) {
            match self.store().delete_generation(&name).await {
                Ok(true) => {
                    tracing::info!(generation = %name, "deleted stale generation");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(generation = %name, error = %e, "failed to delete stale generation"),
            }
        }

        let claimed = self.clients().claim(self.version()).await;
        self.set_state(LifecycleState::Activated).await;
        Ok(ActivateReport { deleted, claimed })
    }

    pub async fn mark_redundant(&self) {
        self.set_state(LifecycleState::Redundant).await;
    }
}

/// Holds the worker currently serving requests.
pub struct Registration {
    active: RwLock<Option<Arc<Worker>>>,
    network: Arc<dyn Network>,
    origin: Url,
}

impl Registration {
    /// `network` and `origin` serve requests while no worker is active.
    pub fn new(origin: Url, network: Arc<dyn Network>) -> Self {
        Self { active: RwLock::new(None), network, origin }
    }

    /// Install then activate `worker`, and make it the active one.
    ///
    /// On failure the previously active worker keeps serving.
    pub async fn register(&self, worker: Arc<Worker>) -> Result<RegisterReport, Error> {
        let assets = worker.install().await?;
        let activated = worker.activate().await?;

        let previous = self.active.write().await.replace(worker.clone());
        if let Some(previous) = previous {
            tracing::info!(previous = %previous.version(), next = %worker.version(), "worker superseded");
            previous.mark_redundant().await;
        }

        Ok(RegisterReport {
            version: worker.version().to_string(),
            assets,
            deleted: activated.deleted,
            claimed: activated.claimed,
        })
    }

    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.active.read().await.clone()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Route a request through the active worker, or straight to the network.
    pub async fn fetch(&self, request: &Request) -> Result<Served, Error> {
        match self.active().await {
            Some(worker) => worker.handle_fetch(request).await,
            None => {
                let response = self.network.fetch(request).await?;
                Ok(Served::new(response, Source::Passthrough))
            }
        }
    }

    /// Dispatch an event to the active worker.
    pub async fn dispatch(&self, event: Event) -> Result<Outcome, Error> {
        if let Some(worker) = self.active().await {
            return worker.dispatch(event).await;
        }

        match event {
            Event::Fetch { url, method, accept } => {
                let request = build_request(&self.origin, &url, method.as_deref(), accept.as_deref())?;
                let served = self.fetch(&request).await?;
                Ok(Outcome::Fetched(FetchReport::from(&served)))
            }
            _ => Ok(Outcome::Ignored { reason: "no active worker".to_string() }),
        }
    }
}
