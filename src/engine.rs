//! Engine facade
//!
//! Owns everything that lives for the whole process: the configuration, the
//! validated [`ViewRegistry`] and the [`EventBus`]. Per-request state is a
//! [`QueryContext`] built by the collaborator layer; [`Engine::context`]
//! binds the two for one render.
//!
//! ```rust,ignore
//! let engine = Engine::fuelrats()?;
//! let query = engine
//!     .query_with(&params)?
//!     .with_caller(caller, permissions);
//!
//! let document = Document::collection(engine.context(&query), "rescues", rescues, total)?;
//! Json(document.render())
//! ```

use anyhow::Result;

use crate::config::EngineConfig;
use crate::core::error::EngineResult;
use crate::core::events::EventBus;
use crate::core::query::{QueryContext, QueryParams};
use crate::view::{RenderContext, ViewRegistry};

pub struct Engine {
    config: EngineConfig,
    registry: ViewRegistry,
    api_version: String,
    events: EventBus,
}

impl Engine {
    /// Build the registry from `config` and validate it
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let registry = ViewRegistry::from_config(&config)?;
        let api_version = config
            .api_version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        tracing::info!(
            resource_types = registry.len(),
            api_version = %api_version,
            external_url = %config.external_url,
            "engine ready"
        );

        Ok(Self {
            config,
            registry,
            api_version,
            events: EventBus::default(),
        })
    }

    /// Engine over the built-in Fuel Rats catalogue
    pub fn fuelrats() -> Result<Self> {
        Ok(Self::new(EngineConfig::fuelrats()?)?)
    }

    /// Replace the event bus, e.g. to share one with a websocket layer
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Anonymous query with default paging
    pub fn query(&self) -> QueryContext {
        QueryContext::new(self.config.external_url.clone())
    }

    /// Query built from parsed request parameters
    pub fn query_with(&self, params: &QueryParams) -> EngineResult<QueryContext> {
        self.query().with_params(params, &self.config.pagination)
    }

    /// Bind a request's query to this engine for one render
    pub fn context<'a>(&'a self, query: &'a QueryContext) -> RenderContext<'a> {
        RenderContext::new(&self.registry, query).with_api_version(&self.api_version)
    }
}
