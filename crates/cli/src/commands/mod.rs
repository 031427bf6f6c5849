//! CLI commands and the shared wiring they build on.

pub mod chat;
pub mod run;

use anyhow::Context;
use async_trait::async_trait;
use inkflow_config::AppConfig;
use inkflow_core::{
    AgentEvent, CounterStore, EventPayload, EventSink, LlmClient, NoteStore, StopFlags,
};
use inkflow_providers::OpenAiCompatClient;
use inkflow_store::{InMemoryCounterStore, InMemoryNoteStore, InMemoryStopFlags, SqliteStore};
use std::sync::Arc;

/// Everything a command needs to construct runners and dispatchers.
pub(crate) struct Stack {
    pub config: AppConfig,
    pub llm: Arc<dyn LlmClient>,
    pub notes: Option<Arc<dyn NoteStore>>,
    pub counters: Arc<dyn CounterStore>,
    pub stops: Arc<dyn StopFlags>,
    pub sink: Arc<dyn EventSink>,
}

/// Build the full stack from configuration.
pub(crate) async fn build_stack() -> anyhow::Result<Stack> {
    let config = AppConfig::load().context("Failed to load config")?;

    let api_key = config.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key found. Set INKFLOW_API_KEY (or OPENROUTER_API_KEY / OPENAI_API_KEY), \
             or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;

    let llm: Arc<dyn LlmClient> = Arc::new(
        OpenAiCompatClient::new("openai_compat", &config.base_url, api_key, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens),
    );

    let (counters, notes): (Arc<dyn CounterStore>, Option<Arc<dyn NoteStore>>) =
        if config.store.backend == "memory" {
            (
                Arc::new(InMemoryCounterStore::new()),
                Some(Arc::new(InMemoryNoteStore::new())),
            )
        } else {
            let path = config.store.sqlite_path();
            if let Some(parent) = std::path::Path::new(&path).parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let store = Arc::new(
                SqliteStore::new(&format!("sqlite://{path}"))
                    .await
                    .context("Failed to open SQLite store")?,
            );
            (store.clone(), Some(store))
        };

    Ok(Stack {
        config,
        llm,
        notes,
        counters,
        stops: Arc::new(InMemoryStopFlags::new()),
        sink: Arc::new(PrintSink),
    })
}

/// An event sink that renders emitted events to the terminal.
pub(crate) struct PrintSink;

#[async_trait]
impl EventSink for PrintSink {
    async fn emit(&self, event: AgentEvent) {
        match &event.payload {
            EventPayload::Text(text) => {
                let is_thought = event
                    .metadata
                    .get("stage")
                    .and_then(|v| v.as_str())
                    .is_some_and(|s| s == "thought");
                if is_thought {
                    eprint!("{text}");
                } else {
                    println!("{text}");
                }
            }
            EventPayload::Results(results) => {
                for result in results {
                    println!(
                        "[{}#{}] {}\n{}",
                        result.kind.tag(),
                        result.sequence_id,
                        result.title,
                        result.content
                    );
                    for (field, value) in &result.aux {
                        println!("  {field}: {value}");
                    }
                }
            }
        }
    }
}
