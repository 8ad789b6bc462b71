//! Tool catalog manager.
//!
//! Keeps tool definitions in one vector-store collection, guarantees the
//! meta-tool is always present and listed first, and turns task descriptions
//! into stored tool definitions through the completion backend.

pub mod meta_tool;

pub use meta_tool::{meta_tool, META_TOOL_ID, META_TOOL_NAME};

use crate::config::ToolsmithConfig;
use crate::embedding::EmbeddingFunction;
use crate::error::{CatalogError, Result, StoreError};
use crate::llm::{ChatRequest, CompletionBackend};
use crate::store::{Collection, Distance, Include, Metadata, Record, VectorStore};
use crate::synthesis;
use crate::types::{ChatMessage, CreationOutcome, ToolDefinition, ToolKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Settings the catalog needs from the wider configuration.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub collection_name: String,
    pub distance: Distance,
    pub model: String,
    pub max_tokens: u32,
    pub synthesis_temperature: f64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self::from_config(&ToolsmithConfig::default())
    }
}

impl CatalogSettings {
    pub fn from_config(config: &ToolsmithConfig) -> Self {
        Self {
            collection_name: config.collection_name.clone(),
            distance: config.distance,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            synthesis_temperature: config.synthesis_temperature,
        }
    }
}

/// The tool catalog manager.
pub struct ToolCatalog {
    store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
    completion: Option<Arc<dyn CompletionBackend>>,
    settings: CatalogSettings,
    collection: OnceCell<Arc<dyn Collection>>,
}

impl ToolCatalog {
    /// Create a catalog over `store`. No connection is made until first use.
    pub fn new(store: Arc<dyn VectorStore>, settings: CatalogSettings) -> Self {
        Self {
            store,
            embedder: None,
            completion: None,
            settings,
            collection: OnceCell::new(),
        }
    }

    /// Enable similarity search by supplying an embedding function.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingFunction>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Enable tool synthesis by supplying a completion backend.
    pub fn with_completion(mut self, completion: Arc<dyn CompletionBackend>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn similarity_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Open the collection once and cache the handle.
    async fn connect(&self) -> Result<&Arc<dyn Collection>> {
        self.collection
            .get_or_try_init(|| async {
                if self.embedder.is_none() {
                    warn!("No embedding function configured; similarity search is disabled");
                }
                let collection = self
                    .store
                    .get_or_create_collection(
                        &self.settings.collection_name,
                        self.embedder.clone(),
                        self.settings.distance,
                    )
                    .await?;
                info!("Tool catalog using collection '{}'", collection.name());
                Ok::<_, CatalogError>(collection)
            })
            .await
    }

    /// Connect if needed, then make sure the meta-tool is stored.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.initialized().await.map(|_| ())
    }

    async fn initialized(&self) -> Result<&Arc<dyn Collection>> {
        let collection = self.connect().await?;
        self.seed_meta_tool(collection).await?;
        Ok(collection)
    }

    /// Store the meta-tool if it is missing. Safe to call any number of times.
    pub async fn ensure_tool_creation_tool(&self) -> Result<()> {
        let collection = self.connect().await?;
        self.seed_meta_tool(collection).await
    }

    async fn seed_meta_tool(&self, collection: &Arc<dyn Collection>) -> Result<()> {
        match collection.get(&[META_TOOL_ID.to_string()]).await {
            Ok(found) if found.ids.iter().any(|id| id == META_TOOL_ID) => Ok(()),
            Ok(_) | Err(StoreError::NotFound(_)) => {
                info!("Seeding meta-tool '{}'", META_TOOL_NAME);
                upsert(collection, meta_tool(), true).await.map(|_| ())
            }
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Catalog operations
    // -----------------------------------------------------------------------

    /// Insert or overwrite a tool definition.
    ///
    /// Missing `id` gets a fresh one; missing `type` becomes `core` or
    /// `llm_generated` depending on `is_core`. `parameters` is stored as given.
    pub async fn add_tool(
        &self,
        definition: ToolDefinition,
        is_core: bool,
    ) -> Result<ToolDefinition> {
        let collection = self.initialized().await?;
        upsert(collection, definition, is_core).await
    }

    /// Look up a tool by id. Read failures count as absence.
    pub async fn get_tool(&self, id: &str) -> Result<Option<ToolDefinition>> {
        let collection = self.initialized().await?;
        Ok(fetch(collection, id).await)
    }

    /// Number of stored tool definitions, the meta-tool included.
    pub async fn count(&self) -> Result<usize> {
        let collection = self.initialized().await?;
        Ok(collection.count().await?)
    }

    /// Tools to offer for `context`: the meta-tool first, then up to
    /// `max_results` distinct relevant tools.
    pub async fn get_available_tools(
        &self,
        context: &str,
        max_results: usize,
    ) -> Result<Vec<ToolDefinition>> {
        let collection = self.initialized().await?;

        let meta = match fetch(collection, META_TOOL_ID).await {
            Some(def) => def,
            None => {
                // Stored copy unreadable: serve the built-in definition, which
                // may be older than whatever overwrote it in storage.
                warn!("Meta-tool could not be read from storage; using built-in definition");
                meta_tool()
            }
        };

        let mut seen: HashSet<String> = HashSet::from([META_TOOL_ID.to_string()]);
        let mut tools = vec![meta];

        if context.trim().is_empty() || !self.similarity_enabled() || max_results == 0 {
            debug!("Skipping similarity search");
            return Ok(tools);
        }

        let result = match collection
            .query(&[context.to_string()], max_results, &[Include::Metadatas])
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Similarity query failed, returning meta-tool only: {}", e);
                return Ok(tools);
            }
        };

        let ids = result.ids.into_iter().next().unwrap_or_default();
        let metadatas = result.metadatas.into_iter().next().unwrap_or_default();

        for (id, metadata) in ids.into_iter().zip(metadatas) {
            if tools.len() > max_results {
                break;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            match from_metadata(&metadata) {
                Ok(mut def) => {
                    def.id.get_or_insert(id);
                    tools.push(def);
                }
                Err(e) => warn!("Skipping undecodable tool '{}': {}", id, e),
            }
        }

        debug!("Offering {} tools for context", tools.len());
        Ok(tools)
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    /// Ask the completion backend for a new tool and store it.
    ///
    /// Never fails: every problem is reported through
    /// [`CreationOutcome::Failed`].
    pub async fn execute_tool_creation(
        &self,
        task_description: &str,
        suggested_name: Option<&str>,
    ) -> CreationOutcome {
        match self.create_tool(task_description, suggested_name).await {
            Ok(def) => {
                info!(
                    "Created tool '{}' ({})",
                    def.name,
                    def.id.as_deref().unwrap_or_default()
                );
                CreationOutcome::Created(def)
            }
            Err(e) => {
                warn!("Tool creation failed: {}", e);
                if let CatalogError::GenerationParse { raw, .. } = &e {
                    debug!("Unparseable completion text: {}", raw);
                }
                CreationOutcome::Failed { error: e.to_string() }
            }
        }
    }

    async fn create_tool(
        &self,
        task_description: &str,
        suggested_name: Option<&str>,
    ) -> Result<ToolDefinition> {
        let completion = self.completion.as_ref().ok_or_else(|| {
            CatalogError::Configuration("no completion backend configured".into())
        })?;

        let prompt = synthesis::build_creation_prompt(task_description, suggested_name);
        let request = ChatRequest::new(&self.settings.model, vec![ChatMessage::user(prompt)])
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.synthesis_temperature);

        let response = completion
            .chat(&request)
            .await
            .map_err(|e| CatalogError::Completion(format!("{:#}", e)))?;

        let text = response.content.unwrap_or_default();
        let definition = synthesis::definition_from_completion(&text)?;
        self.add_tool(definition, false).await
    }
}

// ---------------------------------------------------------------------------
// Storage helpers
// ---------------------------------------------------------------------------

fn generate_id() -> String {
    format!("tool_{}", ulid::Ulid::new().to_string().to_lowercase())
}

async fn upsert(
    collection: &Arc<dyn Collection>,
    mut definition: ToolDefinition,
    is_core: bool,
) -> Result<ToolDefinition> {
    let id = definition.id.get_or_insert_with(generate_id).clone();
    definition.kind.get_or_insert(if is_core {
        ToolKind::Core
    } else {
        ToolKind::LlmGenerated
    });

    let record = Record {
        id,
        metadata: to_metadata(&definition),
        document: definition.embedding_text(),
    };
    collection.upsert(&[record]).await?;

    debug!("Upserted tool '{}'", definition.name);
    Ok(definition)
}

async fn fetch(collection: &Arc<dyn Collection>, id: &str) -> Option<ToolDefinition> {
    let found = match collection.get(&[id.to_string()]).await {
        Ok(found) => found,
        Err(StoreError::NotFound(_)) => return None,
        Err(e) => {
            warn!("Reading tool '{}' failed, treating as absent: {}", id, e);
            return None;
        }
    };

    let index = found.ids.iter().position(|i| i == id)?;
    match found.metadatas.get(index).map(from_metadata) {
        Some(Ok(mut def)) => {
            def.id.get_or_insert_with(|| id.to_string());
            Some(def)
        }
        Some(Err(e)) => {
            warn!("Stored tool '{}' is undecodable: {}", id, e);
            None
        }
        None => None,
    }
}

/// Flatten a definition into scalar metadata; `parameters` becomes a JSON string.
pub fn to_metadata(def: &ToolDefinition) -> Metadata {
    let mut m = Metadata::new();
    if let Some(id) = &def.id {
        m.insert("id".into(), Value::String(id.clone()));
    }
    m.insert("name".into(), Value::String(def.name.clone()));
    m.insert("description".into(), Value::String(def.description.clone()));
    m.insert("parameters".into(), Value::String(def.parameters.to_string()));
    if let Some(kind) = def.kind {
        m.insert("type".into(), Value::String(kind.to_string()));
    }
    m
}

/// Rebuild a definition from stored metadata.
pub fn from_metadata(m: &Metadata) -> std::result::Result<ToolDefinition, String> {
    let text = |key: &str| m.get(key).and_then(Value::as_str).map(str::to_string);

    let name = text("name").ok_or("missing 'name'")?;
    let description = text("description").ok_or("missing 'description'")?;
    let parameters = match m.get("parameters") {
        Some(Value::String(s)) => {
            serde_json::from_str(s).map_err(|e| format!("bad 'parameters': {}", e))?
        }
        Some(v @ Value::Object(_)) => v.clone(),
        _ => return Err("missing 'parameters'".into()),
    };

    Ok(ToolDefinition {
        id: text("id"),
        name,
        description,
        parameters,
        kind: text("type").as_deref().and_then(ToolKind::parse),
    })
}
