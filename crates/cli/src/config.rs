use act_indexer::BuildOptions;
use act_translator::{OpenAiChatConfig, PromptTemplate, TranslatorSettings};
use act_vector_store::{default_index_dir_rel, EmbeddingMode, OpenAiEmbedderConfig};
use anyhow::{anyhow, Context as AnyhowContext, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "act.toml";

pub(crate) const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub(crate) const EMBEDDING_MODE_ENV: &str = "ACT_EMBEDDING_MODE";
pub(crate) const INDEX_DIR_ENV: &str = "ACT_INDEX_DIR";

/// Fully resolved settings: file, then environment, then command-line flags.
#[derive(Clone, Debug)]
pub(crate) struct AppConfig {
    pub embedding_mode: EmbeddingMode,
    pub embedding: OpenAiEmbedderConfig,
    pub completion: OpenAiChatConfig,
    pub translator: TranslatorSettings,
    pub build: BuildOptions,
    pub prompt: PromptTemplate,
    pub index_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding_mode: EmbeddingMode::OpenAi,
            embedding: OpenAiEmbedderConfig::default(),
            completion: OpenAiChatConfig::default(),
            translator: TranslatorSettings::default(),
            build: BuildOptions::default(),
            prompt: PromptTemplate::default(),
            index_dir: default_index_dir_rel(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    embedding: Option<RawEmbedding>,
    completion: Option<RawCompletion>,
    retrieval: Option<RawRetrieval>,
    build: Option<RawBuild>,
    prompt: Option<PromptTemplate>,
    index: Option<RawIndex>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEmbedding {
    mode: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    dimension: Option<usize>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCompletion {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetrieval {
    top_k: Option<usize>,
    max_query_chars: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    concurrency: Option<usize>,
    max_input_chars: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndex {
    dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read `explicit`, or `act.toml` in `cwd` when present, or fall back to defaults.
    pub(crate) fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(cwd.join(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(raw)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mut cfg = Self::default();

        let embedding = raw.embedding.unwrap_or_default();
        if let Some(mode) = embedding.mode {
            cfg.embedding_mode = EmbeddingMode::parse(&mode)?;
        }
        if let Some(endpoint) = embedding.endpoint {
            cfg.embedding.endpoint = endpoint;
        }
        if let Some(model) = embedding.model {
            cfg.embedding.model = model;
        }
        if let Some(dimension) = embedding.dimension {
            if dimension == 0 {
                return Err(anyhow!("embedding.dimension must be at least 1"));
            }
            cfg.embedding.dimension = dimension;
        }
        cfg.embedding.api_key = embedding.api_key;
        if let Some(secs) = embedding.timeout_secs {
            cfg.embedding.timeout = Duration::from_secs(secs);
        }

        let completion = raw.completion.unwrap_or_default();
        if let Some(endpoint) = completion.endpoint {
            cfg.completion.endpoint = endpoint;
        }
        if let Some(model) = completion.model {
            cfg.completion.model = model;
        }
        cfg.completion.api_key = completion.api_key;
        if let Some(secs) = completion.timeout_secs {
            cfg.completion.timeout = Duration::from_secs(secs);
        }
        if let Some(max_tokens) = completion.max_tokens {
            cfg.translator.max_tokens = max_tokens;
        }
        if let Some(temperature) = completion.temperature {
            cfg.translator.temperature = temperature;
        }

        let retrieval = raw.retrieval.unwrap_or_default();
        if let Some(top_k) = retrieval.top_k {
            if top_k == 0 {
                return Err(anyhow!("retrieval.top_k must be at least 1"));
            }
            cfg.translator.top_k = top_k;
        }
        if let Some(max_query_chars) = retrieval.max_query_chars {
            cfg.translator.max_query_chars = max_query_chars;
        }

        let build = raw.build.unwrap_or_default();
        if let Some(concurrency) = build.concurrency {
            cfg.build.concurrency = concurrency.max(1);
        }
        if let Some(max_input_chars) = build.max_input_chars {
            cfg.build.max_input_chars = max_input_chars;
        }

        if let Some(prompt) = raw.prompt {
            cfg.prompt = prompt;
        }
        if let Some(dir) = raw.index.and_then(|index| index.dir) {
            cfg.index_dir = dir;
        }

        cfg.sync_timeouts();
        Ok(cfg)
    }

    /// Environment overrides. `lookup` is `std::env::var` outside tests.
    pub(crate) fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            if self.embedding.api_key.is_none() {
                self.embedding.api_key = Some(key.clone());
            }
            if self.completion.api_key.is_none() {
                self.completion.api_key = Some(key);
            }
        }
        if let Some(mode) = lookup(EMBEDDING_MODE_ENV).filter(|m| !m.trim().is_empty()) {
            self.embedding_mode = EmbeddingMode::parse(&mode)
                .with_context(|| format!("Invalid {EMBEDDING_MODE_ENV}"))?;
        }
        if let Some(dir) = lookup(INDEX_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.index_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// The orchestrator's own step timeouts follow the client timeouts.
    fn sync_timeouts(&mut self) {
        self.translator.embed_timeout = self.embedding.timeout;
        self.translator.generation_timeout = self.completion.timeout;
    }
}
