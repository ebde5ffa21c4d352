use crate::completion::{
    CompletionClient, CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::error::{CompletionError, Result, TranslateError};
use crate::postprocess::strip_code_fences;
use crate::prompt::{Prompt, PromptTemplate};
use act_vector_store::{truncate_chars, Embedder, EmbeddingError, ExampleStore, RetrievalResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 24_000;

#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    /// Examples retrieved per query
    pub top_k: usize,
    /// Query text beyond this many characters is not embedded (the prompt keeps it all)
    pub max_query_chars: usize,
    pub embed_timeout: Duration,
    pub generation_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Everything a translation needs, built once at startup and shared read-only.
pub struct TranslationContext {
    store: Arc<ExampleStore>,
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionClient>,
    template: PromptTemplate,
    settings: TranslatorSettings,
}

impl TranslationContext {
    /// Fails with `DimensionMismatch` when the embedder cannot produce vectors the index
    /// can be searched with.
    pub fn new(
        store: Arc<ExampleStore>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionClient>,
        template: PromptTemplate,
        settings: TranslatorSettings,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(TranslateError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }
        if embedder.model_id() != store.embedding_model() {
            log::warn!(
                "Index was built with '{}' but queries are embedded with '{}'",
                store.embedding_model(),
                embedder.model_id()
            );
        }
        Ok(Self {
            store,
            embedder,
            completion,
            template,
            settings,
        })
    }

    #[must_use]
    pub fn store(&self) -> &ExampleStore {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    #[must_use]
    pub fn completion(&self) -> &dyn CompletionClient {
        self.completion.as_ref()
    }
}

/// Prompt built for a query, before generation.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub prompt: Prompt,
    pub retrieval: RetrievalResult,
    pub embed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub prompt: Prompt,
    pub retrieval: RetrievalResult,
    pub timings: StepTimings,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StepTimings {
    pub embed_ms: u64,
    pub generate_ms: u64,
    pub total_ms: u64,
}

/// Query → embed → retrieve → assemble → generate → clean.
///
/// Holds no mutable state; clones share the same context.
#[derive(Clone)]
pub struct Translator {
    context: Arc<TranslationContext>,
}

impl Translator {
    pub fn new(context: Arc<TranslationContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &TranslationContext {
        &self.context
    }

    pub async fn translate(&self, query: &str) -> Result<String> {
        Ok(self.translate_detailed(query).await?.text)
    }

    pub async fn translate_detailed(&self, query: &str) -> Result<Translation> {
        let start = Instant::now();
        let PreparedPrompt {
            prompt,
            retrieval,
            embed_ms,
        } = self.prepare(query).await?;

        let settings = &self.context.settings;
        let request = CompletionRequest {
            system: prompt.system.clone(),
            prompt: prompt.text.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };
        let generate_start = Instant::now();
        let raw = match tokio::time::timeout(
            settings.generation_timeout,
            self.context.completion.complete(&request),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return Err(TranslateError::GenerationFailed(err)),
            Err(_) => {
                return Err(TranslateError::GenerationFailed(CompletionError::Timeout(
                    settings.generation_timeout,
                )))
            }
        };
        let generate_ms = elapsed_ms(generate_start);

        let text = strip_code_fences(&raw);
        if text.is_empty() {
            log::warn!(
                "Completion reply held no code after fence removal ({} chars)",
                raw.len()
            );
            return Err(TranslateError::GenerationFailed(CompletionError::BlankCode));
        }
        let timings = StepTimings {
            embed_ms,
            generate_ms,
            total_ms: elapsed_ms(start),
        };
        log::info!(
            "Translated {} chars with {} examples in {} ms (embed {} ms, generate {} ms)",
            query.chars().count(),
            prompt.example_count,
            timings.total_ms,
            timings.embed_ms,
            timings.generate_ms
        );
        Ok(Translation {
            text,
            prompt,
            retrieval,
            timings,
        })
    }

    /// Validate, embed, retrieve and assemble without calling the completion service.
    pub async fn prepare(&self, query: &str) -> Result<PreparedPrompt> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let settings = &self.context.settings;
        let embed_start = Instant::now();
        let embed_input = truncate_chars(query, settings.max_query_chars);
        let vector = match tokio::time::timeout(
            settings.embed_timeout,
            self.context.embedder.embed(embed_input),
        )
        .await
        {
            Ok(Ok(vector)) => vector,
            Ok(Err(err)) => return Err(TranslateError::RetrievalUnavailable(err)),
            Err(_) => {
                return Err(TranslateError::RetrievalUnavailable(
                    EmbeddingError::Timeout(settings.embed_timeout),
                ))
            }
        };
        let embed_ms = elapsed_ms(embed_start);

        let retrieval = if self.context.store.is_empty() {
            RetrievalResult::default()
        } else {
            self.context.store.search(&vector, settings.top_k.max(1))?
        };
        log::debug!(
            "Retrieved {} examples (nearest distance {:?})",
            retrieval.len(),
            retrieval.hits.first().map(|hit| hit.distance)
        );

        let prompt = self.context.template.assemble(retrieval.examples(), query);
        Ok(PreparedPrompt {
            prompt,
            retrieval,
            embed_ms,
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
