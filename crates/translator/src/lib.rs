//! Retrieval-augmented translation on top of an [`act_vector_store::ExampleStore`].
//!
//! A [`Translator`] embeds the query, fetches the nearest stored examples, renders them
//! as a few-shot prompt and asks a [`CompletionClient`] for the translation. All
//! dependencies live in a [`TranslationContext`] built once per process.

mod completion;
mod error;
mod postprocess;
mod prompt;
mod translator;

pub use completion::{
    CompletionClient, CompletionRequest, CompletionResult, OpenAiChatClient, OpenAiChatConfig,
    DEFAULT_COMPLETION_ENDPOINT, DEFAULT_COMPLETION_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use error::{CompletionError, Result, TranslateError};
pub use postprocess::strip_code_fences;
pub use prompt::{
    assemble, Prompt, PromptTemplate, DEFAULT_HEADER, DEFAULT_SEPARATOR, DEFAULT_SOURCE_LABEL,
    DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_TARGET_LABEL,
};
pub use translator::{
    PreparedPrompt, StepTimings, TranslationContext, Translation, Translator, TranslatorSettings,
    DEFAULT_MAX_QUERY_CHARS, DEFAULT_TOP_K,
};
