use act_vector_store::Example;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert in Delphi Pascal and C# programming. Translate code from Delphi to C#. Only output the C# translated code.";
pub const DEFAULT_HEADER: &str = "Translate Delphi Pascal to C# using the examples below.\n\n";
pub const DEFAULT_SOURCE_LABEL: &str = "Delphi";
pub const DEFAULT_TARGET_LABEL: &str = "C#";
pub const DEFAULT_SEPARATOR: &str = "---";

/// Wording of the few-shot prompt. Every field can be overridden from `[prompt]` in the
/// config file to retarget another language pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub system: String,
    pub header: String,
    pub source_label: String,
    pub target_label: String,
    pub separator: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            header: DEFAULT_HEADER.to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// System instruction sent alongside the prompt
    pub system: String,
    /// User message: header, example blocks, then the query with an open output marker
    pub text: String,
    pub example_count: usize,
}

impl PromptTemplate {
    /// Render `examples` (nearest first) and then `query`. Pure string building.
    pub fn assemble<'a, I>(&self, examples: I, query: &str) -> Prompt
    where
        I: IntoIterator<Item = &'a Example>,
    {
        let mut text = self.header.clone();
        let mut example_count = 0;
        for example in examples {
            self.push_block(&mut text, &example.input);
            text.push_str(&example.output);
            text.push_str("\n\n");
            text.push_str(&self.separator);
            text.push('\n');
            example_count += 1;
        }
        self.push_block(&mut text, query);

        Prompt {
            system: self.system.clone(),
            text,
            example_count,
        }
    }

    /// `<source>:\n<input>\n\n<target>:\n`
    fn push_block(&self, text: &mut String, input: &str) {
        text.push_str(&self.source_label);
        text.push_str(":\n");
        text.push_str(input);
        text.push_str("\n\n");
        text.push_str(&self.target_label);
        text.push_str(":\n");
    }
}

/// [`PromptTemplate::assemble`] with the default template.
pub fn assemble<'a, I>(examples: I, query: &str) -> Prompt
where
    I: IntoIterator<Item = &'a Example>,
{
    PromptTemplate::default().assemble(examples, query)
}
