// Prompt texts sent to the completion backend.

use crate::models::Language;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that provides clear, concise definitions. For any text provided, focus on defining the specific highlighted term/phrase. Any additional text provided is context to help you understand the term better, but is not the target of the definition. Keep responses under 100 words.";

const NO_CONTEXT: &str = "No context provided";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

fn context_or_placeholder(context: &str) -> &str {
    if context.trim().is_empty() { NO_CONTEXT } else { context }
}

pub fn definition_prompt(system_prompt: &str, text: &str, context: &str, language: Language) -> Prompt {
    let instruction = match language {
        Language::En => String::new(),
        other => format!("Provide the definition in {}.", other.name()),
    };
    Prompt {
        system: format!("{system_prompt} {instruction}").trim_end().to_string(),
        user: format!(
            "Define this term: \"{text}\"\nContext: \"{context}\"",
            text = text,
            context = context_or_placeholder(context)
        ),
    }
}

pub fn translation_prompt(text: &str, target: Language) -> Prompt {
    Prompt {
        system: format!(
            "Translate the following text to {lang}. Maintain the same tone and style.",
            lang = target.name()
        ),
        user: text.to_string(),
    }
}

pub fn custom_prompt(system_prompt: &str, prompt: &str, text: &str, context: &str) -> Prompt {
    Prompt {
        system: system_prompt.to_string(),
        user: format!(
            r#"{prompt}

Selected text: "{text}"
Context: "{context}""#,
            prompt = prompt,
            text = text,
            context = context_or_placeholder(context)
        ),
    }
}
