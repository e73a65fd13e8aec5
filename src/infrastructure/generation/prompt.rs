//! Prompt construction for the generation pipeline

use std::collections::BTreeMap;

use crate::domain::generation::GenerationRequest;

/// Append the names of the supplied context fields to a prompt.
///
/// Only keys are echoed, sorted; values stay out of the prompt.
pub fn enrich_prompt(prompt: &str, context: Option<&BTreeMap<String, serde_json::Value>>) -> String {
    let keys = match context {
        Some(context) if !context.is_empty() => {
            context.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        }
        _ => "none".to_string(),
    };

    format!("{}\n\n[context keys: {}]", prompt, keys)
}

/// User message for one request: the question, its scope and output limits
pub fn build_user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!("Question: {}", request.query);

    if let Some(ref category) = request.category {
        prompt.push_str(&format!("\nCategory: {}", category));
    }

    if let Some(ref difficulty) = request.difficulty {
        prompt.push_str(&format!("\nDifficulty: {}", difficulty));
    }

    prompt.push_str(&format!(
        "\nReturn at most {} items per list.",
        request.max_results
    ));

    if !request.include_code {
        prompt.push_str("\nDo not include code examples.");
    }

    if !request.include_techniques {
        prompt.push_str("\nDo not list techniques.");
    }

    enrich_prompt(&prompt, request.context.as_ref())
}
