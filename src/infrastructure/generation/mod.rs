//! Generation pipeline implementations

mod openai;
mod prompt;

pub use openai::OpenAiGenerationPipeline;
pub use prompt::{build_user_prompt, enrich_prompt};
