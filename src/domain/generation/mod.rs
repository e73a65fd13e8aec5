//! Generation pipeline domain
//!
//! The expensive collaborator the cache sits in front of: a knowledge lookup
//! plus a language-model call that turns a query into an answer.

mod answer;
mod pipeline;
mod request;

pub use answer::GeneratedAnswer;
pub use pipeline::GenerationPipeline;
pub use request::GenerationRequest;

#[cfg(test)]
pub use pipeline::MockGenerationPipeline;
#[cfg(test)]
pub use pipeline::mock::CountingPipeline;
