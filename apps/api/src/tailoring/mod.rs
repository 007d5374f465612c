// Resume tailoring: prompt policy, the extract → prompt → chat → diff pipeline,
// per-session request gating, and the HTTP handlers on top.
// All LLM calls go through llm_client; no direct provider calls here.

pub mod handlers;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;
pub mod session;
