// src/generate/mod.rs
pub mod adapter;

pub use adapter::{
    build_client_from_config, DisabledClient, DynGenerationClient, GenerationClient,
    GenerationRequest, MockProvider, OpenAiProvider, Provider, TimedClient,
};
