// ReasoningLens Core Services

pub mod text_processor;
pub mod config_store;
pub mod reasoning;

pub use config_store::{ConfigError, ConfigStore, ExtractorConfig};

// Re-export reasoning entry points
pub use reasoning::{
    extract_uncached,
    get_reasoning_analytics,
    remove_reasoning_from_content,
    ReasoningEngine,
    StreamingExtractor,
};
