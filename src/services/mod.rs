//! Pipeline assembly and execution.
//!
//! # Architecture
//!
//! ```text
//! PipelineFactory::build(config)
//!   ├── DomainLexicon::load(domain, data_dir)
//!   ├── resolve source/target adapters
//!   ├── resolve subnets (adapters + lexicon injected)
//!   └── resolve coordinator (subnet count + embed_dim injected)
//!         ▼
//!      Pipeline ── translate / translate_concurrent / update_memory / save / load
//! ```

mod checkpoint;
mod factory;
mod pipeline;

pub use checkpoint::Checkpoint;
pub use factory::PipelineFactory;
pub use pipeline::Pipeline;
