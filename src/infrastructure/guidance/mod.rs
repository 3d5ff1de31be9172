//! Guidance store implementations and the step guidance resolver

mod cached;
mod factory;
mod in_memory;
mod postgres;
mod resolver;

pub use cached::CachedGuidanceProvider;
pub use factory::create_guidance_provider;
pub use in_memory::InMemoryGuidanceProvider;
pub use postgres::PostgresGuidanceProvider;
pub use resolver::{
    trim_snippet, GuidanceResolver, GuidanceResolverConfig, DEFAULT_LOOKUP_TIMEOUT,
    DEFAULT_MAX_HELP_CHARS,
};
