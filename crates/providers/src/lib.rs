pub mod local;
pub mod registry;
pub mod remote;
mod sse;
pub mod traits;
pub mod util;

pub use local::LocalProvider;
pub use registry::ProviderRegistry;
pub use remote::RemoteProvider;
pub use traits::{
    ChatMessage, ChunkSink, CompletionOptions, CompletionResult, HealthStatus, LlmProvider,
    ModelDescriptor, Role,
};
