//! Provider adapters used by the prompt wizard.
//!
//! Each codec module speaks one wire format over the shared [`transport`]
//! seam, while [`registry`] maps provider ids onto the right codec.

#![warn(missing_docs, clippy::pedantic)]

pub mod chat_completions;
mod completion;
mod error;
pub mod generate_content;
pub mod registry;
pub mod transport;

pub use chat_completions::ChatCompletionsAdapter;
pub use completion::{AdapterInfo, CompletionAdapter, CompletionRequest, Speaker, Turn};
pub use error::{AdapterError, AdapterResult};
pub use generate_content::GenerateContentAdapter;
pub use registry::{KeyFormatError, ProviderDescriptor, ProviderRegistry, WireFormat};
pub use transport::{HttpTransport, HyperTransport, TransportRequest, TransportResponse};
