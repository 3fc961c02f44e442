pub mod error;
pub mod local;
pub mod ports;

pub use error::{CollaboratorError, CollaboratorErrorKind};
pub use local::{
    ConfigDiscovery, StaticIdentityProvider, TemplateThoughtGenerator, TracingContentSink,
};
pub use ports::{
    AgentIdentity, ContentSink, DiscoverySource, IdentityProvider, MediaAttachment,
    PlatformCredentials, PublishRecord, ThoughtContext, ThoughtGenerator, ThoughtPurpose,
};
