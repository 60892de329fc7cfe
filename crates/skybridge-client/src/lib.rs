// ABOUTME: Network side of skybridge: AT Protocol and page backend clients plus the post workflow.
// ABOUTME: Collaborators sit behind traits so the workflow can run against stubs in tests.

pub mod builder;
pub mod collaborators;
pub mod config;
pub mod page;
pub mod popup;
pub mod testing;
pub mod workflow;
pub mod xrpc;

pub use builder::AtprotoRecordBuilder;
pub use collaborators::{
    PageApi, RecordApi, RecordBuilder, SessionProvider, SharePopup, StaticSession,
};
pub use config::{ConfigError, Credentials, SkybridgeConfig};
pub use page::HttpPageApi;
pub use popup::{IntentPopup, intent_url};
pub use workflow::PostWorkflow;
pub use xrpc::XrpcClient;
