//! Preview sessions and their registry.
//!
//! - [state]: the per-file [PreviewSession] state machine and decode supersession.
//! - [panel]: the [Panel] and [TextOpener] collaborators and the view/host messages.
//! - [subscription]: release-once subscriptions bound to a session's lifetime.
//! - [registry]: the [SessionRegistry] owning all live sessions and the focus reference.

pub mod panel;
pub mod registry;
pub mod state;
pub mod subscription;

pub use panel::{HostMessage, Panel, TextOpener, ViewColumn, ViewMessage};
pub use registry::{RegistryError, SessionRegistry};
pub use state::{FileEvent, PreviewSession, PreviewState, SessionId, SessionOptions};
pub use subscription::{Subscription, Teardown};
