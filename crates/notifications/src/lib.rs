//! Notification dispatch for reservation status changes.
//!
//! Every state transition produces one or more [`StatusChangedEvent`]s. The
//! dispatcher renders them into in-app notification rows and hands them to a
//! pluggable [`EventPublisher`] for external delivery. Dispatch is strictly
//! best-effort: a failed notification never fails the transition it reports.

pub mod dispatcher;
pub mod event;
pub mod publisher;
pub mod text;

pub use dispatcher::NotificationDispatcher;
pub use event::{Audience, StatusChangedEvent};
pub use publisher::{EventPublisher, LoggingPublisher, PublishError, RecordingPublisher};
pub use text::notification_text;
