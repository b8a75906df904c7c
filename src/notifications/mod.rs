pub mod dispatcher;
pub mod templates;
pub mod transports;

pub use dispatcher::{NotificationDispatcher, NotificationPolicy};
pub use transports::{ResendEmailClient, TwilioMessageClient};
