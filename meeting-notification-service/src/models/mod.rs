pub mod notification;

pub use notification::{token_preview, NotificationRequest, NotificationResult, PushPriority};
