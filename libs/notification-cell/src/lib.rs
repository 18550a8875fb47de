// libs/notification-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    AppointmentNotificationRequest, ChannelOutcome, DispatchResult, NotificationError,
    NotificationEvent, Recipient, RetryPolicy, SendOutcome,
};
pub use router::notification_routes;
pub use services::{
    selected_channels, DeliveryProvider, EmailProvider, NotificationDispatcher, SmsProvider,
};
