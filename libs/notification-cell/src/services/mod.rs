// libs/notification-cell/src/services/mod.rs
pub mod dispatch;
pub mod providers;

pub use dispatch::{selected_channels, NotificationDispatcher};
pub use providers::{DeliveryProvider, EmailProvider, SmsProvider};
