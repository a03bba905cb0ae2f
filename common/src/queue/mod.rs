// Queue module for NATS JetStream integration

pub mod client;
pub mod consumer;
pub mod nats;
pub mod publisher;

pub use client::EditRequestClient;
pub use consumer::{Delivery, EditRequestConsumer, JobHandler};
pub use nats::NatsClient;
pub use publisher::{NatsReplyPublisher, ReplyPublisher};
