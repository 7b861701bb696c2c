use anyhow::Context;
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::dto::FullName;
use crate::auth::repo_types::{Role, User};

pub mod listener;

/// Queue carrying one message per newly created account.
pub const USER_CREATED_QUEUE: &str = "user.created";

/// Publishing seam for handlers, so tests can substitute a no-op.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, queue: &str, message: &serde_json::Value) -> anyhow::Result<()>;
}

/// Owned RabbitMQ connection + channel. Connected once at startup and closed
/// at shutdown; the channel is safe to share across request handlers.
pub struct Broker {
    connection: Connection,
    channel: Channel,
}

impl Broker {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);
        let connection = Connection::connect(url, options)
            .await
            .context("connect to RabbitMQ")?;
        let channel = connection
            .create_channel()
            .await
            .context("open RabbitMQ channel")?;
        info!("connected to RabbitMQ");
        Ok(Self {
            connection,
            channel,
        })
    }

    async fn declare_durable(&self, queue: &str) -> anyhow::Result<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    /// Begin consuming a durable queue. Deliveries must be acked explicitly.
    pub async fn subscribe(&self, queue: &str, consumer_tag: &str) -> anyhow::Result<Consumer> {
        self.declare_durable(queue).await?;
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                Default::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("subscribe to queue {queue}"))?;
        info!(queue, "subscribed");
        Ok(consumer)
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.connection.close(200, "shutdown").await?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for Broker {
    async fn publish(&self, queue: &str, message: &serde_json::Value) -> anyhow::Result<()> {
        self.declare_durable(queue).await?;
        let body = serde_json::to_vec(message)?;
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &body,
                // delivery mode 2: persist across broker restarts
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        debug!(queue, "message published");
        Ok(())
    }
}

/// Payload of a `user.created` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedEvent {
    pub id: Uuid,
    pub email: Option<String>,
    pub fullname: FullName,
    pub role: Role,
}

impl UserCreatedEvent {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            fullname: FullName {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
            },
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_camel_case_fullname() {
        let event = UserCreatedEvent {
            id: Uuid::new_v4(),
            email: Some("a@x.com".into()),
            fullname: FullName {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            },
            role: Role::User,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["fullname"]["firstName"], "Ada");
        assert_eq!(json["fullname"]["lastName"], "Lovelace");
        assert_eq!(json["role"], "user");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = UserCreatedEvent {
            id: Uuid::new_v4(),
            email: None,
            fullname: FullName {
                first_name: "Solo".into(),
                last_name: "Artist".into(),
            },
            role: Role::Artist,
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let back: UserCreatedEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.role, Role::Artist);
        assert_eq!(back.fullname.first_name, "Solo");
    }
}
