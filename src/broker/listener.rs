use std::sync::Arc;

use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tracing::{error, info, warn};

use crate::broker::{Broker, UserCreatedEvent, USER_CREATED_QUEUE};
use crate::mailer::Mailer;

/// Consume `user.created` and send a welcome email for each delivery.
///
/// Deliveries are acknowledged only after the mail goes out, so a crash
/// mid-send causes redelivery; duplicate sends are acceptable. A payload
/// that cannot be decoded is dropped with an ack, since redelivering it
/// could never succeed.
pub async fn run(broker: Arc<Broker>, mailer: Arc<Mailer>) -> anyhow::Result<()> {
    let mut consumer = broker.subscribe(USER_CREATED_QUEUE, "welcome-mailer").await?;
    info!(queue = USER_CREATED_QUEUE, "welcome mail listener started");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "consumer delivery error");
                continue;
            }
        };

        let event = match serde_json::from_slice::<UserCreatedEvent>(&delivery.data) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "dropping undecodable user.created message");
                delivery.ack(BasicAckOptions::default()).await?;
                continue;
            }
        };

        match mailer.send_welcome(&event).await {
            Ok(()) => {
                info!(user_id = %event.id, "welcome email sent");
                delivery.ack(BasicAckOptions::default()).await?;
            }
            Err(e) => {
                error!(error = %e, user_id = %event.id, "welcome email failed, requeueing");
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await?;
            }
        }
    }

    Ok(())
}
