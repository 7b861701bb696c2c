use anyhow::Context;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::broker::UserCreatedEvent;
use crate::config::MailConfig;

/// SMTP sender for the welcome email.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .context("build smtp transport")?
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();
        let from: Mailbox = format!("TuneHub <{}>", config.user)
            .parse()
            .context("parse sender mailbox")?;
        Ok(Self { transport, from })
    }

    pub async fn send_welcome(&self, event: &UserCreatedEvent) -> anyhow::Result<()> {
        let email = event
            .email
            .as_deref()
            .context("user has no email address")?;
        let to: Mailbox = email.parse().context("parse recipient mailbox")?;

        let (text, html) = render_welcome(event);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Welcome to TuneHub")
            .multipart(MultiPart::alternative_plain_html(text, html))
            .context("build welcome message")?;

        self.transport
            .send(message)
            .await
            .context("send welcome email")?;
        debug!(email, "welcome email delivered to smtp relay");
        Ok(())
    }
}

/// Render the welcome mail body as (plain text, html).
fn render_welcome(event: &UserCreatedEvent) -> (String, String) {
    let first = &event.fullname.first_name;
    let last = &event.fullname.last_name;
    let role = event.role.as_str();

    let text = format!(
        "Dear {first} {last},\n\n\
         Thank you for registering with TuneHub.\n\
         We are excited to have you on board!\n\
         Your role is: {role}.\n\n\
         Best regards,\n\
         The TuneHub Team\n"
    );
    let html = format!(
        "<p>Dear {first} {last},</p>\
         <p>Thank you for registering with TuneHub.</p>\
         <p>We are excited to have you on board!</p>\
         <p>Your role is: {role}.</p>\
         <p>Best regards,<br/>The TuneHub Team</p>"
    );
    (text, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::FullName;
    use crate::auth::repo_types::Role;
    use uuid::Uuid;

    fn sample_event(role: Role) -> UserCreatedEvent {
        UserCreatedEvent {
            id: Uuid::new_v4(),
            email: Some("new@listener.example".into()),
            fullname: FullName {
                first_name: "Rafi".into(),
                last_name: "Ahmed".into(),
            },
            role,
        }
    }

    #[test]
    fn welcome_body_addresses_recipient_by_name() {
        let (text, html) = render_welcome(&sample_event(Role::User));
        assert!(text.contains("Dear Rafi Ahmed"));
        assert!(html.contains("Dear Rafi Ahmed"));
        assert!(text.contains("Your role is: user"));
    }

    #[test]
    fn welcome_body_reflects_artist_role() {
        let (text, _) = render_welcome(&sample_event(Role::Artist));
        assert!(text.contains("Your role is: artist"));
    }
}
