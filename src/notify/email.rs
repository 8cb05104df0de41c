use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{render_html, render_text, subject, NotificationSender};
use crate::config::SmtpConfig;
use crate::types::{Article, Filter};

/// SMTP sender backed by lettre. The transport carries a bounded timeout so a
/// stuck relay surfaces as a delivery failure instead of a hang.
pub struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.user.clone(), cfg.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("invalid SMTP host")?
            .credentials(creds)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)))
            .build();
        let from = cfg
            .from
            .parse()
            .with_context(|| format!("invalid sender address '{}'", cfg.from))?;
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    async fn deliver(&self, to: &str, filter: &Filter, articles: &[Article]) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("invalid destination address '{to}'"))?;

        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject(filter))
            .multipart(MultiPart::alternative_plain_html(
                render_text(filter, articles),
                render_html(filter, articles),
            ))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
