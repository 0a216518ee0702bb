//! Mail fan-out to topic subscribers and watch-area watchers.
//!
//! Runs inline in the request that triggered it. Every recipient is handled
//! independently: an invalid address or a failed delivery skips that
//! recipient only. Rendering errors abort the fan-out.

pub mod email;
pub mod locale;
pub mod render;

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, OptionExt},
    mail::{send_quietly, Mailer, OutgoingMail},
    models::{Post, Topic, User, WatcherMatch},
    repositories::{
        post_repository, subscription_repository, topic_repository, user_repository,
        watch_area_repository,
    },
};
use email::EmailValidator;
use locale::Locale;
pub use render::{PostNotice, SiteInfo, TopicNotice, WatchAreaRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub language: Option<String>,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            language: user.language.clone(),
        }
    }
}

/// A watcher together with every matching area they watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherGroup {
    pub recipient: Recipient,
    pub areas: Vec<WatchAreaRef>,
}

/// Subscribers minus the author of the post.
pub fn subscriber_recipients(subscribers: &[User], author_id: Uuid) -> Vec<Recipient> {
    subscribers
        .iter()
        .filter(|user| user.id != author_id)
        .map(Recipient::from)
        .collect()
}

/// Collapses (area, watcher) pairs into one group per watcher, excluding the
/// author. Watchers and their areas keep the order of `matches`.
pub fn group_watchers(matches: Vec<WatcherMatch>, author_id: Uuid) -> Vec<WatcherGroup> {
    let mut groups: Vec<WatcherGroup> = Vec::new();
    for m in matches {
        if m.user_id == author_id {
            continue;
        }
        let area = WatchAreaRef {
            id: m.watch_area_id,
            name: m.watch_area_name,
        };
        match groups.iter_mut().find(|g| g.recipient.id == m.user_id) {
            Some(group) => {
                if !group.areas.iter().any(|a| a.id == area.id) {
                    group.areas.push(area);
                }
            }
            None => groups.push(WatcherGroup {
                recipient: Recipient {
                    id: m.user_id,
                    username: m.username,
                    email: m.email,
                    language: m.language,
                },
                areas: vec![area],
            }),
        }
    }
    groups
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    validator: Arc<EmailValidator>,
    site: SiteInfo,
    default_language: String,
    from_email: String,
}

impl Notifier {
    pub fn new(config: &Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        Ok(Self {
            mailer,
            validator: Arc::new(EmailValidator::new()?),
            site: SiteInfo {
                name: config.site_name.clone(),
                domain: config.site_domain.clone(),
            },
            default_language: config.language_code.clone(),
            from_email: config.default_from_email.clone(),
        })
    }

    /// Whether mail to `email` would be attempted.
    pub fn accepts_address(&self, email: &str) -> bool {
        self.validator.is_valid(email)
    }

    fn locale_for(&self, recipient: &Recipient) -> Locale {
        Locale::resolve(recipient.language.as_deref(), &self.default_language)
    }

    /// Mails the subscribers of the post's topic. The head post of a topic
    /// never notifies. Returns the number of mails the transport accepted.
    pub async fn notify_topic_subscribers(&self, pool: &PgPool, post: &Post) -> Result<usize, AppError> {
        let head_id = post_repository::get_head_post_id(pool, post.topic_id).await?;
        if head_id == Some(post.id) {
            debug!(post_id = %post.id, "Head post, no subscriber notification");
            return Ok(0);
        }

        let topic = topic_repository::get_topic_by_id(pool, post.topic_id)
            .await?
            .or_not_found()?;
        let author = user_repository::get_user_by_id(pool, post.user_id)
            .await?
            .or_not_found()?;
        let subscribers = subscription_repository::list_topic_subscribers(pool, topic.id).await?;

        let notice = PostNotice {
            id: post.id,
            topic_id: topic.id,
            topic_name: topic.name,
            author_id: author.id,
            author_name: author.username,
            body: post.body.clone(),
        };
        let recipients = subscriber_recipients(&subscribers, notice.author_id);
        Ok(self.send_subscription_mails(&notice, &recipients).await?)
    }

    pub async fn send_subscription_mails(
        &self,
        post: &PostNotice,
        recipients: &[Recipient],
    ) -> askama::Result<usize> {
        let mut sent = 0;
        for recipient in recipients {
            if !self.validator.is_valid(&recipient.email) {
                debug!(user_id = %recipient.id, "Skipping subscriber without a valid email");
                continue;
            }
            let mail = render::render_subscription_mail(
                self.locale_for(recipient),
                &self.site,
                post,
                &recipient.username,
            )?;
            if self.deliver(mail, &recipient.email).await {
                sent += 1;
            }
        }
        info!(post_id = %post.id, recipients = recipients.len(), sent, "Notified topic subscribers");
        Ok(sent)
    }

    /// Mails every watcher of an area whose fence intersects the topic's place.
    /// Topics without a place notify nobody.
    pub async fn notify_area_watchers(&self, pool: &PgPool, topic: &Topic) -> Result<usize, AppError> {
        if topic.place.is_none() {
            return Ok(0);
        }

        let matches = watch_area_repository::find_watchers_for_topic(pool, topic.id).await?;
        if matches.is_empty() {
            return Ok(0);
        }
        let author = user_repository::get_user_by_id(pool, topic.user_id)
            .await?
            .or_not_found()?;

        let notice = TopicNotice {
            id: topic.id,
            name: topic.name.clone(),
            author_id: author.id,
            author_name: author.username,
        };
        let groups = group_watchers(matches, notice.author_id);
        Ok(self.send_watch_area_mails(&notice, &groups).await?)
    }

    pub async fn send_watch_area_mails(
        &self,
        topic: &TopicNotice,
        groups: &[WatcherGroup],
    ) -> askama::Result<usize> {
        let mut sent = 0;
        for group in groups {
            let recipient = &group.recipient;
            if !self.validator.is_valid(&recipient.email) {
                debug!(user_id = %recipient.id, "Skipping watcher without a valid email");
                continue;
            }
            let mail = render::render_watch_area_mail(
                self.locale_for(recipient),
                &self.site,
                topic,
                &group.areas,
                &recipient.username,
            )?;
            if self.deliver(mail, &recipient.email).await {
                sent += 1;
            }
        }
        info!(topic_id = %topic.id, recipients = groups.len(), sent, "Notified watch area watchers");
        Ok(sent)
    }

    async fn deliver(&self, mail: render::RenderedMail, to: &str) -> bool {
        let outgoing = OutgoingMail {
            subject: mail.subject,
            body: mail.body,
            from: self.from_email.clone(),
            to: vec![to.to_string()],
        };
        send_quietly(self.mailer.as_ref(), outgoing).await
    }
}
