use askama::Template;
use uuid::Uuid;

use super::locale::Locale;
use crate::urls;

#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub domain: String,
}

/// What the subscriber mail says about the new post.
#[derive(Debug, Clone)]
pub struct PostNotice {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub topic_name: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
}

/// What the watch-area mail says about the topic.
#[derive(Debug, Clone)]
pub struct TopicNotice {
    pub id: Uuid,
    pub name: String,
    pub author_id: Uuid,
    pub author_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchAreaRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

#[derive(Template)]
#[template(path = "mail/subscription_email_subject.txt")]
struct SubscriptionSubject<'a> {
    lang: &'a str,
    site: &'a SiteInfo,
    post: &'a PostNotice,
}

#[derive(Template)]
#[template(path = "mail/subscription_email_body.txt")]
struct SubscriptionBody<'a> {
    lang: &'a str,
    site: &'a SiteInfo,
    post: &'a PostNotice,
    recipient_name: &'a str,
    post_url: &'a str,
    delete_url: &'a str,
}

#[derive(Template)]
#[template(path = "mail/watch_area_subscription_email_subject.txt")]
struct WatchAreaSubject<'a> {
    lang: &'a str,
    site: &'a SiteInfo,
    watch_areas: &'a [WatchAreaRef],
}

#[derive(Template)]
#[template(path = "mail/watch_area_subscription_email_body.txt")]
struct WatchAreaBody<'a> {
    lang: &'a str,
    site: &'a SiteInfo,
    topic: &'a TopicNotice,
    watch_areas: &'a [WatchAreaRef],
    recipient_name: &'a str,
    topic_url: &'a str,
    manage_url: &'a str,
}

/// Mail headers are single line: drops every line break a template or the
/// interpolated content may have produced.
pub fn single_line(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                c,
                '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
                    | '\u{2028}' | '\u{2029}'
            )
        })
        .collect()
}

pub fn render_subscription_mail(
    locale: Locale,
    site: &SiteInfo,
    post: &PostNotice,
    recipient_name: &str,
) -> askama::Result<RenderedMail> {
    let lang = locale.code();
    let subject = SubscriptionSubject { lang, site, post }.render()?;

    let post_url = urls::post(post.id);
    let delete_url = urls::delete_subscription(post.topic_id);
    let body = SubscriptionBody {
        lang,
        site,
        post,
        recipient_name,
        post_url: &post_url,
        delete_url: &delete_url,
    }
    .render()?;

    Ok(RenderedMail {
        subject: single_line(&subject),
        body,
    })
}

pub fn render_watch_area_mail(
    locale: Locale,
    site: &SiteInfo,
    topic: &TopicNotice,
    watch_areas: &[WatchAreaRef],
    recipient_name: &str,
) -> askama::Result<RenderedMail> {
    let lang = locale.code();
    let subject = WatchAreaSubject {
        lang,
        site,
        watch_areas,
    }
    .render()?;

    let topic_url = urls::topic(topic.id);
    let manage_url = urls::edit_profile();
    let body = WatchAreaBody {
        lang,
        site,
        topic,
        watch_areas,
        recipient_name,
        topic_url: &topic_url,
        manage_url: &manage_url,
    }
    .render()?;

    Ok(RenderedMail {
        subject: single_line(&subject),
        body,
    })
}
