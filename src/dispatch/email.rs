use askama::Template;

use crate::client::Email;
use crate::domain::{EmailAddress, MediaKind};
use crate::error::Result;
use crate::links::LinkBuilder;
use crate::model::Newsletter;

/// HTML body of a newsletter email. Headlines and URLs are escaped, the rich content is not
#[derive(Template)]
#[template(path = "newsletter_email.html")]
struct NewsletterEmail<'a> {
    title: &'a str,
    subtitle: &'a str,
    content: Option<&'a str>,
    image_url: Option<&'a str>,
    video_url: Option<&'a str>,
    unsubscribe_url: &'a str,
    tracking_url: &'a str,
}

/// Render the email a single recipient receives for a newsletter.
///
/// Both bodies carry the recipient's unsubscribe link; the HTML body also carries an invisible
/// tracking pixel bound to the newsletter and the recipient.
pub fn render(
    newsletter: &Newsletter,
    recipient: EmailAddress,
    links: &LinkBuilder,
) -> Result<Email> {
    let unsubscribe_url = links.unsubscribe(&recipient);
    let tracking_url = links.tracking_pixel(newsletter.id, &recipient);

    let media = newsletter.media();
    let (image_url, video_url) = match &media {
        Some(media) if media.kind == MediaKind::Image => (Some(media.url.as_str()), None),
        Some(media) => (None, Some(media.url.as_str())),
        None => (None, None),
    };

    let html_body = NewsletterEmail {
        title: &newsletter.title,
        subtitle: &newsletter.subtitle,
        content: newsletter.content.as_deref().filter(|c| !c.is_empty()),
        image_url,
        video_url,
        unsubscribe_url: unsubscribe_url.as_str(),
        tracking_url: tracking_url.as_str(),
    }
    .render()?;

    let text_body = format!(
        "{}\n{}\n\nThis newsletter is best viewed in an HTML-capable email client.\n\nTo unsubscribe, visit this web page: {}",
        newsletter.title, newsletter.subtitle, unsubscribe_url
    );

    Ok(Email {
        recipient,
        subject: newsletter.title.clone(),
        html_body,
        text_body,
    })
}
