use actix_multipart::Multipart;
use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::Utc;

use futures::TryStreamExt;

use serde_json::json;

use uuid::Uuid;

use crate::dispatch::DispatchQueue;
use crate::domain::{Headline, MediaKind};
use crate::error::Error;
use crate::media::MediaStore;
use crate::model::{NewNewsletter, NewsletterMedia};
use crate::repo::Repos;

use super::error::{RestError, RestResult};
use super::{ok, respond};

/// Multipart form fields shared by the create and update endpoints
#[derive(Debug, Default)]
struct NewsletterForm {
    title: Option<String>,
    subtitle: Option<String>,
    content: Option<String>,
    media: Option<Upload>,
}

struct Upload {
    filename: Option<String>,
    kind: MediaKind,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl NewsletterForm {
    async fn read(mut payload: Multipart) -> RestResult<Self> {
        let mut form = Self::default();

        while let Some(mut field) = payload.try_next().await? {
            let name = field.name().to_string();
            let filename = field
                .content_disposition()
                .get_filename()
                .map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await? {
                bytes.extend_from_slice(&chunk);
            }

            match name.as_str() {
                "title" => form.title = Some(text(&name, bytes)?),
                "subtitle" => form.subtitle = Some(text(&name, bytes)?),
                "content" => form.content = Some(text(&name, bytes)?),
                // Browsers send an empty part when no file was picked
                "mediaFile" if bytes.is_empty() => {}
                "mediaFile" => {
                    let kind = content_type
                        .as_deref()
                        .and_then(MediaKind::from_content_type)
                        .ok_or_else(|| {
                            Error::Validation("Media file must be an image or a video".into())
                        })?;
                    form.media = Some(Upload {
                        filename,
                        kind,
                        bytes,
                    });
                }
                other => tracing::debug!("Ignoring unknown form field {}", other),
            }
        }

        Ok(form)
    }

    fn headlines(&self) -> RestResult<(Headline, Headline)> {
        let title = self
            .title
            .as_deref()
            .ok_or_else(|| Error::Validation("Title is required".into()))?
            .parse()?;
        let subtitle = self
            .subtitle
            .as_deref()
            .ok_or_else(|| Error::Validation("Subtitle is required".into()))?
            .parse()?;
        Ok((title, subtitle))
    }

    fn content(&self) -> Option<String> {
        self.content.clone().filter(|c| !c.trim().is_empty())
    }

    /// Validate the form, then store its upload (if any) and build the newsletter content
    async fn into_newsletter(self, media_store: &MediaStore) -> RestResult<NewNewsletter> {
        let (title, subtitle) = self.headlines()?;
        let content = self.content();

        let media = match self.media {
            Some(upload) => {
                let url = media_store
                    .save(upload.filename.as_deref(), &upload.bytes)
                    .await?;
                Some(NewsletterMedia {
                    url,
                    kind: upload.kind,
                })
            }
            None => None,
        };

        Ok(NewNewsletter {
            title,
            subtitle,
            content,
            media,
        })
    }
}

fn text(field: &str, bytes: Vec<u8>) -> RestResult<String> {
    String::from_utf8(bytes)
        .map_err(|_| Error::Validation(format!("Field {} must be valid UTF-8", field)).into())
}

#[tracing::instrument(name = "Create newsletter", skip(repos, media_store, payload))]
#[post("/create")]
async fn create(
    repos: web::Data<Repos>,
    media_store: web::Data<MediaStore>,
    payload: Multipart,
) -> RestResult<impl Responder> {
    let form = NewsletterForm::read(payload).await?;
    let new_newsletter = form.into_newsletter(&media_store).await?;

    let newsletter = match repos.newsletters.insert(&new_newsletter, Utc::now()).await {
        Ok(newsletter) => newsletter,
        Err(e) => {
            if let Some(media) = &new_newsletter.media {
                media_store.delete(&media.url).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!(newsletter_id = %newsletter.id, "Newsletter created");

    Ok(respond(
        StatusCode::CREATED,
        "Newsletter created successfully",
        json!({ "newsletter": newsletter }),
    ))
}

/// Replace a draft's content. A new upload replaces (and removes) the previous media file
#[tracing::instrument(name = "Update newsletter", skip(repos, media_store, payload))]
#[put("/update/{id}")]
async fn update(
    repos: web::Data<Repos>,
    media_store: web::Data<MediaStore>,
    path: web::Path<(Uuid,)>,
    payload: Multipart,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    let existing = repos
        .newsletters
        .fetch(id)
        .await?
        .ok_or_else(|| Error::not_found("Newsletter"))?;
    if existing.is_sent() {
        return Err(already_sent().into());
    }

    let form = NewsletterForm::read(payload).await?;
    let changes = form.into_newsletter(&media_store).await?;

    let updated = match repos.newsletters.update(id, &changes).await {
        Ok(Some(updated)) => updated,
        // Sent or deleted while the upload was being processed
        other => {
            if let Some(media) = &changes.media {
                media_store.delete(&media.url).await;
            }
            return Err(match other {
                Err(e) => e.into(),
                _ => already_sent().into(),
            });
        }
    };

    if changes.media.is_some() {
        if let Some(old_url) = existing.media_url.as_deref() {
            media_store.delete(old_url).await;
        }
    }

    Ok(respond(
        StatusCode::OK,
        "Newsletter updated successfully",
        json!({ "newsletter": updated }),
    ))
}

fn already_sent() -> Error {
    Error::Conflict("Cannot update a newsletter that has already been sent".into())
}

/// Delete a newsletter together with its media, scheduled jobs and analytics
#[tracing::instrument(name = "Delete newsletter", skip(repos, media_store))]
#[delete("/delete/{id}")]
async fn remove(
    repos: web::Data<Repos>,
    media_store: web::Data<MediaStore>,
    path: web::Path<(Uuid,)>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    let deleted = repos
        .newsletters
        .delete(id)
        .await?
        .ok_or_else(|| Error::not_found("Newsletter"))?;
    if let Some(url) = deleted.media_url.as_deref() {
        media_store.delete(url).await;
    }

    Ok(ok("Newsletter deleted successfully"))
}

/// Start a background dispatch of an unsent newsletter and return immediately
#[tracing::instrument(name = "Send newsletter now", skip(repos, queue))]
#[post("/send/{id}")]
async fn send(
    repos: web::Data<Repos>,
    queue: web::Data<DispatchQueue>,
    path: web::Path<(Uuid,)>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    let newsletter = repos
        .newsletters
        .fetch(id)
        .await?
        .ok_or_else(|| Error::not_found("Newsletter"))?;
    if newsletter.is_sent() {
        return Err(Error::AlreadySent.into());
    }
    queue.enqueue(id).map_err(RestError::Other)?;

    Ok(ok("Newsletter sending started"))
}

#[tracing::instrument(name = "List newsletters", skip(repos))]
#[get("/all")]
async fn all(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let newsletters = repos.newsletters.fetch_all().await?;
    Ok(HttpResponse::Ok().json(newsletters))
}

/// Total number of emails delivered across all sent newsletters
#[tracing::instrument(name = "Newsletter send totals", skip(repos))]
#[get("/analytics")]
async fn totals(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let total = repos.newsletters.total_recipients_sent().await?;
    Ok(HttpResponse::Ok().json(json!({ "totalEmailsSent": total })))
}

#[tracing::instrument(name = "Get newsletter", skip(repos))]
#[get("/{id}")]
async fn get_by_id(
    repos: web::Data<Repos>,
    path: web::Path<(Uuid,)>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    let newsletter = repos
        .newsletters
        .fetch(id)
        .await?
        .ok_or_else(|| Error::not_found("Newsletter"))?;

    Ok(HttpResponse::Ok().json(newsletter))
}

/// Newsletter API endpoints
pub fn scope() -> impl HttpServiceFactory {
    // Fixed paths go before `/{id}`
    web::scope("/newsletters")
        .service(create)
        .service(update)
        .service(remove)
        .service(send)
        .service(all)
        .service(totals)
        .service(get_by_id)
}
