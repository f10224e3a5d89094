use actix_web::dev::HttpServiceFactory;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, web, HttpResponse, Responder};

use crate::media::MediaStore;

use super::error::{RestError, RestResult};

/// Serve an uploaded media file inline
#[tracing::instrument(name = "Serve media file", skip(media_store))]
#[get("/media/{filename}")]
async fn serve(
    media_store: web::Data<MediaStore>,
    path: web::Path<(String,)>,
) -> RestResult<impl Responder> {
    let (filename,) = path.into_inner();
    let not_found = || RestError::NotFound("Media file not found".into());

    let (bytes, content_type) = match media_store.open(&filename).await {
        Ok(Some(file)) => file,
        Ok(None) => return Err(not_found()),
        Err(crate::error::Error::Validation(_)) => {
            tracing::warn!("Rejected media filename");
            return Err(not_found());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

/// Media API endpoints
pub fn scope() -> impl HttpServiceFactory {
    serve
}
