use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use serde_derive::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reqwest error {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("{0} not found")]
    ReferenceNotFound(&'static str),
    #[error("No document surface is mounted")]
    RenderSurfaceUnavailable,
    #[error("No mail relay is configured")]
    MailRelayUnavailable,
    #[error("No recipient address on the invoice or its customer")]
    MissingRecipient,
    #[error("Deleting requires confirm=true")]
    ConfirmationRequired,
    #[error("Unsupported image data. Supported formats are (png|jpg|jpeg|gif|svg)")]
    UnsupportedImageFormat,
    #[error("Error while decoding base64 image data")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Error while encoding image")]
    ImageError(#[from] image::ImageError),
    #[error("Error in handling json value")]
    JsonRejection(#[from] axum::extract::rejection::JsonRejection),
    #[error("Error while parsing json")]
    JsonError(#[from] serde_json::Error),
    #[error("Internal server error")]
    InternalServerError(#[from] std::io::Error),
    #[error("Pdf error")]
    PdfError(#[from] lopdf::Error),
    #[error("Typst error")]
    TypstError,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        error!(%self);

        let status = match self {
            Error::InternalServerError(_)
            | Error::ReqwestError(_)
            | Error::ImageError(_)
            | Error::PdfError(_)
            | Error::TypstError => StatusCode::INTERNAL_SERVER_ERROR,
            Error::RenderSurfaceUnavailable | Error::MailRelayUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::ReferenceNotFound(_) => StatusCode::NOT_FOUND,
            Error::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            Error::JsonError(_)
            | Error::JsonRejection(_)
            | Error::MissingRecipient
            | Error::Base64Error(_)
            | Error::UnsupportedImageFormat => StatusCode::BAD_REQUEST,
        };

        (
            status,
            axum::Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
