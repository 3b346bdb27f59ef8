use crate::state::State;
use axum::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

mod invoices;

/// The outgoing mail boundary. The application composes the message and hands
/// it to an HTTP relay over multipart form data, delivery itself happens
/// outside this process.
#[derive(Clone)]
pub struct Mailer {
    pub client: reqwest::Client,
    pub url: Option<String>,
    pub from: String,
}

/// One composed message with a single PDF attachment.
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub filename: String,
    pub pdf: Vec<u8>,
}

impl Mailer {
    /// Without `MAIL_RELAY_URL` the mailer still constructs, every send then
    /// reports the relay as unavailable.
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: std::env::var("MAIL_RELAY_URL").ok(),
            from: std::env::var("MAIL_FROM").unwrap_or(String::from("invoices@localhost")),
        }
    }

    pub async fn send(self, email: Email) -> Result<(), crate::error::Error> {
        let url = self.url.ok_or(crate::error::Error::MailRelayUnavailable)?;

        let form = reqwest::multipart::Form::new()
            .text("from", self.from)
            .text("to", email.to)
            .text("subject", email.subject)
            .text("body", email.body)
            .part(
                "attachment",
                reqwest::multipart::Part::bytes(email.pdf).file_name(email.filename),
            );

        let response = self.client.post(url).multipart(form).send().await?;

        match response.error_for_status() {
            Ok(_) => Ok(()),
            Err(e) => Err(crate::error::Error::ReqwestError(e)),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Mailer
where
    S: Send + Sync,
    State: FromRef<S>,
{
    type Rejection = crate::error::Error;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = State::from_ref(state);
        Ok(state.mailer)
    }
}
