use std::time::Duration;

use reqwest::multipart::{Form, Part};
use url::Url;

use super::router::{MultipartForm, PartValue, Transport, TransportError, TransportResponse};

/// reqwest-backed [`Transport`] posting `multipart/form-data` bodies.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn post(
        &self,
        endpoint: &Url,
        form: MultipartForm,
    ) -> Result<TransportResponse, TransportError> {
        let body = encode_form(form)?;
        let response = self
            .client
            .post(endpoint.clone())
            .multipart(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn encode_form(form: MultipartForm) -> Result<Form, TransportError> {
    let mut body = Form::new();
    for part in form.into_parts() {
        body = match part.value {
            PartValue::Text(value) => body.text(part.name, value),
            PartValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut file = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file
                        .mime_str(content_type.as_ref())
                        .map_err(|err| TransportError::InvalidPart(err.to_string()))?;
                }
                body.part(part.name, file)
            }
        };
    }
    Ok(body)
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
