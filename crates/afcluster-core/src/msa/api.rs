use super::error::TransportError;
use crate::engine::config::{FetchConfig, MsaMode};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::fmt;
use tracing::error;

/// Status of a ticket as reported by the MSA server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Unknown,
    Ratelimit,
    Pending,
    Running,
    Complete,
    Error,
    Maintenance,
    #[serde(other)]
    Unrecognized,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Unknown => "UNKNOWN",
            TicketStatus::Ratelimit => "RATELIMIT",
            TicketStatus::Pending => "PENDING",
            TicketStatus::Running => "RUNNING",
            TicketStatus::Complete => "COMPLETE",
            TicketStatus::Error => "ERROR",
            TicketStatus::Maintenance => "MAINTENANCE",
            TicketStatus::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// The job is still queued or being processed.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TicketStatus::Unknown | TicketStatus::Pending | TicketStatus::Running
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketResponse {
    pub status: TicketStatus,
    #[serde(default)]
    pub id: Option<String>,
}

impl TicketResponse {
    /// Parses a submission or status reply. A body that is not a ticket JSON object is read
    /// as status `ERROR`.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| {
            error!("Server didn't reply with json: {}", body);
            Self {
                status: TicketStatus::Error,
                id: None,
            }
        })
    }
}

/// The three operations of the ticket-based MSA service.
///
/// Implementations perform exactly one attempt per call and return the raw reply; retrying
/// and interpretation happen in [`super::remote`].
pub trait TicketApi {
    /// Submits a FASTA batch for alignment with the given database mode.
    fn submit(&mut self, query: &str, mode: MsaMode) -> Result<String, TransportError>;

    fn status(&mut self, ticket_id: &str) -> Result<String, TransportError>;

    /// Downloads the gzipped tar archive of a completed ticket.
    fn download(&mut self, ticket_id: &str) -> Result<Vec<u8>, TransportError>;
}

/// [`TicketApi`] over HTTP, compatible with the ColabFold MMseqs2 server.
pub struct HttpTicketApi {
    client: Client,
    host_url: String,
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(e.to_string())
    }
}

impl HttpTicketApi {
    pub fn new(config: &FetchConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().timeout(config.retry.request_timeout);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let client = builder.build().map_err(classify)?;
        Ok(Self {
            client,
            host_url: config.host_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host_url, path)
    }

    fn text(response: Response) -> Result<String, TransportError> {
        response.text().map_err(classify)
    }
}

impl TicketApi for HttpTicketApi {
    fn submit(&mut self, query: &str, mode: MsaMode) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.url("ticket/msa"))
            .form(&[("q", query), ("mode", mode.as_str())])
            .send()
            .map_err(classify)?;
        Self::text(response)
    }

    fn status(&mut self, ticket_id: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("ticket/{}", ticket_id)))
            .send()
            .map_err(classify)?;
        Self::text(response)
    }

    fn download(&mut self, ticket_id: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("result/download/{}", ticket_id)))
            .send()
            .and_then(Response::error_for_status)
            .map_err(classify)?;
        let bytes = response.bytes().map_err(classify)?;
        Ok(bytes.to_vec())
    }
}
