use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};

use super::wire::{
    AssignBody, ManagerIdValue, MessageBody, StatusBody, confirmed_status, parse_thread,
    parse_ticket_list,
};
use super::{Backend, OutgoingMessage};
use crate::config::Config;
use crate::error::{DeskwatchError, Result};
use crate::types::{Message, Ticket, TicketId, TicketStatus};

/// Helpdesk REST API client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    /// Backend URL plus API prefix, no trailing slash
    api_base: String,
    /// Backend URL without the API prefix, for `/health`
    root: String,
}

impl HttpBackend {
    /// Create a client from configuration.
    ///
    /// Uses the configured request timeout for every call.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_urls(
            config.backend_root()?,
            config.api_base()?,
            config.request_timeout(),
        )
    }

    /// Create a client for explicit URLs, without trailing slashes.
    pub fn with_urls(root: String, api_base: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            root: root.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.api_base, path))
    }

    /// Send a request and return the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder, endpoint: String) -> Result<String> {
        let response: Response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!("{endpoint} failed with {status}: {detail}");
            return Err(DeskwatchError::UnexpectedStatus { status, endpoint });
        }
        Ok(response.text().await?)
    }
}

fn ticket_path(ticket_id: &TicketId) -> String {
    format!("/tickets/{}", ticket_id)
}

impl Backend for HttpBackend {
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>> {
        let request = self.request(Method::GET, "/tickets");
        let body = self.execute(request, "GET /tickets".to_string()).await?;
        parse_ticket_list(&body)
    }

    async fn fetch_thread(&self, ticket_id: &TicketId) -> Result<Vec<Message>> {
        let path = ticket_path(ticket_id);
        let request = self.request(Method::GET, &path);
        let body = self.execute(request, format!("GET {path}")).await?;
        parse_thread(&body)
    }

    async fn post_message(&self, ticket_id: &TicketId, message: &OutgoingMessage) -> Result<()> {
        let path = format!("{}/messages", ticket_path(ticket_id));
        let body = MessageBody {
            sender_type: "manager",
            sender_id: &message.sender_id,
            content: &message.content,
        };
        let request = self.request(Method::POST, &path).json(&body);
        self.execute(request, format!("POST {path}")).await?;
        Ok(())
    }

    async fn update_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<TicketStatus> {
        let path = format!("{}/status", ticket_path(ticket_id));
        let request = self.request(Method::PATCH, &path).json(&StatusBody { status });
        let body = self.execute(request, format!("PATCH {path}")).await?;
        confirmed_status(&body, status)
    }

    async fn assign_manager(&self, ticket_id: &TicketId, manager_id: &str) -> Result<TicketStatus> {
        let path = format!("{}/assign", ticket_path(ticket_id));
        let body = AssignBody {
            manager_id: ManagerIdValue::new(manager_id),
        };
        let request = self.request(Method::PATCH, &path).json(&body);
        let body = self.execute(request, format!("PATCH {path}")).await?;
        confirmed_status(&body, TicketStatus::InProgress)
    }

    async fn health(&self) -> Result<()> {
        let request = self.client.get(format!("{}/health", self.root));
        self.execute(request, "GET /health".to_string()).await?;
        Ok(())
    }
}
