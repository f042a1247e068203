//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::ZscalerClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::graphql::GraphQlRequest;
use crate::http::RequestConfig;
use crate::pagination::PageConfig;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load the configuration the command line points at
    pub fn load_config(&self) -> Result<ClientConfig> {
        match &self.cli.config {
            Some(path) => ClientConfig::load(path),
            None => ClientConfig::from_env(),
        }
    }

    /// Run the CLI command.
    ///
    /// The session is logged out afterwards whether or not the command
    /// succeeded.
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = ZscalerClient::from_config(&config)?;

        let result = self.dispatch(&client, &config).await;

        if let Err(e) = client.logout().await {
            warn!("Logout failed: {e}");
        }
        result
    }

    async fn dispatch(&self, client: &ZscalerClient, config: &ClientConfig) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check(client).await,
            Commands::Get {
                path,
                query,
                no_cache,
            } => self.get(client, path, query, *no_cache).await,
            Commands::List {
                path,
                page_size,
                max_pages,
                max_items,
                items_path,
                query,
            } => {
                let mut page_config = config.pagination.clone();
                if let Some(size) = page_size {
                    page_config.page_size = *size;
                }
                if max_pages.is_some() {
                    page_config.max_pages = *max_pages;
                }
                if max_items.is_some() {
                    page_config.max_items = *max_items;
                }
                if items_path.is_some() {
                    page_config.items_path.clone_from(items_path);
                }
                self.list(client, path, page_config, query).await
            }
            Commands::Graphql {
                query,
                query_file,
                variables,
            } => {
                self.graphql(client, query.as_deref(), query_file.as_ref(), variables.as_deref())
                    .await
            }
        }
    }

    /// Test credentials by establishing a session
    async fn check(&self, client: &ZscalerClient) -> Result<()> {
        let status = if client.http().authenticator().is_some_and(|a| a.config().is_session()) {
            client.login().await.map(|session| {
                format!(
                    "Session established ({})",
                    session.info.auth_type.as_deref().unwrap_or("unknown auth type")
                )
            })
        } else {
            client
                .http()
                .get("/api/v1/status")
                .await
                .map(|_| "Bearer token accepted".to_string())
        };

        match status {
            Ok(message) => self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "SUCCEEDED",
                    "message": message
                }
            })),
            Err(e) => self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "FAILED",
                    "message": format!("Connection failed: {e}")
                }
            })),
        }

        Ok(())
    }

    /// GET one path and print the response
    async fn get(
        &self,
        client: &ZscalerClient,
        path: &str,
        query: &[(String, String)],
        no_cache: bool,
    ) -> Result<()> {
        let mut request = RequestConfig::new();
        for (key, value) in query {
            request = request.query(key.as_str(), value.as_str());
        }
        if no_cache {
            request = request.no_cache();
        }

        let response = client.http().get_with_config(path, request).await?;
        let body = response
            .json::<Value>()
            .unwrap_or_else(|_| Value::String(response.text()));

        self.output_message(&json!({
            "type": "RESPONSE",
            "response": {
                "status": response.status().as_u16(),
                "body": body
            }
        }));
        Ok(())
    }

    /// Page through a list endpoint, printing one record per item
    async fn list(
        &self,
        client: &ZscalerClient,
        path: &str,
        page_config: PageConfig,
        query: &[(String, String)],
    ) -> Result<()> {
        let start = Instant::now();
        let mut paginator = client.paginate_with(path, page_config);
        for (key, value) in query {
            paginator = paginator.query(key.as_str(), value.as_str());
        }

        let mut count = 0usize;
        while let Some(page) = paginator.next_page().await? {
            debug!("Page {} returned {} items", page.number, page.items.len());
            for item in page.items {
                count += 1;
                self.output_message(&json!({
                    "type": "RECORD",
                    "record": {
                        "path": path,
                        "data": item
                    }
                }));
            }
        }

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Fetched {count} items from {path} in {} pages ({:.2?})",
                    paginator.state().pages_fetched,
                    start.elapsed()
                )
            }
        }));
        Ok(())
    }

    /// Run a GraphQL query and print its data
    async fn graphql(
        &self,
        client: &ZscalerClient,
        query: Option<&str>,
        query_file: Option<&PathBuf>,
        variables: Option<&str>,
    ) -> Result<()> {
        let document = match (query, query_file) {
            (Some(q), _) => q.to_string(),
            (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FileNotFound {
                        path: path.display().to_string(),
                    }
                } else {
                    Error::Io(e)
                }
            })?,
            (None, None) => return Err(Error::config("Provide --query or --query-file")),
        };

        let mut request = GraphQlRequest::new(document);
        if let Some(raw) = variables {
            let parsed: Value = serde_json::from_str(raw)?;
            if !parsed.is_object() {
                return Err(Error::invalid_value(
                    "variables",
                    "must be a JSON object",
                ));
            }
            request = request.variables(parsed);
        }

        let data: Value = client.zinsights().execute(&request).await?;
        self.output_message(&json!({
            "type": "RESULT",
            "data": data
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
