mod definition;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};

use definition::WorkflowFile;

#[derive(Parser)]
#[command(name = "omnipdfctl")]
#[command(version, about = "OmniPDF workflow command line tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Control plane URL
    #[arg(long, env = "OMNIPDF_SERVER_URL", default_value = "http://localhost:8084")]
    server_url: String,

    /// Session token sent as a bearer token
    #[arg(long, env = "OMNIPDF_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Emit only the JSON response
    #[arg(short, long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow against a document
    ///
    /// Examples:
    ///     omnipdfctl trigger invoice-intake doc_123
    ///     omnipdfctl trigger translate-fr doc_123 --language fr --notify ops@example.com
    ///     omnipdfctl trigger wf-1 doc_123 --set priority=high
    #[command(verbatim_doc_comment)]
    Trigger {
        workflow_id: String,
        document_id: String,

        /// Trigger event recorded with the run
        #[arg(short, long, default_value = "manual")]
        event: String,

        /// Target language for Translate
        #[arg(short, long)]
        language: Option<String>,

        /// Recipient for Email Notification
        #[arg(long)]
        notify: Option<String>,

        /// Fallback recipient for Email Notification
        #[arg(long)]
        user_email: Option<String>,

        /// Extra metadata (format: key=value), can be repeated
        #[arg(long = "set", value_name = "KEY=VALUE")]
        variables: Vec<String>,
    },

    /// Manage workflow definitions
    #[command(subcommand)]
    Workflow(WorkflowCommands),

    /// List registered step names
    Steps,

    /// List past runs
    Executions {
        /// Only runs of this workflow
        #[arg(short, long)]
        workflow_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum WorkflowCommands {
    /// Create a definition from a YAML or JSON file
    Create {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List definitions
    List,
    /// Show one definition
    Get { workflow_id: String },
    /// Delete a definition
    Delete { workflow_id: String },
}

/// Thin client for the control plane API.
struct Api {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Api {
    fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and decode; non-2xx responses become errors carrying the server message.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            bail!("{} failed: {} - {}", what, status, message);
        }
        Ok(body)
    }

    async fn get(&self, path: &str, what: &str) -> Result<Value> {
        self.send(self.client.get(self.url(path)), what).await
    }

    async fn post(&self, path: &str, body: &Value, what: &str) -> Result<Value> {
        self.send(self.client.post(self.url(path)).json(body), what)
            .await
    }

    async fn delete(&self, path: &str, what: &str) -> Result<Value> {
        self.send(self.client.delete(self.url(path)), what).await
    }
}

/// Parse repeated `key=value` pairs; values that parse as JSON keep their type.
fn parse_variables(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid variable '{}', expected KEY=VALUE", pair);
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        out.insert(key.trim().to_string(), value);
    }
    Ok(out)
}

fn trigger_body(
    workflow_id: String,
    document_id: String,
    event: String,
    language: Option<String>,
    notify: Option<String>,
    user_email: Option<String>,
    variables: &[String],
) -> Result<Value> {
    let mut metadata = parse_variables(variables)?;
    if let Some(language) = language {
        metadata.insert("targetLanguage".to_string(), Value::String(language));
    }
    if let Some(notify) = notify {
        metadata.insert("notificationEmail".to_string(), Value::String(notify));
    }
    if let Some(user_email) = user_email {
        metadata.insert("userEmail".to_string(), Value::String(user_email));
    }

    Ok(json!({
        "workflowId": workflow_id,
        "documentId": document_id,
        "event": event,
        "metadata": metadata,
    }))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_run(result: &Value) {
    let results = result
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let succeeded = results
        .iter()
        .filter(|r| r.get("status").and_then(Value::as_str) == Some("success"))
        .count();
    let color = if succeeded == results.len() {
        "\x1b[32m"
    } else {
        "\x1b[33m"
    };

    println!("\n{}{}\x1b[0m", color, "=".repeat(60));
    println!(
        "Workflow:  {}",
        result.get("workflow").and_then(Value::as_str).unwrap_or("?")
    );
    println!("Steps:     {}/{} succeeded", succeeded, results.len());
    println!(
        "Finished:  {}",
        result
            .get("execution_time")
            .and_then(Value::as_str)
            .unwrap_or("?")
    );
    for step in &results {
        let name = step.get("step").and_then(Value::as_str).unwrap_or("?");
        match step.get("error").and_then(Value::as_str) {
            Some(error) => println!("  \x1b[31m✗\x1b[0m {} - {}", name, error),
            None => println!("  \x1b[32m✓\x1b[0m {}", name),
        }
    }
    println!("{}{}\x1b[0m\n", color, "=".repeat(60));
    println!("Use --json for full step results");
}

fn print_workflows(workflows: &Value) {
    let Some(items) = workflows.as_array() else {
        return;
    };
    if items.is_empty() {
        println!("No workflows defined");
        return;
    }
    for wf in items {
        let steps: Vec<&str> = wf
            .get("steps")
            .and_then(Value::as_array)
            .map(|s| s.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        println!(
            "{:<38} {:<28} {}",
            wf.get("workflow_id").and_then(Value::as_str).unwrap_or("?"),
            wf.get("name").and_then(Value::as_str).unwrap_or("?"),
            steps.join(" -> ")
        );
    }
}

fn print_executions(runs: &Value) {
    let Some(items) = runs.as_array() else {
        return;
    };
    if items.is_empty() {
        println!("No executions recorded");
        return;
    }
    for run in items {
        let text = |key: &str| run.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
        let count = |key: &str| run.get(key).and_then(Value::as_u64).unwrap_or(0);
        println!(
            "{:<26} {:<24} {:<20} {}/{}",
            text("executed_at"),
            text("workflow_id"),
            text("document_id"),
            count("success_count"),
            count("steps_executed")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = Api::new(&cli.server_url, cli.token);

    match cli.command {
        Commands::Trigger {
            workflow_id,
            document_id,
            event,
            language,
            notify,
            user_email,
            variables,
        } => {
            let body = trigger_body(
                workflow_id,
                document_id,
                event,
                language,
                notify,
                user_email,
                &variables,
            )?;
            let result = api.post("/api/workflows/trigger", &body, "trigger").await?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_run(&result);
            }
        }
        Commands::Workflow(WorkflowCommands::Create { file }) => {
            let definition = WorkflowFile::load(&file)?;
            let body = serde_json::to_value(&definition)?;
            let created = api.post("/api/workflows", &body, "create workflow").await?;
            if cli.json {
                print_json(&created)?;
            } else {
                println!(
                    "Created workflow {}",
                    created
                        .get("workflow_id")
                        .and_then(Value::as_str)
                        .unwrap_or("?")
                );
            }
        }
        Commands::Workflow(WorkflowCommands::List) => {
            let workflows = api.get("/api/workflows", "list workflows").await?;
            if cli.json {
                print_json(&workflows)?;
            } else {
                print_workflows(&workflows);
            }
        }
        Commands::Workflow(WorkflowCommands::Get { workflow_id }) => {
            let workflow = api
                .get(&format!("/api/workflows/{}", workflow_id), "get workflow")
                .await?;
            print_json(&workflow)?;
        }
        Commands::Workflow(WorkflowCommands::Delete { workflow_id }) => {
            let result = api
                .delete(&format!("/api/workflows/{}", workflow_id), "delete workflow")
                .await?;
            if cli.json {
                print_json(&result)?;
            } else {
                println!("Deleted workflow {}", workflow_id);
            }
        }
        Commands::Steps => {
            let steps = api.get("/api/workflows/steps", "list steps").await?;
            if cli.json {
                print_json(&steps)?;
            } else if let Some(names) = steps.get("steps").and_then(Value::as_array) {
                for name in names.iter().filter_map(Value::as_str) {
                    println!("{}", name);
                }
            }
        }
        Commands::Executions { workflow_id } => {
            let path = match workflow_id {
                Some(id) => format!("/api/executions?workflow_id={}", id),
                None => "/api/executions".to_string(),
            };
            let runs = api.get(&path, "list executions").await?;
            if cli.json {
                print_json(&runs)?;
            } else {
                print_executions(&runs);
            }
        }
    }

    Ok(())
}
