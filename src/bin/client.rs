use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reqwest::multipart;
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "docquery-client",
    about = "Command line client for the document query service"
)]
struct Cli {
    /// Base URL of a running service instance.
    #[arg(long, default_value = "http://localhost:8000")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a document for indexing.
    Upload {
        /// Path to a .pdf, .docx, .eml, or .msg file.
        #[arg(long)]
        file: PathBuf,
        /// Business domain to file the document under.
        #[arg(long)]
        domain: String,
    },
    /// Ask a question against the indexed documents.
    Query {
        /// Question text.
        #[arg(long)]
        text: String,
        /// Restrict retrieval to one domain.
        #[arg(long)]
        domain: Option<String>,
        /// Maximum number of chunks to retrieve.
        #[arg(long)]
        max_results: Option<usize>,
        /// Skip the generated analysis and return raw retrieval only.
        #[arg(long)]
        no_explanation: bool,
    },
    /// Show the catalog record for a document.
    Status { document_id: String },
    /// Delete a document and its vectors.
    Delete { document_id: String },
    /// Check that the service is up.
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Command::Upload { file, domain } => upload(&client, &base, &file, &domain).await,
        Command::Query {
            text,
            domain,
            max_results,
            no_explanation,
        } => query(&client, &base, &text, domain, max_results, no_explanation).await,
        Command::Status { document_id } => {
            let response = client
                .get(format!("{base}/document/{document_id}"))
                .send()
                .await
                .context("status request failed")?;
            print_response(response).await
        }
        Command::Delete { document_id } => {
            let response = client
                .delete(format!("{base}/document/{document_id}"))
                .send()
                .await
                .context("delete request failed")?;
            print_response(response).await
        }
        Command::Health => {
            let response = client
                .get(format!("{base}/health"))
                .send()
                .await
                .context("health request failed")?;
            print_response(response).await
        }
    }
}

async fn upload(client: &reqwest::Client, base: &str, file: &Path, domain: &str) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("path {} has no usable filename", file.display()))?
        .to_string();

    let form = multipart::Form::new()
        .part("file", multipart::Part::bytes(bytes).file_name(filename))
        .text("domain", domain.to_string());
    let response = client
        .post(format!("{base}/upload-document/"))
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;
    print_response(response).await
}

async fn query(
    client: &reqwest::Client,
    base: &str,
    text: &str,
    domain: Option<String>,
    max_results: Option<usize>,
    no_explanation: bool,
) -> Result<()> {
    let mut body = serde_json::json!({ "query": text });
    if let Some(domain) = domain {
        body["domain"] = Value::String(domain);
    }
    if let Some(max_results) = max_results {
        body["max_results"] = Value::from(max_results);
    }
    if no_explanation {
        body["include_explanation"] = Value::Bool(false);
    }

    let response = client
        .post(format!("{base}/query/"))
        .json(&body)
        .send()
        .await
        .context("query request failed")?;
    print_response(response).await
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read response body")?;
    let rendered = serde_json::from_str::<Value>(&body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or(body);
    println!("{rendered}");

    if !status.is_success() {
        bail!("server returned {status}");
    }
    Ok(())
}
