use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use shared::{domain::DocumentRole, protocol::ResponseMode};
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload_client::{HttpTransport, SubmitEvent, SubmitOutcome, UploadForm, UploadFormController};

mod config;
mod surface;

use config::{load_settings, Settings, DEFAULT_CONFIG_PATH};
use surface::{FsSurface, PAGE_FILENAME};

#[derive(Parser, Debug)]
#[command(
    name = "uploader",
    about = "Submit documents to a discrepancy-check upload endpoint"
)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// negotiate, page or download
    #[arg(long)]
    mode: Option<ResponseMode>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    treaty: Option<PathBuf>,
    #[arg(long)]
    bordereaux: Option<PathBuf>,
    #[arg(long)]
    statement: Option<PathBuf>,
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_key_value)]
    files: Vec<(String, String)>,
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,
}

impl Args {
    fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(server_url) = &self.server_url {
            settings.server_url = server_url.clone();
        }
        if let Some(mode) = self.mode {
            settings.controller.response_mode = mode;
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir = output_dir.clone();
        }
        settings
    }

    async fn build_form(&self) -> Result<UploadForm> {
        let mut form = UploadForm::new();
        let documents = [
            (DocumentRole::Treaty, &self.treaty),
            (DocumentRole::Bordereaux, &self.bordereaux),
            (DocumentRole::Statement, &self.statement),
        ];
        for (role, path) in documents {
            if let Some(path) = path {
                form = form.file_from_path(role.field_name(), path).await?;
            }
        }
        for (name, path) in &self.files {
            form = form.file_from_path(name.clone(), path).await?;
        }
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

async fn submit(settings: &Settings, form: UploadForm) -> Result<(SubmitOutcome, Arc<FsSurface>)> {
    let transport = HttpTransport::new(
        &settings.server_url,
        settings.request_timeout_secs.map(Duration::from_secs),
    )?;
    let surface = Arc::new(FsSurface::new(
        &settings.output_dir,
        [
            settings.controller.form_id.clone(),
            settings.controller.status_id.clone(),
        ],
    ));
    let controller = UploadFormController::bind(
        settings.controller.clone(),
        Arc::new(transport),
        surface.clone(),
    )?;

    let mut event = SubmitEvent::new(form);
    let outcome = controller.handle_submit(&mut event).await;
    Ok((outcome, surface))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = args.apply_overrides(load_settings(&args.config));
    let form = args.build_form().await?;
    if form.is_empty() {
        bail!("nothing to upload; pass --treaty/--bordereaux/--statement or --file NAME=PATH");
    }
    info!(server_url = %settings.server_url, fields = form.len(), "uploading");

    let (outcome, surface) = submit(&settings, form).await?;
    match outcome {
        SubmitOutcome::Rendered => {
            println!(
                "Response page written to {}",
                settings.output_dir.join(PAGE_FILENAME).display()
            );
        }
        SubmitOutcome::Downloaded { filename } => {
            let saved = surface
                .written_files()
                .await
                .pop()
                .unwrap_or_else(|| settings.output_dir.join(&filename));
            println!("Saved {}", saved.display());
        }
        SubmitOutcome::Failed(err) => {
            let status = surface.status().await.unwrap_or_default();
            return Err(anyhow!(err).context(status));
        }
        SubmitOutcome::Ignored | SubmitOutcome::Superseded => {
            bail!("submission was not applied");
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
