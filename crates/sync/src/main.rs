//! `maskctl` -- command-line front end for the slit-mask editor.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default                     | Description                  |
//! |---------------------|----------|-----------------------------|------------------------------|
//! | `MASK_API_URL`      | no       | `http://localhost:8000/api` | Store API base URL           |
//! | `MASK_USER_ID`      | no       | `guest`                     | Acting user                  |
//! | `MASK_PROJECT`      | no       | `untitled`                  | Project for mask operations  |
//! | `MASK_DOWNLOAD_DIR` | no       | `.`                         | Where files are written      |

use std::path::Path;

use anyhow::{bail, Context, Result};
use slitmask_client::MaskApi;
use slitmask_core::catalog::ObjectRecord;
use slitmask_core::payload::MaskParameterSet;
use slitmask_sync::coordinator::RenderOutcome;
use slitmask_sync::renderer::SceneRecorder;
use slitmask_sync::{SessionState, SyncConfig, SyncCoordinator};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Container id passed to the renderer.
const MAP_CONTAINER: &str = "aladin-lite-div";

const USAGE: &str = "\
Usage:
  maskctl render <mask>
  maskctl masks
  maskctl edit <list_name> <rows.json>
  maskctl generate <params.json> <list_name> [--finalize]
  maskctl machine-code <mask>";

type Coordinator = SyncCoordinator<MaskApi, SceneRecorder>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slitmask_sync=info,slitmask_client=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SyncConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        user_id = %config.user_id,
        project = %config.project_name,
        "Starting maskctl",
    );

    let api = MaskApi::new(config.api_url.clone(), config.user_id.clone());
    let mut coordinator = SyncCoordinator::new(api, SceneRecorder::new(), &config);

    let args: Vec<String> = std::env::args().collect();
    if !handle_commands(&mut coordinator, &args).await? {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }
    Ok(())
}

/// Run the subcommand in `args`. Returns `false` for an unknown or
/// incomplete command line.
async fn handle_commands(coordinator: &mut Coordinator, args: &[String]) -> Result<bool> {
    let arg = |i: usize| args.get(i).map(String::as_str);

    match (arg(1), arg(2), arg(3)) {
        (Some("render"), Some(mask), _) => render(coordinator, mask).await?,
        (Some("masks"), _, _) => {
            for name in coordinator.list_masks().await? {
                println!("{name}");
            }
        }
        (Some("edit"), Some(list), Some(rows)) => edit(coordinator, list, Path::new(rows)).await?,
        (Some("generate"), Some(params), Some(list)) => {
            let finalize = args.iter().skip(4).any(|a| a == "--finalize");
            generate(coordinator, Path::new(params), list, finalize).await?
        }
        (Some("machine-code"), Some(mask), _) => {
            let artifact = coordinator.machine_code(mask).await?;
            let path = coordinator.save_artifact(&artifact).await?;
            println!("{}", path.display());
        }
        _ => return Ok(false),
    }
    Ok(true)
}

async fn render(coordinator: &mut Coordinator, mask: &str) -> Result<()> {
    if coordinator.open_mask(mask).await? == SessionState::NoMaskYet {
        tracing::info!(mask = %mask, "Mask has not been generated yet");
    }
    match coordinator.render(MAP_CONTAINER).await? {
        RenderOutcome::Drawn { .. } => {
            let scene = serde_json::to_string_pretty(coordinator.renderer().calls())?;
            println!("{scene}");
        }
        outcome => tracing::info!(?outcome, "Nothing drawn"),
    }
    Ok(())
}

async fn edit(coordinator: &mut Coordinator, list: &str, rows_path: &Path) -> Result<()> {
    let rows: Vec<ObjectRecord> = read_json(rows_path).await?;

    coordinator.load_catalog(list).await?;
    coordinator.toggle_edit()?;
    coordinator.replace_draft(rows)?;
    let outcome = coordinator.save().await?;
    let path = coordinator.export_rows().await?;

    println!(
        "{} object update(s) sent; {} rows written to {}",
        outcome.patched,
        outcome.rows.len(),
        path.display()
    );
    Ok(())
}

async fn generate(
    coordinator: &mut Coordinator,
    params_path: &Path,
    list: &str,
    finalize: bool,
) -> Result<()> {
    let params: MaskParameterSet = read_json(params_path).await?;
    let titled = params.title.as_deref().is_some_and(|t| !t.trim().is_empty());
    if finalize && !titled {
        bail!("--finalize needs a title in {}", params_path.display());
    }

    coordinator.load_catalog(list).await?;
    coordinator.set_parameters(params);

    let artifact = coordinator.generate().await?.clone();
    let path = coordinator.save_artifact(&artifact).await?;
    println!("{}", path.display());

    if finalize {
        coordinator.finalize().await?;
        println!("finalized");
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("parsing {}", path.display()))
}
