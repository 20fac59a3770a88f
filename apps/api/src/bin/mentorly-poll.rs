//! Submits a roadmap or cover-letter job to a running API and polls it to completion.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mentorly::formatting::roadmap;
use mentorly::jobs::poller::JobClient;
use mentorly::models::job::JobKind;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the API
    #[arg(long, env = "MENTORLY_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Session token sent as a Bearer header
    #[arg(long, env = "MENTORLY_TOKEN")]
    token: Option<String>,

    #[arg(long)]
    user_id: String,

    #[arg(long)]
    user_email: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a learning roadmap for a career goal
    Roadmap { goal: String },
    /// Generate a cover letter for a job description
    CoverLetter {
        job_description: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let client = JobClient::new(&args.api_url, args.token.clone())?;

    let (kind, submitted) = match &args.command {
        Command::Roadmap { goal } => (
            JobKind::Roadmap,
            client
                .submit_roadmap(&args.user_id, &args.user_email, goal)
                .await?,
        ),
        Command::CoverLetter {
            job_description,
            name,
        } => (
            JobKind::CoverLetter,
            client
                .submit_cover_letter(
                    &args.user_id,
                    &args.user_email,
                    job_description,
                    name.as_deref(),
                )
                .await?,
        ),
    };
    info!(
        job_id = %submitted.id,
        remaining = ?submitted.remaining_credits,
        "Submitted {}, waiting for result",
        kind.label()
    );

    let snapshot = client.wait(kind, submitted.id).await?;

    match kind {
        JobKind::Roadmap => {
            let text = snapshot
                .body
                .get("roadmapData")
                .and_then(Value::as_str)
                .context("completed roadmap has no roadmapData")?;
            print_roadmap(&roadmap::parse(text));
        }
        _ => {
            let content = snapshot
                .body
                .get("content")
                .and_then(Value::as_str)
                .context("completed cover letter has no content")?;
            println!("{content}");
        }
    }

    Ok(())
}

fn print_roadmap(view: &roadmap::RoadmapView) {
    if !view.overview.is_empty() {
        println!("OVERVIEW\n{}\n", view.overview);
    }
    for (i, step) in view.steps.iter().enumerate() {
        println!("{}. {}", i + 1, step.title);
        if !step.content.is_empty() {
            println!("{}\n", step.content);
        }
    }
    println!("FINAL ADVICE\n{}", view.final_advice);
}
