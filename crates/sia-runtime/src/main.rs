//! sia-runtime: the Self-Initiating Agent daemon.
//!
//! A long-running process that ticks the closed loop (Sensor through
//! Proposal) on an interval, against whatever `Source` is wired up, and
//! presents whatever Proposals survive (spec.md §9). Grounded on
//! `add-ons/pagi-daemon/src/main.rs`'s `dotenvy` + `tracing_subscriber` +
//! `tokio::time::interval`/`tokio::select!` shape.

mod fixture_source;

use std::sync::Arc;
use std::time::Duration;

use sia_core::{Domain, NoLlm, Presenter, Runtime, SiaConfig, TracingPresenter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fixture_source::FixtureSource;

/// Default tick rate; spec.md places no hard requirement on cadence.
const DEFAULT_TICK_RATE_SECS: u64 = 300;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[sia-runtime] .env not loaded: {e} (using system environment)");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SiaConfig::from_env();
    let tick_rate = std::env::var("SIA_TICK_RATE_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICK_RATE_SECS)
        .max(1);

    let runtime = Arc::new(Runtime::new(config).expect("initialize sia runtime"));
    let source = Arc::new(FixtureSource::new());
    let presenter = TracingPresenter;

    tracing::info!(tick_rate_secs = tick_rate, "sia-runtime started");

    let mut interval = tokio::time::interval(Duration::from_secs(tick_rate));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick(Arc::clone(&runtime), Arc::clone(&source), &presenter).await {
                    tracing::warn!(error = %e, "tick failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down sia-runtime");
                break;
            }
        }
    }
}

async fn tick(runtime: Arc<Runtime>, source: Arc<FixtureSource>, presenter: &dyn Presenter) -> sia_core::Result<()> {
    // No real LlmPort is wired into this binary; NoLlm fails generate() and
    // every pipeline stage falls back to its deterministic template cleanly.
    let no_llm = NoLlm;
    let llm: Option<&dyn sia_core::LlmPort> = Some(&no_llm);

    for domain in Domain::concrete() {
        let proposals = runtime.run_detection_cycle(domain, source.as_ref(), llm).await?;
        for proposal in &proposals {
            presenter.present_proposal(proposal);
        }
    }

    runtime.world_model.with_snapshot(|wm| presenter.present_world_model_view(wm));
    Ok(())
}
