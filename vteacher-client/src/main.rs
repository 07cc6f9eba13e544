//! VTeacher client entry point: a line-oriented shell over the render cache.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vteacher_client::commands::HELP;
use vteacher_client::{
    parse_command, render_outline, ClientConfig, ClientError, ClientSession, Command,
    HttpRenderTransport, NavigationController, NavigationOutcome,
};
use vteacher_core::Location;

type Controller = Arc<NavigationController<HttpRenderTransport>>;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    init_logging();

    let config = ClientConfig::load()?;
    let session = ClientSession::connect(&config)?;
    let controller = Arc::clone(session.controller());

    let initial = controller.current_location();
    report(&controller, controller.navigate(initial)).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        let handle = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Stats => {
                let stats = session.cache().stats();
                println!(
                    "entries={} hits={} misses={} hit_rate={:.2} evictions={}",
                    stats.entry_count,
                    stats.hits,
                    stats.misses,
                    stats.hit_rate(),
                    stats.evictions
                );
                continue;
            }
            Command::Dismiss => {
                controller.dismiss_failure();
                print_screen(&controller);
                continue;
            }
            Command::Back => match controller.back() {
                Some(handle) => handle,
                None => {
                    println!("no previous screen");
                    continue;
                }
            },
            Command::List => controller.navigate(Location::list()),
            Command::Open(id) => controller.navigate(Location::selected(id)),
            Command::Goto(encoded) => match controller.navigate_encoded(&encoded) {
                Ok(handle) => handle,
                Err(err) => {
                    println!("{}", err);
                    continue;
                }
            },
            Command::Create(input) => controller.create(input),
            Command::Update(id, input) => controller.update(id, input),
            Command::Delete(id) => controller.delete(id),
        };
        report(&controller, handle).await;
    }

    drop(session);
    Ok(())
}

async fn report(controller: &Controller, handle: JoinHandle<NavigationOutcome>) {
    match handle.await {
        Ok(NavigationOutcome::Displayed(_)) | Ok(NavigationOutcome::Failed(_)) => {
            print_screen(controller)
        }
        Ok(NavigationOutcome::Superseded) | Ok(NavigationOutcome::Cancelled) => {}
        Err(err) => tracing::error!(error = %err, "navigation task failed"),
    }
}

fn print_screen(controller: &Controller) {
    let screen = controller.screen();
    println!("--- {} ---", screen.location.to_json());
    if let Some(node) = screen.tree.as_ref().and_then(|tree| tree.materialize()) {
        print!("{}", render_outline(&node));
    }
    if let Some(failure) = &screen.failure {
        println!("!! {} (dismiss to clear)", failure);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vteacher_client=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
