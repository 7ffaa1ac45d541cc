use murmur::chat::{ExchangeController, Intent, Notices};
use murmur::settings::{ProviderSettings, SettingsStore};
use snafu::{ResultExt, Whatever};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

mod console;

use console::{Command, HELP, TranscriptRenderer, describe_event, print_settings};

const INTENT_CHANNEL_CAPACITY: usize = 16;

/// Console entry point.
///
/// Loads persisted settings, starts the exchange loop on its own task, renders
/// conversation snapshots as they change and forwards stdin lines as intents.
#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), Whatever> {
    // Logs go to stderr so the transcript on stdout stays readable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let settings_store = SettingsStore::load();
    let config = settings_store.settings().to_provider_config();
    let provider = murmur_llm::create_provider(&config)
        .whatever_context("failed to initialize the completion provider")?;
    tracing::info!(
        base_url = %config.base_url,
        model = %config.model_name,
        "initialized provider from settings"
    );

    let controller = ExchangeController::new(provider, Notices::default());
    let mut snapshots = controller.subscribe();
    let mut events = controller.events();
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_CHANNEL_CAPACITY);
    let exchange = tokio::spawn(controller.run(intent_rx));

    let renderer = tokio::spawn(async move {
        let mut transcript = TranscriptRenderer::default();
        transcript.render(&snapshots.borrow_and_update().clone());
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            transcript.render(&snapshot);
        }
    });

    let notifier = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(notice) = describe_event(event) {
                        println!("{notice}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .whatever_context("failed to read from stdin")?
    {
        let intent = match Command::parse(&line) {
            Command::Send(text) => Intent::Submit(text),
            Command::NewChat => Intent::NewChat,
            Command::ShowSettings => {
                print_settings(&settings_store.settings());
                continue;
            }
            Command::SetModel(model_name) => {
                let mut settings = (*settings_store.settings()).clone();
                settings.model_name = model_name;
                match save_settings(&settings_store, settings) {
                    Some(intent) => intent,
                    None => continue,
                }
            }
            Command::SetBaseUrl(base_url) => {
                let mut settings = (*settings_store.settings()).clone();
                settings.base_url = base_url;
                match save_settings(&settings_store, settings) {
                    Some(intent) => intent,
                    None => continue,
                }
            }
            Command::SetApiKey(api_key) => {
                let mut settings = (*settings_store.settings()).clone();
                settings.api_key = api_key;
                match save_settings(&settings_store, settings) {
                    Some(intent) => intent,
                    None => continue,
                }
            }
            Command::ResetSettings => match settings_store.reset_to_defaults() {
                Ok(settings) => {
                    print_settings(&settings);
                    Intent::ApplyConfig(settings.to_provider_config())
                }
                Err(error) => {
                    tracing::warn!(error = %error, "failed to reset settings");
                    continue;
                }
            },
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
        };

        if intent_tx.send(intent).await.is_err() {
            tracing::warn!("exchange loop stopped; exiting");
            break;
        }
    }

    drop(intent_tx);
    exchange
        .await
        .whatever_context("exchange loop panicked")?;
    renderer.abort();
    notifier.abort();
    Ok(())
}

/// Persists edited settings and returns the intent that applies them.
fn save_settings(store: &SettingsStore, settings: ProviderSettings) -> Option<Intent> {
    match store.update(settings) {
        Ok(settings) => {
            print_settings(&settings);
            Some(Intent::ApplyConfig(settings.to_provider_config()))
        }
        Err(error) => {
            tracing::warn!(error = %error, "failed to save settings");
            None
        }
    }
}
