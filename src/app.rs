use std::path::PathBuf;
use std::time::Duration;

use crate::core::{
    alerts::{AlertAction, AlertSpec, AlertStore, ControlSurface, SoundEngine},
    config::{ConfigManager, Settings},
    error::{Error, Result},
};

/// How often the demo renders a frame of the alert stack.
const FRAME_INTERVAL: Duration = Duration::from_millis(500);

fn config_dir() -> PathBuf {
    std::env::var("ALERT_DECK_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Fire one alert of every kind, the way the demo panel buttons do.
fn show_demo_alerts(store: &AlertStore) -> Result<()> {
    store.enqueue(AlertSpec::success("Operation completed successfully!").title("Success!"))?;
    store.enqueue(
        AlertSpec::error("Failed to process your request. Please check your connection.")
            .title("Error Alert"),
    )?;
    store.enqueue(
        AlertSpec::warning("Low disk space detected. Please free up some space.").title("Warning"),
    )?;
    store.enqueue(AlertSpec::info("System maintenance scheduled for tonight at 2 AM.").title("Info"))?;

    let details = store.clone();
    let shared = store.clone();
    store.enqueue(
        AlertSpec::new("special", "Congratulations! You've earned a special badge!")
            .title("Special")
            .duration_ms(7000)
            .action(AlertAction::new("View Badge", move || {
                details.enqueue(AlertSpec::info("Badge details coming soon!"))?;
                Ok(())
            }))
            .action(AlertAction::new("Share", move || {
                shared.enqueue(AlertSpec::success("Badge shared successfully!"))?;
                Ok(())
            })),
    )?;
    Ok(())
}

/// Sticky loading alert replaced by a success alert once the "upload" is done.
async fn simulate_upload(store: AlertStore) -> Result<()> {
    let loading = store.enqueue(AlertSpec::loading("Uploading files...").sticky())?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    store.remove(loading);
    store.enqueue(AlertSpec::success("Files uploaded successfully!"))?;
    Ok(())
}

/// Log the renderer-facing snapshot until the stack drains.
async fn render_until_empty(control: &ControlSurface) -> Result<()> {
    loop {
        let snapshot = control.snapshot();
        for alert in &snapshot.alerts {
            let progress = alert
                .remaining_percent
                .map(|p| format!("{:>3.0}%", p))
                .unwrap_or_else(|| "  --".to_string());
            log::info!(
                "[{}] {} {} {}: {}",
                progress,
                alert.time_label(),
                alert.kind,
                alert.display_title(),
                alert.message
            );
        }
        log::debug!("{}", serde_json::to_string(&snapshot)?);

        if snapshot.active_alerts == 0 {
            return Ok(());
        }
        tokio::time::sleep(FRAME_INTERVAL).await;
    }
}

async fn demo(settings: Settings) -> Result<()> {
    let store = AlertStore::new(&settings.alert_settings, SoundEngine::host());
    let control = ControlSurface::new(store.clone());
    log::info!(
        "Alert deck ready (sound {}, position {})",
        if control.sound_enabled() { "on" } else { "off" },
        control.position()
    );

    show_demo_alerts(&store)?;
    let upload = tokio::spawn(simulate_upload(store.clone()));

    // Press "View Badge" on the special alert.
    if let Some(special) = store.list().iter().find(|a| !a.actions.is_empty()) {
        let outcome = control.invoke_action(special.id, 0);
        log::info!("Action \"{}\": {:?}", special.actions[0].label, outcome);
    }

    render_until_empty(&control).await?;
    upload
        .await
        .map_err(|e| Error::Runtime(e.to_string()))??;
    control.clear_all();
    log::info!("All alerts dismissed");
    Ok(())
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Initialize Config
    let config_manager = ConfigManager::new(config_dir());
    let settings = config_manager.load_or_init();

    // One cooperative event loop drives every store mutation and countdown.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(e.to_string()))?;

    runtime.block_on(demo(settings))
}
