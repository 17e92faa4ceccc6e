//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::PoisonError;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::info;

use super::EqArgs;
use crate::bus::{PageEvent, PageRequest, PageResponse, TabHost, TabId};
use crate::config::EqConfig;
use crate::control::{ControlSurface, ResponseCurves};
use crate::coordinator::Coordinator;
use crate::dsp::{read_wav, write_wav};
use crate::math::{clamp, format_frequency, freq_to_percent, percent_to_freq, MAX_FREQ_HZ, MIN_FREQ_HZ};
use crate::page::{AudioGraph, InstanceId, MediaKind};
use crate::settings::{Band, PresetName};
use crate::store::SettingsStore;

/// Print response curves for the given settings.
pub fn curve(
    config: &EqConfig,
    eq: &EqArgs,
    width: f64,
    height: f64,
    composite: bool,
) -> anyhow::Result<()> {
    let settings = eq.to_settings()?;
    let curves = ResponseCurves::new(config);

    let output = if composite {
        json!({
            "settings": settings,
            "composite": curves.composite_curve(&settings, width, height),
        })
    } else {
        json!({
            "settings": settings,
            "bands": curves.curves(&settings, width, height),
        })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Convert a knob position to Hz or back.
pub fn freq(percent: Option<f64>, hz: Option<f64>) -> anyhow::Result<()> {
    match (percent, hz) {
        (Some(percent), _) => {
            let hz = percent_to_freq(clamp(percent, 0.0, 100.0));
            println!("{:.1} % -> {} ({} Hz)", percent, format_frequency(hz), hz);
        }
        (None, Some(hz)) => {
            let hz = clamp(hz, MIN_FREQ_HZ, MAX_FREQ_HZ);
            println!("{} -> {:.2} %", format_frequency(hz), freq_to_percent(hz));
        }
        (None, None) => bail!("give either --percent or --hz"),
    }
    Ok(())
}

/// Run a WAV file through a resumed audio graph.
pub fn render(
    config: &EqConfig,
    input: &Path,
    output: &Path,
    eq: &EqArgs,
    bit_depth: u16,
) -> anyhow::Result<()> {
    info!("Rendering {} -> {}", input.display(), output.display());
    if !matches!(bit_depth, 16 | 24 | 32) {
        bail!("unsupported bit depth {}", bit_depth);
    }

    let settings = eq.to_settings()?;
    let mut buffer =
        read_wav(input).with_context(|| format!("failed to read {}", input.display()))?;

    // The graph runs at the file's native rate
    let config = EqConfig {
        sample_rate: buffer.sample_rate,
        ..config.clone()
    };
    let mut graph = AudioGraph::new(InstanceId::new(), &config)?;
    graph.apply_update(&settings.to_update());
    graph.resume();

    let before = buffer.rms_db();
    graph.process(&mut buffer);
    write_wav(&buffer, output, bit_depth)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Rendered {} samples at {} Hz", buffer.len(), buffer.sample_rate);
    println!("RMS: {:.1} dB -> {:.1} dB", before, buffer.rms_db());
    Ok(())
}

/// Scripted session: open a tab, enable, drag, apply a preset, reload.
pub fn simulate(config: &EqConfig, url: &str) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run_simulation(config.clone(), url))
}

async fn run_simulation(config: EqConfig, url: &str) -> anyhow::Result<()> {
    let host = TabHost::new(config);
    let store = SettingsStore::default();
    let coordinator = Coordinator::new(host.clone(), store.clone());
    let tab = host.open_tab(url);
    add_player(&host, tab)?;

    let mut surface =
        ControlSurface::open(host.clone(), store.clone(), coordinator.clone(), tab).await?;
    surface.toggle(true).await?;
    host.dispatch(tab, PageEvent::UserGesture)?;
    report("enabled", &host, &coordinator, tab).await?;

    surface.drag_gain(Band::Bass, 6.0, 10).await?;
    surface.drag_knob(Band::Mid, 50.0).await?;
    report("dragged", &host, &coordinator, tab).await?;

    surface.apply_preset(PresetName::BoostPop).await?;
    report("preset", &host, &coordinator, tab).await?;

    coordinator.navigate(tab, url).await?;
    add_player(&host, tab)?;
    report("reloaded", &host, &coordinator, tab).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "stage": "stored",
            "state": store.load_settings(tab).await.eq,
            "activePreset": store.load_active_preset(tab).await,
            "channel": surface.channel().stats(),
        }))?
    );
    surface.close();
    Ok(())
}

/// Insert a video element inside a shadow root, like an embedded player
fn add_player(host: &TabHost, tab: TabId) -> anyhow::Result<()> {
    let document = host.document(tab)?;
    let mut doc = document.lock().unwrap_or_else(PoisonError::into_inner);
    let root = doc.root();
    let player = doc.create_element("video-player");
    let shadow = doc.attach_shadow(player)?;
    let video = doc.create_media(MediaKind::Video);
    doc.append_child(shadow, video)?;
    doc.append_child(root, player)?;
    Ok(())
}

async fn report(
    stage: &str,
    host: &TabHost,
    coordinator: &Coordinator,
    tab: TabId,
) -> anyhow::Result<()> {
    let params = match host.request(tab, PageRequest::GetGraphParams).await? {
        PageResponse::GraphParams { params } => params,
        other => bail!("unexpected reply {:?}", other),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "stage": stage,
            "badge": coordinator.badge_text(tab),
            "graph": params,
        }))?
    );
    Ok(())
}
