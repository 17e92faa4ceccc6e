//! Integration Tests
//!
//! End-to-end tests across the page and control-surface contexts: a tab
//! host with live page tasks, the coordinator and the control surface.

use std::time::Duration;

use tabeq::bus::{PageEvent, PageRequest, PageResponse, TabHost, TabId};
use tabeq::config::EqConfig;
use tabeq::control::ControlSurface;
use tabeq::coordinator::Coordinator;
use tabeq::dsp::{AudioBuffer, ChannelLayout};
use tabeq::page::{GraphParams, MediaKind};
use tabeq::settings::{ActivePreset, Band, ConfigPanel, EqualizerSettings, PresetName};
use tabeq::store::SettingsStore;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

struct Harness {
    host: TabHost,
    store: SettingsStore,
    coordinator: Coordinator,
}

/// No animation delay and a fast spectrum poll
fn harness() -> Harness {
    let config = EqConfig {
        animation_frame_ms: 0,
        spectrum_poll_ms: 5,
        ..Default::default()
    };
    let host = TabHost::new(config);
    let store = SettingsStore::default();
    let coordinator = Coordinator::new(host.clone(), store.clone());
    Harness {
        host,
        store,
        coordinator,
    }
}

impl Harness {
    async fn open(&self, tab: TabId) -> ControlSurface {
        ControlSurface::open(
            self.host.clone(),
            self.store.clone(),
            self.coordinator.clone(),
            tab,
        )
        .await
        .unwrap()
    }

    async fn params(&self, tab: TabId) -> Option<GraphParams> {
        match self
            .host
            .request(tab, PageRequest::GetGraphParams)
            .await
            .unwrap()
        {
            PageResponse::GraphParams { params } => params,
            other => panic!("unexpected response {:?}", other),
        }
    }

    /// Poll until the page graph has `expected` sources
    async fn wait_for_sources(&self, tab: TabId, expected: usize) -> GraphParams {
        for _ in 0..200 {
            if let Some(params) = self.params(tab).await {
                if params.sources == expected {
                    return params;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("graph never reached {} sources", expected);
    }
}

fn add_media(host: &TabHost, tab: TabId, kind: MediaKind, in_shadow: bool) {
    let document = host.document(tab).unwrap();
    let mut doc = document.lock().unwrap();
    let root = doc.root();
    let media = doc.create_media(kind);
    if in_shadow {
        let player = doc.create_element("custom-player");
        let shadow = doc.attach_shadow(player).unwrap();
        doc.append_child(shadow, media).unwrap();
        doc.append_child(root, player).unwrap();
    } else {
        doc.append_child(root, media).unwrap();
    }
}

fn assert_neutral(params: &GraphParams) {
    assert_eq!(params.bass_gain_db, 0.0);
    assert_eq!(params.mid_gain_db, 0.0);
    assert_eq!(params.treble_gain_db, 0.0);
    assert_eq!(params.preamp_gain, 1.0);
    assert_eq!(params.master_gain, 1.0);
}

// === Media Attachment ===

#[tokio::test]
async fn test_existing_late_and_shadow_media_attach_once() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com/watch");
    add_media(&h.host, tab, MediaKind::Audio, false);

    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    h.wait_for_sources(tab, 1).await;

    add_media(&h.host, tab, MediaKind::Video, true);
    h.wait_for_sources(tab, 2).await;

    // Repeated injection never builds a second graph or re-taps
    h.host.inject_equalizer(tab).unwrap();
    let reopened = h.open(tab).await;
    let params = h.wait_for_sources(tab, 2).await;
    assert_eq!(params.sources, 2);
    assert_eq!(h.host.registry().len(), 1);

    let document = h.host.document(tab).unwrap();
    let doc = document.lock().unwrap();
    for node in doc.media_elements() {
        assert!(doc.media(node).unwrap().attached);
    }
    drop(doc);
    reopened.close();
    surface.close();
}

#[tokio::test]
async fn test_restricted_media_does_not_block_others() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    {
        let document = h.host.document(tab).unwrap();
        let mut doc = document.lock().unwrap();
        let root = doc.root();
        let blocked = doc.create_media(MediaKind::Video);
        doc.restrict_media(blocked).unwrap();
        doc.append_child(root, blocked).unwrap();
        let fine = doc.create_media(MediaKind::Audio);
        doc.append_child(root, fine).unwrap();
    }

    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    assert_eq!(h.wait_for_sources(tab, 1).await.sources, 1);
}

// === Toggle and Persistence ===

#[tokio::test]
async fn test_default_tab_scenario() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;

    assert_eq!(*surface.settings(), EqualizerSettings::default());
    assert_eq!(surface.settings().bass_freq, 60.0);
    assert_eq!(surface.settings().mid_freq, 1000.0);
    assert_eq!(surface.settings().treble_freq, 12000.0);
    assert!(!surface.is_enabled());
    assert!(!surface.controls_enabled());
    assert_eq!(surface.panel(), ConfigPanel::Gain);
    assert_eq!(h.coordinator.badge_text(tab), "off");

    // Inert while off
    surface.set_gain(Band::Bass, 12.0, true).await.unwrap();
    assert_eq!(surface.settings().bass, 0.0);
    assert_eq!(surface.channel().stats().field, 0);
    assert_eq!(surface.active_preset(), None);
}

#[tokio::test]
async fn test_disable_then_enable_restores_exact_params() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    surface.set_gain(Band::Bass, 7.0, true).await.unwrap();
    surface.set_gain(Band::Treble, -4.5, true).await.unwrap();
    surface.set_preamp(6.0).await.unwrap();
    surface.set_master(150.0).await.unwrap();
    surface.set_mid_q(3.0).await.unwrap();
    let before = h.params(tab).await.unwrap();
    assert_abs_diff_eq!(before.preamp_gain, 10f64.powf(6.0 / 20.0), epsilon = 1e-9);
    assert_abs_diff_eq!(before.master_gain, 1.5, epsilon = 1e-9);

    surface.toggle(false).await.unwrap();
    let off = h.params(tab).await.unwrap();
    assert!(!off.enabled);
    assert_neutral(&off);
    assert_eq!(off.mid_q, 3.0);

    surface.toggle(true).await.unwrap();
    assert_eq!(h.params(tab).await.unwrap(), before);
}

#[tokio::test]
async fn test_settings_survive_reopen() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    surface.set_gain(Band::Mid, -8.0, true).await.unwrap();
    surface.set_master(80.0).await.unwrap();
    surface.drag_knob(Band::Treble, 80.0).await.unwrap();
    surface.select_panel(ConfigPanel::Frequency).await.unwrap();
    let expected = *surface.settings();
    surface.close();

    let reopened = h.open(tab).await;
    assert_eq!(*reopened.settings(), expected);
    assert!(reopened.is_enabled());
    assert_eq!(reopened.active_preset(), Some(ActivePreset::Custom));
    assert_eq!(reopened.panel(), ConfigPanel::Frequency);
    assert_eq!(reopened.knobs().frequency(Band::Treble), expected.treble_freq);
}

#[tokio::test]
async fn test_single_injection_per_page_load() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    h.open(tab).await.close();
    h.open(tab).await.close();
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    assert_eq!(h.host.injection_count(tab), 1);
    assert!(h.store.has_run(tab).await);
}

#[tokio::test]
async fn test_non_http_tab_is_never_injected() {
    let h = harness();
    let tab = h.host.open_tab("chrome://newtab");
    let mut surface = h.open(tab).await;
    assert!(!surface.is_instrumentable());

    surface.toggle(true).await.unwrap();
    assert!(!surface.controls_enabled());
    assert_eq!(h.host.injection_count(tab), 0);
    assert!(h.params(tab).await.is_none());
}

// === Presets and Resets ===

#[tokio::test]
async fn test_presets_and_custom_detection() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    surface.set_preamp(3.0).await.unwrap();

    surface.apply_preset(PresetName::BoostBass).await.unwrap();
    let marker = ActivePreset::Preset(PresetName::BoostBass);
    assert_eq!(surface.active_preset(), Some(marker));
    assert_eq!(h.store.load_active_preset(tab).await, Some(marker));
    let params = h.params(tab).await.unwrap();
    assert_eq!(
        (params.bass_gain_db, params.mid_gain_db, params.treble_gain_db),
        (19.0, -30.0, -30.0)
    );
    // Presets leave preamp and frequencies alone
    assert_eq!(surface.settings().preamp, 3.0);
    assert_eq!(surface.settings().mid_freq, 1000.0);

    surface.set_gain(Band::Treble, 3.0, true).await.unwrap();
    assert_eq!(surface.active_preset(), Some(ActivePreset::Custom));

    surface.reset_band(Band::Treble).await.unwrap();
    assert_eq!(surface.active_preset(), Some(ActivePreset::Custom));

    surface.reset_all().await.unwrap();
    assert_eq!(surface.active_preset(), Some(ActivePreset::Reset));
    assert!(surface.settings().tone().is_flat());
    assert_eq!(h.store.load_settings(tab).await.eq.bass, 0.0);
}

#[tokio::test]
async fn test_reset_band_to_flat_marks_reset() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    surface.set_gain(Band::Bass, 4.0, true).await.unwrap();
    surface.reset_band(Band::Bass).await.unwrap();
    assert_eq!(surface.active_preset(), Some(ActivePreset::Reset));
}

#[tokio::test]
async fn test_preset_animation_is_untrusted() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    surface.apply_preset(PresetName::BoostPop).await.unwrap();
    // Every tick of every band went out as a field update
    let steps = h.host.config().animation_steps;
    assert_eq!(surface.channel().stats().field, 3 * steps);
    assert_eq!(
        surface.active_preset(),
        Some(ActivePreset::Preset(PresetName::BoostPop))
    );
}

// === Drags ===

#[tokio::test]
async fn test_slider_drag_sends_one_message_per_tick() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    surface.drag_gain(Band::Mid, 9.0, 12).await.unwrap();
    assert_eq!(surface.channel().stats().field, 12);
    assert_eq!(h.store.load_settings(tab).await.eq.mid, 9.0);
    assert_eq!(h.params(tab).await.unwrap().mid_gain_db, 9.0);
}

#[tokio::test]
async fn test_knob_push_keeps_frequencies_ordered() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    let moves = surface.drag_knob(Band::Bass, 97.0).await.unwrap();
    assert_eq!(moves.len(), 3);
    assert_eq!(surface.channel().stats().field, 3);

    let stored = h.store.load_settings(tab).await.eq;
    assert!(stored.frequencies_ordered());
    assert_eq!(stored.treble_freq, 20000.0);

    let params = h.params(tab).await.unwrap();
    assert!(params.bass_freq < params.mid_freq && params.mid_freq < params.treble_freq);
    assert_eq!(params.treble_freq, 20000.0);
}

// === Navigation ===

#[tokio::test]
async fn test_reload_rehydrates_from_store() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com/a");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    surface.set_gain(Band::Bass, 5.0, true).await.unwrap();
    surface.drag_knob(Band::Mid, 50.0).await.unwrap();
    surface.close();

    h.coordinator
        .navigate(tab, "https://example.com/b")
        .await
        .unwrap();
    add_media(&h.host, tab, MediaKind::Video, false);

    let params = h.wait_for_sources(tab, 1).await;
    assert_eq!(params.bass_gain_db, 5.0);
    assert_eq!(params.mid_freq, 632.0);
    assert_eq!(h.host.injection_count(tab), 2);
    assert_eq!(h.host.registry().len(), 1);
}

#[tokio::test]
async fn test_sends_after_close_are_dropped() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    h.coordinator.close_tab(tab).await.unwrap();
    surface.set_gain(Band::Treble, 2.0, true).await.unwrap();
    assert_eq!(surface.channel().stats().dropped, 1);
    assert_eq!(surface.settings().treble, 2.0);
}

// === Spectrum ===

#[tokio::test]
async fn test_spectrum_reflects_rendered_audio() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();
    h.host.dispatch(tab, PageEvent::UserGesture).unwrap();

    let block = AudioBuffer::sine(1000.0, 0.5, 1024, ChannelLayout::Stereo, 48000);
    let rendered = match h
        .host
        .request(tab, PageRequest::Render { block })
        .await
        .unwrap()
    {
        PageResponse::Rendered { block } => block,
        other => panic!("unexpected response {:?}", other),
    };
    assert!(rendered.peak() > 0.4);

    let mut frame = Vec::new();
    for _ in 0..20 {
        frame = surface.next_spectrum().await.unwrap();
        if frame.iter().any(|&b| b > 0) {
            break;
        }
    }
    assert_eq!(frame.len(), 128);
    assert!(frame.iter().any(|&b| b > 0));
}

#[tokio::test]
async fn test_suspended_page_renders_silence() {
    let h = harness();
    let tab = h.host.open_tab("https://example.com");
    let mut surface = h.open(tab).await;
    surface.toggle(true).await.unwrap();

    let block = AudioBuffer::sine(440.0, 0.5, 512, ChannelLayout::Mono, 48000);
    match h
        .host
        .request(tab, PageRequest::Render { block })
        .await
        .unwrap()
    {
        PageResponse::Rendered { block } => assert_eq!(block.peak(), 0.0),
        other => panic!("unexpected response {:?}", other),
    }
    assert!(h.params(tab).await.unwrap().suspended);
}
