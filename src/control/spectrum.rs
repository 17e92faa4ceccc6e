//! Spectrum Sampler
//!
//! Polls the page's analyser tap at a fixed cadence for the bar visualizer.
//! Pulls go over the same bus as parameter pushes. A tab with no page or no
//! graph yields empty frames instead of errors. The polling task is
//! cancelled when the sampler is stopped or dropped.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::bus::{PageRequest, PageResponse, TabHost, TabId};

pub struct SpectrumSampler {
    frames: watch::Receiver<Vec<u8>>,
    paused: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SpectrumSampler {
    /// Start polling `tab` every `interval`
    ///
    /// `tab` is `None` when the control surface is not attached to an
    /// instrumentable page; frames are then always empty.
    pub fn start(host: TabHost, tab: Option<TabId>, interval: Duration) -> Self {
        let (frame_tx, frames) = watch::channel(Vec::new());
        let (paused, pause_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(host, tab, interval, frame_tx, pause_rx));
        Self {
            frames,
            paused,
            task,
        }
    }

    /// Most recent frame (empty before the first poll)
    pub fn latest(&self) -> Vec<u8> {
        self.frames.borrow().clone()
    }

    /// Wait for the next frame; `None` once polling has stopped
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.frames.changed().await.ok()?;
        Some(self.frames.borrow_and_update().clone())
    }

    /// Suspend polling (control surface hidden)
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel polling (control surface closed)
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SpectrumSampler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop(
    host: TabHost,
    tab: Option<TabId>,
    interval: Duration,
    frames: watch::Sender<Vec<u8>>,
    mut paused: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        loop {
            let is_paused = *paused.borrow_and_update();
            if !is_paused {
                break;
            }
            if paused.changed().await.is_err() {
                return;
            }
        }

        let data = match tab {
            Some(tab) => sample(&host, tab).await,
            None => Vec::new(),
        };
        if frames.send(data).is_err() {
            return;
        }
    }
}

async fn sample(host: &TabHost, tab: TabId) -> Vec<u8> {
    match host.request(tab, PageRequest::GetFrequencyData).await {
        Ok(PageResponse::FrequencyData { data }) => data,
        Ok(other) => {
            debug!(%tab, ?other, "Unexpected spectrum reply");
            Vec::new()
        }
        Err(err) => {
            debug!(%tab, error = %err, "Spectrum unavailable");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EqConfig;

    #[tokio::test(start_paused = true)]
    async fn test_detached_sampler_yields_empty_frames() {
        let host = TabHost::new(EqConfig::default());
        let mut sampler = SpectrumSampler::start(host, None, Duration::from_millis(50));
        assert_eq!(sampler.next_frame().await, Some(Vec::new()));
        assert!(sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_tab_yields_empty_frames() {
        let host = TabHost::new(EqConfig::default());
        let tab = host.open_tab("https://example.com");
        host.close_tab(tab).unwrap();

        let mut sampler = SpectrumSampler::start(host, Some(tab), Duration::from_millis(50));
        assert_eq!(sampler.next_frame().await, Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_polling() {
        let host = TabHost::new(EqConfig::default());
        let mut sampler = SpectrumSampler::start(host, None, Duration::from_millis(50));
        sampler.next_frame().await;

        sampler.pause();
        assert!(sampler.is_paused());
        let waited =
            tokio::time::timeout(Duration::from_millis(500), sampler.next_frame()).await;
        assert!(waited.is_err(), "no frames while paused");

        sampler.resume();
        assert!(sampler.next_frame().await.is_some());
    }
}
