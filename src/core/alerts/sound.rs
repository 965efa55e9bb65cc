// Sound engine - short synthesized cue per alert kind.
//
// Playback happens on a dedicated audio thread that owns the output for its
// whole life; each tone gets its own short-lived sink. Callers only push a
// request onto a channel, so `play` never blocks and never fails.

use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;

use super::model::AlertKind;
use crate::core::error::Result;

pub const SAMPLE_RATE: u32 = 44_100;
pub const TONE_DURATION: Duration = Duration::from_millis(100);
const START_GAIN: f32 = 0.1;
const END_GAIN: f32 = 0.01;

/// Tone frequency in Hz for each alert kind.
pub fn frequency_for(kind: AlertKind) -> f32 {
    match kind {
        AlertKind::Success => 880.0,
        AlertKind::Error => 220.0,
        AlertKind::Warning => 440.0,
        AlertKind::Info => 660.0,
        AlertKind::Loading => 330.0,
        AlertKind::Special => 440.0,
    }
}

/// A single cue: a sine wave with an exponential decay envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub duration: Duration,
}

impl Tone {
    pub fn for_kind(kind: AlertKind) -> Self {
        Self {
            frequency: frequency_for(kind),
            duration: TONE_DURATION,
        }
    }

    /// Mono samples at `SAMPLE_RATE`. Gain decays from 0.1 to 0.01 over the tone.
    pub fn samples(&self) -> Vec<f32> {
        let total = (self.duration.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as usize;
        let ratio = END_GAIN / START_GAIN;
        (0..total)
            .map(|n| {
                let t = n as f32 / SAMPLE_RATE as f32;
                let progress = n as f32 / total as f32;
                let gain = START_GAIN * ratio.powf(progress);
                gain * (2.0 * std::f32::consts::PI * self.frequency * t).sin()
            })
            .collect()
    }

    pub fn to_buffer(&self) -> SamplesBuffer {
        SamplesBuffer::new(1, SAMPLE_RATE, self.samples())
    }
}

/// Where synthesized tones end up. Lives on the audio thread only.
pub trait ToneOutput {
    fn play(&mut self, tone: &Tone) -> Result<()>;
}

/// Output used when no audio backend is compiled in.
#[derive(Debug, Default)]
pub struct NullOutput;

impl ToneOutput for NullOutput {
    fn play(&mut self, tone: &Tone) -> Result<()> {
        log::debug!("No audio backend, skipping {} Hz tone", tone.frequency);
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use rodio_output::RodioOutput;

#[cfg(feature = "playback")]
mod rodio_output {
    use super::{Tone, ToneOutput};
    use crate::core::error::{Error, Result};

    /// Default host device. The stream is opened on first use and kept for
    /// the life of the audio thread.
    #[derive(Default)]
    pub struct RodioOutput {
        stream: Option<rodio::OutputStream>,
    }

    impl ToneOutput for RodioOutput {
        fn play(&mut self, tone: &Tone) -> Result<()> {
            let stream = match self.stream.take() {
                Some(stream) => stream,
                None => rodio::OutputStreamBuilder::open_default_stream()
                    .map_err(|e| Error::Audio(e.to_string()))?,
            };
            {
                let sink = rodio::Sink::connect_new(stream.mixer());
                sink.append(tone.to_buffer());
                sink.detach();
            }
            self.stream = Some(stream);
            Ok(())
        }
    }
}

/// Fire-and-forget tone player.
pub struct SoundEngine {
    tx: Sender<Tone>,
}

impl SoundEngine {
    /// Spawn the audio thread. `make_output` runs on that thread, so the
    /// output itself never has to cross threads.
    pub fn with_output<F>(make_output: F) -> Self
    where
        F: FnOnce() -> Box<dyn ToneOutput> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Tone>();
        let spawned = thread::Builder::new()
            .name("alert-audio".to_string())
            .spawn(move || {
                let mut output = make_output();
                for tone in rx {
                    if let Err(e) = output.play(&tone) {
                        log::warn!("Alert tone failed: {}", e);
                    }
                }
                log::debug!("Audio thread stopped");
            });
        if let Err(e) = spawned {
            // Sender stays valid; sends will fail and be logged.
            log::warn!("Could not start audio thread: {}", e);
        }
        Self { tx }
    }

    /// The host's default output when built with `playback`, silence otherwise.
    pub fn host() -> Self {
        #[cfg(feature = "playback")]
        {
            Self::with_output(|| Box::new(RodioOutput::default()))
        }
        #[cfg(not(feature = "playback"))]
        {
            Self::with_output(|| Box::new(NullOutput))
        }
    }

    pub fn silent() -> Self {
        Self::with_output(|| Box::new(NullOutput))
    }

    /// Queue the cue for `kind`. Never blocks, never fails.
    pub fn play(&self, kind: AlertKind) {
        if self.tx.send(Tone::for_kind(kind)).is_err() {
            log::warn!("Audio thread unavailable, dropping {} tone", kind);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::error::Error;
    use rodio::Source;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Records every tone handed to the output.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingOutput {
        pub played: Arc<Mutex<Vec<Tone>>>,
    }

    impl ToneOutput for RecordingOutput {
        fn play(&mut self, tone: &Tone) -> Result<()> {
            self.played.lock().unwrap().push(*tone);
            Ok(())
        }
    }

    pub(crate) fn recording_engine() -> (SoundEngine, Arc<Mutex<Vec<Tone>>>) {
        let output = RecordingOutput::default();
        let played = output.played.clone();
        (SoundEngine::with_output(move || Box::new(output)), played)
    }

    /// Polls until `count` tones arrived or a second has passed.
    pub(crate) fn wait_for_tones(played: &Arc<Mutex<Vec<Tone>>>, count: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            let seen = played.lock().unwrap().len();
            if seen >= count || Instant::now() >= deadline {
                return seen;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    struct FailingOutput {
        attempts: Arc<AtomicUsize>,
    }

    impl ToneOutput for FailingOutput {
        fn play(&mut self, _tone: &Tone) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Audio("no device".to_string()))
        }
    }

    #[test]
    fn test_frequency_table() {
        assert_eq!(frequency_for(AlertKind::Success), 880.0);
        assert_eq!(frequency_for(AlertKind::Error), 220.0);
        assert_eq!(frequency_for(AlertKind::Warning), 440.0);
        assert_eq!(frequency_for(AlertKind::Info), 660.0);
        assert_eq!(frequency_for(AlertKind::Loading), 330.0);
        assert_eq!(frequency_for(AlertKind::Special), 440.0);
    }

    #[test]
    fn test_tone_envelope_decays() {
        let samples = Tone::for_kind(AlertKind::Info).samples();
        assert_eq!(samples.len(), 4410);

        let peak = |chunk: &[f32]| chunk.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let head = peak(&samples[..441]);
        let tail = peak(&samples[samples.len() - 441..]);
        assert!(head <= START_GAIN + f32::EPSILON);
        assert!(tail < head / 4.0, "head {head} tail {tail}");
    }

    #[test]
    fn test_buffer_is_mono_at_sample_rate() {
        let buffer = Tone::for_kind(AlertKind::Error).to_buffer();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample_rate(), SAMPLE_RATE);
        assert!(buffer.total_duration().is_some());
    }

    #[test]
    fn test_engine_forwards_tones() {
        let (engine, played) = recording_engine();
        engine.play(AlertKind::Success);
        engine.play(AlertKind::Error);

        assert_eq!(wait_for_tones(&played, 2), 2);
        let played = played.lock().unwrap();
        assert_eq!(played[0].frequency, 880.0);
        assert_eq!(played[1].frequency, 220.0);
    }

    #[test]
    fn test_output_errors_are_swallowed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let engine = SoundEngine::with_output(move || Box::new(FailingOutput { attempts: counter }));

        engine.play(AlertKind::Warning);
        engine.play(AlertKind::Warning);

        let deadline = Instant::now() + Duration::from_secs(1);
        while attempts.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2, "thread survives failures");
    }

    #[cfg(feature = "playback")]
    #[test]
    fn test_rodio_output_reports_missing_device() {
        // Headless CI has no output device; that must come back as an error.
        let mut output = RodioOutput::default();
        let tone = Tone::for_kind(AlertKind::Success);
        for _ in 0..2 {
            match output.play(&tone) {
                Ok(()) => {}
                Err(Error::Audio(reason)) => assert!(!reason.is_empty()),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}
