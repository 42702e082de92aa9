//! Listening start/stop chimes
//!
//! Tones are rendered to a sample buffer and handed to a dedicated audio
//! thread, so callers never wait on the output device.

use crate::dispatch::Chime;
use std::f32::consts::TAU;
use tracing::{debug, error, warn};

pub const SAMPLE_RATE: u32 = 44_100;

const ATTACK_SECS: f32 = 0.05;
const DECAY_FLOOR: f32 = 0.001;

/// One sine tone inside a chime
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub freq: f32,
    /// Offset from the start of the chime, in seconds
    pub at: f32,
    pub secs: f32,
}

impl Tone {
    const fn new(freq: f32, at: f32, secs: f32) -> Self {
        Self { freq, at, secs }
    }
}

/// Ascending chime played when listening starts
pub const START_CHIME: [Tone; 3] = [
    Tone::new(440.0, 0.0, 0.2),
    Tone::new(660.0, 0.1, 0.2),
    Tone::new(880.0, 0.2, 0.4),
];

/// Descending chime played when listening ends
pub const STOP_CHIME: [Tone; 2] = [Tone::new(600.0, 0.0, 0.2), Tone::new(400.0, 0.1, 0.3)];

/// Linear attack to `peak`, then exponential decay to near silence at `secs`
fn envelope(t: f32, secs: f32, peak: f32) -> f32 {
    if t < ATTACK_SECS {
        return peak * t / ATTACK_SECS;
    }
    let decay_len = (secs - ATTACK_SECS).max(f32::EPSILON);
    let progress = ((t - ATTACK_SECS) / decay_len).min(1.0);
    peak * (DECAY_FLOOR / peak).powf(progress)
}

/// Mix a chime into a mono buffer
pub fn render(tones: &[Tone], volume: f32) -> Vec<f32> {
    let rate = SAMPLE_RATE as f32;
    let total = tones.iter().map(|t| t.at + t.secs).fold(0.0, f32::max);
    let mut samples = vec![0.0; (total * rate).ceil() as usize];
    if volume <= 0.0 {
        return samples;
    }

    for tone in tones {
        let offset = (tone.at * rate) as usize;
        let len = (tone.secs * rate) as usize;
        for i in 0..len {
            let Some(slot) = samples.get_mut(offset + i) else {
                break;
            };
            let t = i as f32 / rate;
            *slot += envelope(t, tone.secs, volume) * (TAU * tone.freq * t).sin();
        }
    }
    samples
}

/// Plays chimes on a background audio thread
pub struct Tones {
    tx: Option<flume::Sender<Vec<f32>>>,
    volume: f32,
}

impl Tones {
    pub fn spawn(volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        let (tx, rx) = flume::unbounded::<Vec<f32>>();
        let spawned = std::thread::Builder::new()
            .name("tones".to_string())
            .spawn(move || play_loop(rx));
        match spawned {
            Ok(_) => Self {
                tx: Some(tx),
                volume,
            },
            Err(e) => {
                error!("failed to start tone thread: {}", e);
                Self::silent()
            }
        }
    }

    /// Tones disabled
    pub fn silent() -> Self {
        Self {
            tx: None,
            volume: 0.0,
        }
    }

    fn play(&self, tones: &[Tone]) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(render(tones, self.volume)).is_err() {
            warn!("tone thread gone, chime dropped");
        }
    }
}

impl Chime for Tones {
    fn play_start_sound(&mut self) {
        self.play(&START_CHIME);
    }

    fn play_stop_sound(&mut self) {
        self.play(&STOP_CHIME);
    }
}

#[cfg(feature = "tones")]
fn play_loop(rx: flume::Receiver<Vec<f32>>) {
    use rodio::{OutputStreamBuilder, Sink};

    let mut stream = None;
    while let Ok(samples) = rx.recv() {
        if stream.is_none() {
            match OutputStreamBuilder::open_default_stream() {
                Ok(s) => stream = Some(s),
                Err(e) => {
                    warn!("no audio output, chime skipped: {}", e);
                    continue;
                }
            }
        }
        if let Some(stream) = &stream {
            let sink = Sink::connect_new(stream.mixer());
            sink.append(rodio::buffer::SamplesBuffer::new(1, SAMPLE_RATE, samples));
            sink.detach();
        }
    }
    debug!("tone thread exiting");
    if let Some(stream) = stream {
        std::mem::forget(stream); // Suppress "Dropping OutputStream" warning
    }
}

#[cfg(not(feature = "tones"))]
fn play_loop(rx: flume::Receiver<Vec<f32>>) {
    use std::io::Write;

    // Terminal bell stands in for the chime
    while rx.recv().is_ok() {
        eprint!("\x07");
        let _ = std::io::stderr().flush();
    }
    debug!("tone thread exiting");
}
