//! Native playback primitive: symphonia decode + cpal output.
//!
//! 1. `load` probes the file synchronously so duration is known at once
//! 2. `play` spawns a decoder thread feeding a bounded sample queue
//! 3. an output thread drains the queue into the default cpal device
//!
//! Position is counted from frames actually handed to the device, so the
//! progress bar does not run ahead by the queue length. Looping is done by
//! the decoder rewinding at end of stream. The decoder holds at end of
//! stream until the queue has played out, so a loop switched on during the
//! last second still rewinds; only a non-looping end of stream is reported
//! as [`MediaEvent::Ended`].

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use super::MediaBackend;
use crate::error::MediaError;
use crate::models::MediaEvent;

/// `seek_to_ms` value meaning no seek is pending.
const NO_SEEK: u64 = u64::MAX;

/// About one second of 48 kHz stereo.
const QUEUE_CAPACITY: usize = 48_000 * 2;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Thread-safe native backend.
pub struct AudioEffect {
    state: Arc<AudioState>,
}

struct AudioState {
    source: Mutex<Option<String>>,
    /// Decoder/output threads exist for the current source.
    running: AtomicBool,
    paused: AtomicBool,
    looping: AtomicBool,
    stop_signal: AtomicBool,
    /// Decoder reached end of stream (and is not looping).
    drained: AtomicBool,
    seek_to_ms: AtomicU64,
    /// Position of the first frame after the last seek/rewind.
    base_ms: AtomicU64,
    /// Frames handed to the device since `base_ms`.
    played_frames: AtomicU64,
    /// 0 while unknown.
    duration_ms: AtomicU64,
    track_rate: AtomicU32,
    track_channels: AtomicU32,
    output_rate: AtomicU32,
    samples: Mutex<VecDeque<f32>>,
    events: Mutex<VecDeque<MediaEvent>>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl AudioState {
    fn reset_position(&self, ms: u64) {
        self.base_ms.store(ms, Ordering::SeqCst);
        self.played_frames.store(0, Ordering::SeqCst);
    }

    fn push_event(&self, event: MediaEvent) {
        self.events.lock().push_back(event);
    }
}

impl AudioEffect {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AudioState {
                source: Mutex::new(None),
                running: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                looping: AtomicBool::new(false),
                stop_signal: AtomicBool::new(false),
                drained: AtomicBool::new(false),
                seek_to_ms: AtomicU64::new(NO_SEEK),
                base_ms: AtomicU64::new(0),
                played_frames: AtomicU64::new(0),
                duration_ms: AtomicU64::new(0),
                track_rate: AtomicU32::new(44_100),
                track_channels: AtomicU32::new(2),
                output_rate: AtomicU32::new(44_100),
                samples: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
                events: Mutex::new(VecDeque::new()),
                threads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Stop decoder and output threads and wait for them to exit.
    pub fn stop(&self) {
        self.state.stop_signal.store(true, Ordering::SeqCst);
        self.state.samples.lock().clear();

        let handles: Vec<_> = self.state.threads.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        self.state.running.store(false, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
    }

    fn spawn_pipeline(&self, path: String) -> Result<(), MediaError> {
        let rate = self.state.track_rate.load(Ordering::SeqCst);
        let channels = self.state.track_channels.load(Ordering::SeqCst).max(1) as u16;
        let config = choose_output_config(rate, channels).map_err(|e| MediaError::Device(e.to_string()))?;

        self.state.output_rate.store(config.sample_rate.0, Ordering::SeqCst);
        self.state.stop_signal.store(false, Ordering::SeqCst);
        self.state.drained.store(false, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
        self.state.samples.lock().clear();
        self.state.running.store(true, Ordering::SeqCst);

        let mut threads = self.state.threads.lock();

        let decoder_state = Arc::clone(&self.state);
        threads.push(thread::spawn(move || {
            if let Err(e) = decode_to_queue(&path, &decoder_state) {
                log::error!("lyre: decode error: {}", e);
                decoder_state.push_event(MediaEvent::Failed(format!("decode error: {e}")));
                decoder_state.stop_signal.store(true, Ordering::SeqCst);
            }
        }));

        let output_state = Arc::clone(&self.state);
        threads.push(thread::spawn(move || {
            let err_state = Arc::clone(&output_state);
            if let Err(e) = output_from_queue(output_state, config) {
                log::error!("lyre: output error: {}", e);
                err_state.push_event(MediaEvent::Failed(format!("audio device: {e}")));
                err_state.stop_signal.store(true, Ordering::SeqCst);
            }
            err_state.running.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }
}

impl Default for AudioEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioEffect {
    fn drop(&mut self) {
        self.stop();
    }
}

impl MediaBackend for AudioEffect {
    fn load(&self, source: &str) -> Result<(), MediaError> {
        self.stop();
        *self.state.source.lock() = None;
        self.state.reset_position(0);
        self.state.seek_to_ms.store(NO_SEEK, Ordering::SeqCst);
        self.state.duration_ms.store(0, Ordering::SeqCst);

        let info = probe_format(source).map_err(|e| MediaError::unavailable(source, e))?;
        self.state.track_rate.store(info.sample_rate, Ordering::SeqCst);
        self.state.track_channels.store(info.channels, Ordering::SeqCst);
        self.state.duration_ms.store(info.duration_ms.unwrap_or(0), Ordering::SeqCst);
        *self.state.source.lock() = Some(source.to_string());
        Ok(())
    }

    fn play(&self) -> Result<(), MediaError> {
        if self.state.running.load(Ordering::SeqCst) {
            self.state.paused.store(false, Ordering::SeqCst);
            return Ok(());
        }
        let path = self.state.source.lock().clone().ok_or(MediaError::NothingLoaded)?;

        // Threads left over from a finished or failed run.
        self.stop();
        if self.state.drained.load(Ordering::SeqCst) {
            self.state.reset_position(0);
        }
        self.spawn_pipeline(path)
    }

    fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    fn seek(&self, position_secs: f64) {
        let ms = (position_secs.max(0.0) * 1000.0) as u64;
        self.state.seek_to_ms.store(ms, Ordering::SeqCst);
        self.state.reset_position(ms);
    }

    fn set_looping(&self, looping: bool) {
        self.state.looping.store(looping, Ordering::SeqCst);
    }

    fn position_secs(&self) -> f64 {
        let base = self.state.base_ms.load(Ordering::SeqCst) as f64 / 1000.0;
        let rate = self.state.output_rate.load(Ordering::SeqCst).max(1) as f64;
        let played = self.state.played_frames.load(Ordering::SeqCst) as f64 / rate;
        base + played
    }

    fn duration_secs(&self) -> Option<f64> {
        match self.state.duration_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms as f64 / 1000.0),
        }
    }

    fn take_event(&self) -> Option<MediaEvent> {
        self.state.events.lock().pop_front()
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

struct FormatInfo {
    sample_rate: u32,
    channels: u32,
    duration_ms: Option<u64>,
}

fn open_format(file_path: &str) -> Result<Box<dyn FormatReader>, BoxError> {
    let path = Path::new(file_path);
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

/// Probe a file's stream parameters without decoding.
fn probe_format(file_path: &str) -> Result<FormatInfo, BoxError> {
    let format = open_format(file_path)?;
    let track = format.default_track().ok_or("no default track")?;
    let params = &track.codec_params;
    let sample_rate = params.sample_rate.unwrap_or(44_100);
    let channels = params.channels.map(|c| c.count() as u32).unwrap_or(2);
    let duration_ms = params.n_frames.map(|n| n * 1000 / sample_rate.max(1) as u64);
    Ok(FormatInfo { sample_rate, channels, duration_ms })
}

fn seek_format(format: &mut dyn FormatReader, track_id: u32, ms: u64) -> bool {
    let time = Time::new(ms / 1000, (ms % 1000) as f64 / 1000.0);
    format
        .seek(SeekMode::Accurate, SeekTo::Time { time, track_id: Some(track_id) })
        .is_ok()
}

/// Decode `file_path` into the shared queue until stopped or finished.
fn decode_to_queue(file_path: &str, state: &AudioState) -> Result<(), BoxError> {
    let mut format = open_format(file_path)?;
    let track = format.default_track().ok_or("no default track")?;
    let track_id = track.id;
    let src_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
    state.track_channels.store(channels as u32, Ordering::SeqCst);

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let dst_rate = state.output_rate.load(Ordering::SeqCst);
    let mut resampler = (src_rate != dst_rate).then(|| {
        log::info!("lyre: resampling {}Hz -> {}Hz", src_rate, dst_rate);
        Resampler::new(src_rate, dst_rate, channels)
    });

    loop {
        if state.stop_signal.load(Ordering::SeqCst) {
            return Ok(());
        }

        let seek_ms = state.seek_to_ms.swap(NO_SEEK, Ordering::SeqCst);
        if seek_ms != NO_SEEK && seek_format(format.as_mut(), track_id, seek_ms) {
            decoder.reset();
            state.samples.lock().clear();
            state.reset_position(seek_ms);
        }

        if state.paused.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(10));
            continue;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                match await_stream_end(state) {
                    StreamEnd::Rewind if seek_format(format.as_mut(), track_id, 0) => {
                        decoder.reset();
                        state.reset_position(0);
                        continue;
                    }
                    // Handled at the top of the loop.
                    StreamEnd::Seek => continue,
                    _ => break,
                }
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // A corrupt packet is skipped, not fatal.
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::debug!("lyre: skipping bad packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let spec = *decoded.spec();
        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        let samples = match resampler.as_mut() {
            Some(rs) => rs.process(buf.samples()),
            None => buf.samples().to_vec(),
        };

        // Back-pressure: fill whatever room there is, bail out on stop or seek.
        let mut pending = samples.as_slice();
        loop {
            let pushed = push_frames(&mut state.samples.lock(), pending, channels);
            pending = &pending[pushed..];
            if pending.is_empty() {
                break;
            }
            if state.stop_signal.load(Ordering::SeqCst) || state.seek_to_ms.load(Ordering::SeqCst) != NO_SEEK {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    state.drained.store(true, Ordering::SeqCst);
    Ok(())
}

enum StreamEnd {
    Rewind,
    Seek,
    Finished,
}

/// Wait at end of stream until the queued tail has played, unless a loop
/// or a seek asks for more input first.
fn await_stream_end(state: &AudioState) -> StreamEnd {
    loop {
        if state.stop_signal.load(Ordering::SeqCst) {
            return StreamEnd::Finished;
        }
        if state.looping.load(Ordering::SeqCst) {
            return StreamEnd::Rewind;
        }
        if state.seek_to_ms.load(Ordering::SeqCst) != NO_SEEK {
            return StreamEnd::Seek;
        }
        if state.samples.lock().is_empty() {
            return StreamEnd::Finished;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Append as many whole frames of `samples` as fit under `QUEUE_CAPACITY`.
/// Returns the number of samples taken.
fn push_frames(queue: &mut VecDeque<f32>, samples: &[f32], channels: usize) -> usize {
    let channels = channels.max(1);
    let room = QUEUE_CAPACITY.saturating_sub(queue.len()).min(samples.len());
    let take = room - room % channels;
    queue.extend(samples[..take].iter().copied());
    take
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Use the track's format if the device takes it, else the device default.
fn choose_output_config(track_rate: u32, track_channels: u16) -> Result<cpal::StreamConfig, BoxError> {
    let device = cpal::default_host().default_output_device().ok_or("no output device")?;

    let supports_track = device
        .supported_output_configs()
        .map(|mut configs| {
            configs.any(|range| {
                range.sample_format() == cpal::SampleFormat::F32
                    && range.channels() >= track_channels
                    && range.min_sample_rate().0 <= track_rate
                    && range.max_sample_rate().0 >= track_rate
            })
        })
        .unwrap_or(false);

    if supports_track {
        return Ok(cpal::StreamConfig {
            channels: track_channels,
            sample_rate: cpal::SampleRate(track_rate),
            buffer_size: cpal::BufferSize::Default,
        });
    }

    let default_cfg = device.default_output_config()?;
    if default_cfg.sample_format() != cpal::SampleFormat::F32 {
        return Err(format!("device does not support f32 output (got {:?})", default_cfg.sample_format()).into());
    }
    Ok(default_cfg.into())
}

/// Drain the queue into the device until stopped or the track runs out.
fn output_from_queue(state: Arc<AudioState>, config: cpal::StreamConfig) -> Result<(), BoxError> {
    let device = cpal::default_host().default_output_device().ok_or("no output device")?;
    let out_channels = config.channels.max(1) as usize;

    let cb_state = Arc::clone(&state);
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            data.fill(0.0);
            if cb_state.paused.load(Ordering::SeqCst) {
                return;
            }
            let in_channels = cb_state.track_channels.load(Ordering::SeqCst).max(1) as usize;
            let frames = data.len() / out_channels;

            let mut queue = cb_state.samples.lock();
            let take = (frames * in_channels).min(queue.len());
            let pulled: Vec<f32> = queue.drain(..take).collect();
            drop(queue);

            remix(&pulled, in_channels, data, out_channels);
            cb_state
                .played_frames
                .fetch_add((pulled.len() / in_channels) as u64, Ordering::SeqCst);
        },
        move |err| log::error!("lyre: cpal error: {}", err),
        None,
    )?;
    stream.play()?;

    loop {
        if state.stop_signal.load(Ordering::SeqCst) {
            return Ok(());
        }
        if state.drained.load(Ordering::SeqCst) && state.samples.lock().is_empty() {
            // Cleared before the event so a restart from it spawns a fresh pipeline.
            state.running.store(false, Ordering::SeqCst);
            state.push_event(MediaEvent::Ended);
            return Ok(());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// Copy interleaved frames between channel layouts.
///
/// Mono is duplicated, down-mix to mono averages, anything else copies the
/// shared channels. `dst` frames without a source frame are left untouched.
fn remix(src: &[f32], src_ch: usize, dst: &mut [f32], dst_ch: usize) {
    for (input, output) in src.chunks_exact(src_ch).zip(dst.chunks_exact_mut(dst_ch)) {
        if src_ch == dst_ch {
            output.copy_from_slice(input);
        } else if src_ch == 1 {
            output.fill(input[0]);
        } else if dst_ch == 1 {
            output[0] = input.iter().sum::<f32>() / src_ch as f32;
        } else {
            for (c, out) in output.iter_mut().enumerate() {
                *out = input.get(c).copied().unwrap_or(0.0);
            }
        }
    }
}

/// Linear interpolation resampler that carries the last frame across
/// blocks so packet boundaries do not click.
struct Resampler {
    /// Source frames advanced per output frame.
    step: f64,
    pos: f64,
    channels: usize,
    last: Vec<f32>,
}

impl Resampler {
    fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Self {
        Self {
            step: src_rate as f64 / dst_rate.max(1) as f64,
            pos: 0.0,
            channels: channels.max(1),
            last: Vec::new(),
        }
    }

    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let ch = self.channels;
        let frames = input.len() / ch;
        if frames == 0 {
            return Vec::new();
        }

        // Virtual frame 0 is the previous block's last frame.
        let last = std::mem::take(&mut self.last);
        let at = |i: usize, c: usize| -> f32 {
            if i == 0 {
                last.get(c).copied().unwrap_or(input[c])
            } else {
                input[(i - 1) * ch + c]
            }
        };

        let mut out = Vec::with_capacity(((frames as f64 / self.step) as usize + 1) * ch);
        while self.pos < frames as f64 {
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            for c in 0..ch {
                let a = at(i, c);
                let b = at(i + 1, c);
                out.push(a + (b - a) * frac);
            }
            self.pos += self.step;
        }
        self.pos -= frames as f64;
        self.last = input[(frames - 1) * ch..frames * ch].to_vec();
        out
    }
}
