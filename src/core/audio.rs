use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, StreamConfig};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use rubato::{
    Resampler, SincFixedOut, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/* ============================== Public API ============================== */

// Commands to the audio engine
enum AudioCommand {
    PlayClip(Arc<Vec<i16>>),
}

// Global engine (initialized once; None when no usable output device exists)
static ENGINE: Lazy<Option<AudioEngine>> = Lazy::new(init_engine_and_thread);

struct AudioEngine {
    command_sender: Sender<AudioCommand>,
    device_sample_rate: u32,
    device_channels: usize,
}

/// Initializes the audio engine. Call once at startup; a failure here
/// only means the trainer runs silent.
pub fn init() -> Result<(), String> {
    match Lazy::force(&ENGINE) {
        Some(_) => Ok(()),
        None => Err("no usable audio output device".to_string()),
    }
}

/// Queues a decoded clip for playback. Fire-and-forget: if the engine is
/// down or the channel is gone, the clip is silently dropped.
pub fn play_clip(samples: Arc<Vec<i16>>) {
    match ENGINE.as_ref() {
        Some(engine) => {
            let _ = engine.command_sender.send(AudioCommand::PlayClip(samples));
        }
        None => debug!("Audio engine unavailable; clip dropped."),
    }
}

/// Decodes an MP3 file and resamples it to the device format, ready for
/// [`play_clip`]. Requires a running engine (the target rate is the
/// device's).
pub fn load_clip(path: &Path) -> Result<Arc<Vec<i16>>, Box<dyn Error>> {
    let engine = ENGINE
        .as_ref()
        .ok_or("audio engine unavailable, cannot pick a target sample rate")?;

    let (samples, in_hz, in_ch) = decode_mp3(path)?;
    let out = resample_interleaved(
        &samples,
        in_hz,
        in_ch,
        engine.device_sample_rate,
        engine.device_channels,
    )?;
    info!(
        "Loaded clip '{}' ({} Hz {} ch -> {} Hz {} ch, {} samples).",
        path.display(),
        in_hz,
        in_ch,
        engine.device_sample_rate,
        engine.device_channels,
        out.len()
    );
    Ok(Arc::new(out))
}

/* ============================ Engine internals ============================ */

fn init_engine_and_thread() -> Option<AudioEngine> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            warn!("No default audio output config: {e}");
            return None;
        }
    };
    let stream_config: StreamConfig = config.into();

    let device_sample_rate = stream_config.sample_rate.0;
    let device_channels = stream_config.channels as usize;

    let (command_sender, command_receiver) = channel();

    // The manager thread owns the CPAL stream and the command loop.
    thread::spawn(move || {
        audio_manager_thread(command_receiver);
    });

    info!("Audio engine initialized ({device_sample_rate} Hz, {device_channels} ch).");
    Some(AudioEngine {
        command_sender,
        device_sample_rate,
        device_channels,
    })
}

/// Manager thread: builds the CPAL stream and mixes queued clips into it.
fn audio_manager_thread(command_receiver: Receiver<AudioCommand>) {
    let (clip_sender, clip_receiver) = channel::<Arc<Vec<i16>>>();

    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        warn!("Audio output device disappeared before the stream was built.");
        return;
    };
    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            warn!("Audio output config lost: {e}");
            return;
        }
    };
    let stream_config: StreamConfig = config.clone().into();

    // Reusable buffers captured by the callback to avoid allocations
    let mut mix_i16: Vec<i16> = Vec::new();
    let mut active_clips: Vec<(Arc<Vec<i16>>, usize)> = Vec::new();

    // Mixes playing clips into `mix` (saturating add), dropping finished ones.
    let mut mix_active = move |mix: &mut [i16], receiver: &Receiver<Arc<Vec<i16>>>| {
        for new_clip in receiver.try_iter() {
            active_clips.push((new_clip, 0));
        }
        active_clips.retain_mut(|(data, cursor)| {
            let n = (data.len().saturating_sub(*cursor)).min(mix.len());
            for i in 0..n {
                mix[i] = mix[i].saturating_add(data[*cursor + i]);
            }
            *cursor += n;
            *cursor < data.len()
        });
    };

    let stream = match config.sample_format() {
        SampleFormat::I16 => device.build_output_stream(
            &stream_config,
            move |out: &mut [i16], _| {
                if mix_i16.len() != out.len() {
                    mix_i16.resize(out.len(), 0);
                }
                mix_i16.fill(0);
                mix_active(&mut mix_i16, &clip_receiver);
                out.copy_from_slice(&mix_i16);
            },
            |err| error!("Audio stream error: {err}"),
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            &stream_config,
            move |out: &mut [u16], _| {
                if mix_i16.len() != out.len() {
                    mix_i16.resize(out.len(), 0);
                }
                mix_i16.fill(0);
                mix_active(&mut mix_i16, &clip_receiver);
                for (o, s) in out.iter_mut().zip(&mix_i16) {
                    *o = (i32::from(*s) + 32768) as u16;
                }
            },
            |err| error!("Audio stream error: {err}"),
            None,
        ),
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |out: &mut [f32], _| {
                if mix_i16.len() != out.len() {
                    mix_i16.resize(out.len(), 0);
                }
                mix_i16.fill(0);
                mix_active(&mut mix_i16, &clip_receiver);
                for (o, s) in out.iter_mut().zip(&mix_i16) {
                    *o = (*s).to_sample::<f32>();
                }
            },
            |err| error!("Audio stream error: {err}"),
            None,
        ),
        other => {
            warn!("Unsupported audio sample format {other:?}; running silent.");
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to build audio stream: {e}");
            return;
        }
    };
    if let Err(e) = stream.play() {
        warn!("Failed to start audio stream: {e}");
        return;
    }

    // Command loop: hand queued clips to the callback.
    loop {
        match command_receiver.recv() {
            Ok(AudioCommand::PlayClip(data)) => {
                let _ = clip_sender.send(data);
            }
            Err(_) => break, // main dropped; exit thread
        }
    }
}

/* ========================= Clip decode + resample ========================= */

fn decode_mp3(path: &Path) -> Result<(Vec<i16>, u32, usize), Box<dyn Error>> {
    let mut decoder = minimp3::Decoder::new(File::open(path)?);
    let mut samples: Vec<i16> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0usize;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                channels = frame.channels;
                samples.extend_from_slice(&frame.data);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(format!("mp3 decode failed: {e:?}").into()),
        }
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(format!("'{}' decoded to no audio", path.display()).into());
    }
    Ok((samples, sample_rate, channels))
}

/// Sinc-resamples an interleaved clip to the device rate and remaps its
/// channel count. Sub-chunk leftovers at the tail are flushed with a
/// partial pass.
fn resample_interleaved(
    input: &[i16],
    in_hz: u32,
    in_ch: usize,
    out_hz: u32,
    out_ch: usize,
) -> Result<Vec<i16>, Box<dyn Error>> {
    if in_hz == out_hz {
        let frames = input.len() / in_ch;
        let mut out = Vec::with_capacity(frames * out_ch);
        for f in 0..frames {
            push_frame_remapped(&mut out, &input[f * in_ch..(f + 1) * in_ch], out_ch);
        }
        return Ok(out);
    }

    const OUT_FRAMES_PER_CALL: usize = 512;
    let ratio = f64::from(out_hz) / f64::from(in_hz);
    let iparams = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedOut::<f32>::new(ratio, 1.0, iparams, OUT_FRAMES_PER_CALL, in_ch)?;

    // Deinterleave to planar f32
    let frames = input.len() / in_ch;
    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); in_ch];
    for f in 0..frames {
        for c in 0..in_ch {
            planar[c].push(f32::from(input[f * in_ch + c]) / 32768.0);
        }
    }

    let mut out: Vec<i16> = Vec::with_capacity((frames as f64 * ratio) as usize * out_ch);
    let mut pos = 0usize;
    loop {
        let needed = resampler.input_frames_next();
        if pos + needed > frames {
            break;
        }
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..pos + needed]).collect();
        let produced = resampler.process(&chunk, None)?;
        append_planar_as_interleaved(&mut out, &produced, out_ch);
        pos += needed;
    }
    if pos < frames {
        let tail: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        let produced = resampler.process_partial(Some(&tail), None)?;
        append_planar_as_interleaved(&mut out, &produced, out_ch);
    }

    Ok(out)
}

fn append_planar_as_interleaved(out: &mut Vec<i16>, planar: &[Vec<f32>], out_ch: usize) {
    if planar.is_empty() {
        return;
    }
    let frames = planar[0].len();
    let mut frame: Vec<i16> = vec![0; planar.len()];
    for f in 0..frames {
        for (c, chan) in planar.iter().enumerate() {
            frame[c] = (chan[f].clamp(-1.0, 1.0) * 32767.0) as i16;
        }
        push_frame_remapped(out, &frame, out_ch);
    }
}

/// Widens or folds one frame of samples to `out_ch` channels: matching
/// layouts copy through, anything else goes via a mono fold.
fn push_frame_remapped(out: &mut Vec<i16>, frame: &[i16], out_ch: usize) {
    if frame.len() == out_ch {
        out.extend_from_slice(frame);
        return;
    }
    let mono = (frame.iter().map(|s| i32::from(*s)).sum::<i32>() / frame.len() as i32) as i16;
    for _ in 0..out_ch {
        out.push(mono);
    }
}
