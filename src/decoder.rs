// src/decoder.rs

use anyhow::{anyhow, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, JoinHandle};
use symphonia::core::audio::SampleBuffer as SymphoniaBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::store::DecodedAudio;

/// Decodes a whole file into per-channel f32 vectors.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = get_codecs().make(&codec_params, &DecoderOptions::default())?;
    let mut sample_buf: Option<SymphoniaBuffer<f32>> = None;
    let mut interleaved = Vec::<f32>::new();

    let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let mut format_locked = false;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count();

        // Lock the layout on the first non-empty packet.
        if !format_locked {
            if decoded.frames() == 0 {
                continue;
            }
            sample_rate = spec.rate;
            channels = packet_channels;
            format_locked = true;
            log::debug!("decoder locked format: {} Hz / {} ch", sample_rate, channels);
        }

        let needs_alloc = sample_buf
            .as_ref()
            .map_or(true, |b| b.capacity() < decoded.capacity());
        if needs_alloc {
            sample_buf = Some(SymphoniaBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else { continue };
        buf.copy_interleaved_ref(decoded);
        let new_samples = buf.samples();

        if packet_channels == channels {
            interleaved.extend_from_slice(new_samples);
        } else if packet_channels == 1 && channels == 2 {
            for &s in new_samples {
                interleaved.push(s);
                interleaved.push(s);
            }
        } else if packet_channels == 2 && channels == 1 {
            for pair in new_samples.chunks(2) {
                interleaved.push((pair[0] + pair[1]) * 0.5);
            }
        } else {
            log::warn!(
                "dropping packet with {} channels (stream locked to {})",
                packet_channels,
                channels
            );
        }
    }

    let audio = DecodedAudio::from_interleaved(&interleaved, channels, sample_rate);
    log::info!(
        "decoded {}: {} ch, {} Hz, {:.2}s",
        path.display(),
        channels,
        sample_rate,
        audio.duration_secs()
    );
    Ok(audio)
}

/// Runs [`decode_file`] on its own thread; the result arrives on the receiver.
pub fn spawn_decode(path: PathBuf) -> (JoinHandle<()>, Receiver<Result<DecodedAudio>>) {
    let (tx, rx) = channel();
    let handle = thread::spawn(move || {
        let result = decode_file(&path);
        if let Err(e) = &result {
            log::error!("decode thread error for {}: {e}", path.display());
        }
        let _ = tx.send(result);
    });
    (handle, rx)
}
