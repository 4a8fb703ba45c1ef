// src/main.rs

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use image::RgbaImage;
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use waveform_player::{Options, PlayerEvent, SurfaceRegistry, WaveformPlayer};

/// Terminal rows used for the waveform strip.
const STRIP_ROWS: u16 = 12;
const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Leaves raw mode and shows the cursor again however the loop exits.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), Hide, Clear(ClearType::All))?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show);
        let _ = disable_raw_mode();
    }
}

/// Downsamples the surface into `cols x rows` character cells, shading each
/// cell by its mean luminance.
fn render_ascii(image: &RgbaImage, cols: usize, rows: usize) -> Vec<String> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 || cols == 0 || rows == 0 {
        return Vec::new();
    }
    (0..rows)
        .map(|row| {
            let (y0, y1) = (row * h / rows, ((row + 1) * h / rows).max(row * h / rows + 1));
            (0..cols)
                .map(|col| {
                    let (x0, x1) = (col * w / cols, ((col + 1) * w / cols).max(col * w / cols + 1));
                    let mut sum = 0.0f32;
                    let mut n = 0usize;
                    for y in y0..y1.min(h) {
                        for x in x0..x1.min(w) {
                            let [r, g, b, a] = image.get_pixel(x as u32, y as u32).0;
                            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                            sum += luma * a as f32 / 255.0;
                            n += 1;
                        }
                    }
                    let mean = if n > 0 { sum / n as f32 / 255.0 } else { 0.0 };
                    SHADES[((mean * (SHADES.len() - 1) as f32).round() as usize).min(SHADES.len() - 1)]
                })
                .collect()
        })
        .collect()
}

fn draw(player: &WaveformPlayer, playing: bool) -> io::Result<()> {
    let Some(r) = player.last_result() else {
        return Ok(());
    };
    let o = player.options();
    let cols = terminal::size().map(|(c, _)| c as usize).unwrap_or(80);
    let mut out = io::stdout();

    if let Ok(surface) = player.surface() {
        for (i, line) in render_ascii(surface.image(), cols, STRIP_ROWS as usize).iter().enumerate() {
            queue!(out, MoveTo(0, i as u16))?;
            write!(out, "{line}")?;
        }
    }

    queue!(out, MoveTo(0, STRIP_ROWS), Clear(ClearType::CurrentLine))?;
    write!(
        out,
        "{} t={:>8.2}s begin={:>6}s window={}s gap={:.2}px density={} ch={} [{}{}{}{}{}]",
        if playing { "▶" } else { "⏸" },
        r.current_time,
        r.begin_time,
        r.duration,
        r.grid_gap,
        r.density,
        o.channel,
        if o.grid { 'G' } else { '-' },
        if o.ruler { 'R' } else { '-' },
        if o.wave { 'W' } else { '-' },
        if o.cursor { 'C' } else { '-' },
        if o.progress { 'P' } else { '-' },
    )?;
    queue!(out, MoveTo(0, STRIP_ROWS + 1))?;
    write!(
        out,
        "[SPACE] Play/Pause | [←/→] Seek 1s | [↑/↓] Zoom | [G/R/W/C/P] Layers | [1-6] Channel | [E] Export | [Q] Quit"
    )?;
    out.flush()
}

fn toggle(player: &mut WaveformPlayer, key: &str, current: bool) -> waveform_player::Result<()> {
    player.set_options(&json!({ key: !current }))
}

fn run(player: &mut WaveformPlayer) -> Result<(), anyhow::Error> {
    let frame = Duration::from_millis(50);
    let mut playing = false;
    let mut last_tick = Instant::now();

    loop {
        if event::poll(frame)? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind != KeyEventKind::Press {
                    continue;
                }
                if ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }

                let o = player.options().clone();
                let outcome = match ev.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => break,
                    KeyCode::Char(' ') => {
                        playing = !playing;
                        Ok(())
                    }
                    KeyCode::Left => player.seek(player.current_time() - 1.0),
                    KeyCode::Right => player.seek(player.current_time() + 1.0),
                    KeyCode::Up => player.set_options(&json!({ "duration": (o.duration / 2).max(1) })),
                    KeyCode::Down => player.set_options(&json!({ "duration": (o.duration * 2).min(100) })),
                    KeyCode::Char('g') => toggle(player, "grid", o.grid),
                    KeyCode::Char('r') => toggle(player, "ruler", o.ruler),
                    KeyCode::Char('w') => toggle(player, "wave", o.wave),
                    KeyCode::Char('c') => toggle(player, "cursor", o.cursor),
                    KeyCode::Char('p') => toggle(player, "progress", o.progress),
                    KeyCode::Char(d @ '1'..='6') => player.change_channel(d as usize - '1' as usize),
                    KeyCode::Char('e') => player.flush().and_then(|_| {
                        let path = player.export_image(".")?;
                        log::info!("saved {}", path.display());
                        Ok(())
                    }),
                    _ => Ok(()),
                };
                if let Err(e) = outcome {
                    log::warn!("{e}");
                }
            }
        }

        let now = Instant::now();
        if playing {
            let advanced = player.current_time() + (now - last_tick).as_secs_f64();
            player.set_current_time(advanced)?;
            if player.current_time() >= player.media_duration() {
                playing = false;
            }
        }
        last_tick = now;

        player.tick()?;
        draw(player, playing)?;
    }
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(audio_path) = args.get(1).map(PathBuf::from) else {
        eprintln!("usage: wf_viewer <audio-file> [options.json]");
        return Ok(());
    };
    let options = match args.get(2) {
        Some(path) => Options::load_from_disk(path)?,
        None => Options::default(),
    };

    let registry = SurfaceRegistry::new();
    let mut player = WaveformPlayer::mount(&registry, "terminal", options)?;
    player.on(|event| match event {
        PlayerEvent::Decode { sample_rate, channels, duration } => {
            log::info!("decoded {channels} ch @ {sample_rate} Hz, {duration:.2}s");
        }
        PlayerEvent::Error(message) => log::error!("{message}"),
        _ => {}
    });

    player.load_file(&audio_path)?;
    println!("Decoding {} ...", audio_path.display());
    if !player.finish_loading(Duration::from_secs(60))? {
        anyhow::bail!("could not load {}", audio_path.display());
    }

    let outcome = {
        let _raw = RawMode::enable()?;
        run(&mut player)
    };

    player.destroy();
    println!("\nExiting viewer.");
    outcome
}
