//! Cadence stress harness
//!
//! Builds a bridge, runs a performance thread against a demo engine core and
//! hammers the bridge from several producer threads: deferred calls, gated
//! calls and every channel kind. Torn audio blocks are counted on both sides
//! and should always be zero.
//!
//! ## Usage
//!
//! ```text
//! cadence-stress [CONFIG.yaml] [--producers N] [--seconds N]
//! ```
//!
//! Without a config path the bridge uses built-in defaults. Missing demo
//! channels are added to whatever the config declares.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use cadence_core::channel::{ChannelSpec, ChannelTable, FrameHeader, SpectralFrame};
use cadence_core::config::{load_config, BridgeConfig};
use cadence_core::engine::{BlockProcessor, Bridge, EngineCore, PerformanceThread, Performer};
use cadence_core::{
    BridgeError, ChannelDirection, ChannelKind, EngineError, EngineResult, Sample, ScoreEventKind,
};

const SAMPLE_RATE: u32 = 48_000;
const DEFAULT_PRODUCERS: usize = 4;
const DEFAULT_SECONDS: u64 = 5;
const TABLE_LEN: usize = 256;

const GAIN: &str = "gain";
const METER: &str = "meter";
const AUDIO_IN: &str = "audio_in";
const AUDIO_OUT: &str = "audio_out";
const STATUS: &str = "status";
const SPECTRUM: &str = "spectrum";

struct Args {
    config_path: Option<PathBuf>,
    producers: usize,
    seconds: u64,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: None,
        producers: DEFAULT_PRODUCERS,
        seconds: DEFAULT_SECONDS,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--producers" => {
                let value = iter.next().context("--producers needs a value")?;
                args.producers = value
                    .parse()
                    .with_context(|| format!("invalid producer count {:?}", value))?;
            }
            "--seconds" => {
                let value = iter.next().context("--seconds needs a value")?;
                args.seconds = value
                    .parse()
                    .with_context(|| format!("invalid duration {:?}", value))?;
            }
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            path => args.config_path = Some(PathBuf::from(path)),
        }
    }

    if args.producers == 0 {
        bail!("need at least one producer thread");
    }
    Ok(args)
}

/// Add the channels the harness drives unless the config already has them
fn with_demo_channels(mut config: BridgeConfig) -> BridgeConfig {
    let demo = [
        ChannelSpec::new(GAIN, ChannelKind::Control, ChannelDirection::Input),
        ChannelSpec::new(METER, ChannelKind::Control, ChannelDirection::Output),
        ChannelSpec::new(AUDIO_IN, ChannelKind::Audio, ChannelDirection::Input),
        ChannelSpec::new(AUDIO_OUT, ChannelKind::Audio, ChannelDirection::Output),
        ChannelSpec::new(STATUS, ChannelKind::String, ChannelDirection::Bidirectional),
        ChannelSpec::new(SPECTRUM, ChannelKind::Spectral, ChannelDirection::Bidirectional),
    ];
    for spec in demo {
        if !config.channels.iter().any(|c| c.name == spec.name) {
            config.channels.push(spec);
        }
    }
    config
}

// ─────────────────────────────────────────────────────────────
// Demo engine
// ─────────────────────────────────────────────────────────────

/// Engine core keeping tables in a map and counting effects
#[derive(Default)]
struct DemoCore {
    tables: Mutex<HashMap<i32, Vec<Sample>>>,
    messages: AtomicU64,
    events: AtomicU64,
    table_ops: AtomicU64,
}

impl DemoCore {
    fn tables(&self) -> std::sync::MutexGuard<'_, HashMap<i32, Vec<Sample>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn effects(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
            + self.events.load(Ordering::Relaxed)
            + self.table_ops.load(Ordering::Relaxed)
    }
}

impl EngineCore for DemoCore {
    fn input_message(&self, message: &str) {
        log::trace!("input_message: {}", message);
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    fn read_score(&self, score: &str) -> EngineResult<()> {
        self.messages.fetch_add(1, Ordering::Relaxed);
        if score.trim().is_empty() {
            return Err(EngineError::Score("empty score".to_string()));
        }
        Ok(())
    }

    fn score_event(&self, _kind: ScoreEventKind, fields: &[Sample]) -> EngineResult<()> {
        self.events.fetch_add(1, Ordering::Relaxed);
        if fields.is_empty() {
            return Err(EngineError::Score("event without p-fields".to_string()));
        }
        Ok(())
    }

    fn score_event_absolute(
        &self,
        kind: ScoreEventKind,
        fields: &[Sample],
        _time_offset: f64,
    ) -> EngineResult<()> {
        self.score_event(kind, fields)
    }

    fn table_copy_out(&self, table: i32, dest: &mut [Sample]) {
        self.table_ops.fetch_add(1, Ordering::Relaxed);
        if let Some(data) = self.tables().get(&table) {
            let n = data.len().min(dest.len());
            dest[..n].copy_from_slice(&data[..n]);
        }
    }

    fn table_copy_in(&self, table: i32, src: &[Sample]) {
        self.table_ops.fetch_add(1, Ordering::Relaxed);
        self.tables().insert(table, src.to_vec());
    }

    fn table_set(&self, table: i32, index: i32, value: Sample) {
        self.table_ops.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables();
        let data = tables.entry(table).or_insert_with(|| vec![0.0; TABLE_LEN]);
        if let Some(slot) = usize::try_from(index).ok().and_then(|i| data.get_mut(i)) {
            *slot = value;
        }
    }
}

/// Writes uniform audio blocks and checks that incoming blocks are uniform
struct DemoProcessor {
    block: Vec<Sample>,
    frame: SpectralFrame,
    torn_inputs: Arc<AtomicU64>,
}

impl DemoProcessor {
    fn new(block_size: usize, torn_inputs: Arc<AtomicU64>) -> Self {
        Self {
            block: vec![0.0; block_size],
            frame: SpectralFrame::new(0),
            torn_inputs,
        }
    }
}

impl BlockProcessor for DemoProcessor {
    fn process_block(&mut self, channels: &ChannelTable, block_size: usize) {
        if let Ok(input) = channels.audio(AUDIO_IN, ChannelDirection::Input) {
            input.read_into(&mut self.block);
            if !is_uniform(&self.block) {
                self.torn_inputs.fetch_add(1, Ordering::Relaxed);
            }
        }

        let gain = channels
            .control(GAIN, ChannelDirection::Input)
            .map(|c| c.get())
            .unwrap_or(1.0);
        if let Ok(meter) = channels.control(METER, ChannelDirection::Output) {
            meter.set(gain * self.block.first().copied().unwrap_or(0.0));
        }

        // Every sample of an outgoing block carries the same value
        let level = self.block.first().copied().unwrap_or(0.0) * gain;
        let n = block_size.min(self.block.len());
        self.block[..n].fill(level);
        if let Ok(output) = channels.audio(AUDIO_OUT, ChannelDirection::Output) {
            output.write_from(&self.block);
        }

        if let Ok(spectrum) = channels.spectral(SPECTRUM, ChannelDirection::Input) {
            spectrum.get_into(&mut self.frame);
        }
    }
}

fn is_uniform(block: &[Sample]) -> bool {
    block.windows(2).all(|w| w[0] == w[1])
}

// ─────────────────────────────────────────────────────────────
// Producers
// ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProducerStats {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    gated: AtomicU64,
    channel_ops: AtomicU64,
    torn_outputs: AtomicU64,
}

fn run_producer(id: usize, bridge: Arc<Bridge>, stop: Arc<AtomicBool>, stats: Arc<ProducerStats>) {
    let block_size = bridge.block_size();
    let table = id as i32 + 1;
    let copy_out = bridge.table_buffer(TABLE_LEN);
    let mut block = vec![0.0; block_size];
    let mut text = String::new();
    let mut frame = SpectralFrame::new(0);
    let mut iteration: u64 = 0;

    while !stop.load(Ordering::Acquire) {
        iteration += 1;
        let value = (id as u64 * 1_000_000 + iteration) as Sample;

        let note = [1.0, 0.0, 0.1, value];
        let result = match iteration % 6 {
            0 => bridge.enqueue_input_message("schedule 1, 0, 0.1"),
            1 => bridge.enqueue_score_event(ScoreEventKind::Instrument, &note),
            2 => bridge.enqueue_score_event_absolute(
                ScoreEventKind::Instrument,
                &note[..3],
                0.5,
            ),
            3 => {
                let index = (iteration % TABLE_LEN as u64) as i32;
                bridge.enqueue_table_set(table, index, value)
            }
            4 => bridge.enqueue_table_copy_out(table, &copy_out),
            _ => bridge.enqueue_read_score("i 1 0 0.1"),
        };
        match result {
            Ok(()) => {
                stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(BridgeError::QueueFull(_)) => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                thread::yield_now();
            }
            Err(e) => log::error!("producer {}: {}", id, e),
        }

        // Gated path, interleaved with the deferred one
        if iteration % 64 == 0 {
            let src = vec![value; TABLE_LEN];
            bridge.table_copy_in(table, &src);
            bridge.table_set(table, 0, value);
            if let Err(e) = bridge.score_event(ScoreEventKind::Quiet, &[1.0]) {
                log::warn!("producer {}: {}", id, e);
            }
            stats.gated.fetch_add(3, Ordering::Relaxed);
        }

        block.fill(value);
        bridge.set_audio_channel(AUDIO_IN, &block);
        bridge.get_audio_channel(AUDIO_OUT, &mut block);
        if !is_uniform(&block) {
            stats.torn_outputs.fetch_add(1, Ordering::Relaxed);
        }

        bridge.set_control_channel(GAIN, 1.0);
        if let Err(e) = bridge.get_control_channel(METER) {
            log::warn!("producer {}: {}", id, e);
        }

        // Vary payload sizes so string and spectral buffers keep growing
        let width = (iteration % 97) as usize;
        text.clear();
        text.push_str(&format!("producer {} iteration {} ", id, iteration));
        text.extend(std::iter::repeat('#').take(width));
        bridge.set_string_channel(STATUS, &text);
        bridge.get_string_channel(STATUS, &mut text);

        let src = SpectralFrame {
            header: FrameHeader {
                n: width * 2,
                frame_count: iteration as u32,
                ..FrameHeader::default()
            },
            frame: vec![value as f32; width * 2 + 2],
        };
        if let Err(e) = bridge
            .set_spectral_channel(SPECTRUM, &src)
            .and_then(|()| bridge.get_spectral_channel(SPECTRUM, &mut frame))
        {
            log::warn!("producer {}: {}", id, e);
        }

        stats.channel_ops.fetch_add(8, Ordering::Relaxed);
    }

    log::debug!("producer {} stopped after {} iterations", id, iteration);
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let config: BridgeConfig = match &args.config_path {
        Some(path) => load_config(path),
        None => BridgeConfig::default(),
    };
    let config = with_demo_channels(config);
    let block_period =
        Duration::from_secs_f64(config.block_size as f64 / f64::from(SAMPLE_RATE));

    log::info!(
        "cadence-stress: {} producers for {}s, block period {:?}",
        args.producers,
        args.seconds,
        block_period
    );

    let core = Arc::new(DemoCore::default());
    let bridge = Arc::new(Bridge::new(config, core.clone())?);
    for info in bridge.channel_list() {
        log::debug!("channel {:?}", info);
    }

    let torn_inputs = Arc::new(AtomicU64::new(0));
    let processor = DemoProcessor::new(bridge.block_size(), Arc::clone(&torn_inputs));
    let performer = Performer::new(Arc::clone(&bridge), Box::new(processor));
    let perf = PerformanceThread::spawn(performer, block_period)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(ProducerStats::default());
    let started = Instant::now();

    let producers = (0..args.producers)
        .map(|id| {
            let bridge = Arc::clone(&bridge);
            let stop = Arc::clone(&stop);
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name(format!("cadence-producer-{}", id))
                .spawn(move || run_producer(id, bridge, stop, stats))
                .context("failed to spawn producer thread")
        })
        .collect::<Result<Vec<_>>>()?;

    thread::sleep(Duration::from_secs(args.seconds));
    stop.store(true, Ordering::Release);
    for producer in producers {
        if producer.join().is_err() {
            log::error!("producer thread panicked");
        }
    }

    // Let the performance thread pick up what is still queued
    let settle = Instant::now();
    while bridge.queue().pending() > 0 && settle.elapsed() < Duration::from_secs(1) {
        thread::sleep(block_period);
    }
    let blocks = perf.blocks();
    drop(perf);
    let elapsed = started.elapsed().as_secs_f64();

    let enqueued = stats.enqueued.load(Ordering::Relaxed);
    let torn_outputs = stats.torn_outputs.load(Ordering::Relaxed);
    let torn_inputs = torn_inputs.load(Ordering::Relaxed);

    log::info!("blocks performed:   {} ({:.0}/s)", blocks, blocks as f64 / elapsed);
    log::info!("deferred enqueued:  {} ({:.0}/s)", enqueued, enqueued as f64 / elapsed);
    log::info!("deferred rejected:  {}", stats.rejected.load(Ordering::Relaxed));
    log::info!("gated calls:        {}", stats.gated.load(Ordering::Relaxed));
    log::info!("engine effects:     {}", core.effects());
    log::info!("channel operations: {}", stats.channel_ops.load(Ordering::Relaxed));
    log::info!("torn audio blocks:  {} in, {} out", torn_inputs, torn_outputs);

    if torn_inputs + torn_outputs > 0 {
        bail!("detected {} torn audio blocks", torn_inputs + torn_outputs);
    }
    Ok(())
}
