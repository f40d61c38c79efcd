use anyhow::{Context, Result};
use log::{info, warn};
use rand::Rng;
use rectmon_lib::channel::{summary_channel, SummarySender};
use rectmon_lib::protocol::{FrameBuilder, TelemetryFrame, FRAME_LENGTH, MODULE_COUNT};
use rectmon_lib::telemetry::{project, TelemetrySummary};
use std::time::Duration;

/// The control-room panel has six module slots, so the seventh record in
/// each frame is decoded and projected but never shown.
pub const DISPLAY_SLOTS: usize = 6;

/// State owned by the producer loop. Synthesizes drifting readings the
/// way a live rectifier would report them.
struct SimSource {
    soc: u8,
    soh: u8,
    ambient_raw: [u16; MODULE_COUNT],
    current_raw: [u16; MODULE_COUNT],
    voltage_raw: [u16; MODULE_COUNT],
    rng: rand::rngs::ThreadRng,
}

impl SimSource {
    fn new() -> Self {
        Self {
            soc: 29,
            soh: 100,
            ambient_raw: [300; MODULE_COUNT],
            current_raw: [500; MODULE_COUNT],
            voltage_raw: [3874; MODULE_COUNT],
            rng: rand::thread_rng(),
        }
    }

    fn jitter(&mut self, value: u16) -> u16 {
        let delta: i16 = self.rng.gen_range(-3..=3);
        value.saturating_add_signed(delta)
    }

    fn next_frame(&mut self) -> [u8; FRAME_LENGTH] {
        self.soc = if self.soc >= 100 { 0 } else { self.soc + 1 };
        for i in 0..MODULE_COUNT {
            self.ambient_raw[i] = self.jitter(self.ambient_raw[i]);
            self.current_raw[i] = self.jitter(self.current_raw[i]);
            self.voltage_raw[i] = self.jitter(self.voltage_raw[i]);
        }

        let mut builder = FrameBuilder::new()
            .header("SunMob Tech...")
            .active_bitmap(0b0011)
            .battery(self.soc, self.soh)
            .control_byte(0x01)
            .charging_state_count(0x55)
            .demand(4440, 500)
            .charging_readings(self.current_raw[0] * 2, self.voltage_raw[0])
            .charging_time(0, 0);
        for i in 0..MODULE_COUNT {
            builder = builder.module(
                i,
                [0, 0],
                self.ambient_raw[i],
                self.current_raw[i],
                self.voltage_raw[i],
            );
        }
        builder.build()
    }
}

fn producer_loop(tx: SummarySender, interval: Duration) {
    let mut source = SimSource::new();
    loop {
        let raw = source.next_frame();
        match TelemetryFrame::decode(&raw) {
            Ok(frame) => {
                if !frame.checksum_valid {
                    warn!(
                        "Forwarding frame with bad checksum - received={:02X?}",
                        frame.checksum_bytes
                    );
                }
                tx.put(project(&frame));
            }
            Err(e) => warn!("Skipping frame: {e}"),
        }
        std::thread::sleep(interval);
    }
}

fn render(summary: &TelemetrySummary) {
    println!("--- Data at {} ---", chrono::Local::now().to_rfc3339());
    let soh = summary
        .state_of_health
        .map(|v| v.to_string())
        .unwrap_or_else(|| "NA".to_string());
    println!("SOC: {:.2} %  SOH: {}", summary.state_of_charge, soh);
    for (i, module) in summary.modules.iter().take(DISPLAY_SLOTS).enumerate() {
        println!(
            "Power Module {}: Temp: {:.2} C  Current: {:.2} A  Voltage: {:.2} V",
            i + 1,
            module.temperature,
            module.current,
            module.voltage
        );
    }
    println!("--------------------------");
}

pub fn run(interval: Duration, poll: Duration, cycles: Option<u64>) -> Result<()> {
    info!("Starting monitor: interval={interval:?}, poll={poll:?}, cycles={cycles:?}");
    let (tx, rx) = summary_channel(64);

    std::thread::Builder::new()
        .name("frame-producer".into())
        .spawn(move || producer_loop(tx, interval))
        .with_context(|| "Cannot spawn producer thread")?;

    let mut current: Option<TelemetrySummary> = None;
    let mut remaining = cycles;
    loop {
        if let Some(latest) = rx.latest() {
            current = Some(latest);
        }
        if let Some(summary) = &current {
            render(summary);
        }
        if let Some(n) = remaining.as_mut() {
            if *n <= 1 {
                break;
            }
            *n -= 1;
        }
        std::thread::sleep(poll);
    }
    Ok(())
}
