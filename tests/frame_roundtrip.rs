//! End-to-end coverage: a synthetic frame with known values at every
//! documented offset must decode back exactly, and a frame captured from
//! a real device must keep decoding to the same values.

use rectmon_lib::channel::summary_channel;
use rectmon_lib::protocol::{crc16, validate, FrameBuilder, TelemetryFrame, MODULE_COUNT};
use rectmon_lib::telemetry::project;

/// Frame captured from a live rectifier session.
const CAPTURED_FRAME_HEX: &str = "0101000053756e4d6f6220546563682e2e2e0000000000030000f400f201220f00000000000000000000f400f401230f000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000001d00015558110000f401000000000000e603220f00000000000001000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000009dd2";

fn from_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn synthetic_frame_decodes_to_every_expected_field() {
    let mut builder = FrameBuilder::new()
        .header("Rect Station 01")
        .active_bitmap(0x0B)
        .battery(87, 95)
        .control_byte(0b1010_0111)
        .charging_state_count(0x3C)
        .demand(4440, 1250)
        .gun_temperatures(41, 39)
        .charging_readings(998, 3874)
        .charging_time(42, 3)
        .session_reasons([0x01, 0x02], [0x03, 0x04])
        .energy([0xDE, 0xAD, 0xBE, 0xEF]);
    for i in 0..MODULE_COUNT {
        let i_u16 = i as u16;
        builder = builder.module(
            i,
            [0x01 + i as u8, 0x20 + i as u8],
            240 + i_u16,
            490 + i_u16,
            3870 + i_u16,
        );
    }
    let raw = builder.build();

    let check = validate(&raw);
    assert!(check.length_ok);
    assert!(check.checksum_valid);

    let frame = TelemetryFrame::decode(&raw).unwrap();
    assert!(frame.checksum_valid);
    assert!(frame.header_text().starts_with("Rect Station 01"));
    assert_eq!(frame.active_bitmap, 0x0B);
    assert_eq!(frame.active_module_bits(), "1011");
    assert_eq!(frame.reserved_active_bits, [0, 0, 0]);

    for (i, module) in frame.power_modules.iter().enumerate() {
        let i_u16 = i as u16;
        assert_eq!(module.status_flag_1, 0x01 + i as u8);
        assert_eq!(module.status_flag_2, 0x20 + i as u8);
        assert_eq!(module.ambient_temperature_raw, 240 + i_u16);
        assert_eq!(module.current, (490 + i_u16) as f32 / 10.0);
        assert_eq!(module.voltage, (3870 + i_u16) as f32 / 10.0);
        assert_eq!(module.reserved, [0u8; 8]);
    }

    let info = &frame.charging_info;
    assert_eq!(info.battery_soc, 87);
    assert_eq!(info.battery_soh, 95);
    assert_eq!(info.charge_enable_bit, 1);
    assert_eq!(info.reserved_low_bits, 0b011);
    assert_eq!(info.reserved_high_nibble, 0b1010);
    assert_eq!(info.contactor_status, 0x3);
    assert_eq!(info.charging_state, 0xC);
    assert_eq!(info.demand_voltage, 444.0);
    assert_eq!(info.demand_current, 125.0);
    assert_eq!(info.positive_gun_temperature, 41);
    assert_eq!(info.negative_gun_temperature, 39);
    // Crosswise assignment: current from the second reading, voltage
    // from the first.
    assert_eq!(info.charging_current, 387.4);
    assert_eq!(info.charging_voltage, 99.8);
    assert_eq!(info.charging_time_minute, 42);
    assert_eq!(info.charging_time_hour, 3);
    assert_eq!(info.bst_reason, [0x01, 0x02]);
    assert_eq!(info.cst_reason, [0x03, 0x04]);
    assert_eq!(info.energy_data, [0xDE, 0xAD, 0xBE, 0xEF]);

    assert_eq!(frame.padding, [0u8; 86]);
    let expected_crc = crc16(&raw[..254]);
    assert_eq!(frame.checksum_bytes, expected_crc.to_be_bytes());
}

#[test]
fn captured_frame_still_decodes_to_known_values() {
    let raw = from_hex(CAPTURED_FRAME_HEX);
    assert_eq!(raw.len(), 256);

    let frame = TelemetryFrame::decode(&raw).unwrap();
    assert!(frame.checksum_valid);
    assert_eq!(frame.checksum_bytes, [0x9D, 0xD2]);
    assert!(frame.header_text().contains("SunMob Tech"));
    assert_eq!(frame.active_module_bits(), "0011");

    assert_eq!(frame.power_modules[0].ambient_temperature_raw, 244);
    assert_eq!(frame.power_modules[0].current, 49.8);
    assert_eq!(frame.power_modules[0].voltage, 387.4);
    assert_eq!(frame.power_modules[1].current, 50.0);
    assert_eq!(frame.power_modules[1].voltage, 387.5);
    for module in &frame.power_modules[2..] {
        assert_eq!(module.current, 0.0);
        assert_eq!(module.voltage, 0.0);
    }

    let info = &frame.charging_info;
    assert_eq!(info.battery_soc, 29);
    assert_eq!(info.battery_soh, 0);
    assert_eq!(info.charge_enable_bit, 1);
    assert_eq!(info.contactor_status, 5);
    assert_eq!(info.charging_state, 5);
    assert_eq!(info.demand_voltage, 444.0);
    assert_eq!(info.demand_current, 50.0);
    assert_eq!(info.charging_voltage, 99.8);
    assert_eq!(info.charging_current, 387.4);
}

#[test]
fn decode_project_deliver_pipeline() {
    let raw = from_hex(CAPTURED_FRAME_HEX);
    let (tx, rx) = summary_channel(4);

    let handle = std::thread::spawn(move || {
        for _ in 0..10 {
            let frame = TelemetryFrame::decode(&raw).unwrap();
            tx.put(project(&frame));
        }
    });
    handle.join().unwrap();

    let summary = rx.latest().expect("producer queued summaries");
    assert_eq!(summary.state_of_charge, 29.0);
    assert_eq!(summary.state_of_health, Some(0));
    assert_eq!(summary.modules.len(), MODULE_COUNT);
    assert_eq!(summary.modules[0].temperature, 24.4);
    assert_eq!(summary.modules[0].current, 49.8);
    assert_eq!(summary.modules[0].voltage, 387.4);
    assert!(rx.drain_all().is_empty());
}

#[test]
fn corrupted_captured_frame_is_flagged_but_decoded() {
    let mut raw = from_hex(CAPTURED_FRAME_HEX);
    raw[255] ^= 0x01;
    let frame = TelemetryFrame::decode(&raw).unwrap();
    assert!(!frame.checksum_valid);
    assert_eq!(frame.charging_info.battery_soc, 29);
}
