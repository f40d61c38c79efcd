use crate::Error;

#[cfg(feature = "serde")]
use serde::Serialize;

/// One telemetry transfer unit is always exactly this many bytes.
pub const FRAME_LENGTH: usize = 256;
/// Offset of the two trailing checksum bytes; the checksum covers
/// everything before this point.
pub const CHECKSUM_OFFSET: usize = 254;
/// Number of power-module records carried in every frame.
pub const MODULE_COUNT: usize = 7;

const HEADER_LENGTH: usize = 20;
const ACTIVE_RESERVED_OFFSET: usize = 20;
const ACTIVE_BITMAP_OFFSET: usize = 23;
const MODULE_BASE_OFFSET: usize = 24;
const MODULE_STRIDE: usize = 16;
const PADDING_OFFSET: usize = 168;
const PADDING_LENGTH: usize = CHECKSUM_OFFSET - PADDING_OFFSET;

/// CRC-16/MODBUS over an arbitrary byte sequence: reflected polynomial
/// 0xA001, initial value 0xFFFF, no final XOR.
pub fn crc16(data: &[u8]) -> u16 {
    let mut acc: u16 = 0xFFFF;
    for byte in data {
        acc ^= *byte as u16;
        for _ in 0..8 {
            if acc & 0x0001 != 0 {
                acc = (acc >> 1) ^ 0xA001;
            } else {
                acc >>= 1;
            }
        }
    }
    acc
}

/// The two checksum bytes as they appear on the wire: the little-endian
/// bytes of the checksum, order-reversed. The receiver reads them back
/// big-endian.
pub fn checksum_trailer(checksum: u16) -> [u8; 2] {
    let le = checksum.to_le_bytes();
    [le[1], le[0]]
}

fn u16_le(raw: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([raw[offset], raw[offset + 1]])
}

fn u32_le(raw: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        raw[offset],
        raw[offset + 1],
        raw[offset + 2],
        raw[offset + 3],
    ])
}

/// Integrity verdict for a raw buffer. A checksum mismatch is recorded
/// here but does not stop field extraction; only a wrong length does.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FrameCheck {
    pub length_ok: bool,
    pub checksum_valid: bool,
    pub computed_checksum: u16,
    pub received_checksum: u16,
}

pub fn validate(raw: &[u8]) -> FrameCheck {
    if raw.len() != FRAME_LENGTH {
        log::warn!(
            "Invalid frame length - required={} received={}",
            FRAME_LENGTH,
            raw.len()
        );
        return FrameCheck {
            length_ok: false,
            checksum_valid: false,
            computed_checksum: 0,
            received_checksum: 0,
        };
    }
    let trailer = checksum_trailer(crc16(&raw[..CHECKSUM_OFFSET]));
    let computed = u16::from_be_bytes(trailer);
    let received = u16::from_be_bytes([raw[CHECKSUM_OFFSET], raw[CHECKSUM_OFFSET + 1]]);
    if received != computed {
        log::warn!("Checksum mismatch - calculated={computed:04X} received={received:04X}");
    }
    FrameCheck {
        length_ok: true,
        checksum_valid: received == computed,
        computed_checksum: computed,
        received_checksum: received,
    }
}

/// One of the seven 16-byte power-module records.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PowerModule {
    pub status_flag_1: u8,
    pub status_flag_2: u8,
    /// Raw sensor count; the summary layer divides this by 10.
    pub ambient_temperature_raw: u16,
    /// Amperes.
    pub current: f32,
    /// Volts.
    pub voltage: f32,
    pub reserved: [u8; 8],
}

impl PowerModule {
    fn decode(record: &[u8]) -> Self {
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&record[8..16]);
        Self {
            status_flag_1: record[0],
            status_flag_2: record[1],
            ambient_temperature_raw: u16_le(record, 2),
            current: u16_le(record, 4) as f32 / 10.0,
            voltage: u16_le(record, 6) as f32 / 10.0,
            reserved,
        }
    }
}

/// Battery and session state, bytes [136,168) of the frame.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ChargingInfo {
    pub battery_soc: u8,
    pub battery_soh: u8,
    /// Bit 0 of byte 138.
    pub charge_enable_bit: u8,
    /// Bits 1-3 of byte 138.
    pub reserved_low_bits: u8,
    /// Bits 4-7 of byte 138.
    pub reserved_high_nibble: u8,
    /// High nibble of byte 139.
    pub contactor_status: u8,
    /// Low nibble of byte 139.
    pub charging_state: u8,
    /// Volts.
    pub demand_voltage: f32,
    /// Amperes.
    pub demand_current: f32,
    pub positive_gun_temperature: u8,
    pub negative_gun_temperature: u8,
    pub reserved_2: [u8; 2],
    /// Amperes. Populated from bytes [154,156) while `charging_voltage`
    /// comes from [152,154) - the device firmware fills these two
    /// crosswise relative to the datasheet labels. Kept as shipped;
    /// suspected naming slip upstream.
    pub charging_current: f32,
    /// Volts, from bytes [152,154). See `charging_current`.
    pub charging_voltage: f32,
    pub charging_time_minute: u8,
    pub charging_time_hour: u8,
    pub reserved_3: [u8; 2],
    pub bst_reason: [u8; 2],
    pub cst_reason: [u8; 2],
    pub energy_data: [u8; 4],
}

impl ChargingInfo {
    fn decode(raw: &[u8]) -> Self {
        let reserved_1 = raw[138];
        let charging_state_count = raw[139];
        let mut reserved_2 = [0u8; 2];
        reserved_2.copy_from_slice(&raw[150..152]);
        let mut reserved_3 = [0u8; 2];
        reserved_3.copy_from_slice(&raw[158..160]);
        let mut bst_reason = [0u8; 2];
        bst_reason.copy_from_slice(&raw[160..162]);
        let mut cst_reason = [0u8; 2];
        cst_reason.copy_from_slice(&raw[162..164]);
        let mut energy_data = [0u8; 4];
        energy_data.copy_from_slice(&raw[164..168]);
        Self {
            battery_soc: raw[136],
            battery_soh: raw[137],
            charge_enable_bit: reserved_1 & 0x01,
            reserved_low_bits: (reserved_1 >> 1) & 0x07,
            reserved_high_nibble: (reserved_1 >> 4) & 0x0F,
            contactor_status: (charging_state_count >> 4) & 0x0F,
            charging_state: charging_state_count & 0x0F,
            demand_voltage: u32_le(raw, 140) as f32 / 10.0,
            demand_current: u32_le(raw, 144) as f32 / 10.0,
            positive_gun_temperature: raw[148],
            negative_gun_temperature: raw[149],
            reserved_2,
            charging_current: u16_le(raw, 154) as f32 / 10.0,
            charging_voltage: u16_le(raw, 152) as f32 / 10.0,
            charging_time_minute: raw[156],
            charging_time_hour: raw[157],
            reserved_3,
            bst_reason,
            cst_reason,
            energy_data,
        }
    }

    /// Contactor status rendered as a 4-bit binary string.
    pub fn contactor_status_bits(&self) -> String {
        format!("{:04b}", self.contactor_status)
    }
}

/// Structured view over one 256-byte frame.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TelemetryFrame {
    pub header: [u8; HEADER_LENGTH],
    pub reserved_active_bits: [u8; 3],
    pub active_bitmap: u8,
    pub power_modules: [PowerModule; MODULE_COUNT],
    pub charging_info: ChargingInfo,
    #[cfg_attr(feature = "serde", serde(skip_serializing))]
    pub padding: [u8; PADDING_LENGTH],
    pub checksum_bytes: [u8; 2],
    /// Computed by the validator, not carried in the buffer. A mismatch
    /// does not abort decoding; strict callers must check this flag.
    pub checksum_valid: bool,
}

impl TelemetryFrame {
    /// Decodes a raw buffer. Fails only on a wrong buffer length; a
    /// checksum mismatch is recorded in `checksum_valid` and extraction
    /// proceeds so a noisy link still yields best-effort telemetry.
    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        let check = validate(raw);
        if !check.length_ok {
            return Err(Error::FrameLength {
                required: FRAME_LENGTH,
                received: raw.len(),
            });
        }

        let mut header = [0u8; HEADER_LENGTH];
        header.copy_from_slice(&raw[..HEADER_LENGTH]);
        let mut reserved_active_bits = [0u8; 3];
        reserved_active_bits.copy_from_slice(&raw[ACTIVE_RESERVED_OFFSET..ACTIVE_BITMAP_OFFSET]);
        let mut padding = [0u8; PADDING_LENGTH];
        padding.copy_from_slice(&raw[PADDING_OFFSET..CHECKSUM_OFFSET]);

        let power_modules = std::array::from_fn(|i| {
            let start = MODULE_BASE_OFFSET + i * MODULE_STRIDE;
            PowerModule::decode(&raw[start..start + MODULE_STRIDE])
        });

        Ok(Self {
            header,
            reserved_active_bits,
            active_bitmap: raw[ACTIVE_BITMAP_OFFSET],
            power_modules,
            charging_info: ChargingInfo::decode(raw),
            padding,
            checksum_bytes: [raw[CHECKSUM_OFFSET], raw[CHECKSUM_OFFSET + 1]],
            checksum_valid: check.checksum_valid,
        })
    }

    /// Header rendered as text. Non-ASCII bytes are dropped rather than
    /// rejected; the header is identification text, not a checked field.
    pub fn header_text(&self) -> String {
        self.header
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| b as char)
            .collect()
    }

    /// Low nibble of the active bitmap as a 4-character binary string,
    /// one bit per module group.
    pub fn active_module_bits(&self) -> String {
        format!("{:04b}", self.active_bitmap & 0x0F)
    }
}

/// Assembles a wire-exact frame, checksum trailer included. The device
/// only ever emits frames, but simulators and test fixtures need to
/// construct them.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    buf: [u8; FRAME_LENGTH],
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buf: [0; FRAME_LENGTH],
        }
    }

    pub fn header(mut self, text: &str) -> Self {
        for (dst, src) in self.buf[..HEADER_LENGTH].iter_mut().zip(text.bytes()) {
            *dst = src;
        }
        self
    }

    pub fn active_bitmap(mut self, bits: u8) -> Self {
        self.buf[ACTIVE_BITMAP_OFFSET] = bits;
        self
    }

    pub fn module(
        mut self,
        index: usize,
        status_flags: [u8; 2],
        ambient_raw: u16,
        current_raw: u16,
        voltage_raw: u16,
    ) -> Self {
        assert!(index < MODULE_COUNT, "module index out of range");
        let start = MODULE_BASE_OFFSET + index * MODULE_STRIDE;
        self.buf[start] = status_flags[0];
        self.buf[start + 1] = status_flags[1];
        self.buf[start + 2..start + 4].copy_from_slice(&ambient_raw.to_le_bytes());
        self.buf[start + 4..start + 6].copy_from_slice(&current_raw.to_le_bytes());
        self.buf[start + 6..start + 8].copy_from_slice(&voltage_raw.to_le_bytes());
        self
    }

    pub fn battery(mut self, soc: u8, soh: u8) -> Self {
        self.buf[136] = soc;
        self.buf[137] = soh;
        self
    }

    /// Byte 138: charge-enable bit and the reserved bit fields around it.
    pub fn control_byte(mut self, reserved_1: u8) -> Self {
        self.buf[138] = reserved_1;
        self
    }

    /// Byte 139: contactor status in the high nibble, charging state in
    /// the low nibble.
    pub fn charging_state_count(mut self, byte: u8) -> Self {
        self.buf[139] = byte;
        self
    }

    pub fn demand(mut self, voltage_raw: u32, current_raw: u32) -> Self {
        self.buf[140..144].copy_from_slice(&voltage_raw.to_le_bytes());
        self.buf[144..148].copy_from_slice(&current_raw.to_le_bytes());
        self
    }

    pub fn gun_temperatures(mut self, positive: u8, negative: u8) -> Self {
        self.buf[148] = positive;
        self.buf[149] = negative;
        self
    }

    /// The two scaled readings at [152,154) and [154,156), in byte order.
    /// Note the decoder maps the second to `charging_current` and the
    /// first to `charging_voltage`.
    pub fn charging_readings(mut self, first_raw: u16, second_raw: u16) -> Self {
        self.buf[152..154].copy_from_slice(&first_raw.to_le_bytes());
        self.buf[154..156].copy_from_slice(&second_raw.to_le_bytes());
        self
    }

    pub fn charging_time(mut self, minute: u8, hour: u8) -> Self {
        self.buf[156] = minute;
        self.buf[157] = hour;
        self
    }

    pub fn session_reasons(mut self, bst: [u8; 2], cst: [u8; 2]) -> Self {
        self.buf[160..162].copy_from_slice(&bst);
        self.buf[162..164].copy_from_slice(&cst);
        self
    }

    pub fn energy(mut self, data: [u8; 4]) -> Self {
        self.buf[164..168].copy_from_slice(&data);
        self
    }

    /// Finishes the frame with a correct checksum trailer.
    pub fn build(mut self) -> [u8; FRAME_LENGTH] {
        let trailer = checksum_trailer(crc16(&self.buf[..CHECKSUM_OFFSET]));
        self.buf[CHECKSUM_OFFSET..].copy_from_slice(&trailer);
        self.buf
    }

    /// Finishes the frame without touching the trailer bytes, for
    /// exercising the checksum-mismatch path.
    pub fn build_unchecked(self) -> [u8; FRAME_LENGTH] {
        self.buf
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
