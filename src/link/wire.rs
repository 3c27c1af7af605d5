//! Wire codec — encodes and decodes a single link frame.
//!
//! Frame layout (all multi-byte integers big-endian):
//!
//! ```text
//! ┌──────────────┬──────────┬──────────────┬──────────────┐
//! │ cmd | len_hi │ len_lo   │ frame_id     │ body … │ CRC │
//! │ 4b  | 4b     │ 1 byte   │ 4 bytes BE   │ 0–4095 │ 2B  │
//! └──────────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! The 12-bit length field counts body bytes only. The CRC-16/MODBUS
//! trailer covers header + body. Each command declares a strict body
//! schema; anything that violates it is rejected with a typed
//! [`FrameError`] — parse failures here are always local and
//! recoverable, never fatal to the session.

use core::fmt;

use crc::{CRC_16_MODBUS, Crc, NoTable};
use serde::{Deserialize, Serialize};

/// Fixed header size: command/length packed bytes plus the frame id.
pub const FRAME_HEADER_SIZE: usize = 6;

/// CRC-16 trailer size.
pub const CHECKSUM_SIZE: usize = 2;

/// Body length ceiling imposed by the 12-bit length field.
pub const MAX_BODY_LEN: usize = 0x0FFF;

/// Largest possible encoded frame (header + max body + trailer).
pub const MAX_FRAME_LEN: usize = FRAME_HEADER_SIZE + MAX_BODY_LEN + CHECKSUM_SIZE;

// Table-free implementation: the per-frame byte counts are tiny and the
// 512-byte lookup table is not worth its flash on the target.
static CRC16: Crc<u16, NoTable> = Crc::<u16, NoTable>::new(&CRC_16_MODBUS);

/// CRC-16 over `bytes` (poly 0xA001 right-shifting, init 0xFFFF).
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Every way a byte buffer can fail to be a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Zero-length input.
    EmptyFrame,
    /// Unrecognised command nibble (0xE is unassigned).
    InvalidErrorCode,
    /// Declared body length violates the command's schema.
    LengthValueOutOfRange,
    /// Input ends before the declared frame does.
    NotEnoughBytes,
    /// A decoded field violates its domain (RSSI range, SSID size, bad JSON).
    ValueOutOfRange,
    /// Structurally valid frame whose trailer does not match — the caller
    /// should request retransmission, not abort.
    InvalidChecksum,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "empty frame"),
            Self::InvalidErrorCode => write!(f, "invalid command nibble"),
            Self::LengthValueOutOfRange => write!(f, "body length out of range"),
            Self::NotEnoughBytes => write!(f, "not enough bytes"),
            Self::ValueOutOfRange => write!(f, "field value out of range"),
            Self::InvalidChecksum => write!(f, "checksum mismatch"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field value types
// ---------------------------------------------------------------------------

/// WiFi network name, at most 32 bytes of UTF-8.
///
/// Invalid byte sequences on the wire are replaced with a placeholder
/// name rather than failing the frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ssid(String);

impl Ssid {
    pub const MAX_LEN: usize = 32;

    /// Wire-visible stand-in for an undecodable name; must stay stable
    /// across nodes.
    pub const REPLACEMENT: &'static str = "INVALID_UTF-8";

    pub fn new(name: &str) -> Result<Self, FrameError> {
        if name.len() > Self::MAX_LEN {
            return Err(FrameError::ValueOutOfRange);
        }
        Ok(Self(name.to_owned()))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Decode a wire name; non-UTF-8 input yields the placeholder.
    /// Callers are responsible for the ≤ 32 byte bound.
    pub fn from_wire(bytes: &[u8]) -> Self {
        match core::str::from_utf8(bytes) {
            Ok(name) => Self(name.to_owned()),
            Err(_) => Self(Self::REPLACEMENT.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// MAC-like access point address, exactly 6 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bssid([u8; 6]);

impl Bssid {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 6 {
            return Err(FrameError::NotEnoughBytes);
        }
        Ok(Self([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ]))
    }

    pub fn as_bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Signal strength in dBm, constrained to `[-127, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rssi(i8);

impl Rssi {
    pub fn new(dbm: i8) -> Result<Self, FrameError> {
        if !(-127..=0).contains(&dbm) {
            return Err(FrameError::ValueOutOfRange);
        }
        Ok(Self(dbm))
    }

    /// Decode the two's-complement wire byte.
    pub fn from_wire(byte: u8) -> Result<Self, FrameError> {
        Self::new(byte as i8)
    }

    pub fn dbm(self) -> i8 {
        self.0
    }

    pub fn to_wire(self) -> u8 {
        self.0 as u8
    }
}

/// Receiver-assigned stable handle for an SSID, monotonically increasing
/// from 1 and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(u32);

impl NetworkId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 4 {
            return Err(FrameError::NotEnoughBytes);
        }
        Ok(Self(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw pan/tilt position. The full u32 range maps linearly onto
/// `[0°, 360°)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub pitch: u32,
    pub yaw: u32,
}

impl Position {
    pub fn new(pitch: u32, yaw: u32) -> Self {
        Self { pitch, yaw }
    }

    pub fn raw_to_deg(raw: u32) -> f64 {
        f64::from(raw) / 4_294_967_296.0 * 360.0
    }

    pub fn pitch_deg(&self) -> f64 {
        Self::raw_to_deg(self.pitch)
    }

    pub fn yaw_deg(&self) -> f64 {
        Self::raw_to_deg(self.yaw)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 8 {
            return Err(FrameError::NotEnoughBytes);
        }
        Ok(Self {
            pitch: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            yaw: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.pitch.to_be_bytes());
        out.extend_from_slice(&self.yaw.to_be_bytes());
    }
}

/// Per-cycle position increment, same raw/degree mapping as [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StepSize {
    pub pitch_step: u32,
    pub yaw_step: u32,
}

impl StepSize {
    pub fn new(pitch_step: u32, yaw_step: u32) -> Self {
        Self {
            pitch_step,
            yaw_step,
        }
    }

    pub fn pitch_deg(&self) -> f64 {
        Position::raw_to_deg(self.pitch_step)
    }

    pub fn yaw_deg(&self) -> f64 {
        Position::raw_to_deg(self.yaw_step)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 8 {
            return Err(FrameError::NotEnoughBytes);
        }
        Ok(Self {
            pitch_step: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            yaw_step: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.pitch_step.to_be_bytes());
        out.extend_from_slice(&self.yaw_step.to_be_bytes());
    }
}

/// One observed access point: network handle plus averaged strength.
/// 5 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub id: NetworkId,
    pub rssi: Rssi,
}

impl Record {
    pub const WIRE_LEN: usize = 5;

    pub fn new(id: NetworkId, rssi: Rssi) -> Self {
        Self { id, rssi }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(FrameError::NotEnoughBytes);
        }
        Ok(Self {
            id: NetworkId::parse(&bytes[0..4])?,
            rssi: Rssi::from_wire(bytes[4])?,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.value().to_be_bytes());
        out.push(self.rssi.to_wire());
    }
}

// ---------------------------------------------------------------------------
// JSON-shaped bodies (pre-agreed schemas)
// ---------------------------------------------------------------------------

fn u8_is_zero(v: &u8) -> bool {
    *v == 0
}

fn u16_is_zero(v: &u16) -> bool {
    *v == 0
}

/// Camera capture metadata carried by a TransmitPicture frame.
///
/// Serialised compactly with absent-when-default fields, so the minimal
/// body stays the two-byte `{}` the camera node has always sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PictureMeta {
    #[serde(default, skip_serializing_if = "u8_is_zero")]
    pub quality: u8,
    #[serde(default, skip_serializing_if = "u8_is_zero")]
    pub frame_size: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jpeg_b64: String,
}

/// Forwarded log lines carried by a TransmitLogs frame, mirroring the
/// camera node's terminal payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    #[serde(default, skip_serializing_if = "u16_is_zero")]
    pub code: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// The fifteen command kinds, as their 4-bit wire nibbles. 0xE is
/// unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    StartOfTransmission = 0x0,
    Reset = 0x1,
    Ready = 0x2,
    RequestPosition = 0x3,
    Ack = 0x4,
    RequestRetransmit = 0x5,
    RequestAck = 0x6,
    AddSsid = 0x7,
    AddBssid = 0x8,
    RecordRssi = 0x9,
    SetPosition = 0xA,
    SetParams = 0xB,
    TransmitPicture = 0xC,
    TransmitLogs = 0xD,
    EndOfTransmission = 0xF,
}

impl CommandKind {
    pub fn from_nibble(nibble: u8) -> Result<Self, FrameError> {
        match nibble {
            0x0 => Ok(Self::StartOfTransmission),
            0x1 => Ok(Self::Reset),
            0x2 => Ok(Self::Ready),
            0x3 => Ok(Self::RequestPosition),
            0x4 => Ok(Self::Ack),
            0x5 => Ok(Self::RequestRetransmit),
            0x6 => Ok(Self::RequestAck),
            0x7 => Ok(Self::AddSsid),
            0x8 => Ok(Self::AddBssid),
            0x9 => Ok(Self::RecordRssi),
            0xA => Ok(Self::SetPosition),
            0xB => Ok(Self::SetParams),
            0xC => Ok(Self::TransmitPicture),
            0xD => Ok(Self::TransmitLogs),
            0xF => Ok(Self::EndOfTransmission),
            _ => Err(FrameError::InvalidErrorCode),
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

/// A command with its body fields — the tagged union a frame carries.
/// Control-only commands have no fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartOfTransmission,
    Reset,
    Ready,
    RequestPosition,
    Ack {
        frame_id: u32,
    },
    RequestRetransmit {
        frame_id_start: u32,
        frame_id_end: u32,
    },
    RequestAck {
        frame_id: u32,
    },
    AddSsid {
        id: NetworkId,
        ssid: Ssid,
    },
    AddBssid {
        id: NetworkId,
        bssid: Bssid,
    },
    RecordRssi {
        position: Position,
        records: Vec<Record>,
    },
    SetPosition {
        position: Position,
    },
    SetParams {
        position: Position,
        step_size: StepSize,
        measurements_per_step: u8,
    },
    TransmitPicture {
        position: Position,
        meta: PictureMeta,
    },
    TransmitLogs {
        logs: LogBatch,
    },
    EndOfTransmission,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::StartOfTransmission => CommandKind::StartOfTransmission,
            Self::Reset => CommandKind::Reset,
            Self::Ready => CommandKind::Ready,
            Self::RequestPosition => CommandKind::RequestPosition,
            Self::Ack { .. } => CommandKind::Ack,
            Self::RequestRetransmit { .. } => CommandKind::RequestRetransmit,
            Self::RequestAck { .. } => CommandKind::RequestAck,
            Self::AddSsid { .. } => CommandKind::AddSsid,
            Self::AddBssid { .. } => CommandKind::AddBssid,
            Self::RecordRssi { .. } => CommandKind::RecordRssi,
            Self::SetPosition { .. } => CommandKind::SetPosition,
            Self::SetParams { .. } => CommandKind::SetParams,
            Self::TransmitPicture { .. } => CommandKind::TransmitPicture,
            Self::TransmitLogs { .. } => CommandKind::TransmitLogs,
            Self::EndOfTransmission => CommandKind::EndOfTransmission,
        }
    }

    /// Body bytes exactly as they go on the wire.
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::StartOfTransmission
            | Self::Reset
            | Self::Ready
            | Self::RequestPosition
            | Self::EndOfTransmission => {}

            Self::Ack { frame_id } | Self::RequestAck { frame_id } => {
                out.extend_from_slice(&frame_id.to_be_bytes());
            }

            Self::RequestRetransmit {
                frame_id_start,
                frame_id_end,
            } => {
                out.extend_from_slice(&frame_id_start.to_be_bytes());
                out.extend_from_slice(&frame_id_end.to_be_bytes());
            }

            Self::AddSsid { id, ssid } => {
                out.extend_from_slice(&id.value().to_be_bytes());
                out.extend_from_slice(ssid.as_bytes());
            }

            Self::AddBssid { id, bssid } => {
                out.extend_from_slice(&id.value().to_be_bytes());
                out.extend_from_slice(&bssid.as_bytes());
            }

            Self::RecordRssi { position, records } => {
                position.write_to(&mut out);
                out.extend_from_slice(&(records.len() as u32).to_be_bytes());
                for record in records {
                    record.write_to(&mut out);
                }
            }

            Self::SetPosition { position } => {
                position.write_to(&mut out);
            }

            Self::SetParams {
                position,
                step_size,
                measurements_per_step,
            } => {
                position.write_to(&mut out);
                step_size.write_to(&mut out);
                out.push(*measurements_per_step);
            }

            Self::TransmitPicture { position, meta } => {
                position.write_to(&mut out);
                // Serialising these plain structs cannot fail.
                out.extend_from_slice(&serde_json::to_vec(meta).unwrap_or_default());
            }

            Self::TransmitLogs { logs } => {
                out.extend_from_slice(&serde_json::to_vec(logs).unwrap_or_default());
            }
        }
        out
    }

    /// Parse a body of exactly `length` bytes against the per-command
    /// schema.
    pub fn parse_body(nibble: u8, length: u16, data: &[u8]) -> Result<Self, FrameError> {
        let kind = CommandKind::from_nibble(nibble)?;
        let length = usize::from(length);

        match kind {
            CommandKind::StartOfTransmission
            | CommandKind::Reset
            | CommandKind::Ready
            | CommandKind::RequestPosition
            | CommandKind::EndOfTransmission => {
                if length != 0 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                Ok(match kind {
                    CommandKind::StartOfTransmission => Self::StartOfTransmission,
                    CommandKind::Reset => Self::Reset,
                    CommandKind::Ready => Self::Ready,
                    CommandKind::RequestPosition => Self::RequestPosition,
                    _ => Self::EndOfTransmission,
                })
            }

            CommandKind::Ack | CommandKind::RequestAck => {
                if length != 4 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let frame_id = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                Ok(if kind == CommandKind::Ack {
                    Self::Ack { frame_id }
                } else {
                    Self::RequestAck { frame_id }
                })
            }

            CommandKind::RequestRetransmit => {
                if length != 8 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                Ok(Self::RequestRetransmit {
                    frame_id_start: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
                    frame_id_end: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
                })
            }

            CommandKind::AddSsid => {
                if !(4..=4 + Ssid::MAX_LEN).contains(&length) {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let id = NetworkId::parse(&data[0..4])?;
                let ssid = if length == 4 {
                    Ssid::empty()
                } else {
                    Ssid::from_wire(&data[4..])
                };
                Ok(Self::AddSsid { id, ssid })
            }

            CommandKind::AddBssid => {
                if length != 10 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                Ok(Self::AddBssid {
                    id: NetworkId::parse(&data[0..4])?,
                    bssid: Bssid::parse(&data[4..10])?,
                })
            }

            CommandKind::RecordRssi => {
                if length < 12 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let position = Position::parse(&data[0..8])?;
                let count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
                // The declared length must agree with the record count.
                if length as u64 != 12 + u64::from(count) * Record::WIRE_LEN as u64 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let mut records = Vec::with_capacity(count as usize);
                for i in 0..count as usize {
                    let start = 12 + i * Record::WIRE_LEN;
                    records.push(Record::parse(&data[start..start + Record::WIRE_LEN])?);
                }
                Ok(Self::RecordRssi { position, records })
            }

            CommandKind::SetPosition => {
                if length != 8 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                Ok(Self::SetPosition {
                    position: Position::parse(&data[0..8])?,
                })
            }

            CommandKind::SetParams => {
                if length != 17 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                Ok(Self::SetParams {
                    position: Position::parse(&data[0..8])?,
                    step_size: StepSize::parse(&data[8..16])?,
                    measurements_per_step: data[16],
                })
            }

            CommandKind::TransmitPicture => {
                if length < 10 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let position = Position::parse(&data[0..8])?;
                let text =
                    core::str::from_utf8(&data[8..]).map_err(|_| FrameError::ValueOutOfRange)?;
                let meta = serde_json::from_str(text).map_err(|_| FrameError::ValueOutOfRange)?;
                Ok(Self::TransmitPicture { position, meta })
            }

            CommandKind::TransmitLogs => {
                if length < 2 {
                    return Err(FrameError::LengthValueOutOfRange);
                }
                let text = core::str::from_utf8(data).map_err(|_| FrameError::ValueOutOfRange)?;
                let logs = serde_json::from_str(text).map_err(|_| FrameError::ValueOutOfRange)?;
                Ok(Self::TransmitLogs { logs })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One complete protocol message: command + frame id + checksum.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub cmd: Command,
    pub frame_id: u32,
    pub checksum: u16,
}

impl Frame {
    /// Build a frame with a freshly computed trailer.
    pub fn from_command(cmd: Command, frame_id: u32) -> Self {
        let body = cmd.body_bytes();
        debug_assert!(body.len() <= MAX_BODY_LEN);
        let mut covered = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
        covered.extend_from_slice(&header_bytes(cmd.kind().nibble(), body.len() as u16, frame_id));
        covered.extend_from_slice(&body);
        Self {
            checksum: checksum(&covered),
            cmd,
            frame_id,
        }
    }

    /// Full wire image: header + body + trailer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.cmd.body_bytes();
        let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + body.len() + CHECKSUM_SIZE);
        out.extend_from_slice(&header_bytes(
            self.cmd.kind().nibble(),
            body.len() as u16,
            self.frame_id,
        ));
        out.extend_from_slice(&body);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out
    }
}

pub fn header_bytes(nibble: u8, length: u16, frame_id: u32) -> [u8; FRAME_HEADER_SIZE] {
    debug_assert!(usize::from(length) <= MAX_BODY_LEN);
    let id = frame_id.to_be_bytes();
    [
        (nibble << 4) | ((length >> 8) as u8 & 0x0F),
        (length & 0xFF) as u8,
        id[0],
        id[1],
        id[2],
        id[3],
    ]
}

/// Split the 6-byte header into `(cmd_nibble, body_length, frame_length,
/// frame_id)` where `frame_length` is the complete on-wire size including
/// trailer.
pub fn parse_header(bytes: &[u8]) -> Result<(u8, u16, usize, u32), FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(FrameError::NotEnoughBytes);
    }

    let nibble = bytes[0] >> 4;
    let length = (u16::from(bytes[0] & 0x0F) << 8) | u16::from(bytes[1]);
    let frame_length = FRAME_HEADER_SIZE + usize::from(length) + CHECKSUM_SIZE;
    let frame_id = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);

    Ok((nibble, length, frame_length, frame_id))
}

/// Parse one frame from the front of `bytes`, returning it together with
/// the number of bytes consumed. Trailing bytes beyond the declared frame
/// are ignored — the transport may deliver more than one frame per read.
pub fn parse_frame(bytes: &[u8]) -> Result<(Frame, usize), FrameError> {
    let (nibble, length, frame_length, frame_id) = parse_header(bytes)?;

    let body_end = FRAME_HEADER_SIZE + usize::from(length);
    if bytes.len() < body_end {
        return Err(FrameError::NotEnoughBytes);
    }

    let cmd = Command::parse_body(nibble, length, &bytes[FRAME_HEADER_SIZE..body_end])?;

    if bytes.len() < frame_length {
        return Err(FrameError::NotEnoughBytes);
    }
    let trailer = u16::from_be_bytes([bytes[body_end], bytes[body_end + 1]]);
    if checksum(&bytes[..body_end]) != trailer {
        return Err(FrameError::InvalidChecksum);
    }

    Ok((
        Frame {
            cmd,
            frame_id,
            checksum: trailer,
        },
        frame_length,
    ))
}
