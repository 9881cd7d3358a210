use super::ParticipantId;

/// Protocol constants and header layout.
///
/// Header (network byte order):
///   [magic: u32][src: u32][dest: u32][type: u32][media: u32][length: u32]
/// Body:
///   [payload bytes...], up to `MAX_PAYLOAD_LEN`.
pub const MAGIC: u32 = 0xDEAD_BEEF;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 24;

/// Maximum allowed payload size for a frame (to avoid OOM).
pub const MAX_PAYLOAD_LEN: usize = 1_048_576; // 1 MiB

/// Source id of a peer that has not been assigned an id yet.
pub const ANONYMOUS_ID: ParticipantId = 0;

/// The hub is always participant 1.
pub const HUB_ID: ParticipantId = 1;

/// First id handed out by the hub.
pub const FIRST_ASSIGNED_ID: ParticipantId = 2;

pub const DEFAULT_HUB_PORT: u16 = 9893;
