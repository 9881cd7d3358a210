// ---- Basic types ----------------------------------------------------------

/// Logical participant id. 0 = anonymous, 1 = the hub, >= 2 hub-assigned.
pub type ParticipantId = u32;

/// Media stream id a CODEC/CANDIDATE frame belongs to (audio, video, ...).
pub type MediaId = u32;
