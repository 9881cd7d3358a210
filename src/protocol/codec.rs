use std::fmt;

use super::ProtoError;

/// The codec id is chosen by the media engine.
pub const CODEC_ID_ANY: i32 = -1;
/// The codec must never be negotiated.
pub const CODEC_ID_DISABLE: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum MediaType {
    Audio = 0,
    Video = 1,
    Application = 2,
}

impl MediaType {
    pub fn from_u32(v: u32) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(Self::Audio),
            1 => Ok(Self::Video),
            2 => Ok(Self::Application),
            _ => Err(ProtoError::InvalidNumber("codec media type")),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// A supported media encoding and its parameters.
///
/// Wire form: `"<id> <name> <media-type> <clock-rate> <channels>|k=v:k=v"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub id: i32,
    pub encoding_name: String,
    pub media_type: MediaType,
    pub clock_rate: u32,
    pub channels: u32,
    pub params: Vec<(String, String)>,
}

impl Codec {
    pub fn new(id: i32, encoding_name: impl Into<String>, media_type: MediaType, clock_rate: u32) -> Self {
        Self {
            id,
            encoding_name: encoding_name.into(),
            media_type,
            clock_rate,
            channels: 0,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_disabled(&self) -> bool {
        self.id == CODEC_ID_DISABLE
    }

    pub fn encode(&self) -> Result<String, ProtoError> {
        if self.encoding_name.is_empty() || self.encoding_name.contains([' ', '|']) {
            return Err(ProtoError::InvalidFormat("codec encoding name"));
        }

        let mut out = format!(
            "{} {} {} {} {}|",
            self.id,
            self.encoding_name,
            self.media_type.as_u32(),
            self.clock_rate,
            self.channels
        );

        for (i, (key, value)) in self.params.iter().enumerate() {
            if key.is_empty() || key.contains(['=', ':', '|']) {
                return Err(ProtoError::InvalidFormat("codec parameter key"));
            }
            // The first '=' splits key from value, so values may hold more.
            if value.contains([':', '|']) {
                return Err(ProtoError::InvalidFormat("codec parameter value"));
            }
            if i > 0 {
                out.push(':');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        Ok(out)
    }

    pub fn decode(s: &str) -> Result<Self, ProtoError> {
        let (head, tail) = s
            .split_once('|')
            .ok_or(ProtoError::InvalidFormat("codec: missing '|'"))?;
        if tail.contains('|') {
            return Err(ProtoError::InvalidFormat("codec: more than one '|'"));
        }

        let fields: Vec<&str> = head.split(' ').collect();
        let [id, name, media_type, clock_rate, channels] = fields.as_slice() else {
            return Err(ProtoError::InvalidFormat("codec: expected 5 header fields"));
        };
        if name.is_empty() {
            return Err(ProtoError::InvalidFormat("codec encoding name"));
        }

        let mut params = Vec::new();
        for entry in tail.split(':').filter(|e| !e.is_empty()) {
            let (k, v) = entry
                .split_once('=')
                .ok_or(ProtoError::InvalidFormat("codec parameter without '='"))?;
            if k.is_empty() {
                return Err(ProtoError::InvalidFormat("codec parameter key"));
            }
            params.push((k.to_owned(), v.to_owned()));
        }

        Ok(Self {
            id: id.parse().map_err(|_| ProtoError::InvalidNumber("codec id"))?,
            encoding_name: (*name).to_owned(),
            media_type: MediaType::from_u32(
                media_type
                    .parse()
                    .map_err(|_| ProtoError::InvalidNumber("codec media type"))?,
            )?,
            clock_rate: clock_rate
                .parse()
                .map_err(|_| ProtoError::InvalidNumber("codec clock rate"))?,
            channels: channels
                .parse()
                .map_err(|_| ProtoError::InvalidNumber("codec channels"))?,
            params,
        })
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} ({:?}",
            self.id, self.encoding_name, self.clock_rate, self.media_type
        )?;
        if self.channels > 0 {
            write!(f, ", {} ch", self.channels)?;
        }
        write!(f, ")")
    }
}
