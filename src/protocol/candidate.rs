use std::fmt;

use super::ProtoError;

/// Component id of the RTP flow.
pub const COMPONENT_RTP: u32 = 1;
/// Component id of the RTCP flow.
pub const COMPONENT_RTCP: u32 = 2;

const FIELD_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NetworkProtocol {
    Udp = 0,
    Tcp = 1,
}

impl NetworkProtocol {
    pub fn from_u32(v: u32) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(Self::Udp),
            1 => Ok(Self::Tcp),
            _ => Err(ProtoError::InvalidNumber("candidate transport protocol")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CandidateType {
    Host = 0,
    ServerReflexive = 1,
    PeerReflexive = 2,
    Relayed = 3,
}

impl CandidateType {
    pub fn from_u32(v: u32) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(Self::Host),
            1 => Ok(Self::ServerReflexive),
            2 => Ok(Self::PeerReflexive),
            3 => Ok(Self::Relayed),
            _ => Err(ProtoError::InvalidNumber("candidate type")),
        }
    }
}

/// A network address a participant offers for connectivity establishment.
///
/// The signaling layer only carries candidates; checking them is the media
/// engine's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub candidate_id: String,
    pub foundation: String,
    pub component_id: u32,
    pub ip: String,
    pub port: u16,
    pub base_ip: String,
    pub base_port: u16,
    pub proto: NetworkProtocol,
    pub priority: u32,
    pub cand_type: CandidateType,
    pub username: String,
    pub password: String,
}

impl Candidate {
    /// Convenience for host candidates (base address == address).
    pub fn host(
        candidate_id: impl Into<String>,
        component_id: u32,
        ip: impl Into<String>,
        port: u16,
    ) -> Self {
        let ip = ip.into();
        Self {
            candidate_id: candidate_id.into(),
            foundation: String::new(),
            component_id,
            base_ip: ip.clone(),
            ip,
            port,
            base_port: port,
            proto: NetworkProtocol::Udp,
            priority: 0,
            cand_type: CandidateType::Host,
            username: String::new(),
            password: String::new(),
        }
    }

    /// `|`-joined, in wire order.
    pub fn encode(&self) -> Result<String, ProtoError> {
        let text_fields = [
            &self.candidate_id,
            &self.foundation,
            &self.ip,
            &self.base_ip,
            &self.username,
            &self.password,
        ];
        if text_fields.iter().any(|f| f.contains('|')) {
            return Err(ProtoError::InvalidFormat("'|' inside a candidate field"));
        }

        Ok([
            self.candidate_id.clone(),
            self.foundation.clone(),
            self.component_id.to_string(),
            self.ip.clone(),
            self.port.to_string(),
            self.base_ip.clone(),
            self.base_port.to_string(),
            (self.proto as u32).to_string(),
            self.priority.to_string(),
            (self.cand_type as u32).to_string(),
            self.username.clone(),
            self.password.clone(),
        ]
        .join("|"))
    }

    pub fn decode(s: &str) -> Result<Self, ProtoError> {
        let fields: Vec<&str> = s.split('|').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ProtoError::InvalidFormat("candidate: expected 12 fields"));
        }

        Ok(Self {
            candidate_id: fields[0].to_owned(),
            foundation: fields[1].to_owned(),
            component_id: parse_num(fields[2], "candidate component id")?,
            ip: fields[3].to_owned(),
            port: parse_num(fields[4], "candidate port")?,
            base_ip: fields[5].to_owned(),
            base_port: parse_num(fields[6], "candidate base port")?,
            proto: NetworkProtocol::from_u32(parse_num(fields[7], "candidate transport protocol")?)?,
            priority: parse_num(fields[8], "candidate priority")?,
            cand_type: CandidateType::from_u32(parse_num(fields[9], "candidate type")?)?,
            username: fields[10].to_owned(),
            password: fields[11].to_owned(),
        })
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, what: &'static str) -> Result<T, ProtoError> {
    s.parse().map_err(|_| ProtoError::InvalidNumber(what))
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} c{} {}:{} {:?} {:?} prio={}",
            self.candidate_id,
            self.component_id,
            self.ip,
            self.port,
            self.proto,
            self.cand_type,
            self.priority
        )
    }
}
