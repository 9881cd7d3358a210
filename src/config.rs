use std::collections::HashMap;
use std::fs;

use crate::participant::MediaConfig;
use crate::protocol::{Candidate, Codec, DEFAULT_HUB_PORT, MediaType};

/// INI-style configuration: `[section]` headers, `key = value` lines, `#`
/// comments. Keys before the first section are globals.
#[derive(Debug)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Error reading file {path}: {e}"))?;
        Ok(Self::parse(&content))
    }

    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = &line[1..line.len() - 1];
                current_section = Some(name.trim().to_string());
                continue;
            }

            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        globals.insert(key, value);
                    }
                    Some(sec) => {
                        sections.entry(sec.clone()).or_default().insert(key, value);
                    }
                }
            }
        }
        Config { globals, sections }
    }

    pub fn empty() -> Self {
        Self {
            globals: HashMap::new(),
            sections: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// `true/false`, `yes/no`, `on/off` or `1/0`. `None` when absent or unparsable.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get_non_empty(section, key)?.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn get_port(&self, section: &str, key: &str) -> Result<Option<u16>, String> {
        self.get_non_empty(section, key)
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| format!("[{section}] {key}: invalid port '{v}'"))
            })
            .transpose()
    }
}

const MEDIA_NAMES: [(&str, MediaType); 3] = [
    ("audio", MediaType::Audio),
    ("video", MediaType::Video),
    ("application", MediaType::Application),
];

/// Typed view over the `[Signaling]` and `[Media]` sections.
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    pub hub_host: String,
    pub hub_port: u16,
    pub listen_host: String,
    pub listen_port: u16,
    pub display_name: String,
    /// One entry per configured media type; its media id is the type's value.
    pub media: Vec<MediaConfig>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            hub_host: "127.0.0.1".into(),
            hub_port: DEFAULT_HUB_PORT,
            listen_host: "0.0.0.0".into(),
            listen_port: DEFAULT_HUB_PORT,
            display_name: default_display_name(),
            media: Vec::new(),
        }
    }
}

impl SignalingConfig {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let defaults = Self::default();
        let mut media = Vec::new();
        for (name, media_type) in MEDIA_NAMES {
            let codecs = parse_records(config, &format!("{name}_codecs"), Codec::decode)?;
            let candidates =
                parse_records(config, &format!("{name}_candidates"), Candidate::decode)?;
            if codecs.is_empty() && candidates.is_empty() {
                continue;
            }
            media.push(MediaConfig {
                media: media_type.as_u32(),
                codecs,
                candidates,
            });
        }

        Ok(Self {
            hub_host: config
                .get_non_empty_or_default("Signaling", "hub_host", &defaults.hub_host)
                .to_string(),
            hub_port: config
                .get_port("Signaling", "hub_port")?
                .unwrap_or(defaults.hub_port),
            listen_host: config
                .get_non_empty_or_default("Signaling", "listen_host", &defaults.listen_host)
                .to_string(),
            listen_port: config
                .get_port("Signaling", "listen_port")?
                .unwrap_or(defaults.listen_port),
            display_name: config
                .get_non_empty_or_default("Signaling", "display_name", &defaults.display_name)
                .to_string(),
            media,
        })
    }
}

fn default_display_name() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "peer".into())
}

/// `;`-separated wire records from `[Media] key`.
fn parse_records<T, E: std::fmt::Display>(
    config: &Config,
    key: &str,
    decode: impl Fn(&str) -> Result<T, E>,
) -> Result<Vec<T>, String> {
    let Some(raw) = config.get_non_empty("Media", key) else {
        return Ok(Vec::new());
    };
    raw.split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| decode(r).map_err(|e| format!("[Media] {key}: '{r}': {e}")))
        .collect()
}
