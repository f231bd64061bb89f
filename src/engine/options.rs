//! UCI options
//!
//! `UciOption` describes an option the way an engine advertises it in its
//! `option name ... type ...` lines. The bridge keeps the advertised set from
//! the handshake and uses it to clamp what it sends; the stub engine uses the
//! same type to advertise its own options.

use serde::{Deserialize, Serialize};

pub const LIMIT_STRENGTH: &str = "UCI_LimitStrength";
pub const ELO: &str = "UCI_Elo";
pub const SKILL_LEVEL: &str = "Skill Level";
pub const THREADS: &str = "Threads";
pub const HASH: &str = "Hash";
pub const MULTI_PV: &str = "MultiPV";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Spin,
    Check,
    Combo,
    Button,
    String,
}

impl OptionType {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "spin" => Some(OptionType::Spin),
            "check" => Some(OptionType::Check),
            "combo" => Some(OptionType::Combo),
            "button" => Some(OptionType::Button),
            "string" => Some(OptionType::String),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            OptionType::Spin => "spin",
            OptionType::Check => "check",
            OptionType::Combo => "combo",
            OptionType::Button => "button",
            OptionType::String => "string",
        }
    }
}

/// UCI option representation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UciOption {
    pub name: String,
    pub opt_type: OptionType,
    pub default: String,
    pub value: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Allowed values of a combo option
    pub vars: Vec<String>,
}

impl UciOption {
    pub fn spin(name: &str, default: i64, min: i64, max: i64) -> Self {
        UciOption {
            name: name.to_string(),
            opt_type: OptionType::Spin,
            default: default.to_string(),
            value: default.to_string(),
            min: Some(min),
            max: Some(max),
            vars: Vec::new(),
        }
    }

    pub fn check(name: &str, default: bool) -> Self {
        UciOption {
            name: name.to_string(),
            opt_type: OptionType::Check,
            default: default.to_string(),
            value: default.to_string(),
            min: None,
            max: None,
            vars: Vec::new(),
        }
    }

    pub fn button(name: &str) -> Self {
        UciOption {
            name: name.to_string(),
            opt_type: OptionType::Button,
            default: String::new(),
            value: String::new(),
            min: None,
            max: None,
            vars: Vec::new(),
        }
    }

    /// Parse an advertised `option name <n> type <t> [default ..] [min ..] [max ..] [var ..]*` line
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"option") || parts.get(1) != Some(&"name") {
            return None;
        }

        const KEYWORDS: [&str; 5] = ["type", "default", "min", "max", "var"];

        let mut name_parts = Vec::new();
        let mut i = 2;
        while i < parts.len() && parts[i] != "type" {
            name_parts.push(parts[i]);
            i += 1;
        }
        if name_parts.is_empty() || i + 1 >= parts.len() {
            return None;
        }
        let opt_type = OptionType::parse(parts[i + 1])?;
        i += 2;

        let mut option = UciOption {
            name: name_parts.join(" "),
            opt_type,
            default: String::new(),
            value: String::new(),
            min: None,
            max: None,
            vars: Vec::new(),
        };

        while i < parts.len() {
            let key = parts[i];
            let mut j = i + 1;
            while j < parts.len() && !KEYWORDS.contains(&parts[j]) {
                j += 1;
            }
            let value = parts[i + 1..j].join(" ");
            match key {
                "default" => option.default = value,
                "min" => option.min = value.parse().ok(),
                "max" => option.max = value.parse().ok(),
                "var" => option.vars.push(value),
                _ => {}
            }
            i = j;
        }

        if option.default == "<empty>" {
            option.default.clear();
        }
        option.value = option.default.clone();
        Some(option)
    }

    pub fn to_uci_string(&self) -> String {
        let mut s = format!("option name {} type {}", self.name, self.opt_type.as_str());

        match self.opt_type {
            OptionType::Spin => {
                s.push_str(&format!(" default {}", self.default));
                if let Some(min) = self.min {
                    s.push_str(&format!(" min {}", min));
                }
                if let Some(max) = self.max {
                    s.push_str(&format!(" max {}", max));
                }
            }
            OptionType::Check | OptionType::String => {
                s.push_str(&format!(" default {}", self.default));
            }
            OptionType::Combo => {
                s.push_str(&format!(" default {}", self.default));
                for var in &self.vars {
                    s.push_str(&format!(" var {}", var));
                }
            }
            OptionType::Button => {}
        }

        s
    }

    /// Store a new value if it fits the option's type and range
    pub fn set_value(&mut self, value_str: &str) -> bool {
        match self.opt_type {
            OptionType::Spin => match value_str.parse::<i64>() {
                Ok(val) if self.min.map_or(true, |m| val >= m) && self.max.map_or(true, |m| val <= m) => {
                    self.value = val.to_string();
                    true
                }
                _ => false,
            },
            OptionType::Check => {
                self.value = (value_str.to_lowercase() == "true").to_string();
                true
            }
            OptionType::Combo => {
                match self.vars.iter().find(|v| v.eq_ignore_ascii_case(value_str)) {
                    Some(var) => {
                        self.value = var.clone();
                        true
                    }
                    None => false,
                }
            }
            OptionType::String => {
                self.value = value_str.to_string();
                true
            }
            OptionType::Button => false,
        }
    }

    /// Clamp a spin value into the advertised range
    pub fn clamp(&self, value: i64) -> i64 {
        let lo = self.min.unwrap_or(i64::MIN);
        let hi = self.max.unwrap_or(i64::MAX);
        value.clamp(lo, hi.max(lo))
    }

    pub fn get_int(&self) -> i64 {
        self.value.parse().unwrap_or(0)
    }

    pub fn get_bool(&self) -> bool {
        self.value.to_lowercase() == "true"
    }
}

/// `setoption name <name> value <value>`
pub fn setoption(name: &str, value: impl std::fmt::Display) -> String {
    format!("setoption name {} value {}", name, value)
}

/// Playing-strength request. Either field may be left unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strength {
    pub elo: Option<u32>,
    pub skill_level: Option<u8>,
}

impl Strength {
    pub fn full() -> Self {
        Strength::default()
    }

    pub fn elo(elo: u32) -> Self {
        Strength {
            elo: Some(elo),
            skill_level: None,
        }
    }

    pub fn skill(level: u8) -> Self {
        Strength {
            elo: None,
            skill_level: Some(level),
        }
    }
}

/// Engine options a bridge applies before each search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub threads: usize,
    pub hash_mb: usize,
    pub multipv: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            threads: num_cpus::get(),
            hash_mb: 64,
            multipv: 1,
        }
    }
}

/// The advertised options an engine sent during the handshake
#[derive(Clone, Debug, Default)]
pub struct OptionSet {
    options: Vec<UciOption>,
}

impl OptionSet {
    pub fn insert(&mut self, option: UciOption) {
        match self.options.iter_mut().find(|o| o.name.eq_ignore_ascii_case(&option.name)) {
            Some(existing) => *existing = option,
            None => self.options.push(option),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UciOption> {
        self.options.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UciOption> {
        self.options.iter()
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    /// Whether `name` may be sent. With nothing advertised every option is tried.
    pub fn supports(&self, name: &str) -> bool {
        self.is_empty() || self.get(name).is_some()
    }

    fn clamped(&self, name: &str, value: i64) -> i64 {
        self.get(name).map_or(value, |o| o.clamp(value))
    }

    /// `setoption` for a numeric option, clamped, or `None` if it is not offered
    pub fn spin_command(&self, name: &str, value: i64) -> Option<String> {
        if self.supports(name) {
            Some(setoption(name, self.clamped(name, value)))
        } else {
            None
        }
    }

    /// `setoption` commands for a strength request.
    ///
    /// Elo limiting goes through `UCI_LimitStrength`/`UCI_Elo`, skill through
    /// `Skill Level`; an unlimited request switches limiting off again.
    pub fn strength_commands(&self, strength: &Strength) -> Vec<String> {
        let mut commands = Vec::new();

        match strength.elo {
            Some(elo) if self.supports(ELO) => {
                if self.supports(LIMIT_STRENGTH) {
                    commands.push(setoption(LIMIT_STRENGTH, true));
                }
                commands.push(setoption(ELO, self.clamped(ELO, elo as i64)));
            }
            Some(_) => {}
            None => {
                if self.get(LIMIT_STRENGTH).is_some() {
                    commands.push(setoption(LIMIT_STRENGTH, false));
                }
            }
        }

        if let Some(level) = strength.skill_level {
            commands.extend(self.spin_command(SKILL_LEVEL, level as i64));
        }

        commands
    }

    /// `setoption` commands for threads, hash and MultiPV
    pub fn settings_commands(&self, settings: &EngineSettings) -> Vec<String> {
        let mut commands = Vec::new();
        commands.extend(self.spin_command(THREADS, settings.threads.max(1) as i64));
        commands.extend(self.spin_command(HASH, settings.hash_mb.max(1) as i64));
        if settings.multipv > 1 {
            commands.extend(self.spin_command(MULTI_PV, settings.multipv as i64));
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_advertised_options() {
        let skill = UciOption::parse("option name Skill Level type spin default 20 min 0 max 20").unwrap();
        assert_eq!(skill.name, "Skill Level");
        assert_eq!(skill.opt_type, OptionType::Spin);
        assert_eq!((skill.min, skill.max), (Some(0), Some(20)));
        assert_eq!(skill.get_int(), 20);

        let combo = UciOption::parse("option name Style type combo default Normal var Solid var Normal var Risky").unwrap();
        assert_eq!(combo.vars, vec!["Solid", "Normal", "Risky"]);

        let path = UciOption::parse("option name SyzygyPath type string default <empty>").unwrap();
        assert_eq!(path.default, "");

        assert!(UciOption::parse("option name Broken type").is_none());
        assert!(UciOption::parse("info depth 3").is_none());
    }

    #[test]
    fn advertise_and_reparse() {
        let threads = UciOption::spin("Threads", 4, 1, 256);
        assert_eq!(threads.to_uci_string(), "option name Threads type spin default 4 min 1 max 256");
        assert_eq!(UciOption::parse(&threads.to_uci_string()).unwrap(), threads);
    }

    #[test]
    fn set_value_respects_range() {
        let mut hash = UciOption::spin("Hash", 16, 1, 1024);
        assert!(hash.set_value("128"));
        assert!(!hash.set_value("4096"));
        assert_eq!(hash.get_int(), 128);

        let mut ponder = UciOption::check("Ponder", false);
        assert!(ponder.set_value("TRUE"));
        assert!(ponder.get_bool());
        assert!(!UciOption::button("Clear Hash").set_value("x"));
    }

    #[test]
    fn strength_commands_clamp_to_advertised_range() {
        let mut set = OptionSet::default();
        set.insert(UciOption::check(LIMIT_STRENGTH, false));
        set.insert(UciOption::spin(ELO, 1350, 1350, 2850));
        set.insert(UciOption::spin(SKILL_LEVEL, 20, 0, 20));

        assert_eq!(
            set.strength_commands(&Strength::elo(900)),
            vec![
                "setoption name UCI_LimitStrength value true".to_string(),
                "setoption name UCI_Elo value 1350".to_string(),
            ]
        );
        assert_eq!(
            set.strength_commands(&Strength::skill(25)),
            vec![
                "setoption name UCI_LimitStrength value false".to_string(),
                "setoption name Skill Level value 20".to_string(),
            ]
        );
    }

    #[test]
    fn unadvertised_options_are_skipped() {
        let mut set = OptionSet::default();
        set.insert(UciOption::spin(THREADS, 1, 1, 8));
        let settings = EngineSettings {
            threads: 32,
            hash_mb: 64,
            multipv: 1,
        };
        assert_eq!(set.settings_commands(&settings), vec!["setoption name Threads value 8".to_string()]);
        assert!(set.strength_commands(&Strength::elo(2000)).is_empty());

        let empty = OptionSet::default();
        assert_eq!(empty.settings_commands(&settings).len(), 2);
    }
}
