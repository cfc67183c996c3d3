//! Значения полей пира и их проверка перед отправкой в API.

use regex::Regex;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static PEER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("peer name regex"));
static DATA_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(MiB|GiB)$").expect("data limit regex"));
static DNS_IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("dns ip regex"));
static DNS_DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("dns domain regex"));
static CONFIG_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+\.conf$").expect("config file regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid peer name. Use letters, numbers, and underscores only.")]
    PeerName,
    #[error("Invalid data limit. Use format `500MiB` or `1GiB`.")]
    DataLimit,
    #[error("Invalid value. Please enter a positive number.")]
    PositiveNumber,
    #[error("Invalid DNS format. Use valid IP addresses or domain names.")]
    Dns,
    #[error("Invalid configuration file name. Example: wg0.conf")]
    ConfigFile,
    #[error("Invalid expiry. Enter days (e.g. `10`) or days,hours,minutes (e.g. `10,0,0`).")]
    Expiry,
    #[error("Invalid value. Enter 'Blocked' or 'Unblocked'.")]
    BlockStatus,
    #[error("Invalid IP address.")]
    IpAddress,
}

pub fn validate_peer_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if PEER_NAME_RE.is_match(name) {
        Ok(name.to_string())
    } else {
        Err(ValidationError::PeerName)
    }
}

/// Положительное целое число (значение лимита, дни).
pub fn parse_positive(input: &str) -> Result<u32, ValidationError> {
    match input.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ValidationError::PositiveNumber),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataUnit {
    MiB,
    GiB,
}

impl DataUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            DataUnit::MiB => "MiB",
            DataUnit::GiB => "GiB",
        }
    }

    pub fn bytes(self) -> u64 {
        match self {
            DataUnit::MiB => 1024 * 1024,
            DataUnit::GiB => 1024 * 1024 * 1024,
        }
    }
}

impl FromStr for DataUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MiB" => Ok(DataUnit::MiB),
            "GiB" => Ok(DataUnit::GiB),
            _ => Err(ValidationError::DataLimit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLimit {
    pub value: u32,
    pub unit: DataUnit,
}

impl DataLimit {
    pub fn new(value: u32, unit: DataUnit) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::PositiveNumber);
        }
        Ok(Self { value, unit })
    }

    pub fn bytes(&self) -> u64 {
        u64::from(self.value) * self.unit.bytes()
    }
}

impl FromStr for DataLimit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = DATA_LIMIT_RE
            .captures(s.trim())
            .ok_or(ValidationError::DataLimit)?;
        let value = caps[1]
            .parse::<u32>()
            .map_err(|_| ValidationError::DataLimit)?;
        let unit = caps[2].parse::<DataUnit>()?;
        DataLimit::new(value, unit).map_err(|_| ValidationError::DataLimit)
    }
}

impl fmt::Display for DataLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// Список DNS через запятую: IPv4 или доменные имена.
pub fn validate_dns_list(input: &str) -> Result<String, ValidationError> {
    let entries: Vec<&str> = input.split(',').map(str::trim).collect();
    if entries.is_empty()
        || entries
            .iter()
            .any(|entry| !(DNS_IP_RE.is_match(entry) || DNS_DOMAIN_RE.is_match(entry)))
    {
        return Err(ValidationError::Dns);
    }
    Ok(entries.join(","))
}

pub fn validate_config_file(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if CONFIG_FILE_RE.is_match(name) {
        Ok(name.to_string())
    } else {
        Err(ValidationError::ConfigFile)
    }
}

pub fn interface_name(raw: &str) -> &str {
    raw.strip_suffix(".conf").unwrap_or(raw)
}

pub fn config_file(raw: &str) -> String {
    format!("{}.conf", interface_name(raw))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiry {
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl Expiry {
    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }
}

impl FromStr for Expiry {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        match parts.as_slice() {
            [days] => parse_positive(days)
                .map(Expiry::days)
                .map_err(|_| ValidationError::Expiry),
            [days, hours, minutes] => {
                let parse = |v: &str| v.parse::<u32>().map_err(|_| ValidationError::Expiry);
                let expiry = Expiry {
                    months: 0,
                    days: parse(days)?,
                    hours: parse(hours)?,
                    minutes: parse(minutes)?,
                };
                if expiry == Expiry::default() {
                    return Err(ValidationError::Expiry);
                }
                Ok(expiry)
            }
            _ => Err(ValidationError::Expiry),
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days, {} months, {} hours, {} minutes",
            self.days, self.months, self.hours, self.minutes
        )
    }
}

pub fn parse_block_status(input: &str) -> Result<bool, ValidationError> {
    match input.trim().to_lowercase().as_str() {
        "blocked" => Ok(true),
        "unblocked" => Ok(false),
        _ => Err(ValidationError::BlockStatus),
    }
}

pub fn parse_ip(input: &str) -> Result<IpAddr, ValidationError> {
    input
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ValidationError::IpAddress)
}

pub fn bytes_to_human(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value >= KIB * KIB * KIB {
        format!("{:.2} GiB", value / (KIB * KIB * KIB))
    } else if value >= KIB * KIB {
        format!("{:.2} MiB", value / (KIB * KIB))
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_names_allow_word_characters_only() {
        assert_eq!(validate_peer_name("  anna_01 ").unwrap(), "anna_01");
        assert_eq!(validate_peer_name("peer-1"), Err(ValidationError::PeerName));
        assert_eq!(validate_peer_name("two words"), Err(ValidationError::PeerName));
        assert_eq!(validate_peer_name(""), Err(ValidationError::PeerName));
    }

    #[test]
    fn data_limit_requires_binary_unit() {
        let limit: DataLimit = "500MiB".parse().unwrap();
        assert_eq!(limit, DataLimit { value: 500, unit: DataUnit::MiB });
        assert_eq!(limit.to_string(), "500MiB");
        assert_eq!("1GiB".parse::<DataLimit>().unwrap().bytes(), 1024 * 1024 * 1024);

        for bad in ["500", "500MB", "1.5GiB", "0GiB", "GiB", "-1MiB"] {
            assert!(bad.parse::<DataLimit>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn positive_numbers() {
        assert_eq!(parse_positive(" 30 "), Ok(30));
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-3").is_err());
        assert!(parse_positive("ten").is_err());
    }

    #[test]
    fn dns_accepts_ips_and_domains() {
        assert_eq!(validate_dns_list("1.1.1.1").unwrap(), "1.1.1.1");
        assert_eq!(
            validate_dns_list("8.8.8.8, dns.google").unwrap(),
            "8.8.8.8,dns.google"
        );
        assert!(validate_dns_list("").is_err());
        assert!(validate_dns_list("1.1.1").is_err());
        assert!(validate_dns_list("8.8.8.8,,1.1.1.1").is_err());
        assert!(validate_dns_list("localhost").is_err());
    }

    #[test]
    fn config_file_names() {
        assert_eq!(validate_config_file("wg0.conf").unwrap(), "wg0.conf");
        assert!(validate_config_file("wg0").is_err());
        assert!(validate_config_file("../wg0.conf").is_err());
        assert_eq!(interface_name("wg0.conf"), "wg0");
        assert_eq!(interface_name("wg1"), "wg1");
        assert_eq!(config_file("wg0"), "wg0.conf");
        assert_eq!(config_file("wg0.conf"), "wg0.conf");
    }

    #[test]
    fn expiry_accepts_days_or_triplet() {
        assert_eq!("10".parse::<Expiry>().unwrap(), Expiry::days(10));
        assert_eq!(
            "0, 12, 30".parse::<Expiry>().unwrap(),
            Expiry { months: 0, days: 0, hours: 12, minutes: 30 }
        );
        assert!("0".parse::<Expiry>().is_err());
        assert!("0,0,0".parse::<Expiry>().is_err());
        assert!("1,2".parse::<Expiry>().is_err());
        assert!("1,-2,3".parse::<Expiry>().is_err());
    }

    #[test]
    fn block_status_and_ips() {
        assert_eq!(parse_block_status("Blocked"), Ok(true));
        assert_eq!(parse_block_status("UNBLOCKED"), Ok(false));
        assert!(parse_block_status("maybe").is_err());
        assert!(parse_ip("10.0.0.1").is_ok());
        assert!(parse_ip("2001:db8::1").is_ok());
        assert!(parse_ip("10.0.0.256").is_err());
    }

    #[test]
    fn human_readable_sizes() {
        assert_eq!(bytes_to_human(512), "512 bytes");
        assert_eq!(bytes_to_human(2048), "2.00 KiB");
        assert_eq!(bytes_to_human(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(bytes_to_human(3 * 1024 * 1024 * 1024 / 2), "1.50 GiB");
    }
}
