//! Amazon Resource Names and the account environment they are built from

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("Malformed ARN '{value}': {reason}")]
    Malformed { value: String, reason: String },

    #[error("Invalid account id '{0}': expected 12 digits")]
    InvalidAccount(String),

    #[error("Invalid region '{0}'")]
    InvalidRegion(String),
}

fn account_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{12}$").expect("static regex"))
}

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d+$").expect("static regex"))
}

/// Partition, region and account a stack is deployed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub partition: String,
    pub region: String,
    pub account: String,
}

impl Environment {
    pub fn new(partition: &str, region: &str, account: &str) -> Result<Self, ArnError> {
        if !account_pattern().is_match(account) {
            return Err(ArnError::InvalidAccount(account.to_string()));
        }
        if !region_pattern().is_match(region) {
            return Err(ArnError::InvalidRegion(region.to_string()));
        }
        Ok(Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account: account.to_string(),
        })
    }

    /// ARN of a regional resource in this environment.
    pub fn arn(&self, service: &str, resource: &str) -> Arn {
        Arn {
            partition: self.partition.clone(),
            service: service.to_string(),
            region: self.region.clone(),
            account: self.account.clone(),
            resource: resource.to_string(),
        }
    }
}

/// A parsed `arn:partition:service:region:account:resource` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
}

impl Arn {
    pub fn parse(value: &str) -> Result<Self, ArnError> {
        let malformed = |reason: &str| ArnError::Malformed {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = value.splitn(6, ':');
        let prefix = parts.next().unwrap_or_default();
        if prefix != "arn" {
            return Err(malformed("must start with 'arn:'"));
        }

        let partition = parts.next().ok_or_else(|| malformed("missing partition"))?;
        let service = parts.next().ok_or_else(|| malformed("missing service"))?;
        let region = parts.next().ok_or_else(|| malformed("missing region"))?;
        let account = parts.next().ok_or_else(|| malformed("missing account"))?;
        let resource = parts.next().ok_or_else(|| malformed("missing resource"))?;

        if partition.is_empty() {
            return Err(malformed("empty partition"));
        }
        if service.is_empty() {
            return Err(malformed("empty service"));
        }
        if resource.is_empty() {
            return Err(malformed("empty resource"));
        }
        if !account.is_empty() && !account_pattern().is_match(account) {
            return Err(ArnError::InvalidAccount(account.to_string()));
        }
        if !region.is_empty() && !region_pattern().is_match(region) {
            return Err(ArnError::InvalidRegion(region.to_string()));
        }

        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.to_string(),
        })
    }
}

impl FromStr for Arn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Arn::parse(s)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

impl Serialize for Arn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Arn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Arn::parse(&s).map_err(serde::de::Error::custom)
    }
}
