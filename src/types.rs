//! Common types used throughout the Zscaler client
//!
//! This module contains shared type definitions, type aliases,
//! and small enums used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Verb Class
// ============================================================================

/// Rate-limit bucket a request method falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerbClass {
    /// GET and HEAD
    Read,
    /// POST, PUT, PATCH and DELETE
    Write,
}

impl VerbClass {
    /// Classify an HTTP method
    pub fn of(method: &reqwest::Method) -> Self {
        if *method == reqwest::Method::GET || *method == reqwest::Method::HEAD {
            Self::Read
        } else {
            Self::Write
        }
    }
}

impl fmt::Display for VerbClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Zscaler Cloud
// ============================================================================

/// Zscaler cloud a tenant lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    #[default]
    Zscaler,
    ZscalerOne,
    ZscalerTwo,
    ZscalerThree,
    ZsCloud,
    ZscalerBeta,
    ZscalerGov,
    ZscalerTen,
    ZsPreview,
}

impl Cloud {
    /// All known clouds
    pub const ALL: [Cloud; 9] = [
        Cloud::Zscaler,
        Cloud::ZscalerOne,
        Cloud::ZscalerTwo,
        Cloud::ZscalerThree,
        Cloud::ZsCloud,
        Cloud::ZscalerBeta,
        Cloud::ZscalerGov,
        Cloud::ZscalerTen,
        Cloud::ZsPreview,
    ];

    /// Cloud name as used in hostnames
    pub fn as_str(&self) -> &'static str {
        match self {
            Cloud::Zscaler => "zscaler",
            Cloud::ZscalerOne => "zscalerone",
            Cloud::ZscalerTwo => "zscalertwo",
            Cloud::ZscalerThree => "zscalerthree",
            Cloud::ZsCloud => "zscloud",
            Cloud::ZscalerBeta => "zscalerbeta",
            Cloud::ZscalerGov => "zscalergov",
            Cloud::ZscalerTen => "zscalerten",
            Cloud::ZsPreview => "zspreview",
        }
    }

    /// API base URL for this cloud
    pub fn base_url(&self) -> String {
        format!("https://zsapi.{}.net", self.as_str())
    }
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cloud {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Cloud::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| crate::Error::invalid_value("cloud", format!("unknown cloud '{s}'")))
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}
