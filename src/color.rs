// src/color.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;

/// Straight (non-premultiplied) RGBA color. `a` is in `[0, 1]` like CSS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0.0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)? as f32 / 255.0)),
            _ => None,
        }
    }

    fn parse_functional(body: &str, with_alpha: bool) -> Option<Self> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if with_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }
        let channel = |s: &str| -> Option<u8> {
            let v: f32 = s.parse().ok()?;
            v.is_finite().then(|| v.round().clamp(0.0, 255.0) as u8)
        };
        let alpha = if with_alpha {
            let a: f32 = parts[3].parse().ok()?;
            if !a.is_finite() {
                return None;
            }
            a.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Some(Self::rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
    }
}

impl FromStr for Color {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let parsed = if let Some(hex) = raw.strip_prefix('#') {
            Self::parse_hex(hex)
        } else if let Some(body) = raw.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            Self::parse_functional(body, true)
        } else if let Some(body) = raw.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            Self::parse_functional(body, false)
        } else {
            match raw.as_str() {
                "transparent" => Some(Self::TRANSPARENT),
                "black" => Some(Self::rgb(0, 0, 0)),
                "white" => Some(Self::rgb(255, 255, 255)),
                "red" => Some(Self::rgb(255, 0, 0)),
                "green" => Some(Self::rgb(0, 128, 0)),
                "blue" => Some(Self::rgb(0, 0, 255)),
                _ => None,
            }
        };
        parsed.ok_or_else(|| PlayerError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = PlayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}
