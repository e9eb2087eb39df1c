// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RFC 6238 time-based one-time passwords (HMAC-SHA1).
//!
//! Authenticator apps commonly ignore the `algorithm` parameter and compute
//! SHA-1.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Digits in a generated code.
pub const DIGITS: u32 = 6;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32 without padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decode base32, ignoring padding, whitespace and case.
pub fn base32_decode(encoded: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for c in encoded.bytes() {
        if c == b'=' || c.is_ascii_whitespace() {
            continue;
        }
        let value = BASE32_ALPHABET
            .iter()
            .position(|a| *a == c.to_ascii_uppercase())? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    Some(out)
}

/// HOTP value for `counter`, zero-padded to [`DIGITS`].
pub fn hotp(secret: &[u8], counter: u64) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    format!(
        "{:0width$}",
        binary % 10u32.pow(DIGITS),
        width = DIGITS as usize
    )
}

/// Constant-time equality for equal-length inputs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// TOTP parameters bound to one shared secret.
#[derive(Clone)]
pub struct Totp {
    secret: Vec<u8>,
    period: u64,
    skew: u64,
}

impl Totp {
    pub fn new(secret: Vec<u8>, period: u64, skew: u64) -> Self {
        Self {
            secret,
            period: period.max(1),
            skew,
        }
    }

    pub fn generate(&self, unix_secs: u64) -> String {
        hotp(&self.secret, unix_secs / self.period)
    }

    /// Accept codes from the current step and up to `skew` steps either side.
    pub fn verify(&self, code: &str, unix_secs: u64) -> bool {
        let code = code.trim();
        if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        let step = unix_secs / self.period;
        let first = step.saturating_sub(self.skew);
        let last = step.saturating_add(self.skew);

        // every candidate is compared so timing does not reveal which step matched
        (first..=last).fold(false, |matched, counter| {
            constant_time_eq(hotp(&self.secret, counter).as_bytes(), code.as_bytes()) | matched
        })
    }
}

/// `otpauth://totp/{issuer}:{label}?secret=..&issuer=..&algorithm=SHA1&digits=6&period=..`
pub fn provisioning_uri(issuer: &str, label: &str, secret_base32: &str, period: u64) -> String {
    let mut uri = match Url::parse("otpauth://totp/") {
        Ok(uri) => uri,
        Err(_) => return String::new(),
    };
    if let Ok(mut segments) = uri.path_segments_mut() {
        segments.clear().push(&format!("{issuer}:{label}"));
    }
    uri.query_pairs_mut()
        .append_pair("secret", secret_base32)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA1")
        .append_pair("digits", &DIGITS.to_string())
        .append_pair("period", &period.to_string());
    uri.to_string()
}
