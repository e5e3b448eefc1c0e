use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encoding_rs::{Encoding, UTF_8};
use zvit_core::domain::RawAlert;
use zvit_core::error::AppError;
use zvit_core::normalize::timestamps::parse_mail_date;

/// Header fields of one message or MIME part, unfolded, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn parse(head: &str) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();
        for line in head.lines() {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_string(), value.trim().to_string()));
            }
        }
        Self { fields }
    }

    /// First field named `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Lowercased MIME type; `text/plain` when absent.
    pub fn mime_type(&self) -> String {
        self.get("Content-Type")
            .and_then(|v| v.split(';').next())
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text/plain".to_string())
    }

    pub fn content_type_param(&self, param: &str) -> Option<String> {
        let value = self.get("Content-Type")?;
        value.split(';').skip(1).find_map(|pair| {
            let (name, v) = pair.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case(param)
                .then(|| v.trim().trim_matches('"').to_string())
        })
    }
}

fn split_head_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(b"\n") {
        return (&[], body);
    }
    match raw.windows(2).position(|w| w == b"\n\n") {
        Some(idx) => (&raw[..idx], &raw[idx + 2..]),
        None => (raw, &[]),
    }
}

fn normalize_newlines(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for (i, b) in raw.iter().enumerate() {
        if *b == b'\r' && raw.get(i + 1) == Some(&b'\n') {
            continue;
        }
        out.push(*b);
    }
    out
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |idx| idx + 1);
    &line[..end]
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Quoted-printable to bytes. `header` enables the RFC 2047 `Q` rule that `_` is a space.
pub fn decode_quoted_printable(bytes: &[u8], header: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'=' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'=' if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') => {
                i += 3
            }
            b'=' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_value);
                let lo = bytes.get(i + 2).copied().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'=');
                        i += 1;
                    }
                }
            }
            b'_' if header => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

/// Decode `bytes` in the named charset. Any label known to the WHATWG encoding
/// table is accepted (`windows-1251`, `koi8-r`, `iso-8859-5`, ...); RFC 2231
/// language suffixes (`utf-8*uk`) are ignored.
fn decode_charset(charset: &str, bytes: &[u8]) -> Result<String, AppError> {
    let label = charset.split('*').next().unwrap_or("").trim();
    let encoding = if label.is_empty() {
        UTF_8
    } else {
        Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            AppError::new("MAIL_CHARSET_UNSUPPORTED", "Unsupported character set")
                .with_details(format!("charset={label}"))
        })?
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            AppError::new("MAIL_TEXT_UNDECODABLE", "Text does not match its character set")
                .with_details(format!("charset={}", encoding.name()))
        })
}

/// One `=?charset?enc?text?=` word at the start of `s`, with the number of bytes it spans.
fn parse_encoded_word(s: &str) -> Result<Option<(String, usize)>, AppError> {
    let inner = &s[2..];
    let Some(q1) = inner.find('?') else {
        return Ok(None);
    };
    let charset = &inner[..q1];
    let after = &inner[q1 + 1..];
    let b = after.as_bytes();
    if b.len() < 2 || b[1] != b'?' {
        return Ok(None);
    }
    let text_part = &after[2..];
    let Some(end) = text_part.find("?=") else {
        return Ok(None);
    };
    let text = &text_part[..end];

    let bytes = match b[0].to_ascii_uppercase() {
        b'B' => STANDARD.decode(text).map_err(|e| {
            AppError::new("MAIL_HEADER_UNDECODABLE", "Invalid base64 encoded word")
                .with_details(e.to_string())
        })?,
        b'Q' => decode_quoted_printable(text.as_bytes(), true),
        _ => return Ok(None),
    };
    let consumed = 2 + q1 + 1 + 2 + end + 2;
    Ok(Some((decode_charset(charset, &bytes)?, consumed)))
}

/// Decode RFC 2047 encoded words; whitespace between two adjacent words is dropped.
pub fn decode_encoded_words(value: &str) -> Result<String, AppError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        match parse_encoded_word(candidate)? {
            Some((decoded, consumed)) => {
                if !(after_word && before.trim().is_empty()) {
                    out.push_str(before);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                after_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_transfer(headers: &Headers, body: &[u8]) -> Result<String, AppError> {
    let encoding = headers
        .get("Content-Transfer-Encoding")
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let bytes = match encoding.as_str() {
        "base64" => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD.decode(&compact).map_err(|e| {
                AppError::new("MAIL_BODY_UNDECODABLE", "Invalid base64 message body")
                    .with_details(e.to_string())
            })?
        }
        "quoted-printable" => decode_quoted_printable(body, false),
        _ => body.to_vec(),
    };

    match headers.content_type_param("charset") {
        Some(charset) => decode_charset(&charset, &bytes),
        None => {
            let text = String::from_utf8_lossy(&bytes);
            if let Cow::Owned(_) = text {
                tracing::debug!("body without charset is not UTF-8, invalid bytes replaced");
            }
            Ok(text.into_owned())
        }
    }
}

fn multipart_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let open = format!("--{boundary}");
    let close = format!("--{boundary}--");
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|b| *b == b'\n') {
        let trimmed = trim_line_end(line);
        if trimmed == open.as_bytes() || trimmed == close.as_bytes() {
            if let Some(s) = start {
                let mut part = &body[s..offset];
                while let Some(rest) = part.strip_suffix(b"\n") {
                    part = rest;
                }
                parts.push(part);
            }
            if trimmed == close.as_bytes() {
                return parts;
            }
            start = Some(offset + line.len());
        }
        offset += line.len();
    }
    if let Some(s) = start {
        parts.push(&body[s..]);
    }
    parts
}

/// Header block as text. Raw 8-bit header bytes are taken as UTF-8.
fn header_text(head: &[u8]) -> Headers {
    Headers::parse(&String::from_utf8_lossy(head))
}

/// Text of the first `text/plain` part, searching nested multiparts depth first.
fn plain_text(headers: &Headers, body: &[u8]) -> Result<Option<String>, AppError> {
    let mime = headers.mime_type();
    if mime.starts_with("multipart/") {
        let Some(boundary) = headers.content_type_param("boundary") else {
            return Err(AppError::new(
                "MAIL_BODY_UNDECODABLE",
                "Multipart message without boundary",
            ));
        };
        for part in multipart_parts(body, &boundary) {
            let (head, part_body) = split_head_body(part);
            if let Some(text) = plain_text(&header_text(head), part_body)? {
                return Ok(Some(text));
            }
        }
        return Ok(None);
    }
    if mime == "text/plain" {
        return decode_transfer(headers, body).map(Some);
    }
    Ok(None)
}

/// Parse one RFC 822 message into an alert.
///
/// `Date` and `Subject` are required. A message with no `text/plain` content yields an
/// empty body. Body text is decoded in the charset its `Content-Type` names.
pub fn parse_message(raw: impl AsRef<[u8]>) -> Result<RawAlert, AppError> {
    let normalized = normalize_newlines(raw.as_ref());
    let (head, body) = split_head_body(&normalized);
    let headers = header_text(head);

    let date = headers.get("Date").ok_or_else(|| {
        AppError::new("MAIL_HEADER_MISSING", "Message has no Date header")
    })?;
    let received_at = parse_mail_date(date).ok_or_else(|| {
        AppError::new("MAIL_DATE_INVALID", "Message Date header is not RFC 2822")
            .with_details(format!("date={date}"))
    })?;
    let subject = headers.get("Subject").ok_or_else(|| {
        AppError::new("MAIL_HEADER_MISSING", "Message has no Subject header")
    })?;
    let subject = decode_encoded_words(subject)?;

    let body = match plain_text(&headers, body)? {
        Some(text) => text,
        None => {
            tracing::debug!(subject = %subject, "message has no text/plain part");
            String::new()
        }
    };
    Ok(RawAlert::new(subject, body, received_at))
}
