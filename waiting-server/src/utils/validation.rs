//! Input validation helpers
//!
//! Centralized limits and validation functions for waiting registration.
//! Limits follow the product rules:
//! - party size 1-6 people per waiting
//! - contact name 2-20 chars, alphanumeric or Hangul only
//! - contact email: basic shape check, full verification happens upstream

use crate::waiting::WaitingError;

// ── Registration limits ─────────────────────────────────────────────

/// Minimum party size per waiting
pub const MIN_PARTY_SIZE: u32 = 1;

/// Maximum party size per waiting
pub const MAX_PARTY_SIZE: u32 = 6;

/// Contact name length bounds (chars, not bytes — Hangul counts as one)
pub const MIN_CONTACT_NAME_LEN: usize = 2;
pub const MAX_CONTACT_NAME_LEN: usize = 20;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate party size at construction time.
pub fn validate_party_size(party_size: u32) -> Result<(), WaitingError> {
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&party_size) {
        return Err(WaitingError::InvalidPartySize(party_size));
    }
    Ok(())
}

/// Validate a contact name: 2-20 chars, each alphanumeric ASCII or Hangul.
pub fn validate_contact_name(name: &str) -> Result<(), WaitingError> {
    let len = name.chars().count();
    if !(MIN_CONTACT_NAME_LEN..=MAX_CONTACT_NAME_LEN).contains(&len) {
        return Err(WaitingError::InvalidContactName(name.to_string()));
    }
    if !name.chars().all(is_name_char) {
        return Err(WaitingError::InvalidContactName(name.to_string()));
    }
    Ok(())
}

/// Validate the rough shape of an email address (local@domain, one '@').
pub fn validate_contact_email(email: &str) -> Result<(), WaitingError> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return Err(WaitingError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// 姓名合法字符：ASCII 字母数字或韩文音节 (U+AC00..=U+D7A3)
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}
