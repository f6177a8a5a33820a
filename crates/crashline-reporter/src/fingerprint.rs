//! Error fingerprinting
//!
//! A fingerprint is the key the aggregation service groups occurrences by.
//! Typed errors are grouped by their type identity; every other error is
//! grouped by a short hash of its message, written as `{xxxxxxxx}`.

use crashline_core::domain::ReportedError;

/// Derives grouping keys for reported errors.
pub struct Fingerprinter;

impl Fingerprinter {
    /// Classify an error into its fingerprint.
    ///
    /// Typed errors return their identity verbatim. Builtin errors return
    /// [`Fingerprinter::classify_message`] of their display text.
    pub fn classify(error: &ReportedError<'_>) -> String {
        match error.type_identity() {
            Some(identity) => identity.into_owned(),
            None => Self::classify_message(&error.as_error().to_string()),
        }
    }

    /// Hash a message into the bracketed 8-hex-digit form.
    ///
    /// The tag is the Adler-32 checksum of the message bytes, zero-padded
    /// lowercase hex.
    pub fn classify_message(message: &str) -> String {
        format!("{{{:08x}}}", adler2::adler32_slice(message.as_bytes()))
    }

    /// Returns true if `fingerprint` has the hashed `{xxxxxxxx}` form.
    pub fn is_hashed(fingerprint: &str) -> bool {
        fingerprint.len() == 10
            && fingerprint.starts_with('{')
            && fingerprint.ends_with('}')
            && fingerprint.as_bytes()[1..9]
                .iter()
                .all(|&b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}
