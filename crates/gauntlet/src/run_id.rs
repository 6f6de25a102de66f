//! Run identifier generation.
//!
//! Every per-file pipeline invocation gets a 26-character Crockford-base-32
//! token in the ULID layout: the first 10 characters encode the millisecond
//! UTC timestamp (most significant bits first), the trailing 16 characters
//! are derived from 16 cryptographically random bytes.
//!
//! The timestamp prefix makes ids sortable by creation time while the random
//! tail keeps ids generated within the same millisecond distinct.
//!
//! # Example
//!
//! ```
//! use gauntlet::run_id;
//!
//! let id = run_id::generate();
//! assert_eq!(id.len(), 26);
//! assert!(run_id::is_valid(&id));
//! ```

use chrono::Utc;
use rand::Rng;

/// Crockford base-32 alphabet (no I, L, O, U).
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Total length of a run id.
pub const RUN_ID_LEN: usize = 26;

/// Number of leading characters that encode the timestamp.
const TIMESTAMP_CHARS: usize = 10;

/// Number of random bytes feeding the trailing characters.
const RANDOM_BYTES: usize = 16;

/// Generates a fresh run id for the current instant.
#[must_use]
pub fn generate() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let entropy: [u8; RANDOM_BYTES] = rand::rng().random();
    encode(millis, &entropy)
}

/// Encodes a run id from an explicit timestamp and entropy.
///
/// Only the low 50 bits of `millis` are representable; real clock values fit
/// in 48 bits until the year 10889.
fn encode(millis: u64, entropy: &[u8; RANDOM_BYTES]) -> String {
    let mut out = String::with_capacity(RUN_ID_LEN);
    for position in 0..TIMESTAMP_CHARS {
        let shift = 5 * (TIMESTAMP_CHARS - 1 - position);
        let index = ((millis >> shift) & 0x1F) as usize;
        out.push(CROCKFORD_ALPHABET[index] as char);
    }
    for byte in entropy {
        out.push(CROCKFORD_ALPHABET[(byte & 0x1F) as usize] as char);
    }
    out
}

/// Returns `true` if `candidate` has the shape of a run id.
#[must_use]
pub fn is_valid(candidate: &str) -> bool {
    candidate.len() == RUN_ID_LEN
        && candidate
            .bytes()
            .all(|byte| CROCKFORD_ALPHABET.contains(&byte))
}

/// Decodes the millisecond UTC timestamp from a run id's prefix.
///
/// Returns `None` if the id is malformed.
#[must_use]
pub fn decode_timestamp_millis(run_id: &str) -> Option<u64> {
    if !is_valid(run_id) {
        return None;
    }
    let mut millis: u64 = 0;
    for byte in run_id.bytes().take(TIMESTAMP_CHARS) {
        let value = CROCKFORD_ALPHABET.iter().position(|c| *c == byte)? as u64;
        millis = (millis << 5) | value;
    }
    Some(millis)
}
