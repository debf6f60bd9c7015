//! Bearer-token registry. Tokens are issued out-of-band (account
//! management lives in a separate system) and stored only as SHA-256
//! hashes.

use base64::Engine;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::db::DatabaseError;

/// Generate a random bearer token (URL-safe base64, 32 bytes of
/// entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a bearer token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Issue a new token for a user and return the plaintext. The
/// plaintext is never stored.
pub fn issue_token(conn: &Connection, user_id: &str) -> Result<String, DatabaseError> {
    let token = generate_token();
    conn.execute(
        "INSERT INTO api_tokens (token_hash, user_id) VALUES (?1, ?2)",
        params![hash_token(&token), user_id],
    )?;
    Ok(token)
}

/// Resolve a presented token to its owning user, if any.
pub fn lookup_user(conn: &Connection, token: &str) -> Result<Option<String>, DatabaseError> {
    conn.query_row(
        "SELECT user_id FROM api_tokens WHERE token_hash = ?1",
        params![hash_token(token)],
        |row| row.get(0),
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Revoke every token a user holds. Returns how many were removed.
pub fn revoke_tokens(conn: &Connection, user_id: &str) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM api_tokens WHERE user_id = ?1",
        params![user_id],
    )?;
    Ok(affected)
}
