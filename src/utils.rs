//! Utility functions for file naming and path resolution

use rand::Rng;
use std::path::{Path, PathBuf};

/// Length of the random token used as an on-disk file name.
///
/// 11 characters from a 64 symbol alphabet give 66 bits of randomness.
pub const TOKEN_LEN: usize = 11;

const TOKEN_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Generate a URL and filesystem safe random token
///
/// # Examples
///
/// ```
/// use form_ingest::utils::random_token;
///
/// let token = random_token(11);
/// assert_eq!(token.len(), 11);
/// assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
/// ```
pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Resolve the directory disk mode writes into
///
/// Falls back to the platform temp directory when no directory is given.
pub fn scratch_dir(output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::temp_dir(),
    }
}

/// Path of a fresh randomly named file inside `dir`.
///
/// The client supplied filename never takes part in the on-disk name.
pub fn random_file_path(dir: &Path) -> PathBuf {
    dir.join(random_token(TOKEN_LEN))
}

/// Reduce a client supplied filename to its last path component
///
/// Both `/` and `\` count as separators, so `C:\docs\cv.pdf` and
/// `../../etc/passwd` become `cv.pdf` and `passwd`.
pub fn client_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).to_string()
}
