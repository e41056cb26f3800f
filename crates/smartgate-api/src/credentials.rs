//! Generated staff credentials.

use rand_core::{OsRng, RngCore};

const PASSWORD_CHARSET: &[u8] =
  b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789@#$!";

pub const PASSWORD_LEN: usize = 10;

/// A uniformly random index below `bound`, by rejection sampling.
fn random_below(rng: &mut impl RngCore, bound: u32) -> u32 {
  let zone = u32::MAX - (u32::MAX % bound);
  loop {
    let v = rng.next_u32();
    if v < zone {
      return v % bound;
    }
  }
}

/// A random password of [`PASSWORD_LEN`] characters.
pub fn generate_password() -> String {
  let mut rng = OsRng;
  (0..PASSWORD_LEN)
    .map(|_| {
      let i = random_below(&mut rng, PASSWORD_CHARSET.len() as u32) as usize;
      PASSWORD_CHARSET[i] as char
    })
    .collect()
}

/// A login email derived from a display name: `jane.smith042@<domain>`.
///
/// Characters other than ASCII letters, digits and spaces are dropped;
/// runs of whitespace become a single dot.
pub fn generate_email(name: &str, domain: &str) -> String {
  let local: String = name
    .split_whitespace()
    .map(|word| {
      word
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
    })
    .filter(|w| !w.is_empty())
    .collect::<Vec<_>>()
    .join(".");
  let local = if local.is_empty() { "staff".to_string() } else { local };
  let suffix = random_below(&mut OsRng, 1000);
  format!("{local}{suffix:03}@{domain}")
}
