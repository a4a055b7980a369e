//! Deterministic pseudo-random helpers.
//!
//! Every synthetic value in the system (keyword variants, synthetic source
//! series, fallback scores) is derived from these two functions so that the
//! same input always produces the same output.

/// 31-multiplier string hash over the lowercased input, wrapped to i32 and
/// returned as its absolute value.
pub fn create_seed(input: &str) -> u64 {
    let text = input.to_lowercase();
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    u64::from(hash.unsigned_abs())
}

/// Uniform-looking value in `[0, 1)` for a seed.
pub fn seeded_random(seed: u64) -> f64 {
    let x = (seed as f64).sin() * 10000.0;
    x - x.floor()
}

/// Uppercase the first character of every word.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_word = false;
    for c in text.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}
