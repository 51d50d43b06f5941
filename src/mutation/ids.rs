#![forbid(unsafe_code)]

use rand::Rng;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const ID_PREFIX: &str = "demo-";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates `demo-xxxxxxxxx` ids, retrying until `taken` reports a free one.
pub fn fresh_id<R, F>(rng: &mut R, taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        let id = format!("{ID_PREFIX}{suffix}");
        if !taken(&id) {
            return id;
        }
    }
}

/// Current UTC time in RFC 3339 form.
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
