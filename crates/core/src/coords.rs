//! Sexagesimal sky-coordinate parsing and angular unit conversion.
//!
//! These functions never fail. Malformed input produces a non-finite
//! result (`NaN`) which callers must filter before using it in geometry.

/// Parse a right ascension string `h:m:s` into decimal degrees.
///
/// `degrees = (h + m/60 + s/3600) * 15`. No range clamping is applied.
pub fn parse_ra(s: &str) -> f64 {
    let [h, m, s] = sexagesimal_parts(s);
    (h + m / 60.0 + s / 3600.0) * 15.0
}

/// Parse a declination string `[+|-]d:m:s` into signed decimal degrees.
///
/// A leading `-` negates the magnitude; `+` or no sign means positive.
pub fn parse_dec(s: &str) -> f64 {
    let trimmed = s.trim();
    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, trimmed)
    };
    let [d, m, s] = sexagesimal_parts(rest);
    sign * (d + m / 60.0 + s / 3600.0)
}

/// Convert arcminutes to degrees.
pub fn arcmin_to_deg(v: f64) -> f64 {
    v / 60.0
}

/// Split on `:` and coerce the first three tokens to numbers.
///
/// Missing or unparsable tokens become `NaN`. Tokens past the third are
/// ignored.
fn sexagesimal_parts(s: &str) -> [f64; 3] {
    let mut parts = [f64::NAN; 3];
    for (slot, token) in parts.iter_mut().zip(s.split(':')) {
        *slot = coerce_token(token);
    }
    parts
}

/// Numeric coercion of a single token: surrounding whitespace is ignored
/// and an empty token counts as zero.
fn coerce_token(token: &str) -> f64 {
    let t = token.trim();
    if t.is_empty() {
        return 0.0;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
