//! C1: compact `DDMMH DDDMMH` port-coordinate encoding.
//!
//! Pure, stateless, never panics. Malformed input of any kind — wrong token
//! count, non-digit characters, bad hemisphere letter, out-of-range degrees
//! or minutes — yields `None` rather than an error; callers that need to
//! surface a failure (C2's per-line load) do so themselves.

/// Parse a `DDMMH DDDMMH` coordinate pair into decimal degrees `(lat, lon)`.
///
/// Interior whitespace is collapsed before tokenization, so inputs with
/// extra spaces between the tokens still parse; leading/trailing whitespace
/// is trimmed.
pub fn parse(text: &str) -> Option<(f64, f64)> {
    let collapsed = collapse_whitespace(text.trim());
    let mut tokens = collapsed.split(' ');
    let lat_tok = tokens.next()?;
    let lon_tok = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    let lat = parse_lat(lat_tok)?;
    let lon = parse_lon(lon_tok)?;

    if lat.abs() > 90.0 || lon.abs() > 180.0 {
        return None;
    }

    Some((lat, lon))
}

/// Re-encode decimal degrees back into the `DDMMH DDDMMH` form, to 0.01°
/// precision (the precision documented for the round-trip property test).
/// Out-of-range input returns `None` rather than producing a malformed token.
pub fn format(lat: f64, lon: f64) -> Option<String> {
    if lat.abs() > 90.0 || lon.abs() > 180.0 {
        return None;
    }
    let lat_tok = format_component(lat, 2, 'N', 'S')?;
    let lon_tok = format_component(lon, 3, 'E', 'W')?;
    Some(format!("{lat_tok} {lon_tok}"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_lat(tok: &str) -> Option<f64> {
    if tok.len() != 5 {
        return None;
    }
    let (deg, min, hemi) = split_token(tok, 2)?;
    if !(0..=90).contains(&deg) || !(0..=59).contains(&min) {
        return None;
    }
    let value = deg as f64 + min as f64 / 60.0;
    apply_hemisphere(value, hemi, 'N', 'S')
}

fn parse_lon(tok: &str) -> Option<f64> {
    if tok.len() != 6 {
        return None;
    }
    let (deg, min, hemi) = split_token(tok, 3)?;
    if !(0..=180).contains(&deg) || !(0..=59).contains(&min) {
        return None;
    }
    let value = deg as f64 + min as f64 / 60.0;
    apply_hemisphere(value, hemi, 'E', 'W')
}

/// Split a token into (degrees, minutes, hemisphere letter), where `deg_width`
/// is 2 for latitude (`DD`) or 3 for longitude (`DDD`); minutes are always `MM`.
fn split_token(tok: &str, deg_width: usize) -> Option<(i32, i32, char)> {
    let bytes = tok.as_bytes();
    if bytes.len() != deg_width + 3 {
        return None;
    }
    let deg_str = &tok[..deg_width];
    let min_str = &tok[deg_width..deg_width + 2];
    let hemi = tok.chars().last()?;

    if !deg_str.bytes().all(|b| b.is_ascii_digit()) || !min_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let deg: i32 = deg_str.parse().ok()?;
    let min: i32 = min_str.parse().ok()?;
    Some((deg, min, hemi))
}

fn apply_hemisphere(value: f64, hemi: char, positive: char, negative: char) -> Option<f64> {
    match hemi.to_ascii_uppercase() {
        h if h == positive => Some(value),
        h if h == negative => Some(-value),
        _ => None,
    }
}

fn format_component(value: f64, deg_width: usize, positive: char, negative: char) -> Option<String> {
    let hemi = if value < 0.0 { negative } else { positive };
    let abs = value.abs();
    let deg = abs.trunc() as i32;
    let min = ((abs - deg as f64) * 60.0).round() as i32;
    let (deg, min) = if min == 60 { (deg + 1, 0) } else { (deg, min) };
    Some(format!("{deg:0>width$}{min:02}{hemi}", width = deg_width))
}
