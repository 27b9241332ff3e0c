//! NMEA RMC sentence parsing.
//!
//! Only the recommended minimum (RMC) sentence is interpreted. Fields are
//! `$--RMC,time,status,lat,N|S,lon,E|W,...[*hh]` with coordinates in `dddmm.mmmm` notation.
use num_traits::Float;

/// A valid position fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GnssError {
    #[error("Not an RMC sentence")]
    NotRmc,
    #[error("Malformed sentence")]
    Malformed,
    #[error("Checksum mismatch")]
    Checksum,
    #[error("No fix (status {0})")]
    NoFix(char),
    #[error("Empty coordinate field")]
    EmptyCoordinate,
    #[error("Zero coordinate")]
    ZeroCoordinate,
    #[error("Coordinate out of range")]
    OutOfRange,
}

/// Verify and strip an optional `*hh` checksum suffix.
fn checked_body(line: &str) -> Result<&str, GnssError> {
    let body = line.strip_prefix('$').ok_or(GnssError::Malformed)?;
    let Some((body, checksum)) = body.split_once('*') else {
        return Ok(body);
    };

    let expected = u8::from_str_radix(checksum.trim(), 16)
        .map_err(|_| GnssError::Malformed)?;
    let actual = body.bytes().fold(0u8, |sum, byte| sum ^ byte);
    if actual != expected {
        return Err(GnssError::Checksum);
    }
    Ok(body)
}

/// Convert `dddmm.mmmm` to signed decimal degrees.
fn coordinate(
    value: &str,
    hemisphere: &str,
    positive: &str,
    negative: &str,
    limit: f64,
) -> Result<f64, GnssError> {
    if value.is_empty() {
        return Err(GnssError::EmptyCoordinate);
    }
    let raw: f64 = value.parse().map_err(|_| GnssError::Malformed)?;
    if raw == 0.0 {
        return Err(GnssError::ZeroCoordinate);
    }
    if !raw.is_finite() || raw < 0.0 {
        return Err(GnssError::Malformed);
    }

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(GnssError::OutOfRange);
    }
    let decimal = degrees + minutes / 60.0;
    if decimal > limit {
        return Err(GnssError::OutOfRange);
    }

    if hemisphere == positive {
        Ok(decimal)
    } else if hemisphere == negative {
        Ok(-decimal)
    } else {
        Err(GnssError::Malformed)
    }
}

/// Parse an RMC sentence into a position fix.
///
/// # Args
/// * `line` - One sentence without line terminator.
///
/// # Returns
/// The fix if the sentence is an RMC sentence with an active fix and valid coordinates.
/// Sentences of any other type yield [GnssError::NotRmc].
pub fn parse_rmc(line: &str) -> Result<Fix, GnssError> {
    let body = checked_body(line.trim())?;
    let mut fields = body.split(',');

    let kind = fields.next().ok_or(GnssError::Malformed)?;
    if kind.len() != 5 || !kind.ends_with("RMC") {
        return Err(GnssError::NotRmc);
    }

    let mut next = || fields.next().ok_or(GnssError::Malformed);
    let _time = next()?;
    let status = next()?;
    let latitude = next()?;
    let north_south = next()?;
    let longitude = next()?;
    let east_west = next()?;

    match status {
        "A" => {}
        "" => return Err(GnssError::Malformed),
        other => {
            return Err(GnssError::NoFix(other.chars().next().unwrap_or('?')))
        }
    }

    Ok(Fix {
        latitude: coordinate(latitude, north_south, "N", "S", 90.0)?,
        longitude: coordinate(longitude, east_west, "E", "W", 180.0)?,
    })
}
