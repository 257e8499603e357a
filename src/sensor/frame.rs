//! Wire codec for glove sensor frames.
//!
//! A frame is a single text packet `<f1,f2,f3,f4,f5,gx,gy,hr>`: five flex
//! readings, two gyro readings and an integer heart rate. Anything else is
//! rejected whole; there is no partial decode.

use serde::Serialize;
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

/// Number of comma-separated fields in a frame.
pub const FIELD_COUNT: usize = 8;

/// Length of the feature vector handed to the classifier.
pub const VECTOR_LEN: usize = 7;

const START: char = '<';
const END: char = '>';

/// Why a frame was dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame is not enclosed in '<' and '>'")]
    MissingDelimiters,

    #[error("expected 8 fields, found {found}")]
    FieldCount { found: usize },

    #[error("field {index} is not a valid number: {value:?}")]
    InvalidNumber { index: usize, value: String },
}

/// One decoded glove sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample {
    /// Flex sensors, thumb to pinky.
    pub flex: [f32; 5],
    pub gyro_x: f32,
    pub gyro_y: f32,
    /// Beats per minute.
    pub heart_rate: i32,
}

impl SensorSample {
    /// The 7-channel vector (flex1..flex5, gyroX, gyroY) used for matching.
    pub fn vector(&self) -> [f32; VECTOR_LEN] {
        let [f1, f2, f3, f4, f5] = self.flex;
        [f1, f2, f3, f4, f5, self.gyro_x, self.gyro_y]
    }
}

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [f1, f2, f3, f4, f5] = self.flex;
        write!(
            f,
            "<{f1},{f2},{f3},{f4},{f5},{:.2},{:.2},{}>",
            self.gyro_x, self.gyro_y, self.heart_rate
        )
    }
}

/// Decode one raw frame.
///
/// Surrounding whitespace is ignored, as is whitespace around each field.
/// `NaN` and `inf` literals are rejected. Numerals too large for their
/// channel saturate to the channel's bounds instead of failing the frame.
pub fn decode(raw: &str) -> Result<SensorSample, FrameError> {
    let body = raw
        .trim()
        .strip_prefix(START)
        .and_then(|s| s.strip_suffix(END))
        .ok_or(FrameError::MissingDelimiters)?;

    let fields: Vec<&str> = body.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(FrameError::FieldCount {
            found: fields.len(),
        });
    }

    let mut channels = [0.0f32; VECTOR_LEN];
    for (index, (slot, field)) in channels.iter_mut().zip(&fields).enumerate() {
        *slot = parse_float(index, field)?;
    }

    let heart_rate = parse_heart_rate(fields[VECTOR_LEN])?;

    let [f1, f2, f3, f4, f5, gyro_x, gyro_y] = channels;
    Ok(SensorSample {
        flex: [f1, f2, f3, f4, f5],
        gyro_x,
        gyro_y,
        heart_rate,
    })
}

fn parse_float(index: usize, field: &str) -> Result<f32, FrameError> {
    match field.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) if value.is_infinite() && !is_infinity_literal(field) => {
            Ok(value.clamp(f32::MIN, f32::MAX))
        }
        _ => Err(invalid(index, field)),
    }
}

fn is_infinity_literal(field: &str) -> bool {
    let unsigned = field.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn parse_heart_rate(field: &str) -> Result<i32, FrameError> {
    match field.parse::<i32>() {
        Ok(bpm) => Ok(bpm),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i32::MAX),
            IntErrorKind::NegOverflow => Ok(i32::MIN),
            _ => Err(invalid(VECTOR_LEN, field)),
        },
    }
}

fn invalid(index: usize, value: &str) -> FrameError {
    FrameError::InvalidNumber {
        index,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_open_hand_frame() {
        let sample = decode("<800,800,800,800,800,0.00,0.00,75>").unwrap();
        assert_eq!(sample.flex, [800.0; 5]);
        assert_eq!(sample.gyro_x, 0.0);
        assert_eq!(sample.gyro_y, 0.0);
        assert_eq!(sample.heart_rate, 75);
    }

    #[test]
    fn decodes_with_surrounding_whitespace_and_newline() {
        let sample = decode("  <300,810,305,300,299,-0.42,0.97,112>\r\n").unwrap();
        assert_eq!(sample.flex, [300.0, 810.0, 305.0, 300.0, 299.0]);
        assert!((sample.gyro_x + 0.42).abs() < 1e-6);
        assert!((sample.gyro_y - 0.97).abs() < 1e-6);
        assert_eq!(sample.heart_rate, 112);
    }

    #[test]
    fn vector_orders_flex_then_gyro() {
        let sample = decode("<1,2,3,4,5,6.5,7.5,60>").unwrap();
        assert_eq!(sample.vector(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.5, 7.5]);
    }

    #[test]
    fn rejects_too_few_fields() {
        assert_eq!(decode("<1,2,3>"), Err(FrameError::FieldCount { found: 3 }));
    }

    #[test]
    fn rejects_too_many_fields() {
        assert_eq!(
            decode("<1,2,3,4,5,6,7,8,9>"),
            Err(FrameError::FieldCount { found: 9 })
        );
    }

    #[test]
    fn rejects_empty_body() {
        assert_eq!(decode("<>"), Err(FrameError::FieldCount { found: 1 }));
    }

    #[test]
    fn rejects_missing_brackets() {
        assert_eq!(
            decode("800,800,800,800,800,0.00,0.00,75"),
            Err(FrameError::MissingDelimiters)
        );
        assert_eq!(
            decode("<800,800,800,800,800,0.00,0.00,75"),
            Err(FrameError::MissingDelimiters)
        );
        assert_eq!(
            decode("800,800,800,800,800,0.00,0.00,75>"),
            Err(FrameError::MissingDelimiters)
        );
        assert_eq!(decode(""), Err(FrameError::MissingDelimiters));
    }

    #[test]
    fn rejects_non_numeric_flex() {
        assert_eq!(
            decode("<800,abc,800,800,800,0.00,0.00,75>"),
            Err(FrameError::InvalidNumber {
                index: 1,
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn rejects_fractional_heart_rate() {
        assert_eq!(
            decode("<800,800,800,800,800,0.00,0.00,75.5>"),
            Err(FrameError::InvalidNumber {
                index: 7,
                value: "75.5".to_string()
            })
        );
    }

    #[test]
    fn rejects_empty_field() {
        assert!(matches!(
            decode("<800,,800,800,800,0.00,0.00,75>"),
            Err(FrameError::InvalidNumber { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(matches!(
            decode("<NaN,800,800,800,800,0.00,0.00,75>"),
            Err(FrameError::InvalidNumber { index: 0, .. })
        ));
        assert!(matches!(
            decode("<800,800,800,800,800,inf,0.00,75>"),
            Err(FrameError::InvalidNumber { index: 5, .. })
        ));
        assert!(matches!(
            decode("<800,800,800,800,800,0.00,-Infinity,75>"),
            Err(FrameError::InvalidNumber { index: 6, .. })
        ));
    }

    #[test]
    fn oversized_numerals_saturate() {
        let sample = decode("<1e39,800,800,800,800,-1e39,0.00,3000000000>").unwrap();
        assert_eq!(sample.flex[0], f32::MAX);
        assert_eq!(sample.gyro_x, f32::MIN);
        assert_eq!(sample.heart_rate, i32::MAX);

        let sample = decode("<800,800,800,800,800,0.00,0.00,-3000000000>").unwrap();
        assert_eq!(sample.heart_rate, i32::MIN);
    }

    #[test]
    fn display_renders_wire_format() {
        let sample = decode("<800,300,800,300,800,0.5,-0.25,90>").unwrap();
        assert_eq!(sample.to_string(), "<800,300,800,300,800,0.50,-0.25,90>");
        assert_eq!(decode(&sample.to_string()).unwrap(), sample);
    }
}
