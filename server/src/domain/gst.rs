//! GST arithmetic comes from the shared `gst` crate; this module adds the
//! error codes its validation errors carry over the API.

pub use ::gst::*;

use crate::frame::ErrorCode;

impl ErrorCode for GstError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeAmount(_) => "E_NEGATIVE_AMOUNT",
            Self::AmountTooLarge(_) => "E_AMOUNT_TOO_LARGE",
            Self::InvalidRate(_) => "E_INVALID_RATE",
        }
    }
}
