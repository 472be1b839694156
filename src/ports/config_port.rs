//! Configuration access port trait.
//!
//! A missing key is `Ok(None)` so callers can apply their own default; a key
//! that is present but unparsable is a `ConfigInvalid` error.

use crate::domain::error::MacrossError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, MacrossError>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, MacrossError>;
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, MacrossError>;
}
