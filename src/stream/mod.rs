// Byte-stream collaborator seam
// The core consumes streams; it implements only the local-file case.
// Remote transports register an opener for their URI scheme and interpret
// the options bag themselves (credentials, anonymity flags and the like).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::sync::Mutex;

use lazy_static::lazy_static;
use thiserror::Error;

/// Opaque configuration bag passed through to the opener for the
/// locator's scheme; the core never interprets it.
pub type StreamOptions = serde_json::Map<String, serde_json::Value>;

/// A sequential byte source.  Seekability is not required; the core reads
/// in a single forward pass.
pub trait ByteStream: Read + Send {}

impl<T: Read + Send> ByteStream for T {}

pub type OpenerFn = fn(&str, &StreamOptions) -> Result<Box<dyn ByteStream>>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no stream opener registered for scheme {0:?}")]
    UnknownScheme(String),
}

pub type Result<T> = std::result::Result<T, StreamError>;

lazy_static! {
    static ref OPENERS: Mutex<HashMap<String, OpenerFn>> = Mutex::new(HashMap::new());
}

/// Register an opener for a URI scheme (e.g. "s3").
pub fn register_opener(scheme: &str, opener: OpenerFn) {
    OPENERS.lock().unwrap().insert(scheme.to_string(), opener);
}

/// Open a byte stream for the given locator.
///
/// A plain path opens as a local file.  A `scheme://` locator dispatches
/// to the registered opener for that scheme; none registered is an error.
pub fn open(locator: &str, options: &StreamOptions) -> Result<Box<dyn ByteStream>> {
    match locator.split_once("://") {
        Some((scheme, _)) => {
            let opener = OPENERS
                .lock()
                .unwrap()
                .get(scheme)
                .copied()
                .ok_or_else(|| StreamError::UnknownScheme(scheme.to_string()))?;
            opener(locator, options)
        }
        None => Ok(Box::new(File::open(locator)?)),
    }
}
