#![allow(unused_imports)]

pub use anyhow::{Context, Error, bail, ensure};
pub use tracing::{debug, error, info, instrument, trace, warn};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
