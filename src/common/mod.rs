mod format;
mod fs;
#[cfg(feature = "download")]
mod download;

pub(crate) use format::*;
pub(crate) use fs::*;
#[cfg(feature = "download")]
pub(crate) use download::*;
