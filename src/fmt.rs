//! A thin logging shim over the `log` facade.
//!
//! The driver never installs a logger itself — the embedding application wires up `env_logger`
//! or equivalent. This module exists so call sites read `fmt::debug!(...)` the same way the
//! corpus this crate is grounded on reads `fmt::debug!`/`log::debug!`.

#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::log::trace!($s $(, $x)*)
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::log::debug!($s $(, $x)*)
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::log::info!($s $(, $x)*)
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::log::warn!($s $(, $x)*)
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::log::error!($s $(, $x)*)
    };
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use info;
pub(crate) use trace;
pub(crate) use warn;
