mod backoff;
mod net;

pub(crate) use backoff::*;
pub(crate) use net::*;

#[cfg(test)]
mod backoff_test;
