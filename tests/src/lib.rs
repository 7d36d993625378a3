//! End-to-end tests of the inspection pipeline against a scripted fleet.

pub mod fakes;

#[cfg(test)]
mod inspection;
