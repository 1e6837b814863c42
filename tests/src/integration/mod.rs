//! Cross-component flows through a fully wired `VerifierService`.

pub mod fixtures;

#[cfg(test)]
mod lifecycle;
#[cfg(test)]
mod pipeline;
