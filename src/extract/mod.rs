//! Extraction of the section, item, and error lists from worldfile dumps.

pub mod classify;
pub mod stream;

#[cfg(test)]
mod test_properties;
