//! Provenance attributes carried from the source stream onto every output.

use crate::storage::Attributes;
use log::debug;

/// Attributes copied verbatim from source to outputs.
pub const PROPAGATED_ATTRIBUTES: [&str; 2] = ["image_nr_low", "image_nr_high"];

/// Copy the provenance attributes present on `source` onto `target`.
///
/// A missing attribute is skipped, never an error. Returns how many were
/// copied.
pub fn propagate(source: &Attributes, target: &mut Attributes) -> usize {
    let mut copied = 0;
    for name in PROPAGATED_ATTRIBUTES {
        match source.get(name) {
            Some(value) => {
                target.set(name, value);
                copied += 1;
            }
            None => debug!("metadata: source has no `{name}`, skipped"),
        }
    }
    copied
}
