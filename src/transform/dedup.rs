//! Enum constant deduplication

use crate::error::{Error, Result};
use crate::ir::{DeclFile, Value};
use std::collections::HashMap;

/// Keeps the first enum constant for each normalized identifier in the file.
///
/// A later duplicate with the same value is dropped. One with a different value
/// is a [`Error::ConflictingEnumConstant`] unless `allow_conflicts` is set, in
/// which case it is dropped with a warning.
pub(super) fn dedup_enum_fields(file: &mut DeclFile, allow_conflicts: bool) -> Result<()> {
    let mut seen: HashMap<String, Value> = HashMap::new();

    for e in &mut file.enums {
        let mut kept = Vec::with_capacity(e.fields.len());
        for field in e.fields.drain(..) {
            match seen.get(&field.ident) {
                None => {
                    seen.insert(field.ident.clone(), field.value.clone());
                    kept.push(field);
                }
                Some(first) if *first == field.value => {
                    tracing::debug!("dropping duplicate enum constant {}", field.ident);
                }
                Some(first) if allow_conflicts => {
                    tracing::warn!(
                        "dropping enum constant {} = {}, already defined as {}",
                        field.ident,
                        field.value,
                        first
                    );
                }
                Some(first) => {
                    return Err(Error::ConflictingEnumConstant {
                        ident: field.ident,
                        first: first.to_string(),
                        second: field.value.to_string(),
                    });
                }
            }
        }
        e.fields = kept;
    }
    Ok(())
}
