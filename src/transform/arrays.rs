//! Array/length parameter pairing

use super::rules::RuleSet;
use crate::error::{Error, Result};
use crate::ir::StructField;

/// Deepest companion pointer a slice parameter can stand for
const MAX_ARRAY_DEPTH: usize = 2;

/// Pairs count parameters with the `HasECount` pointer next to them.
///
/// The count is marked `is_array_len` and renamed after its companion, which is
/// marked `is_array`. The following field is tried first, then the preceding
/// one.
pub(super) fn pair_array_lengths(context: &str, fields: &mut [StructField], rules: &RuleSet) -> Result<()> {
    for i in 0..fields.len() {
        let count = &fields[i];
        if count.is_array_len || count.type_info.is_pointer() || !rules.is_array_length(&count.name) {
            continue;
        }

        let companion = [i + 1, i.wrapping_sub(1)]
            .into_iter()
            .find(|&j| fields.get(j).map_or(false, is_companion));
        let Some(j) = companion else {
            continue;
        };

        let depth = fields[j].type_info.pointer_depth();
        if depth > MAX_ARRAY_DEPTH {
            return Err(Error::invariant(
                context,
                format!("array parameter `{}` has pointer depth {}", fields[j].name, depth),
            ));
        }

        tracing::trace!("{}: {} is the length of {}", context, fields[i].name, fields[j].name);
        fields[j].is_array = true;
        fields[i].is_array_len = true;
        fields[i].name = fields[j].name.clone();
    }
    Ok(())
}

fn is_companion(field: &StructField) -> bool {
    field.has_ecount && field.type_info.is_pointer() && !field.is_array
}
