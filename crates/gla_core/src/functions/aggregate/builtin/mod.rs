pub mod gather;
pub mod max;

use super::definition::AggregateDefinition;

/// All builtin aggregate definitions.
pub static BUILTIN_AGGREGATES: &[&dyn AggregateDefinition] = &[&gather::Gather, &max::Max];

/// Find a builtin definition by name or alias, ignoring case.
pub fn find_aggregate(name: &str) -> Option<&'static dyn AggregateDefinition> {
    BUILTIN_AGGREGATES.iter().copied().find(|def| {
        def.name().eq_ignore_ascii_case(name)
            || def.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}
