//! Naming conventions for stages and the members synthesized for them.
//!
//! For a stage named `Foo`:
//!
//! | Member | Name |
//! |---|---|
//! | initialization predicate | `fooInit()` |
//! | init methods | `initFoo(..)`, `initFoo_<Suffix>(..)` |
//! | close method | `closeFoo()` |
//! | close without dependants | `doCloseFoo()` |
//! | close-dependants | `closeFooDependants()` |
//!
//! Guarded wrappers of stage methods append `Guarded` to the method name, and
//! a method hidden by an override during merging is renamed to
//! `_<Declaration>_<method>`.

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character.
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the initialization predicate of a stage.
pub fn predicate_name(stage: &str) -> String {
    format!("{}Init", decapitalize(stage))
}

/// Name shared by all init methods of a stage (before an optional `_Suffix`).
pub fn init_prefix(stage: &str) -> String {
    format!("init{stage}")
}

/// Whether `method` names an init method of `stage`.
pub fn is_init_name(stage: &str, method: &str) -> bool {
    let prefix = init_prefix(stage);
    method == prefix
        || method
            .strip_prefix(&prefix)
            .is_some_and(|rest| rest.starts_with('_'))
}

/// Name of the close method of a stage.
pub fn close_name(stage: &str) -> String {
    format!("close{stage}")
}

/// Name of the close variant that skips dependants.
pub fn do_close_name(stage: &str) -> String {
    format!("doClose{stage}")
}

/// Name of the close-dependants method of a stage or method node.
pub fn close_dependants_name(node: &str) -> String {
    format!("close{node}Dependants")
}

/// Name of the guarded wrapper of a stage method.
pub fn guarded_name(method: &str) -> String {
    format!("{method}Guarded")
}

/// Name of the local holding the predicate value on entry to an init method.
pub fn was_init_local(stage: &str) -> String {
    format!("was{stage}Init")
}

/// Name of a method node: declaring type and method name, both capitalized.
pub fn method_node_name(declaring_type: &str, method: &str) -> String {
    format!("{}{}", capitalize(declaring_type), capitalize(method))
}

/// Name given to an overridden method kept alongside its override.
pub fn overridden_name(declaring_type: &str, method: &str) -> String {
    format!("_{declaring_type}_{method}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalization() {
        assert_eq!(capitalize("foo"), "Foo");
        assert_eq!(capitalize("Foo"), "Foo");
        assert_eq!(capitalize(""), "");
        assert_eq!(decapitalize("Foo"), "foo");
        assert_eq!(decapitalize("FOO"), "fOO");
    }

    #[test]
    fn lifecycle_names() {
        assert_eq!(predicate_name("Foo"), "fooInit");
        assert_eq!(close_name("Foo"), "closeFoo");
        assert_eq!(do_close_name("Foo"), "doCloseFoo");
        assert_eq!(close_dependants_name("Foo"), "closeFooDependants");
        assert_eq!(guarded_name("bar"), "barGuarded");
        assert_eq!(method_node_name("partSub", "run"), "PartSubRun");
        assert_eq!(overridden_name("PartSup", "run"), "_PartSup_run");
    }

    #[test]
    fn init_names_accept_suffixes() {
        assert!(is_init_name("X", "initX"));
        assert!(is_init_name("X", "initX_Suffix"));
        assert!(!is_init_name("X", "initXy"));
        assert!(!is_init_name("X", "initY"));
    }
}
