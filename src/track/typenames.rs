//! A process-wide `TypeId -> display name` table.
//!
//! The registry itself only ever compares opaque [`TypeId`]s; names exist
//! purely so the renderer can say `deleted as type "u32"` instead of printing
//! a hash. The first capture of a type computes its name through [`tynm`] and
//! caches it, every later lookup is a pure read. The table deliberately
//! survives registry resets -- names are facts about types, not about any one
//! diagnostic phase.

use std::any::TypeId;
use std::sync::{Mutex, PoisonError};

use hashbrown::HashMap;
use once_cell::sync::Lazy;

static NAMES: Lazy<Mutex<HashMap<TypeId, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Record the display name for `T` if this is the first time we see it, and
/// hand back its identity
pub fn intern<T: 'static>() -> TypeId {
    let id = TypeId::of::<T>();
    let mut names = NAMES.lock().unwrap_or_else(PoisonError::into_inner);
    names.entry(id).or_insert_with(tynm::type_name::<T>);
    id
}

/// The display name recorded for `id`, if any type with that identity has
/// been interned during this run
pub fn resolve(id: TypeId) -> Option<String> {
    let names = NAMES.lock().unwrap_or_else(PoisonError::into_inner);
    names.get(&id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let first = intern::<Vec<u8>>();
        let second = intern::<Vec<u8>>();
        assert_eq!(first, second);
        assert_eq!(resolve(first), resolve(second));
    }

    #[test]
    fn resolve_returns_readable_name() {
        let id = intern::<f64>();
        assert_eq!(resolve(id).as_deref(), Some("f64"));
    }

    #[test]
    fn resolve_of_never_interned_type_is_none() {
        struct NeverInterned;
        assert_eq!(resolve(TypeId::of::<NeverInterned>()), None);
    }
}
