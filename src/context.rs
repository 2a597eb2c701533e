/*!

The `Context` is a per-run container of type-keyed data plugins. Services such as the random
number streams in [`crate::random`] keep their state in a plugin, so two contexts never share
anything and independent runs can execute side by side.

A data plugin is any `'static` type that knows how to construct itself:

```rust
# use epinet_core::DataPlugin;
struct InfectionCounter {
  total: usize,
}

impl DataPlugin for InfectionCounter {
  const new: &'static dyn Fn() -> Self = &|| InfectionCounter { total: 0 };
}
```

*/

use crate::hashing::HashMap;
use std::any::{Any, TypeId};

/// An object-safe trait for data plugins that can construct their empty state.
pub trait DataPlugin: Any + 'static {
    /// A constant reference to a constructor
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self;
}

impl<T: 'static> DataPlugin for Vec<T> {
    const new: &'static dyn Fn() -> Self = &Vec::<T>::new;
}

pub struct Context {
    // This is actually a `HashMap<TypeId, Box<dyn DataPlugin>>` but must be declared this way to
    // avoid having to implement an `as_any()` method on every plugin.
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            data_plugins: HashMap::default(),
        }
    }

    /// Returns a mutable reference for the data container for `T`, creating it if it doesn't exist yet.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self) -> &mut T {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(<T as DataPlugin>::new()))
            .downcast_mut::<T>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    /// If you need a mutable reference or lazy instantiation, use `Context::get_data_container_mut()`.
    pub fn get_data_container<T: DataPlugin>(&self) -> Option<&T> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tally(u32);
    impl DataPlugin for Tally {
        const new: &'static dyn Fn() -> Self = &|| Tally(0);
    }

    #[test]
    fn containers_are_created_lazily() {
        let mut context = Context::new();
        assert!(context.get_data_container::<Tally>().is_none());

        context.get_data_container_mut::<Tally>().0 += 2;
        context.get_data_container_mut::<Tally>().0 += 3;
        assert_eq!(context.get_data_container::<Tally>().map(|t| t.0), Some(5));
    }

    #[test]
    fn containers_are_keyed_by_type() {
        let mut context = Context::new();
        {
            // If you specify the type of the variable the compiler can infer the generic type.
            let ids: &mut Vec<u32> = context.get_data_container_mut();
            ids.extend([1, 2, 3]);
        }
        {
            let labels: &mut Vec<&str> = context.get_data_container_mut();
            labels.push("household");
        }

        assert_eq!(context.get_data_container::<Vec<u32>>().map(Vec::len), Some(3));
        assert_eq!(context.get_data_container::<Vec<&str>>().map(Vec::len), Some(1));
    }

    #[test]
    fn contexts_do_not_share_state() {
        let mut first = Context::new();
        let second = Context::new();
        first.get_data_container_mut::<Tally>().0 = 7;
        assert!(second.get_data_container::<Tally>().is_none());
    }
}
