//! Root enumeration (spec.md §4.3).
//!
//! The host registers an ordered set of closures — one per root-owning
//! subsystem (UI, thinkers, per-level state, …, in spec.md's LZDoom-derived
//! example). `Collector::mark_roots` runs every one of them at the
//! Pause → Propagate transition. Ordering among hooks is unspecified by the
//! spec ("any topological order is valid"); registration order is used
//! here only because it is the simplest order to reason about, not because
//! later steps depend on it.

use crate::trace::Tracer;

type RootHook = Box<dyn FnMut(&Tracer)>;

/// Ordered collection of host-provided root-marking callbacks.
#[derive(Default)]
pub struct RootRegistry {
    hooks: Vec<(&'static str, RootHook)>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root hook under a diagnostic name (shown in logs; not
    /// otherwise significant). Mirrors spec.md §4.3's fixed list of
    /// subsystems (UI, intermissions, thinkers, …) without committing to
    /// any of their concrete types, which are out of scope here.
    pub fn register(&mut self, name: &'static str, hook: impl FnMut(&Tracer) + 'static) {
        self.hooks.push((name, Box::new(hook)));
    }

    pub fn remove(&mut self, name: &str) {
        self.hooks.retain(|(n, _)| *n != name);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke every registered hook, in registration order.
    ///
    /// `Missing root` (spec.md §7): a live object unreachable from every
    /// hook here is silently collected. Prevention is entirely the host's
    /// responsibility — this registry cannot detect the omission.
    pub(crate) fn mark_all(&mut self, tracer: &Tracer) {
        for (name, hook) in &mut self.hooks {
            log::trace!(target: "frame_gc::roots", "running root hook `{name}`");
            hook(tracer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_run_in_registration_order() {
        let mut registry = RootRegistry::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let order = order.clone();
            registry.register(Box::leak(name.to_string().into_boxed_str()), move |_| {
                order.borrow_mut().push(name);
            });
        }
        // SAFETY: no gray queue access happens in this test's hooks.
        let tracer = unsafe { Tracer::new(std::ptr::null_mut()) };
        registry.mark_all(&tracer);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_drops_hook() {
        let mut registry = RootRegistry::new();
        registry.register("x", |_| {});
        assert_eq!(registry.len(), 1);
        registry.remove("x");
        assert!(registry.is_empty());
    }
}
