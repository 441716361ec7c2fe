use memory::Value;
use tracing::debug;

/// Trait for garbage collection operations
pub trait GarbageCollector {
    fn collect_garbage(&mut self);
    fn mark_roots(&self) -> Vec<Value>;
}

impl GarbageCollector for super::vm::VM {
    fn collect_garbage(&mut self) {
        let before = self.heap.bytes_allocated;
        if self.config.stress_gc {
            debug!("gc triggered (stress mode)");
        } else {
            debug!(allocated = before, "gc begin");
        }

        let roots = self.mark_roots();
        self.heap.trace(roots);
        self.heap.sweep();
    }

    fn mark_roots(&self) -> Vec<Value> {
        let mut roots = Vec::new();

        // 1. Registered roots (the root environment among them)
        roots.extend_from_slice(&self.roots);

        // 2. Arguments of native calls in flight
        roots.extend_from_slice(&self.pinned);

        // 3. The running fiber and every fiber suspended beneath it
        roots.extend(self.fiber.children());
        if let Some(h) = self.current_fiber {
            roots.push(Value::Fiber(h));
        }
        for (handle, fiber) in &self.parents {
            roots.extend(fiber.children());
            if let Some(h) = handle {
                roots.push(Value::Fiber(*h));
            }
        }

        roots
    }
}
