//! The vtable-wrapping contract of §4.2: plugins "wrap" a virtual operation
//! by pushing a closure onto a per-hook-point LIFO stack; unwrapping pops
//! it. A wrapper calls through to whatever it wrapped via a super-call,
//! which is exactly the next layer down the stack — enforced here by
//! passing each layer its own depth rather than a raw function pointer, so
//! there is no way to skip past the layer immediately below (as the design
//! notes ask for: "a 'super handle' into each hook implementation").
use std::rc::Rc;

/// One layer of a wrapped hook: given a handle back onto the stack (for
/// super-calls) and the call arguments, produce a result.
pub type HookLayer<Args, Ret> = Rc<dyn Fn(&WrappedHook<Args, Ret>, usize, Args) -> Ret>;

/// A LIFO stack of closures implementing one virtual operation (e.g.
/// `preparePaintScreen`, `validateWindowResizeRequest`, `getAllowedActions`).
pub struct WrappedHook<Args, Ret> {
    layers: Vec<HookLayer<Args, Ret>>,
}

impl<Args, Ret> WrappedHook<Args, Ret> {
    /// Construct the stack with its base (core) implementation as layer 0.
    pub fn new(base: HookLayer<Args, Ret>) -> Self {
        Self { layers: vec![base] }
    }

    /// Push a plugin wrapper on top of the stack.
    pub fn push(&mut self, layer: HookLayer<Args, Ret>) {
        self.layers.push(layer);
    }

    /// Pop the most recently pushed wrapper. The base layer (index 0,
    /// installed by `new`) can never be popped — unwrap stacks of plugin
    /// wrappers must unwind in LIFO order, down to but not including the
    /// core implementation.
    pub fn pop(&mut self) -> bool {
        if self.layers.len() > 1 {
            self.layers.pop();
            true
        } else {
            false
        }
    }

    /// How many layers (including the base) are currently installed.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Invoke the top of the stack.
    pub fn call(&self, args: Args) -> Ret {
        let top = self.layers.len() - 1;
        (self.layers[top])(self, top, args)
    }

    /// A super-call: invoke the layer immediately below `depth`. Panics if
    /// called from the base layer (`depth == 0`), since there is nothing
    /// further to call through to.
    pub fn call_super(&self, depth: usize, args: Args) -> Ret {
        assert!(depth > 0, "no layer below the base hook implementation");
        let next = depth - 1;
        (self.layers[next])(self, next, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_compose_and_can_super_call() {
        // base doubles; wrapper adds one before doubling via super-call
        let base: HookLayer<i32, i32> = Rc::new(|_stack, _depth, args| args * 2);
        let mut hook = WrappedHook::new(base);

        let wrapper: HookLayer<i32, i32> =
            Rc::new(|stack, depth, args| stack.call_super(depth, args + 1));
        hook.push(wrapper);

        assert_eq!(hook.call(4), 10); // (4 + 1) * 2
    }

    #[test]
    fn unwrap_restores_previous_layer_lifo() {
        let base: HookLayer<i32, i32> = Rc::new(|_s, _d, args| args);
        let mut hook = WrappedHook::new(base);

        hook.push(Rc::new(|s, d, args| s.call_super(d, args) + 1));
        hook.push(Rc::new(|s, d, args| s.call_super(d, args) + 10));

        assert_eq!(hook.call(0), 11);
        assert!(hook.pop());
        assert_eq!(hook.call(0), 1);
        assert!(hook.pop());
        assert_eq!(hook.call(0), 0);
        // Base layer cannot be popped.
        assert!(!hook.pop());
    }
}
