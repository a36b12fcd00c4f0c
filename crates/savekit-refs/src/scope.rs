//! Thread-local resolution scope.
//!
//! serde offers no way to pass context through `Serialize::serialize`, so a
//! compact serializer installs its [`ResolverChains`] here for the duration
//! of one synchronous encode or decode. [`ExternalRef`](crate::ExternalRef)
//! looks them up when it is visited. Scopes nest; the innermost wins.
//!
//! A scope never spans an `.await`: encoding and decoding are synchronous
//! steps even inside the async store.

use std::cell::RefCell;
use std::sync::Arc;

use crate::chain::ResolverChains;

thread_local! {
    static ACTIVE: RefCell<Vec<Arc<ResolverChains>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the scope on drop, including during unwinding.
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `chains` installed as the active resolution scope.
pub fn with_chains<R>(chains: &Arc<ResolverChains>, f: impl FnOnce() -> R) -> R {
    ACTIVE.with(|stack| stack.borrow_mut().push(Arc::clone(chains)));
    let _guard = ScopeGuard;
    f()
}

/// The innermost active chains on this thread, if any.
pub fn active() -> Option<Arc<ResolverChains>> {
    ACTIVE.with(|stack| stack.borrow().last().cloned())
}
