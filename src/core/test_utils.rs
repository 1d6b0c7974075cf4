//! Test helpers for code that builds on an [`Arena`](super::Arena).
//!
//! Each test gets its own arena, dropped when the test body returns, so
//! pages never leak between tests.

#[cfg(test)]
pub mod test {
    use super::super::arena::{Arena, ArenaConfig};
    use super::super::session::AstSession;

    /// Owns the arena a test allocates from.
    pub struct TestContext {
        arena: Arena,
    }

    impl TestContext {
        pub fn new() -> Self {
            init_logging();
            Self {
                arena: Arena::new(),
            }
        }

        /// Context whose arena uses `page_size`-byte small pages.
        ///
        /// Panics when `page_size` is below the arena minimum.
        pub fn with_page_size(page_size: usize) -> Self {
            init_logging();
            let config = ArenaConfig::with_page_size(page_size).expect("valid test page size");
            Self {
                arena: Arena::with_config(config),
            }
        }

        pub fn arena(&self) -> &Arena {
            &self.arena
        }

        /// Create a session over this context's arena.
        pub fn create_session(&self) -> AstSession<'_> {
            AstSession::new(&self.arena)
        }

        /// Bytes reserved by the arena so far.
        pub fn memory_used(&self) -> usize {
            self.arena.stats().bytes_reserved
        }

        pub fn with_session<F, R>(&self, f: F) -> R
        where
            F: FnOnce(&AstSession<'_>) -> R,
        {
            let session = self.create_session();
            f(&session)
        }
    }

    impl Default for TestContext {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Run `f` with a fresh default context.
    pub fn with_test_context<F, R>(f: F) -> R
    where
        F: FnOnce(&TestContext) -> R,
    {
        let ctx = TestContext::new();
        f(&ctx)
    }

    /// Run `f` with a context using small pages of `page_size` bytes.
    pub fn with_small_pages<F, R>(page_size: usize, f: F) -> R
    where
        F: FnOnce(&TestContext) -> R,
    {
        let ctx = TestContext::with_page_size(page_size);
        f(&ctx)
    }

    /// Route `log` output through the test harness. Safe to call repeatedly.
    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_small_page_context() {
        with_small_pages(256, |ctx| {
            assert_eq!(ctx.arena().config().page_size(), 256);
            assert_eq!(ctx.memory_used(), 0);

            ctx.with_session(|session| {
                let text = session.intern_str("rax");
                assert_eq!(text.len(), 3);
            });
            assert!(ctx.memory_used() > 0);
        });
    }
}
