//! Configuration of the asynchronous wait dispatcher.

use std::borrow::Cow;

/// The dispatcher is already running and can no longer be configured.
#[derive(Debug, Eq, PartialEq)]
pub struct AlreadyStarted;

impl core::fmt::Display for AlreadyStarted {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("the asynchronous wait dispatcher is already running")
    }
}

impl std::error::Error for AlreadyStarted {}

/// A builder for the dispatcher thread that runs asynchronous wait callbacks.
///
/// The dispatcher starts lazily on the first asynchronous wait (or on
/// [`start_dispatcher`]). A configuration must be applied before that;
/// afterwards [`apply`] reports [`AlreadyStarted`].
///
/// ```
/// atomwait::DispatcherConfig::new()
///     .name("worker-completions")
///     .stack_size(256 * 1024)
///     .apply()
///     .unwrap();
/// ```
///
/// [`start_dispatcher`]: crate::start_dispatcher
/// [`apply`]: Self::apply
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) stack_size: usize,
}

impl DispatcherConfig {
    /// Default name of the dispatcher thread.
    pub const DEFAULT_NAME: &'static str = "atomwait-dispatch";
    /// Default stack size of the dispatcher thread.
    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

    /// Creates a configuration holding the defaults.
    pub const fn new() -> Self {
        Self {
            name: Cow::Borrowed(Self::DEFAULT_NAME),
            stack_size: Self::DEFAULT_STACK_SIZE,
        }
    }

    /// Sets the name of the dispatcher thread.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the stack size of the dispatcher thread. Callbacks run on this
    /// stack.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Installs this configuration for the dispatcher.
    ///
    /// # Errors
    ///
    /// [`AlreadyStarted`] if the dispatcher thread is already running.
    pub fn apply(self) -> Result<(), AlreadyStarted> {
        crate::dispatch::configure(self)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}
