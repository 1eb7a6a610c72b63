//! Owner callbacks for socket lifecycle events.

/// Plain lifecycle callback.
pub type Callback = Box<dyn FnMut() + Send>;

/// One-shot initialisation hook.
///
/// The first successful open consumes it; every later open is a reconnect.
#[derive(Default)]
pub enum InitHook {
    /// First open not seen yet. `None` means the owner gave no callback.
    Pending(Option<Box<dyn FnOnce() + Send>>),
    /// First open already happened
    #[default]
    Fired,
}

impl InitHook {
    pub fn pending() -> Self {
        InitHook::Pending(None)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InitHook::Pending(_))
    }

    /// Mark the hook fired and hand back the callback, if the hook was pending.
    ///
    /// Returns `None` when the hook had already fired.
    pub fn take(&mut self) -> Option<Option<Box<dyn FnOnce() + Send>>> {
        match std::mem::replace(self, InitHook::Fired) {
            InitHook::Pending(callback) => Some(callback),
            InitHook::Fired => None,
        }
    }
}

/// Callbacks a socket owner can register, at most one per event.
///
/// Built with chained setters:
///
/// ```
/// use fishing_socket::Handlers;
///
/// let handlers = Handlers::new()
///     .on_init(|| println!("joined table"))
///     .on_data(|msg| println!("server: {msg}"));
/// ```
pub struct Handlers {
    pub(crate) init: InitHook,
    pub(crate) data: Option<Box<dyn FnMut(String) + Send>>,
    pub(crate) error: Option<Box<dyn FnMut(Option<String>) + Send>>,
    pub(crate) close: Option<Callback>,
    pub(crate) reconnect: Option<Callback>,
    pub(crate) reconnected: Option<Callback>,
    pub(crate) end: Option<Callback>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new()
    }
}

impl Handlers {
    pub fn new() -> Self {
        Self {
            init: InitHook::pending(),
            data: None,
            error: None,
            close: None,
            reconnect: None,
            reconnected: None,
            end: None,
        }
    }

    /// First successful open. Ignored if the first open already happened.
    pub fn on_init(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.set_on_init(f);
        self
    }

    /// Every non-heartbeat payload, verbatim.
    pub fn on_data(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    /// Transport error. The payload is whatever the transport reported, if anything.
    pub fn on_error(mut self, f: impl FnMut(Option<String>) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Transport closed; a reconnect follows.
    pub fn on_close(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.close = Some(Box::new(f));
        self
    }

    /// A reconnect streak started.
    pub fn on_reconnect(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.reconnect = Some(Box::new(f));
        self
    }

    /// A reconnect attempt opened successfully.
    pub fn on_reconnected(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.reconnected = Some(Box::new(f));
        self
    }

    /// Terminal close.
    pub fn on_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    pub fn set_on_init(&mut self, f: impl FnOnce() + Send + 'static) {
        if self.init.is_pending() {
            self.init = InitHook::Pending(Some(Box::new(f)));
        }
    }

    pub fn set_on_data(&mut self, f: impl FnMut(String) + Send + 'static) {
        self.data = Some(Box::new(f));
    }

    pub fn set_on_error(&mut self, f: impl FnMut(Option<String>) + Send + 'static) {
        self.error = Some(Box::new(f));
    }

    pub fn set_on_close(&mut self, f: impl FnMut() + Send + 'static) {
        self.close = Some(Box::new(f));
    }

    pub fn set_on_reconnect(&mut self, f: impl FnMut() + Send + 'static) {
        self.reconnect = Some(Box::new(f));
    }

    pub fn set_on_reconnected(&mut self, f: impl FnMut() + Send + 'static) {
        self.reconnected = Some(Box::new(f));
    }

    pub fn set_on_end(&mut self, f: impl FnMut() + Send + 'static) {
        self.end = Some(Box::new(f));
    }

    /// Drop every callback. The init hook ends up fired so nothing can resurrect it.
    pub fn clear(&mut self) {
        *self = Self {
            init: InitHook::Fired,
            data: None,
            error: None,
            close: None,
            reconnect: None,
            reconnected: None,
            end: None,
        };
    }

    pub(crate) fn data(&mut self, payload: String) {
        if let Some(cb) = self.data.as_mut() {
            cb(payload);
        }
    }

    pub(crate) fn error(&mut self, detail: Option<String>) {
        if let Some(cb) = self.error.as_mut() {
            cb(detail);
        }
    }

    pub(crate) fn close(&mut self) {
        if let Some(cb) = self.close.as_mut() {
            cb();
        }
    }

    pub(crate) fn reconnect(&mut self) {
        if let Some(cb) = self.reconnect.as_mut() {
            cb();
        }
    }

    pub(crate) fn reconnected(&mut self) {
        if let Some(cb) = self.reconnected.as_mut() {
            cb();
        }
    }

    pub(crate) fn end(&mut self) {
        if let Some(cb) = self.end.as_mut() {
            cb();
        }
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("init_pending", &self.init.is_pending())
            .field("data", &self.data.is_some())
            .field("error", &self.error.is_some())
            .field("close", &self.close.is_some())
            .field("reconnect", &self.reconnect.is_some())
            .field("reconnected", &self.reconnected.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}
