//! Event Factory Implementation
//!
//! A ring buffer calls its factory once per slot at construction time and
//! never again; after that, producers overwrite slots in place.

/// Creates the pre-allocated entries of a ring buffer
///
/// # Examples
/// ```
/// use ringlane::disruptor::EventFactory;
///
/// struct Order {
///     id: u64,
///     lines: Vec<u32>,
/// }
///
/// struct OrderFactory;
///
/// impl EventFactory<Order> for OrderFactory {
///     fn new_instance(&self) -> Order {
///         Order { id: 0, lines: Vec::with_capacity(16) }
///     }
/// }
/// ```
pub trait EventFactory<T> {
    /// Create one slot's initial value
    fn new_instance(&self) -> T;
}

/// Fills every slot with `T::default()`
pub struct DefaultEventFactory<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: Default> DefaultEventFactory<T> {
    /// Create a new default event factory
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Default> Default for DefaultEventFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> EventFactory<T> for DefaultEventFactory<T> {
    fn new_instance(&self) -> T {
        T::default()
    }
}

/// Fills every slot from a closure
pub struct ClosureEventFactory<T, F>
where
    F: Fn() -> T,
{
    factory_fn: F,
}

impl<T, F> ClosureEventFactory<T, F>
where
    F: Fn() -> T,
{
    /// Create a new closure-based event factory
    pub fn new(factory_fn: F) -> Self {
        Self { factory_fn }
    }
}

impl<T, F> EventFactory<T> for ClosureEventFactory<T, F>
where
    F: Fn() -> T,
{
    fn new_instance(&self) -> T {
        (self.factory_fn)()
    }
}
