/// A lazily recomputed value with an explicit dirty flag.
///
/// Writers call [`Cached::invalidate`]; readers call
/// [`Cached::get_or_compute`] with a pure recompute function, which only runs
/// when the value is dirty or has never been computed.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    dirty: bool,
    value: Option<T>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            dirty: true,
            value: None,
        }
    }
}

impl<T> Cached<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.value.is_none()
    }

    pub fn get_or_compute(&mut self, compute: impl FnOnce() -> T) -> &T {
        if self.dirty {
            self.value = None;
            self.dirty = false;
        }
        self.value.get_or_insert_with(compute)
    }
}
