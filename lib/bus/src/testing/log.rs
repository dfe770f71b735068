/*++

Licensed under the Apache-2.0 license.

File Name:

    log.rs

Abstract:

    File contains a shared string log for recording bus activity in unit
    tests.

--*/
use std::{
    cell::{Ref, RefCell},
    fmt::Write,
    ops::Deref,
    rc::Rc,
};

/// An append-only string buffer that hands out writers through `&self`.
///
/// Fake bus implementations record their calls here from trait methods that
/// only borrow the log. Clones share one underlying buffer, so a test can hold
/// its own handle to a log buried inside the structure under test.
///
/// * Example
///
/// ```
/// use ecmm_emu_bus::testing::Log;
/// use std::fmt::Write;
///
/// let log = Log::new();
/// writeln!(log.w(), "Line 1").unwrap();
/// writeln!(log.w(), "Line 2").unwrap();
/// assert_eq!("Line 1\nLine 2\n", &*log.as_str());
/// assert_eq!("Line 1\nLine 2\n", log.take());
/// assert_eq!("", log.take());
/// ```
#[derive(Clone)]
pub struct Log {
    buf: Rc<RefCell<String>>,
}
impl Log {
    /// Construct an empty `Log`.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(String::new())),
        }
    }

    /// Borrows the accumulated text without consuming it.
    pub fn as_str(&self) -> (impl Deref<Target = str> + '_) {
        Ref::map(self.buf.borrow(), String::as_str)
    }

    /// Drains the log, returning everything recorded since the last call.
    /// Assertions against `take()` keep each test step independent.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buf.borrow_mut())
    }

    /// Returns a writer suitable for `write!()` and `writeln!()`.
    pub fn w(&self) -> (impl Write + '_) {
        LogWriter { buf: &self.buf }
    }
}
impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

struct LogWriter<'a> {
    buf: &'a RefCell<String>,
}
impl Write for LogWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.buf.borrow_mut().push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_write_and_take() {
        let log = Log::new();
        writeln!(log.w(), "Line 1").unwrap();
        writeln!(log.w(), "Line 2").unwrap();
        assert_eq!("Line 1\nLine 2\n", &*log.as_str());
        assert_eq!("Line 1\nLine 2\n", log.take());
        assert_eq!("", log.take());
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let log = Log::new();
        let clone = log.clone();
        writeln!(clone.w(), "Line 1").unwrap();
        writeln!(log.w(), "Line 2").unwrap();
        assert_eq!("Line 1\nLine 2\n", log.take());
        assert_eq!("", clone.take());
    }
}
