use std::io::Write;

use crate::scanner::Pos;

/// Sink for static (scan, parse and resolution) diagnostics.
/// Reporting never alters control flow, the phases decide for themselves how to recover.
pub trait ErrorReporter {
    fn report(&mut self, pos: Pos, message: &str);
}

impl<R> ErrorReporter for &mut R
where
    R: ErrorReporter + ?Sized,
{
    fn report(&mut self, pos: Pos, message: &str) {
        (**self).report(pos, message);
    }
}

pub struct WriteErrorReporter<'w, W>
where
    W: Write,
{
    // Store this as a mut reference so we can't accidentally lose something like stderr().lock() inside the reporter
    // that doesn't go out of scope and cause a deadlock
    write: &'w mut W,
}

impl<'w, W> WriteErrorReporter<'w, W>
where
    W: Write,
{
    pub fn new(write: &'w mut W) -> WriteErrorReporter<'w, W> {
        WriteErrorReporter { write }
    }
}

impl<'w, W> ErrorReporter for WriteErrorReporter<'w, W>
where
    W: Write,
{
    fn report(&mut self, pos: Pos, message: &str) {
        // If we can't write to our output there is nowhere left to complain
        _ = writeln!(self.write, "[line {}] Error: {}", pos, message);
    }
}

/// Keeps every diagnostic in memory, mostly useful for tests and embedding
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub diagnostics: Vec<(Pos, String)>,
}

impl ErrorReporter for CollectingReporter {
    fn report(&mut self, pos: Pos, message: &str) {
        self.diagnostics.push((pos, message.to_string()));
    }
}

/// Track whether or not an error actually occurred and delegate to another error reporter
/// This is only meant to be used internally so that a phase can piggy back on whether an error actually occurred
pub(crate) struct StateTrackingReporter<'a, Reporter> {
    reporter: &'a mut Reporter,
    pub errored: bool,
}

impl<'a, Reporter> StateTrackingReporter<'a, Reporter> {
    pub fn new(reporter: &'a mut Reporter) -> StateTrackingReporter<'a, Reporter> {
        StateTrackingReporter {
            reporter,
            errored: false,
        }
    }
}

impl<'a, Reporter> ErrorReporter for StateTrackingReporter<'a, Reporter>
where
    Reporter: ErrorReporter,
{
    fn report(&mut self, pos: Pos, message: &str) {
        self.errored = true;
        self.reporter.report(pos, message);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_reporter_formats_position() {
        let mut out = Vec::new();
        let mut reporter = WriteErrorReporter::new(&mut out);
        reporter.report(
            Pos {
                line: 3,
                offset_in_line: 7,
            },
            "Expect ';' after value.",
        );
        assert_eq!(
            "[line 3:7] Error: Expect ';' after value.\n",
            String::from_utf8(out).unwrap()
        );
    }

    #[test]
    fn tracking_reporter_notices_errors() {
        let mut inner = CollectingReporter::default();
        let mut tracking = StateTrackingReporter::new(&mut inner);
        assert!(!tracking.errored);
        tracking.report(
            Pos {
                line: 1,
                offset_in_line: 0,
            },
            "boom",
        );
        assert!(tracking.errored);
        assert_eq!(1, inner.diagnostics.len());
    }
}
