//! Resolution of the application call site that emitted a log event.
//!
//! Must run on the producer's own thread, before the record crosses into the
//! delivery task: once the record is queued the original stack is gone.
//!
//! [`GelfSink::submit`](crate::sink::GelfSink::submit) takes its location
//! from `#[track_caller]`, which needs no debug info. The stack walk in
//! [`BacktraceResolver`] covers wrappers that can't be annotated and only
//! runs when such a wrapper is on the ignore list, or when installed
//! explicitly with [`GelfSink::with_resolver`](crate::sink::GelfSink::with_resolver).

use std::borrow::Cow;
use std::fmt;

/// Placeholder file reported when no suitable frame is found.
pub const UNKNOWN_FILE: &str = "???";

/// Source location of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerLocation {
    pub file: Cow<'static, str>,
    pub line: u32,
}

impl CallerLocation {
    pub const UNKNOWN: CallerLocation = CallerLocation {
        file: Cow::Borrowed(UNKNOWN_FILE),
        line: 0,
    };

    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        CallerLocation { file: file.into(), line }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for CallerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Rust runtime frames that can sit between a call site and the sink but
/// never are the call site themselves.
const RUNTIME_FRAMES: &[&str] = &[
    "library/core/src/ops/function.rs",
    "library/std/src/panicking.rs",
    "library/std/src/panic.rs",
    "library/std/src/rt.rs",
    "library/std/src/sys/backtrace.rs",
    "library/std/src/sys_common/backtrace.rs",
];

/// Source path suffixes whose frames are skipped while looking for the
/// caller. Wrappers around the sink (a logging facade, a bridge from another
/// framework) register their own files here.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    suffixes: Vec<Cow<'static, str>>,
}

impl IgnoreList {
    /// An empty list; nothing is ignored.
    pub fn empty() -> Self {
        IgnoreList { suffixes: Vec::new() }
    }

    pub fn ignore(mut self, suffix: impl Into<Cow<'static, str>>) -> Self {
        self.push(suffix);
        self
    }

    pub fn push(&mut self, suffix: impl Into<Cow<'static, str>>) {
        self.suffixes.push(suffix.into());
    }

    pub fn matches(&self, file: &str) -> bool {
        self.suffixes.iter().any(|s| file.ends_with(s.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(|s| s.as_ref())
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        IgnoreList {
            suffixes: RUNTIME_FRAMES.iter().map(|s| Cow::Borrowed(*s)).collect(),
        }
    }
}

/// Skip `skip_frames` frames, then return the first frame outside `ignored`.
///
/// Frames are ordered innermost first. An exhausted stack yields
/// [`CallerLocation::UNKNOWN`].
pub fn first_outside<I>(frames: I, skip_frames: usize, ignored: &IgnoreList) -> CallerLocation
where
    I: IntoIterator<Item = CallerLocation>,
{
    frames
        .into_iter()
        .skip(skip_frames)
        .find(|frame| !ignored.matches(&frame.file))
        .unwrap_or(CallerLocation::UNKNOWN)
}

/// Platform capability that inspects the current call stack.
pub trait ResolveCaller: Send + Sync {
    /// Walk outward from the frame that called into the resolver, skipping
    /// `skip_frames` frames and any frame under `ignored`.
    ///
    /// `skip_frames == 0` designates the resolver's direct caller.
    fn resolve_caller(&self, skip_frames: usize, ignored: &IgnoreList) -> CallerLocation;
}

/// Resolver walking the stack with the `backtrace` crate.
///
/// Symbolizes frames one at a time and stops at the first match. Needs debug
/// info to find file and line numbers; without it every lookup reports
/// [`CallerLocation::UNKNOWN`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceResolver;

impl ResolveCaller for BacktraceResolver {
    #[inline(never)]
    fn resolve_caller(&self, skip_frames: usize, ignored: &IgnoreList) -> CallerLocation {
        let mut walk = FrameWalk::new(skip_frames, ignored);

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) {
                    walk.visit(&file.to_string_lossy(), line);
                }
            });
            walk.found.is_none()
        });

        walk.found.unwrap_or(CallerLocation::UNKNOWN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Inside the unwinder, before the resolver's own frames.
    Capture,
    Resolver,
    Outside,
}

/// Streaming form of [`first_outside`] over symbolized frames, innermost
/// first. Frames up to and including the resolver's own are dropped before
/// `skip` applies.
struct FrameWalk<'a> {
    phase: Phase,
    skip: usize,
    ignored: &'a IgnoreList,
    found: Option<CallerLocation>,
}

impl<'a> FrameWalk<'a> {
    fn new(skip: usize, ignored: &'a IgnoreList) -> Self {
        FrameWalk {
            phase: Phase::Capture,
            skip,
            ignored,
            found: None,
        }
    }

    fn visit(&mut self, file: &str, line: u32) {
        if self.found.is_some() {
            return;
        }

        let own = file.ends_with(file!());
        match self.phase {
            Phase::Capture if own => self.phase = Phase::Resolver,
            Phase::Capture => {}
            Phase::Resolver if own => {}
            Phase::Resolver | Phase::Outside => {
                self.phase = Phase::Outside;
                self.outside(file, line);
            }
        }
    }

    fn outside(&mut self, file: &str, line: u32) {
        if self.skip > 0 {
            self.skip -= 1;
        } else if !self.ignored.matches(file) {
            self.found = Some(CallerLocation::new(file.to_string(), line));
        }
    }
}
