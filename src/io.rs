//! External-resource producers: files as stages.
//!
//! This module provides:
//! - [`lines`]: line-at-a-time text file source
//! - [`json_lines`]: typed JSONL variant with Serde (feature `io-jsonl`)
//! - [`glob_lines`]: multi-file lines over a glob pattern (feature
//!   `io-glob`)
//!
//! # Notes
//! - Files open lazily on the first pull and are closed on **both**
//!   exhaustion and `Stop`, including a mid-stream stop from a
//!   short-circuited consumer.
//! - Errors carry contextual information (path, line number).

use crate::stage::{Signal, Stage, Step};
use anyhow::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(feature = "io-jsonl")]
use anyhow::Context;
#[cfg(feature = "io-jsonl")]
use serde::de::DeserializeOwned;
#[cfg(feature = "io-jsonl")]
use std::marker::PhantomData;

/// Yield a text file line by line (line endings stripped).
pub fn lines(path: impl AsRef<Path>) -> Lines {
    Lines {
        path: path.as_ref().to_path_buf(),
        reader: None,
        line_no: 0,
        done: false,
    }
}

pub struct Lines {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line_no: u64,
    done: bool,
}

impl Lines {
    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(path = %self.path.display(), "line source closed");
        }
    }

    /// 1-based number of the most recently yielded line.
    fn current_line(&self) -> u64 {
        self.line_no
    }
}

impl Stage for Lines {
    type Item = String;

    fn pull(&mut self, signal: Signal) -> Step<String> {
        if signal == Signal::Stop || self.done {
            self.done = true;
            self.close();
            return Step::done();
        }
        if self.reader.is_none() {
            match File::open(&self.path) {
                Ok(f) => {
                    debug!(path = %self.path.display(), "line source opened");
                    self.reader = Some(BufReader::new(f));
                }
                Err(e) => {
                    self.done = true;
                    return Step::fail(
                        Error::new(e).context(format!("open {}", self.path.display())),
                    );
                }
            }
        }
        let reader = self.reader.as_mut().expect("reader opened above");
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                self.done = true;
                self.close();
                Step::done()
            }
            Ok(_) => {
                self.line_no += 1;
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Step::item(line)
            }
            Err(e) => {
                self.done = true;
                self.close();
                Step::fail(Error::new(e).context(format!(
                    "read line {} in {}",
                    self.line_no + 1,
                    self.path.display()
                )))
            }
        }
    }
}

/// Yield a JSONL file as typed values, one per non-empty line.
///
/// Blank and whitespace-only lines are skipped. A line that fails to parse
/// terminates the stream with an error naming the line and the path.
#[cfg(feature = "io-jsonl")]
pub fn json_lines<T: DeserializeOwned>(path: impl AsRef<Path>) -> JsonLines<T> {
    JsonLines { inner: lines(path), _t: PhantomData }
}

#[cfg(feature = "io-jsonl")]
pub struct JsonLines<T> {
    inner: Lines,
    _t: PhantomData<T>,
}

#[cfg(feature = "io-jsonl")]
impl<T: DeserializeOwned> Stage for JsonLines<T> {
    type Item = T;

    fn pull(&mut self, signal: Signal) -> Step<T> {
        if signal == Signal::Stop {
            return Step { value: None, error: self.inner.pull(Signal::Stop).error };
        }
        loop {
            let step = self.inner.pull(Signal::Continue);
            if let Some(e) = step.error {
                return Step { value: None, error: Some(e) };
            }
            let Some(line) = step.value else {
                return Step::done();
            };
            if line.trim().is_empty() {
                continue;
            }
            let line_no = self.inner.current_line();
            let path = self.inner.path.display().to_string();
            return match serde_json::from_str::<T>(&line)
                .with_context(|| format!("parse JSONL line {line_no} in {path}"))
            {
                Ok(v) => Step::item(v),
                Err(e) => {
                    // A typed stream has no value to attach the error to;
                    // close the file and terminate.
                    self.inner.pull(Signal::Stop);
                    Step::fail(e)
                }
            };
        }
    }
}

/// Yield the lines of every file matching `pattern`, files visited in
/// sorted path order.
///
/// Fails fast if the pattern itself is malformed.
#[cfg(feature = "io-glob")]
pub fn glob_lines(pattern: &str) -> anyhow::Result<GlobLines> {
    use anyhow::Context as _;
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("bad glob pattern {pattern}"))?
        .filter_map(Result::ok)
        .collect();
    paths.sort();
    Ok(GlobLines {
        paths: paths.into_iter(),
        current: None,
        done: false,
    })
}

#[cfg(feature = "io-glob")]
pub struct GlobLines {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<Lines>,
    done: bool,
}

#[cfg(feature = "io-glob")]
impl Stage for GlobLines {
    type Item = String;

    fn pull(&mut self, signal: Signal) -> Step<String> {
        if signal == Signal::Stop || self.done {
            self.done = true;
            let error = self.current.as_mut().and_then(|c| c.pull(Signal::Stop).error);
            self.current = None;
            return Step { value: None, error };
        }
        loop {
            if self.current.is_none() {
                match self.paths.next() {
                    Some(p) => self.current = Some(lines(p)),
                    None => {
                        self.done = true;
                        return Step::done();
                    }
                }
            }
            let step = self
                .current
                .as_mut()
                .expect("current file set above")
                .pull(Signal::Continue);
            if step.value.is_some() {
                return step;
            }
            if step.error.is_some() {
                self.done = true;
                self.current = None;
                return step;
            }
            // Current file exhausted; move to the next one.
            self.current = None;
        }
    }
}
