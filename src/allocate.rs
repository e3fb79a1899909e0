//! Collision-free destination paths for a batch.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::format::OutputFormat;

/// How a destination file name is derived from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRule {
    /// `{stem}.{format}`
    Convert { format: OutputFormat },
    /// `{stem}{suffix}{source extension or .wav}`; a blank suffix is dropped.
    Master { suffix: String },
    /// `{stem}{source extension or .wav}`
    Trim,
}

impl NameRule {
    /// Destination before any disambiguation.
    pub fn base_destination(&self, source: &Path, output_directory: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default();
        let mut name = OsString::from(stem);
        match self {
            Self::Convert { format } => {
                name.push(".");
                name.push(format.as_str());
            }
            Self::Master { suffix } => {
                name.push(suffix.trim());
                name.push(source_extension(source));
            }
            Self::Trim => name.push(source_extension(source)),
        }
        output_directory.join(name)
    }
}

fn source_extension(source: &Path) -> OsString {
    match source.extension() {
        Some(ext) if !ext.is_empty() => {
            let mut dotted = OsString::from(".");
            dotted.push(ext);
            dotted
        }
        _ => OsString::from(".wav"),
    }
}

/// `{stem} ({index}){extension}` next to `base`.
fn numbered(base: &Path, index: usize) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(format!(" ({index})"));
    if let Some(ext) = base.extension() {
        name.push(".");
        name.push(ext);
    }
    base.with_file_name(name)
}

/// Hands out destinations for one batch, remembering what it already gave away.
#[derive(Debug)]
pub struct PathAllocator<'a> {
    output_directory: &'a Path,
    rule: NameRule,
    overwrite_existing: bool,
    claimed: HashSet<PathBuf>,
}

impl<'a> PathAllocator<'a> {
    pub fn new(output_directory: &'a Path, rule: NameRule, overwrite_existing: bool) -> Self {
        Self {
            output_directory,
            rule,
            overwrite_existing,
            claimed: HashSet::new(),
        }
    }

    /// Destination for the next source file in batch order.
    ///
    /// `name (1)`, `name (2)`, … are probed until a path is found that was not
    /// claimed earlier in the batch and, without overwrite, does not exist on
    /// disk.
    pub fn allocate(&mut self, source: &Path) -> PathBuf {
        let base = self.rule.base_destination(source, self.output_directory);
        let mut destination = base.clone();
        let mut index = 1;
        while self.is_taken(&destination) {
            destination = numbered(&base, index);
            index += 1;
        }
        self.claimed.insert(destination.clone());
        destination
    }

    fn is_taken(&self, candidate: &Path) -> bool {
        self.claimed.contains(candidate) || (!self.overwrite_existing && candidate.exists())
    }

    #[inline]
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }
}

/// Lazy `(input, output)` pairs for a list of inputs.
pub struct Allocations<'a> {
    inputs: std::slice::Iter<'a, PathBuf>,
    allocator: PathAllocator<'a>,
}

impl<'a> Allocations<'a> {
    pub fn new(
        inputs: &'a [PathBuf],
        output_directory: &'a Path,
        rule: NameRule,
        overwrite_existing: bool,
    ) -> Self {
        Self {
            inputs: inputs.iter(),
            allocator: PathAllocator::new(output_directory, rule, overwrite_existing),
        }
    }
}

impl<'a> Iterator for Allocations<'a> {
    type Item = (&'a Path, PathBuf);

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.inputs.next()?;
        let destination = self.allocator.allocate(source);
        Some((source.as_path(), destination))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inputs.size_hint()
    }
}

/// Eagerly allocate every destination of `inputs`.
pub fn allocate(
    inputs: &[PathBuf],
    output_directory: &Path,
    rule: NameRule,
    overwrite_existing: bool,
) -> Vec<(PathBuf, PathBuf)> {
    Allocations::new(inputs, output_directory, rule, overwrite_existing)
        .map(|(source, destination)| (source.to_path_buf(), destination))
        .collect()
}
