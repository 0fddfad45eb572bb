//! Turns the registry's records into compiler-style, source-annotated text.
//!
//! Rendering never mutates the registry, so a report can be produced as many
//! times as wanted and reads identically each time. Source text is fetched
//! through [`crate::source`] and cached per path for the duration of one
//! render call; a file that cannot be loaded costs that block its excerpts
//! and nothing else.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::ColoredString;
use hashbrown::HashMap;
use log::warn;

use super::ansi;
use crate::source;
use crate::track::key::{DataLocation, ErrorKind, ErrorRecord};
use crate::track::registry::{self, AllocationRegistry};
use crate::track::typenames;
use crate::util::num::gutter_pad;

/// Per-render cache of split source files. A failed load is remembered too,
/// so a bad path is attempted (and warned about) only once per render.
struct SourceCache {
    files: HashMap<PathBuf, Option<Vec<String>>>,
}

impl SourceCache {
    fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// The 1-based line `number` of `path`, or `None` if the file cannot be
    /// read or the recorded line is past its end
    fn line(&mut self, path: &Path, number: u32) -> Option<&str> {
        let entry = self
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| match source::load_file(path) {
                Ok(data) => Some(
                    source::partition_data(&data)
                        .into_iter()
                        .map(str::to_owned)
                        .collect(),
                ),
                Err(err) => {
                    warn!("cannot annotate source: {err}");
                    None
                }
            });
        let lines = entry.as_ref()?;
        let index = number.checked_sub(1)? as usize;
        if index >= lines.len() {
            warn!("line {number} is past the end of {}", path.display());
            return None;
        }
        Some(&lines[index])
    }
}

/// Column of the first non-space character; a line that is all spaces (or
/// empty) underlines from column 0
fn leading_spaces(line: &str) -> usize {
    line.find(|c: char| c != ' ').unwrap_or(0)
}

fn message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PreviouslyTracked => "overwrote tracking of previously tracked variable",
        ErrorKind::PreviouslyDeleted => "double deletion found",
        ErrorKind::TypePun => "deleted pointer did not match allocated type",
        ErrorKind::Untracked => "attempted deletion of untracked pointer",
    }
}

fn type_name_or_placeholder(id: std::any::TypeId) -> String {
    typenames::resolve(id).unwrap_or_else(|| "?".to_owned())
}

/// One annotated source excerpt: the line, then an underline from its first
/// non-space column to its end, with an inline caption
fn write_excerpt(
    out: &mut impl Write,
    width: usize,
    number: u32,
    line: &str,
    underline: char,
    caption: &str,
    paint: fn(&str) -> ColoredString,
) -> io::Result<()> {
    let spaces = leading_spaces(line);
    writeln!(out, "{number:<width$} | {}", paint(line))?;
    let marks: String = std::iter::repeat(underline)
        .take(line.len() - spaces)
        .collect();
    writeln!(
        out,
        "{:width$} | {}{}",
        "",
        " ".repeat(spaces),
        paint(&format!("{marks} {caption}"))
    )
}

fn write_error(
    record: &ErrorRecord,
    cache: &mut SourceCache,
    out: &mut impl Write,
) -> io::Result<()> {
    let at = &record.error_location;
    // which recorded site, if any, the diagnostic points back at
    let reference: Option<&DataLocation> = match record.kind {
        ErrorKind::PreviouslyDeleted => record.subject.deletion_point.as_ref(),
        ErrorKind::PreviouslyTracked | ErrorKind::TypePun => {
            record.subject.allocation_point.as_ref()
        }
        ErrorKind::Untracked => None,
    };
    let (reference_caption, offending_caption) = match record.kind {
        ErrorKind::PreviouslyTracked => (
            Some("initial tracking here".to_owned()),
            "overwrote tracking here".to_owned(),
        ),
        ErrorKind::PreviouslyDeleted => (
            Some("initial deletion here".to_owned()),
            "second delete here".to_owned(),
        ),
        ErrorKind::TypePun => (
            Some(format!(
                "allocated as type \"{}\"",
                type_name_or_placeholder(record.subject.type_id)
            )),
            format!(
                "deleted as type \"{}\"",
                type_name_or_placeholder(record.type_id_at_error)
            ),
        ),
        ErrorKind::Untracked => (None, "here".to_owned()),
    };

    // gutter sized to the larger of the two displayed line numbers so both
    // excerpts align
    let largest_line = reference
        .map(|reference| reference.line)
        .unwrap_or(0)
        .max(at.line);
    let pad = gutter_pad(largest_line as usize);
    let width = pad.len();

    writeln!(out, "{}: {}", ansi::error("error"), message(record.kind))?;
    writeln!(out, "{pad} ---> {}:{}:", at.short_path().display(), at.line)?;
    writeln!(out, "{pad} | ")?;

    if let (Some(reference), Some(caption)) = (reference, reference_caption) {
        if let Some(line) = cache.line(&reference.file, reference.line) {
            write_excerpt(
                out,
                width,
                reference.line,
                line,
                '-',
                &caption,
                ansi::reference,
            )?;
            writeln!(out, "{pad} | ")?;
        }
    }
    if let Some(line) = cache.line(&at.file, at.line) {
        write_excerpt(out, width, at.line, line, '^', &offending_caption, ansi::error)?;
        writeln!(out, "{pad} | ")?;
    }
    writeln!(out)
}

/// Render every recorded error, in detection order, as a compiler-style
/// diagnostic block. No-op when the error log is empty.
pub fn render_errors(registry: &AllocationRegistry, out: &mut impl Write) -> io::Result<()> {
    let errors = registry.errors();
    if errors.is_empty() {
        return Ok(());
    }
    let mut cache = SourceCache::new();
    writeln!(out, "{}", ansi::error("allocation errors found: "))?;
    for record in errors {
        write_error(record, &mut cache, out)?;
    }
    Ok(())
}

/// Render the outstanding (leaked) allocations: a count header and one
/// shortened call-site reference per live entry, ordered by address. No
/// excerpts for leaks, just where they came from.
pub fn render_nonfreed(registry: &AllocationRegistry, out: &mut impl Write) -> io::Result<()> {
    let live = registry.live();
    if live.is_empty() {
        return Ok(());
    }
    let mut entries: Vec<_> = live.values().collect();
    entries.sort_by_key(|key| key.address);

    let count = entries.len();
    writeln!(
        out,
        "{}: {} unfreed pointer{} at:",
        ansi::error("error"),
        count,
        if count == 1 { "" } else { "s" }
    )?;
    for key in entries {
        if let Some(at) = &key.allocation_point {
            let arrow = format!("---> {}:{}", at.short_path().display(), at.line);
            writeln!(out, "{}", ansi::error(&arrow))?;
        }
    }
    writeln!(out)
}

/// [`render_errors`] on the process-wide registry, to stdout
pub fn print_errors() {
    let _ = registry::with(|reg| render_errors(reg, &mut io::stdout()));
}

/// [`render_nonfreed`] on the process-wide registry, to stdout
pub fn print_nonfreed() {
    let _ = registry::with(|reg| render_nonfreed(reg, &mut io::stdout()));
}

#[cfg(test)]
mod tests {
    use std::any::TypeId;
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::track::typenames;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn loc(file: &NamedTempFile, line: u32) -> DataLocation {
        DataLocation::new(line, file.path())
    }

    fn render_to_string(registry: &AllocationRegistry) -> String {
        let mut buf = Vec::new();
        render_errors(registry, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn untracked_block_shows_single_annotated_excerpt() {
        ansi::set_colors_enabled(false);
        let src = fixture("fn main() {\n    delete(p);\n}\n");
        let mut reg = AllocationRegistry::new();
        reg.safe_deletion(0xdead, TypeId::of::<u32>(), loc(&src, 2));

        let text = render_to_string(&reg);
        assert!(text.contains("allocation errors found: "));
        assert!(text.contains("error: attempted deletion of untracked pointer"));
        assert!(text.contains(":2:"));
        assert!(text.contains("2 |     delete(p);"));
        assert!(text.contains("    ^^^^^^^^^^ here"));
    }

    #[test]
    fn double_delete_block_shows_both_sites() {
        ansi::set_colors_enabled(false);
        let src = fixture("alloc();\nfirst_delete();\nsecond_delete();\n");
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<String>();
        reg.record_allocation(0x10, t, loc(&src, 1));
        assert!(reg.safe_deletion(0x10, t, loc(&src, 2)));
        assert!(!reg.safe_deletion(0x10, t, loc(&src, 3)));

        let text = render_to_string(&reg);
        assert!(text.contains("error: double deletion found"));
        assert!(text.contains("2 | first_delete();"));
        assert!(text.contains("--------------- initial deletion here"));
        assert!(text.contains("3 | second_delete();"));
        assert!(text.contains("^^^^^^^^^^^^^^^^ second delete here"));
    }

    #[test]
    fn type_pun_block_names_both_types() {
        ansi::set_colors_enabled(false);
        let src = fixture("let p = alloc();\ndelete(p);\n");
        let mut reg = AllocationRegistry::new();
        let allocated = typenames::intern::<f64>();
        let deleted = typenames::intern::<u32>();
        reg.record_allocation(0x20, allocated, loc(&src, 1));
        assert!(!reg.record_deletion(0x20, deleted, loc(&src, 2)));

        let text = render_to_string(&reg);
        assert!(text.contains("error: deleted pointer did not match allocated type"));
        assert!(text.contains("allocated as type \"f64\""));
        assert!(text.contains("deleted as type \"u32\""));
    }

    #[test]
    fn previously_tracked_block_points_at_first_site() {
        ansi::set_colors_enabled(false);
        let src = fixture("track_a();\ntrack_a_again();\n");
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<u8>();
        reg.record_allocation(0x30, t, loc(&src, 1));
        reg.record_allocation(0x30, t, loc(&src, 2));

        let text = render_to_string(&reg);
        assert!(text.contains("error: overwrote tracking of previously tracked variable"));
        assert!(text.contains("---------- initial tracking here"));
        assert!(text.contains("^^^^^^^^^^^^^^^^ overwrote tracking here"));
    }

    #[test]
    fn gutter_width_follows_the_larger_line_number() {
        ansi::set_colors_enabled(false);
        let src = fixture(&"x();\n".repeat(12));
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<u16>();
        reg.record_allocation(0x40, t, loc(&src, 2));
        reg.record_allocation(0x40, t, loc(&src, 11));

        let text = render_to_string(&reg);
        // both line numbers padded to two columns
        assert!(text.contains("2  | x();"));
        assert!(text.contains("11 | x();"));
        assert!(text.contains("   ---> "));
    }

    #[test]
    fn unreadable_file_suppresses_excerpts_but_not_later_blocks() {
        ansi::set_colors_enabled(false);
        let src = fixture("ok();\ndelete(q);\n");
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<i64>();
        reg.safe_deletion(0x50, t, DataLocation::new(4, "/no/such/source.rs"));
        reg.safe_deletion(0x60, t, loc(&src, 2));

        let text = render_to_string(&reg);
        // the bad block keeps its message and location header...
        assert!(text.contains("error: attempted deletion of untracked pointer"));
        assert!(text.contains("source.rs:4:"));
        // ...and the good block is still fully annotated
        assert!(text.contains("2 | delete(q);"));
        assert!(text.contains("^^^^^^^^^^ here"));
    }

    #[test]
    fn stale_line_number_does_not_panic() {
        ansi::set_colors_enabled(false);
        let src = fixture("only_line();\n");
        let mut reg = AllocationRegistry::new();
        reg.safe_deletion(0x70, TypeId::of::<u8>(), loc(&src, 40));
        let text = render_to_string(&reg);
        assert!(text.contains("error: attempted deletion of untracked pointer"));
    }

    #[test]
    fn rendering_is_idempotent() {
        ansi::set_colors_enabled(false);
        let src = fixture("a();\nb();\nc();\n");
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<u32>();
        reg.record_allocation(0x80, t, loc(&src, 1));
        reg.record_allocation(0x90, t, loc(&src, 2));
        assert!(!reg.safe_deletion(0xa0, t, loc(&src, 3)));

        assert_eq!(render_to_string(&reg), render_to_string(&reg));

        let mut first = Vec::new();
        let mut second = Vec::new();
        render_nonfreed(&reg, &mut first).unwrap();
        render_nonfreed(&reg, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn nonfreed_lists_each_live_entry_once() {
        ansi::set_colors_enabled(false);
        let src = fixture("one();\ntwo();\n");
        let mut reg = AllocationRegistry::new();
        let t = TypeId::of::<u32>();
        reg.record_allocation(0xb0, t, loc(&src, 1));
        reg.record_allocation(0xc0, t, loc(&src, 2));

        let mut buf = Vec::new();
        render_nonfreed(&reg, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("error: 2 unfreed pointers at:"));
        assert_eq!(text.matches("---> ").count(), 2);
        assert!(text.contains(":1"));
        assert!(text.contains(":2"));
    }

    #[test]
    fn singular_header_for_one_leak() {
        ansi::set_colors_enabled(false);
        let src = fixture("one();\n");
        let mut reg = AllocationRegistry::new();
        reg.record_allocation(0xd0, TypeId::of::<u32>(), loc(&src, 1));

        let mut buf = Vec::new();
        render_nonfreed(&reg, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("error: 1 unfreed pointer at:"));
    }

    #[test]
    fn empty_registry_renders_nothing() {
        let reg = AllocationRegistry::new();
        let mut buf = Vec::new();
        render_errors(&reg, &mut buf).unwrap();
        render_nonfreed(&reg, &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
