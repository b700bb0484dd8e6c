//! Human-readable listing of the current results view.
//!
//! Each visible group is printed as a header followed by its files. The
//! reference file is flagged with `*`, marked files with `[x]`.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::engine::Engine;

/// Plain text formatter.
pub struct TextOutput<'a> {
    engine: &'a Engine,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Write the listing followed by a summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let marks = self.engine.marks();
        let projection = self.engine.projection();

        for view in &projection {
            writeln!(
                writer,
                "Group {} ({} files, {} reclaimable)",
                view.group.id(),
                view.group.len(),
                ByteSize(view.group.wasted_space())
            )?;
            for file in &view.members {
                let mark = if marks.is_marked(file.key()) { "[x]" } else { "[ ]" };
                let reference = if view.group.is_reference(file.key()) { "*" } else { " " };
                writeln!(
                    writer,
                    "  {} {} {:>10}  {}",
                    mark,
                    reference,
                    ByteSize(file.size()).to_string(),
                    file.display_text()
                )?;
            }
            writeln!(writer)?;
        }

        let visible = projection.group_count();
        let stats = self.engine.stats();
        if visible == stats.groups {
            writeln!(writer, "{}", stats)
        } else {
            writeln!(writer, "{} of {} group(s) shown. {}", visible, stats.groups, stats)
        }
    }
}
