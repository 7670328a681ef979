//! Read-only line access for search and filter consumers.

use crate::log_data::LogData;
use logview_common::{BytePos, LineNumber, LinesCount};

/// The line-access contract shared by the log data facade and any views
/// derived from it.
///
/// All operations are read-only and thread-safe; implementations may be
/// called from a search worker while indexing runs in the background.
pub trait LineAccess: Send + Sync {
    /// Number of lines available.
    fn nb_lines(&self) -> LinesCount;

    /// Byte offset just past the terminator of `line`.
    fn pos_for_line(&self, line: LineNumber) -> Option<BytePos>;

    /// One decoded line, terminator stripped.
    fn get_line(&self, line: LineNumber) -> String;

    /// One decoded line with tabs expanded.
    fn get_expanded_line(&self, line: LineNumber) -> String;
}

impl LineAccess for LogData {
    fn nb_lines(&self) -> LinesCount {
        LogData::nb_lines(self)
    }

    fn pos_for_line(&self, line: LineNumber) -> Option<BytePos> {
        LogData::pos_for_line(self, line)
    }

    fn get_line(&self, line: LineNumber) -> String {
        LogData::get_line(self, line)
    }

    fn get_expanded_line(&self, line: LineNumber) -> String {
        LogData::get_expanded_line(self, line)
    }
}

/// Handle bound to a [`LogData`] for a search/filter consumer.
///
/// The view shares the facade's state; it stays valid while any clone of
/// the facade is alive and keeps the underlying worker running.
#[derive(Clone)]
pub struct FilteredView {
    data: LogData,
}

impl FilteredView {
    pub(crate) fn new(data: LogData) -> Self {
        FilteredView { data }
    }

    /// The facade this view reads through.
    pub fn log_data(&self) -> &LogData {
        &self.data
    }
}

impl LineAccess for FilteredView {
    fn nb_lines(&self) -> LinesCount {
        self.data.nb_lines()
    }

    fn pos_for_line(&self, line: LineNumber) -> Option<BytePos> {
        self.data.pos_for_line(line)
    }

    fn get_line(&self, line: LineNumber) -> String {
        self.data.get_line(line)
    }

    fn get_expanded_line(&self, line: LineNumber) -> String {
        self.data.get_expanded_line(line)
    }
}
