//! Agenda extraction: bounded prefix of the document.

/// Level-2 heading marker the agenda is sectioned by.
const SECTION_MARKER: &str = "## ";

/// Extract the "first two sections" window of a document.
///
/// The content is split on the level-2 heading marker; at most the
/// first three pieces are kept, rejoined by the marker. The window
/// therefore ends just before the third heading. With fewer than two
/// markers the whole document is returned.
pub fn section_window(content: &str) -> String {
    let pieces: Vec<&str> = content.split(SECTION_MARKER).collect();
    if pieces.len() <= 3 {
        return content.to_string();
    }
    pieces[..3].join(SECTION_MARKER)
}
