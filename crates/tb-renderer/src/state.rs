//! State structs tracking context during event processing.

use pulldown_cmark::Alignment;

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    active: bool,
    /// Fence info string (fenced blocks only).
    info: Option<String>,
    indented: bool,
    buffer: String,
}

impl CodeBlockState {
    pub(crate) fn start(&mut self, info: Option<String>, indented: bool) {
        self.active = true;
        self.info = info;
        self.indented = indented;
        self.buffer.clear();
    }

    /// End the current code block and return (info, indented, content).
    pub(crate) fn end(&mut self) -> (Option<String>, bool, String) {
        self.active = false;
        (
            self.info.take(),
            std::mem::take(&mut self.indented),
            std::mem::take(&mut self.buffer),
        )
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub(crate) struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    pub(crate) fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub(crate) fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub(crate) fn end_head(&mut self) {
        self.in_head = false;
    }

    pub(crate) fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub(crate) fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub(crate) fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// Alignment of the current cell as an `align` attribute value.
    pub(crate) fn current_alignment(&self) -> Option<&'static str> {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => Some("left"),
            Some(Alignment::Center) => Some("center"),
            Some(Alignment::Right) => Some("right"),
            Some(Alignment::None) | None => None,
        }
    }
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub(crate) struct ImageState {
    /// Destination and title of the open image.
    pending: Option<(String, String)>,
    alt_text: String,
}

impl ImageState {
    pub(crate) fn start(&mut self, src: String, title: String) {
        self.pending = Some((src, title));
        self.alt_text.clear();
    }

    /// End image capture and return (src, title, alt).
    pub(crate) fn end(&mut self) -> Option<(String, String, String)> {
        let (src, title) = self.pending.take()?;
        Some((src, title, std::mem::take(&mut self.alt_text)))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_alignment_follows_cells() {
        let mut table = TableState::default();
        table.start(vec![Alignment::None, Alignment::Center]);
        table.start_row();
        assert_eq!(table.current_alignment(), None);
        table.next_cell();
        assert_eq!(table.current_alignment(), Some("center"));
        table.next_cell();
        assert_eq!(table.current_alignment(), None);
    }

    #[test]
    fn test_image_state() {
        let mut image = ImageState::default();
        assert!(image.end().is_none());
        image.start("a.png".to_owned(), String::new());
        image.push_str("alt");
        assert!(image.is_active());
        assert_eq!(
            image.end(),
            Some(("a.png".to_owned(), String::new(), "alt".to_owned()))
        );
        assert!(!image.is_active());
    }
}
