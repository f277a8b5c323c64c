//! Code fence tracking so `:::` lines inside code are left alone.

/// Tracks whether line-by-line processing is inside a fenced code block.
///
/// A fence opens with three or more backticks or tildes and closes with a
/// line of at least as many of the same character and nothing else.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    /// Marker character and run length of the open fence.
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one line. Returns `true` if it opened or closed a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let Some((marker, len)) = fence_run(trimmed) else {
            return false;
        };
        match self.open {
            None => {
                self.open = Some((marker, len));
                true
            }
            Some((open_marker, open_len))
                if marker == open_marker
                    && len >= open_len
                    && trimmed[len..].trim().is_empty() =>
            {
                self.open = None;
                true
            }
            Some(_) => false,
        }
    }
}

/// Leading run of at least three backticks or tildes.
fn fence_run(trimmed: &str) -> Option<(char, usize)> {
    let marker = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    // Both markers are one byte, so the count is also a byte length
    let len = trimmed.chars().take_while(|&c| c == marker).count();
    (len >= 3).then_some((marker, len))
}
