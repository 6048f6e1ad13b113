/// Last text and reasoning forwarded during one turn.
///
/// Message parts carry the whole accumulated content, so each new snapshot
/// is diffed by length against what was already sent. The two kinds keep
/// separate baselines.
#[derive(Debug, Default)]
pub struct DeltaState {
    last_text: String,
    last_thinking: String,
}

impl DeltaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsent suffix of a text snapshot. Advances the baseline whenever the
    /// snapshot is longer, whether or not the caller manages to deliver it.
    pub fn text<'a>(&mut self, snapshot: &'a str) -> Option<&'a str> {
        advance(&mut self.last_text, snapshot)
    }

    pub fn thinking<'a>(&mut self, snapshot: &'a str) -> Option<&'a str> {
        advance(&mut self.last_thinking, snapshot)
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    pub fn last_thinking(&self) -> &str {
        &self.last_thinking
    }
}

fn advance<'a>(last: &mut String, snapshot: &'a str) -> Option<&'a str> {
    if snapshot.len() <= last.len() {
        return None;
    }
    // A snapshot that rewrote earlier content can put the cut inside a
    // multi-byte char; nothing sensible to send then.
    let delta = snapshot.get(last.len()..).filter(|d| !d.is_empty());
    last.clear();
    last.push_str(snapshot);
    delta
}
