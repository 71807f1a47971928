use async_trait::async_trait;

use combat_core::DisplayEvent;

/// Whatever actually renders events: a terminal, a UI, a test recorder.
#[async_trait]
pub trait DisplayBackend: Send {
    /// Shows a visual event. Returns once the event is fully presented
    /// (text revealed, bar animated, speech finished).
    async fn present(&mut self, event: &DisplayEvent);

    /// Commits a non-visual event to the presentation model.
    async fn apply(&mut self, event: &DisplayEvent) {
        let _ = event;
    }
}

/// Backend that records everything it is given.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    pub presented: Vec<DisplayEvent>,
    pub applied: Vec<DisplayEvent>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of every presented narrative or system event, in order.
    pub fn lines(&self) -> Vec<&str> {
        self.presented.iter().filter_map(DisplayEvent::text).collect()
    }
}

#[async_trait]
impl DisplayBackend for RecordingBackend {
    async fn present(&mut self, event: &DisplayEvent) {
        self.presented.push(event.clone());
    }

    async fn apply(&mut self, event: &DisplayEvent) {
        self.applied.push(event.clone());
    }
}
