use super::result::Graph;
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects graph dumps emitted by the engine during one session.
///
/// Installed only when graph rendering is requested; each collected
/// result takes the dumps accumulated since the previous one.
#[derive(Debug, Clone, Default)]
pub struct GraphSink {
    graphs: Arc<Mutex<Vec<Graph>>>,
}

impl GraphSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one graph.
    pub fn dump(&self, name: impl Into<String>, content: impl Into<String>) {
        self.graphs.lock().push(Graph {
            name: name.into(),
            content: content.into(),
        });
    }

    /// Removes and returns everything recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<Graph> {
        std::mem::take(&mut *self.graphs.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let sink = GraphSink::new();
        sink.clone().dump("bundle_graph", "digraph {}");
        let graphs = sink.take();
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].name, "bundle_graph");
        assert!(sink.take().is_empty());
    }
}
