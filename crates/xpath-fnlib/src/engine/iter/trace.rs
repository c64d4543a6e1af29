use super::{SequenceIter, SequenceIterator};
use crate::engine::runtime::Error;
use crate::model::{NodeKind, XdmNode};
use crate::xdm::XdmItem;

/// Passes items through unchanged and logs each one as it is pulled.
pub struct TracingIterator<N> {
    base: SequenceIter<N>,
    label: String,
    position: usize,
    finished: bool,
}

impl<N> TracingIterator<N> {
    pub fn new(base: SequenceIter<N>, label: impl Into<String>) -> Self {
        Self { base, label: label.into(), position: 0, finished: false }
    }
}

impl<N: XdmNode> SequenceIterator<N> for TracingIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        if self.finished {
            return Ok(None);
        }
        match self.base.next_item()? {
            Some(item) => {
                self.position += 1;
                tracing::info!(
                    target: "xpath::trace",
                    label = %self.label,
                    position = self.position,
                    item_type = %item.type_label(),
                    value = %display_item(&item),
                    "trace"
                );
                Ok(Some(item))
            }
            None => {
                self.finished = true;
                if self.position == 0 {
                    tracing::info!(target: "xpath::trace", label = %self.label, "empty sequence");
                }
                Ok(None)
            }
        }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(TracingIterator::new(self.base.get_another()?, self.label.clone())))
    }
}

/// Nodes are shown by path, atomic values by their string value.
pub(crate) fn display_item<N: XdmNode>(item: &XdmItem<N>) -> String {
    match item {
        XdmItem::Node(n) => node_path(n),
        XdmItem::Atomic(a) => a.string_value(),
    }
}

/// A path expression that selects `node` from its root, e.g. `/doc/item[2]/@id`.
pub fn node_path<N: XdmNode>(node: &N) -> String {
    let Some(parent) = node.parent() else {
        return if node.kind() == NodeKind::Document { "/".to_string() } else { String::new() };
    };
    let prefix = match node_path(&parent) {
        p if p == "/" => String::new(),
        p => p,
    };
    let name = node.name().map(|q| q.display_name()).unwrap_or_default();
    let step = match node.kind() {
        NodeKind::Attribute => format!("@{name}"),
        NodeKind::Namespace => format!("namespace::{name}"),
        kind => {
            let same: Vec<N> =
                parent.children().into_iter().filter(|c| c.kind() == kind && c.name() == node.name()).collect();
            let index = same.iter().position(|c| c == node).map_or(1, |i| i + 1);
            let test = match kind {
                NodeKind::Element => name,
                NodeKind::Text => "text()".to_string(),
                NodeKind::Comment => "comment()".to_string(),
                NodeKind::ProcessingInstruction => format!("processing-instruction({name})"),
                _ => "node()".to_string(),
            };
            format!("{test}[{index}]")
        }
    };
    format!("{prefix}/{step}")
}
