//! Paste context: ancestors reopened around a range fragment.

use crate::error::EncodeError;
use crate::node_serializer::NodeSerializer;
use dom::{Document, NodeId};

/// Decides which ancestors of a range are reopened as context.
pub trait RangeNodeContext {
    fn include_in_context(&self, _doc: &Document, _node: NodeId) -> bool {
        false
    }

    /// How many of the innermost `ancestors` (index 0 is the innermost) are
    /// reopened regardless of `include_in_context`.
    fn immediate_context_count(&self, _doc: &Document, _ancestors: &[NodeId]) -> usize {
        0
    }
}

/// Reopens nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRangeContext;

impl RangeNodeContext for NoRangeContext {}

pub struct RangeContextSerializer<'c> {
    node_context: &'c dyn RangeNodeContext,
    disabled: bool,
    /// Ancestors reopened by each pending `start`, outermost first.
    frames: Vec<Vec<NodeId>>,
}

impl<'c> RangeContextSerializer<'c> {
    pub fn new(node_context: &'c dyn RangeNodeContext) -> Self {
        Self {
            node_context,
            disabled: false,
            frames: Vec::new(),
        }
    }

    pub fn node_context(&self) -> &'c dyn RangeNodeContext {
        self.node_context
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// While disabled, `start` and `end` do nothing.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Reopen the accepted members of `ancestors` (innermost first), from the
    /// outermost inward, and remember them as one frame.
    pub fn start(
        &mut self,
        ns: &mut NodeSerializer<'_, '_>,
        ancestors: &[NodeId],
    ) -> Result<(), EncodeError> {
        if self.disabled {
            return Ok(());
        }
        let doc = ns.document();
        let immediate = self.node_context.immediate_context_count(doc, ancestors);
        let mut frame = Vec::new();
        let mut result = Ok(());
        for (i, &node) in ancestors.iter().enumerate().rev() {
            if self.node_context.include_in_context(doc, node) || i < immediate {
                result = ns.serialize_node_start(node, 0, None, None);
                frame.push(node);
                if result.is_err() {
                    break;
                }
            }
        }
        log::trace!(target: "encoder.context", "reopened {} of {} ancestors", frame.len(), ancestors.len());
        self.frames.push(frame);
        result
    }

    /// Close the most recent frame, innermost first.
    ///
    /// # Panics
    ///
    /// When no `start` is pending.
    pub fn end(&mut self, ns: &mut NodeSerializer<'_, '_>) -> Result<(), EncodeError> {
        if self.disabled {
            return Ok(());
        }
        let Some(frame) = self.frames.pop() else {
            panic!("range context end without a pending start");
        };
        for &node in frame.iter().rev() {
            ns.serialize_node_end(node, None)?;
        }
        Ok(())
    }
}
