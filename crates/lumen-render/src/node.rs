//! Boundary to the retained UI tree.
//!
//! UI components implement [`RenderNode`]: they append draw commands in
//! logical pixels and may pre-warm the textures they are about to use.
//! Optional abilities are declared as [`Capabilities`] and read once when the
//! node enters a [`NodeTree`]; dispatch never inspects concrete node types.

use bitflags::bitflags;

use crate::coords::{SizePx, Vec2};
use crate::frame::FrameBuffer;
use crate::texture::{ResourceManager, TextureDevice};

bitflags! {
    /// Optional node abilities, resolved once per node.
    #[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
    pub struct Capabilities: u32 {
        /// Accepts [`RenderNode::scroll_by`].
        const SCROLLABLE         = 1 << 0;
        /// Accepts externally built content via [`RenderNode::set_content`].
        const CONTENT_HOST       = 1 << 1;
        /// Wants [`RenderNode::update_resource_context`] on every layout pass.
        const PREWARMS_RESOURCES = 1 << 2;
    }
}

/// Everything a node needs to create textures during a layout pass.
pub struct ResourceContext<'a> {
    pub resources: &'a mut ResourceManager,
    pub gpu: &'a mut dyn TextureDevice,
    pub device_pixel_ratio: f32,
}

impl<'a> ResourceContext<'a> {
    pub fn new(
        resources: &'a mut ResourceManager,
        gpu: &'a mut dyn TextureDevice,
        device_pixel_ratio: f32,
    ) -> Self {
        Self { resources, gpu, device_pixel_ratio }
    }

    /// Device-pixel size for a logical size, rounded up.
    pub fn device_size(&self, logical: Vec2) -> SizePx {
        let dpr = if self.device_pixel_ratio > 0.0 { self.device_pixel_ratio } else { 1.0 };
        SizePx::new(
            (logical.x * dpr).ceil().max(0.0) as u32,
            (logical.y * dpr).ceil().max(0.0) as u32,
        )
    }
}

pub trait RenderNode {
    /// Pushes this node's commands (logical pixels) into `frame`.
    fn append(&self, frame: &mut FrameBuffer);

    /// Creates or refreshes textures this node will draw. Called once per
    /// layout pass for nodes with [`Capabilities::PREWARMS_RESOURCES`].
    fn update_resource_context(&mut self, _ctx: &mut ResourceContext<'_>) {}

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Only called on [`Capabilities::SCROLLABLE`] nodes.
    fn scroll_by(&mut self, _delta: Vec2) {}

    /// Only called on [`Capabilities::CONTENT_HOST`] nodes.
    fn set_content(&mut self, _content: FrameBuffer) {}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

struct NodeEntry {
    node: Box<dyn RenderNode>,
    caps: Capabilities,
}

/// Flat, paint-ordered list of nodes with their resolved capabilities.
#[derive(Default)]
pub struct NodeTree {
    nodes: Vec<NodeEntry>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node after all existing ones and records its capabilities.
    pub fn push(&mut self, node: impl RenderNode + 'static) -> NodeId {
        let caps = node.capabilities();
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry { node: Box::new(node), caps });
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capabilities(&self, id: NodeId) -> Option<Capabilities> {
        self.nodes.get(id.0).map(|e| e.caps)
    }

    /// Nodes declaring every flag in `caps`, in paint order.
    pub fn nodes_with(&self, caps: Capabilities) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.caps.contains(caps))
            .map(|(i, _)| NodeId(i))
    }

    // ── per-frame ─────────────────────────────────────────────────────────

    /// Lets every pre-warming node create its textures.
    pub fn update_resources(&mut self, ctx: &mut ResourceContext<'_>) {
        for entry in &mut self.nodes {
            if entry.caps.contains(Capabilities::PREWARMS_RESOURCES) {
                entry.node.update_resource_context(ctx);
            }
        }
    }

    pub fn append_all(&self, frame: &mut FrameBuffer) {
        for entry in &self.nodes {
            entry.node.append(frame);
        }
    }

    pub fn build_frame(&self) -> FrameBuffer {
        let mut frame = FrameBuffer::new();
        self.append_all(&mut frame);
        frame
    }

    // ── capability dispatch ───────────────────────────────────────────────

    /// Returns `false` if the node is unknown or not scrollable.
    pub fn scroll_by(&mut self, id: NodeId, delta: Vec2) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(e) if e.caps.contains(Capabilities::SCROLLABLE) => {
                e.node.scroll_by(delta);
                true
            }
            _ => false,
        }
    }

    /// Returns `false` if the node is unknown or does not host content.
    pub fn set_content(&mut self, id: NodeId, content: FrameBuffer) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(e) if e.caps.contains(Capabilities::CONTENT_HOST) => {
                e.node.set_content(content);
                true
            }
            _ => false,
        }
    }
}
