use indexmap::IndexMap;

use crate::coords::Rect;
use crate::frame::{FrameBuffer, ImageCommand, RoundedRectCommand};
use crate::texture::TextureHandle;

use super::RenderStage;

/// Receives the commands that survive viewport filtering, in draw order.
///
/// Within one stage every rounded rect arrives before any image, and images
/// arrive grouped by texture.
pub trait StageSink {
    fn rounded_rect(&mut self, stage: RenderStage, cmd: &RoundedRectCommand);
    fn image(&mut self, stage: RenderStage, cmd: &ImageCommand);
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Commands forwarded to the sink, per stage (indexed by [`RenderStage::index`]).
    pub per_stage: [usize; RenderStage::COUNT],
    /// Commands dropped because they miss the viewport.
    pub culled: usize,
}

impl ExecutionStats {
    pub fn executed(&self) -> usize {
        self.per_stage.iter().sum()
    }
}

#[derive(Debug, Clone, Default)]
struct StageCommands {
    rounded_rects: Vec<RoundedRectCommand>,
    images: IndexMap<TextureHandle, Vec<ImageCommand>>,
}

impl StageCommands {
    fn len(&self) -> usize {
        self.rounded_rects.len() + self.images.values().map(Vec::len).sum::<usize>()
    }

    fn clear(&mut self) {
        self.rounded_rects.clear();
        self.images.clear();
    }
}

/// Commands sorted into the four [`RenderStage`]s.
///
/// Insertion order across stages does not matter: execution always runs
/// Background, Content, Overlay, Debug.
///
/// Commands accumulate until [`clear`](Self::clear); callers rebuilding the
/// pipeline every frame must clear it first.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    stages: [StageCommands; RenderStage::COUNT],
    viewport: Rect,
}

impl RenderPipeline {
    pub fn new(viewport: Rect) -> Self {
        Self { stages: Default::default(), viewport }
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    #[inline]
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    // ── recording ─────────────────────────────────────────────────────────

    pub fn add_rounded_rect(&mut self, stage: RenderStage, cmd: RoundedRectCommand) {
        self.stages[stage.index()].rounded_rects.push(cmd);
    }

    /// Adds an image to its stage's batch for `cmd.texture`.
    pub fn add_image(&mut self, stage: RenderStage, cmd: ImageCommand) {
        self.stages[stage.index()].images.entry(cmd.texture).or_default().push(cmd);
    }

    /// Copies every command of `frame` into `stage`.
    pub fn add_frame_data(&mut self, stage: RenderStage, frame: &FrameBuffer) {
        for cmd in &frame.rounded_rects {
            self.add_rounded_rect(stage, cmd.clone());
        }
        for cmd in &frame.images {
            self.add_image(stage, cmd.clone());
        }
    }

    pub fn clear(&mut self) {
        for stage in &mut self.stages {
            stage.clear();
        }
    }

    // ── execution ─────────────────────────────────────────────────────────

    /// Forwards one stage's visible commands to `sink`. Returns how many were forwarded.
    pub fn execute_stage(&self, stage: RenderStage, sink: &mut dyn StageSink) -> usize {
        let commands = &self.stages[stage.index()];
        let mut executed = 0;

        for cmd in &commands.rounded_rects {
            if cmd.rect.intersects(self.viewport) {
                sink.rounded_rect(stage, cmd);
                executed += 1;
            }
        }

        for batch in commands.images.values() {
            for cmd in batch {
                if cmd.rect.intersects(self.viewport) {
                    sink.image(stage, cmd);
                    executed += 1;
                }
            }
        }
        executed
    }

    /// Executes every stage in order.
    pub fn execute_all(&self, sink: &mut dyn StageSink) -> ExecutionStats {
        let mut stats = ExecutionStats::default();
        for stage in RenderStage::ALL {
            let executed = self.execute_stage(stage, sink);
            stats.per_stage[stage.index()] = executed;
            stats.culled += self.stages[stage.index()].len() - executed;
        }
        log::trace!("pipeline: executed {} commands ({} culled)", stats.executed(), stats.culled);
        stats
    }

    // ── counts ────────────────────────────────────────────────────────────

    /// Recorded commands across all stages, before culling.
    pub fn command_count(&self) -> usize {
        self.stages.iter().map(StageCommands::len).sum()
    }

    pub fn stage_command_count(&self, stage: RenderStage) -> usize {
        self.stages[stage.index()].len()
    }

    /// Number of texture batches across all stages.
    pub fn batch_count(&self) -> usize {
        self.stages.iter().map(|s| s.images.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.command_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<(RenderStage, &'static str, f32)>,
    }

    impl StageSink for Recorder {
        fn rounded_rect(&mut self, stage: RenderStage, cmd: &RoundedRectCommand) {
            self.events.push((stage, "rect", cmd.rect.origin.x));
        }

        fn image(&mut self, stage: RenderStage, cmd: &ImageCommand) {
            self.events.push((stage, "image", cmd.rect.origin.x));
        }
    }

    fn rr(x: f32) -> RoundedRectCommand {
        RoundedRectCommand::new(Rect::new(x, 0.0, 10.0, 10.0), 0.0, Color::WHITE)
    }

    fn img(x: f32, texture: u32) -> ImageCommand {
        ImageCommand::new(Rect::new(x, 0.0, 10.0, 10.0), TextureHandle(texture))
    }

    fn pipeline() -> RenderPipeline {
        RenderPipeline::new(Rect::new(0.0, 0.0, 800.0, 600.0))
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn stages_run_in_fixed_order_regardless_of_insertion() {
        let mut p = pipeline();
        p.add_rounded_rect(RenderStage::Debug, rr(4.0));
        p.add_rounded_rect(RenderStage::Overlay, rr(3.0));
        p.add_rounded_rect(RenderStage::Background, rr(1.0));
        p.add_rounded_rect(RenderStage::Content, rr(2.0));

        let mut rec = Recorder::default();
        let stats = p.execute_all(&mut rec);

        let stages: Vec<RenderStage> = rec.events.iter().map(|e| e.0).collect();
        assert_eq!(stages, RenderStage::ALL.to_vec());
        assert_eq!(stats.executed(), 4);
    }

    #[test]
    fn rects_precede_images_within_a_stage() {
        let mut p = pipeline();
        p.add_image(RenderStage::Content, img(1.0, 5));
        p.add_rounded_rect(RenderStage::Content, rr(2.0));

        let mut rec = Recorder::default();
        p.execute_stage(RenderStage::Content, &mut rec);
        let kinds: Vec<&str> = rec.events.iter().map(|e| e.1).collect();
        assert_eq!(kinds, vec!["rect", "image"]);
    }

    #[test]
    fn images_are_grouped_by_texture() {
        let mut p = pipeline();
        p.add_image(RenderStage::Content, img(1.0, 7));
        p.add_image(RenderStage::Content, img(2.0, 9));
        p.add_image(RenderStage::Content, img(3.0, 7));
        assert_eq!(p.batch_count(), 2);

        let mut rec = Recorder::default();
        p.execute_all(&mut rec);
        let xs: Vec<f32> = rec.events.iter().map(|e| e.2).collect();
        assert_eq!(xs, vec![1.0, 3.0, 2.0]);
    }

    // ── culling / counts ──────────────────────────────────────────────────

    #[test]
    fn commands_outside_viewport_are_not_executed() {
        let mut p = RenderPipeline::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        p.add_rounded_rect(RenderStage::Content, rr(50.0));
        p.add_rounded_rect(RenderStage::Content, rr(500.0));
        p.add_image(RenderStage::Overlay, img(900.0, 1));

        let mut rec = Recorder::default();
        let stats = p.execute_all(&mut rec);
        assert_eq!(stats.executed(), 1);
        assert_eq!(stats.culled, 2);
        assert_eq!(stats.per_stage[RenderStage::Content.index()], 1);
        assert_eq!(p.command_count(), 3);
    }

    #[test]
    fn frame_data_lands_in_one_stage() {
        let mut frame = FrameBuffer::new();
        frame.push_rounded_rect(rr(0.0));
        frame.push_image(img(0.0, 3));

        let mut p = pipeline();
        p.add_frame_data(RenderStage::Background, &frame);
        assert_eq!(p.stage_command_count(RenderStage::Background), 2);
        assert_eq!(p.stage_command_count(RenderStage::Content), 0);
    }

    #[test]
    fn commands_accumulate_until_cleared() {
        let mut p = pipeline();
        p.add_rounded_rect(RenderStage::Content, rr(0.0));
        p.add_rounded_rect(RenderStage::Content, rr(0.0));
        assert_eq!(p.command_count(), 2);
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.batch_count(), 0);
    }
}
